// src/lib.rs

//! Book metadata lookup across Turkish retail catalogs and open book APIs.

pub mod error;
pub mod models;
pub mod services;
pub mod sources;
pub mod utils;
