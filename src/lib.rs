// src/lib.rs

//! Job posting ingestion and query library

pub mod error;
pub mod models;
pub mod notify;
pub mod pipeline;
pub mod query;
pub mod services;
pub mod storage;
pub mod utils;
