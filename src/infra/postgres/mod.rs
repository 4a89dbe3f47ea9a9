//! PostgreSQL implementations for production proof storage

mod proof_store;

pub use proof_store::*;
