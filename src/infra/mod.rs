//! Infrastructure layer for the proof gateway
//!
//! Contains trait definitions and implementations for:
//! - Proof storage (PostgreSQL, in-memory)
//! - Retry with backoff (transient store failures)
//! - Graceful shutdown (signal handling, background task cancellation)

mod error;
mod graceful_shutdown;
mod memory;
pub mod postgres;
mod retry;
mod traits;

pub use error::*;
pub use graceful_shutdown::{
    serve_with_shutdown, shutdown_signal, GracefulShutdownConfig, ShutdownCoordinator,
    ShutdownSignal,
};
pub use memory::InMemoryProofStore;
pub use postgres::PgProofStore;
pub use retry::{is_retryable_db_error, Retry, RetryConfig, RetryResult};
pub use traits::*;
