//! HTTP handlers organized by transport.

pub mod graphql;
pub mod health;
pub mod proofs;

pub use graphql::*;
pub use health::*;
pub use proofs::*;
