//! Domain models for the proof gateway
//!
//! Proof records as stored and queried, plus the stream payload contract
//! they are decoded from.

mod message;
mod proof;

pub use message::*;
pub use proof::*;
