//! Shared types for the lending-pool transaction builder.
//!
//! This crate holds the value types that flow between the orchestrator and
//! its collaborators: caller intents, converted amounts, permit signatures,
//! populated transactions and their deferred descriptors, the error taxonomy,
//! and the read-only service traits the orchestrator depends on.

pub mod amount;
pub mod errors;
pub mod intent;
pub mod services;
pub mod transaction;

pub use amount::*;
pub use errors::*;
pub use intent::*;
pub use services::*;
pub use transaction::*;
