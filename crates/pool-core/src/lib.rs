//! Transaction orchestration for an Aave-style lending pool.
//!
//! The [`Orchestrator`] validates a caller intent, converts its amounts to
//! token base units, decides whether allowance or credit-delegation approvals
//! are needed, and returns an ordered list of deferred transaction
//! descriptors. It never signs or sends anything.

use alloy_primitives::{address, Address};
use pool_types::{ServiceError, ValidationError};
use thiserror::Error;

pub mod adapters;
pub mod amount;
pub mod approval;
pub mod cache;
pub mod contracts;
pub mod encoding;
pub mod gas;
pub mod gateway;
pub mod optimized;
pub mod orchestrator;
pub mod permit;
pub mod surplus;
pub mod validation;

#[cfg(test)]
pub mod test_utils;

pub use orchestrator::{Orchestrator, OrchestratorBuilder};
pub use permit::PermitRequest;

/// Address callers use to name the chain's native currency as a reserve.
pub const NATIVE_CURRENCY: Address = address!("EeeeeEeeeEeEeeEeEeEeeEEEeeeeEeeeeeeeEEeE");

#[derive(Debug, Error)]
pub enum PoolError {
	#[error(transparent)]
	Validation(#[from] ValidationError),
	#[error(transparent)]
	Service(#[from] ServiceError),
	#[error("Encoding error: {0}")]
	Encoding(String),
	#[error("Configuration error: {0}")]
	Configuration(String),
}
