//! Chain-backed implementations of the read-only collaborators.
//!
//! The orchestrator only depends on the traits in `pool_types::services`.
//! This crate provides an implementation of all of them over a JSON-RPC
//! provider, plus the ENS name hashing they need.

use alloy_primitives::{keccak256, B256};
use thiserror::Error;

pub mod implementations {
	pub mod alloy;
}

pub use implementations::alloy::AlloyChainReader;

/// Errors raised while constructing a chain reader.
#[derive(Debug, Error)]
pub enum RpcError {
	#[error("Invalid RPC URL: {0}")]
	InvalidUrl(String),
}

/// Read-only contract interfaces used by the chain reader.
pub mod contracts {
	use alloy_sol_types::sol;

	sol! {
		interface IERC20Metadata {
			function decimals() external view returns (uint8);
			function name() external view returns (string);
			function allowance(address owner, address spender) external view returns (uint256);
		}

		interface IERC20Permit {
			function nonces(address owner) external view returns (uint256);
			function _nonces(address owner) external view returns (uint256);
		}

		interface ICreditDelegationToken {
			function borrowAllowance(address fromUser, address toUser) external view returns (uint256);
		}

		interface IPoolReserves {
			function getReserveData(address asset) external view returns (
				uint256 configuration,
				uint128 liquidityIndex,
				uint128 currentLiquidityRate,
				uint128 variableBorrowIndex,
				uint128 currentVariableBorrowRate,
				uint128 currentStableBorrowRate,
				uint40 lastUpdateTimestamp,
				uint16 id,
				address aTokenAddress,
				address stableDebtTokenAddress,
				address variableDebtTokenAddress,
				address interestRateStrategyAddress,
				uint128 accruedToTreasury,
				uint128 unbacked,
				uint128 isolationModeTotalDebt
			);
		}

		interface IENSRegistry {
			function resolver(bytes32 node) external view returns (address);
		}

		interface IENSResolver {
			function addr(bytes32 node) external view returns (address);
		}
	}
}

/// ENS namehash of a dotted name.
pub fn namehash(name: &str) -> B256 {
	let mut node = B256::ZERO;
	if name.is_empty() {
		return node;
	}
	for label in name.rsplit('.') {
		let label_hash = keccak256(label.to_lowercase().as_bytes());
		let mut buf = [0u8; 64];
		buf[..32].copy_from_slice(node.as_slice());
		buf[32..].copy_from_slice(label_hash.as_slice());
		node = keccak256(buf);
	}
	node
}
