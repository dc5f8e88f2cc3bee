//! Contract interfaces the orchestrator encodes calls against.

#![allow(clippy::too_many_arguments)]

use alloy_sol_types::sol;

sol! {
	/// Primary lending pool.
	interface IPool {
		function supply(address asset, uint256 amount, address onBehalfOf, uint16 referralCode) external;

		function supplyWithPermit(
			address asset,
			uint256 amount,
			address onBehalfOf,
			uint16 referralCode,
			uint256 deadline,
			uint8 permitV,
			bytes32 permitR,
			bytes32 permitS
		) external;

		function withdraw(address asset, uint256 amount, address to) external returns (uint256);

		function borrow(
			address asset,
			uint256 amount,
			uint256 interestRateMode,
			uint16 referralCode,
			address onBehalfOf
		) external;

		function repay(
			address asset,
			uint256 amount,
			uint256 interestRateMode,
			address onBehalfOf
		) external returns (uint256);

		function repayWithPermit(
			address asset,
			uint256 amount,
			uint256 interestRateMode,
			address onBehalfOf,
			uint256 deadline,
			uint8 permitV,
			bytes32 permitR,
			bytes32 permitS
		) external returns (uint256);

		function swapBorrowRateMode(address asset, uint256 interestRateMode) external;

		function setUserUseReserveAsCollateral(address asset, bool useAsCollateral) external;

		function liquidationCall(
			address collateralAsset,
			address debtAsset,
			address user,
			uint256 debtToCover,
			bool receiveAToken
		) external;

		function flashLoan(
			address receiverAddress,
			address[] calldata assets,
			uint256[] calldata amounts,
			uint256[] calldata interestRateModes,
			address onBehalfOf,
			bytes calldata params,
			uint16 referralCode
		) external;

		function setUserEMode(uint8 categoryId) external;
	}

	/// Calldata-optimized pool. Arguments are packed into `bytes32` words and
	/// `msg.sender` stands in for `onBehalfOf`.
	interface IL2Pool {
		function supply(bytes32 args) external;
		function supplyWithPermit(bytes32 args, bytes32 r, bytes32 s) external;
		function withdraw(bytes32 args) external returns (uint256);
		function borrow(bytes32 args) external;
		function repay(bytes32 args) external returns (uint256);
		function repayWithPermit(bytes32 args, bytes32 r, bytes32 s) external returns (uint256);
		function swapBorrowRateMode(bytes32 args) external;
		function setUserUseReserveAsCollateral(bytes32 args) external;
		function liquidationCall(bytes32 args1, bytes32 args2) external;
	}

	/// Wraps and unwraps the native currency around pool calls.
	interface IWrappedTokenGateway {
		function depositETH(address pool, address onBehalfOf, uint16 referralCode) external payable;
		function withdrawETH(address pool, uint256 amount, address to) external;
		function repayETH(address pool, uint256 amount, uint256 rateMode, address onBehalfOf) external payable;
		function borrowETH(address pool, uint256 amount, uint256 interestRateMode, uint16 referralCode) external;
	}

	interface IERC20 {
		function approve(address spender, uint256 amount) external returns (bool);
	}

	interface ICreditDelegationToken {
		function approveDelegation(address delegatee, uint256 amount) external;
	}

	/// Signed permit forwarded to an adapter. All-zero when unused.
	#[derive(Debug, Default, PartialEq, Eq)]
	struct PermitSignature {
		uint256 amount;
		uint256 deadline;
		uint8 v;
		bytes32 r;
		bytes32 s;
	}

	interface ILiquiditySwapAdapter {
		function swapAndDeposit(
			address assetToSwapFrom,
			address assetToSwapTo,
			uint256 amountToSwap,
			uint256 minAmountToReceive,
			uint256 swapAllBalanceOffset,
			bytes calldata swapCalldata,
			address augustus,
			PermitSignature calldata permitParams
		) external;
	}

	interface IRepayAdapter {
		function swapAndRepay(
			address collateralAsset,
			address debtAsset,
			uint256 collateralAmount,
			uint256 debtRepayAmount,
			uint256 debtRateMode,
			uint256 buyAllBalanceOffset,
			bytes calldata paraswapData,
			PermitSignature calldata permitSignature
		) external;
	}

	/// EIP-2612 permit message.
	#[derive(Debug)]
	struct Permit {
		address owner;
		address spender;
		uint256 value;
		uint256 nonce;
		uint256 deadline;
	}
}
