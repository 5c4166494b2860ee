// 8.0.2: result types and errors for engine operations.

use crate::api::ErrorCode;
use crate::ledger::LedgerError;
use crate::trade::TradeState;
use crate::types::{Address, Amount, Apy, Timestamp, TokenId, TradeId};
use serde::{Deserialize, Serialize};

// borrower-side parameters for a new trade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenTradeRequest {
    pub nft_id: TokenId,
    pub borrower: Address,
    pub borrowing_amount: Amount,
    pub apy: Apy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinancingResult {
    pub trade_id: TradeId,
    pub lender: Address,
    pub start_time: Timestamp,
    // principal already forwarded to the borrower
    pub disbursed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepaymentResult {
    pub trade_id: TradeId,
    pub paid_back_amount: Amount,
    pub amount_owed: Amount,
    pub state: TradeState,
    pub paid_to_lender: Amount,
    pub refunded_to_borrower: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidationResult {
    pub trade_id: TradeId,
    pub lender: Address,
    pub nft_id: TokenId,
    pub collateral: Amount,
    pub released_currency: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LendingError {
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("{caller} may not act on trade {trade_id:?}")]
    Unauthorized {
        caller: Address,
        trade_id: Option<TradeId>,
    },

    #[error("{borrower} holds {available} of {nft_id}, needs {required}")]
    InsufficientCollateral {
        borrower: Address,
        nft_id: TokenId,
        available: Amount,
        required: Amount,
    },

    #[error("Trade {trade_id} is {state:?}, expected {expected:?}")]
    InvalidState {
        trade_id: TradeId,
        state: TradeState,
        expected: TradeState,
    },

    #[error("Principal of trade {0} has already left custody")]
    PrincipalAlreadyClaimed(TradeId),

    #[error("Trade {0} not found")]
    TradeNotFound(TradeId),

    #[error("Amount must be positive")]
    InvalidAmount,

    #[error("Token {0} cannot be used as collateral")]
    InvalidCollateral(TokenId),

    #[error("Trade {trade_id} cannot be liquidated before {eligible_at}")]
    NotYetLiquidatable {
        trade_id: TradeId,
        eligible_at: Timestamp,
    },

    #[error("Engine is bound to ledger {expected}, got {actual}")]
    LedgerMismatch { expected: Address, actual: Address },

    #[error("Arithmetic overflow")]
    ArithmeticOverflow,
}

impl LendingError {
    pub fn code(&self) -> ErrorCode {
        match self {
            LendingError::Ledger(e) => e.code(),
            LendingError::Unauthorized { .. } => ErrorCode::Unauthorized,
            LendingError::InsufficientCollateral { .. } => ErrorCode::InsufficientCollateral,
            LendingError::InvalidState { .. } | LendingError::PrincipalAlreadyClaimed(_) => {
                ErrorCode::InvalidState
            }
            LendingError::TradeNotFound(_) => ErrorCode::TradeNotFound,
            LendingError::InvalidAmount => ErrorCode::InvalidAmount,
            LendingError::InvalidCollateral(_) => ErrorCode::InvalidCollateral,
            LendingError::NotYetLiquidatable { .. } => ErrorCode::NotYetLiquidatable,
            LendingError::LedgerMismatch { .. } => ErrorCode::LedgerMismatch,
            LendingError::ArithmeticOverflow => ErrorCode::ArithmeticOverflow,
        }
    }
}
