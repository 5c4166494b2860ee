// 12.0 api.rs: serializable command/query surface for any transport layer.
// every failure carries a stable ErrorCode so callers can tell authorization
// failures from balance or state failures without parsing messages.

use crate::engine::{FinancingResult, LendingError, LiquidationResult, RepaymentResult};
use crate::ledger::{LedgerError, TokenType};
use crate::trade::Trade;
use crate::types::{Address, Amount, Apy, TokenId, TradeId};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    Unauthorized,
    InsufficientBalance,
    InsufficientCollateral,
    InvalidState,
    LengthMismatch,
    InvalidAmount,
    UnknownToken,
    TradeNotFound,
    InvalidCollateral,
    NotYetLiquidatable,
    LedgerMismatch,
    ArithmeticOverflow,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::Unauthorized => "UNAUTHORIZED",
            ErrorCode::InsufficientBalance => "INSUFFICIENT_BALANCE",
            ErrorCode::InsufficientCollateral => "INSUFFICIENT_COLLATERAL",
            ErrorCode::InvalidState => "INVALID_STATE",
            ErrorCode::LengthMismatch => "LENGTH_MISMATCH",
            ErrorCode::InvalidAmount => "INVALID_AMOUNT",
            ErrorCode::UnknownToken => "UNKNOWN_TOKEN",
            ErrorCode::TradeNotFound => "TRADE_NOT_FOUND",
            ErrorCode::InvalidCollateral => "INVALID_COLLATERAL",
            ErrorCode::NotYetLiquidatable => "NOT_YET_LIQUIDATABLE",
            ErrorCode::LedgerMismatch => "LEDGER_MISMATCH",
            ErrorCode::ArithmeticOverflow => "ARITHMETIC_OVERFLOW",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{code}: {message}")]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        Self {
            code: err.code(),
            message: err.to_string(),
        }
    }
}

impl From<LendingError> for ApiError {
    fn from(err: LendingError) -> Self {
        Self {
            code: err.code(),
            message: err.to_string(),
        }
    }
}

// State-mutating operations. The caller is supplied alongside, never inside.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    // ledger
    Mint {
        supply: Amount,
    },
    SetApprovalForAll {
        operator: Address,
        approved: bool,
    },
    SafeTransferFrom {
        from: Address,
        to: Address,
        token_id: TokenId,
        amount: Amount,
        #[serde(default)]
        data: Vec<u8>,
    },
    SafeBatchTransferFrom {
        from: Address,
        to: Address,
        token_ids: Vec<TokenId>,
        amounts: Vec<Amount>,
        #[serde(default)]
        data: Vec<u8>,
    },

    // lending engine
    OpenTrade {
        nft_id: TokenId,
        borrower: Address,
        borrowing_amount: Amount,
        apy: Apy,
    },
    LendToTrade {
        trade_id: TradeId,
    },
    ClaimPrincipal {
        trade_id: TradeId,
    },
    PayInterest {
        trade_id: TradeId,
        amount: Amount,
    },
    LiquidateTrade {
        trade_id: TradeId,
    },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Mint { .. } => "mint",
            Command::SetApprovalForAll { .. } => "set_approval_for_all",
            Command::SafeTransferFrom { .. } => "safe_transfer_from",
            Command::SafeBatchTransferFrom { .. } => "safe_batch_transfer_from",
            Command::OpenTrade { .. } => "open_trade",
            Command::LendToTrade { .. } => "lend_to_trade",
            Command::ClaimPrincipal { .. } => "claim_principal",
            Command::PayInterest { .. } => "pay_interest",
            Command::LiquidateTrade { .. } => "liquidate_trade",
        }
    }
}

// Read-only lookups
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Query {
    BalanceOf {
        account: Address,
        token_id: TokenId,
    },
    BalanceOfBatch {
        accounts: Vec<Address>,
        token_ids: Vec<TokenId>,
    },
    IsApprovedForAll {
        owner: Address,
        operator: Address,
    },
    TokenTypeCount,
    TokenType {
        token_id: TokenId,
    },
    Trade {
        trade_id: TradeId,
    },
    TradeCount,
    TokensContract,
    CustodyAddress,
    AmountOwed {
        trade_id: TradeId,
    },
    CalculateReturnAmount {
        elapsed_secs: u64,
        principal: Amount,
        apy: Apy,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiResponse {
    Done,
    TokenMinted { token_id: TokenId },
    TradeOpened { trade_id: TradeId },
    TradeFinanced(FinancingResult),
    Repayment(RepaymentResult),
    Liquidation(LiquidationResult),
    Amount { amount: Amount },
    Amounts { amounts: Vec<Amount> },
    Approved { approved: bool },
    Count { count: usize },
    TokenType { token_type: TokenType },
    Trade { trade: Trade },
    Address { address: Address },
}
