//! Loan records.
//!
//! A trade moves OPEN → FINANCED → CLOSED | LIQUIDATED and never goes back.
//! Only the engine mutates trades; everyone else reads them.

use crate::interest::calculate_amount_owed;
use crate::types::{Address, Amount, Apy, Timestamp, TokenId, TradeId};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeState {
    /// Collateral escrowed, waiting for a lender
    Open,
    /// Principal committed, repayment in progress
    Financed,
    /// Lender took the collateral
    Liquidated,
    /// Fully repaid, collateral returned
    Closed,
}

impl TradeState {
    pub fn can_transition_to(&self, next: TradeState) -> bool {
        matches!(
            (self, next),
            (TradeState::Open, TradeState::Financed)
                | (TradeState::Financed, TradeState::Closed)
                | (TradeState::Financed, TradeState::Liquidated)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TradeState::Closed | TradeState::Liquidated)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    pub trade_id: TradeId,
    pub nft_id: TokenId,
    pub collateral_amount: Amount,
    pub borrower: Address,
    pub lender: Option<Address>,
    pub borrowing_amount: Amount,
    pub apy: Apy,
    pub paid_back_amount: Amount,
    pub opened_at: Timestamp,
    pub start_time: Option<Timestamp>,
    pub principal_claimed: bool,
    pub state: TradeState,
}

impl Trade {
    pub fn new(
        trade_id: TradeId,
        nft_id: TokenId,
        collateral_amount: Amount,
        borrower: Address,
        borrowing_amount: Amount,
        apy: Apy,
        opened_at: Timestamp,
    ) -> Self {
        Self {
            trade_id,
            nft_id,
            collateral_amount,
            borrower,
            lender: None,
            borrowing_amount,
            apy,
            paid_back_amount: 0,
            opened_at,
            start_time: None,
            principal_claimed: false,
            state: TradeState::Open,
        }
    }

    pub fn is_open(&self) -> bool {
        self.state == TradeState::Open
    }

    pub fn is_financed(&self) -> bool {
        self.state == TradeState::Financed
    }

    pub fn seconds_financed(&self, now: Timestamp) -> u64 {
        self.start_time.map(|start| now.seconds_since(start)).unwrap_or(0)
    }

    /// Principal plus simple interest accrued since financing.
    pub fn amount_owed_with_interest(&self, now: Timestamp) -> Option<Amount> {
        calculate_amount_owed(self.seconds_financed(now), self.borrowing_amount, self.apy)
    }

    /// Principal still unpaid, ignoring interest.
    pub fn outstanding_principal(&self) -> Amount {
        self.borrowing_amount.saturating_sub(self.paid_back_amount)
    }

    /// paid_back / borrowing, 1 = fully repaid. Can exceed 1 on overpayment.
    pub fn repaid_ratio(&self) -> Decimal {
        let (Some(paid), Some(borrowed)) = (
            Decimal::from_u128(self.paid_back_amount),
            Decimal::from_u128(self.borrowing_amount),
        ) else {
            return Decimal::ZERO;
        };
        paid.checked_div(borrowed)
            .map(|ratio| ratio.round_dp(4))
            .unwrap_or(Decimal::ZERO)
    }

    pub fn apy_percent(&self) -> Decimal {
        self.apy.as_percent()
    }

    // principal that is still sitting in engine custody
    pub(crate) fn escrowed_principal(&self) -> Amount {
        if self.state == TradeState::Financed && !self.principal_claimed {
            self.borrowing_amount
        } else {
            0
        }
    }
}
