// 8.0 engine/core.rs: main engine. holds the trade table and the custody account.

use super::results::LendingError;
use crate::config::LendingConfig;
use crate::events::{Event, EventLog, LendingEvent, OperationRejectedEvent};
use crate::ledger::Ledger;
use crate::trade::{Trade, TradeState};
use crate::types::{Address, Amount, Timestamp, TokenId, TradeId};

/** 8.1: main engine struct. all loan state lives here, all value lives in the ledger */
#[derive(Debug)]
pub struct LendingEngine {
    pub(super) config: LendingConfig,
    // custody account holding escrowed collateral and currency
    pub(super) address: Address,
    pub(super) tokens_contract: Address,
    // trade_id == index, never reused
    pub(super) trades: Vec<Trade>,
    pub(super) events: EventLog<LendingEvent>,
}

impl LendingEngine {
    /// Bind a new engine to `ledger`. Every later call must pass that same ledger.
    pub fn new(config: LendingConfig, address: Address, ledger: &Ledger) -> Self {
        let events = EventLog::new(config.max_events);
        Self {
            config,
            address,
            tokens_contract: ledger.address(),
            trades: Vec::new(),
            events,
        }
    }

    pub fn config(&self) -> &LendingConfig {
        &self.config
    }

    /// The engine's own account on the ledger.
    pub fn custody_address(&self) -> Address {
        self.address
    }

    /// Which ledger this engine settles against.
    pub fn tokens_contract(&self) -> Address {
        self.tokens_contract
    }

    pub fn trades(&self, trade_id: TradeId) -> Option<&Trade> {
        usize::try_from(trade_id.0).ok().and_then(|i| self.trades.get(i))
    }

    pub fn trade_count(&self) -> usize {
        self.trades.len()
    }

    pub fn trades_iter(&self) -> impl Iterator<Item = &Trade> {
        self.trades.iter()
    }

    pub fn trades_by_borrower(&self, borrower: Address) -> Vec<&Trade> {
        self.trades.iter().filter(|t| t.borrower == borrower).collect()
    }

    pub fn trades_by_lender(&self, lender: Address) -> Vec<&Trade> {
        self.trades.iter().filter(|t| t.lender == Some(lender)).collect()
    }

    pub fn trades_in_state(&self, state: TradeState) -> Vec<&Trade> {
        self.trades.iter().filter(|t| t.state == state).collect()
    }

    pub fn custody_balance(&self, ledger: &Ledger, token_id: TokenId) -> Amount {
        ledger.balance_of(self.address, token_id)
    }

    pub fn events(&self) -> &[Event<LendingEvent>] {
        self.events.events()
    }

    pub fn recent_events(&self, count: usize) -> &[Event<LendingEvent>] {
        self.events.recent(count)
    }

    pub(super) fn ensure_ledger(&self, ledger: &Ledger) -> Result<(), LendingError> {
        if ledger.address() != self.tokens_contract {
            return Err(LendingError::LedgerMismatch {
                expected: self.tokens_contract,
                actual: ledger.address(),
            });
        }
        Ok(())
    }

    pub(super) fn trade(&self, trade_id: TradeId) -> Result<&Trade, LendingError> {
        self.trades(trade_id).ok_or(LendingError::TradeNotFound(trade_id))
    }

    pub(super) fn trade_mut(&mut self, trade_id: TradeId) -> Result<&mut Trade, LendingError> {
        usize::try_from(trade_id.0)
            .ok()
            .and_then(|i| self.trades.get_mut(i))
            .ok_or(LendingError::TradeNotFound(trade_id))
    }

    pub(super) fn next_trade_id(&self) -> TradeId {
        TradeId(self.trades.len() as u64)
    }

    pub(super) fn expect_state(trade: &Trade, expected: TradeState) -> Result<(), LendingError> {
        if trade.state != expected {
            return Err(LendingError::InvalidState {
                trade_id: trade.trade_id,
                state: trade.state,
                expected,
            });
        }
        Ok(())
    }

    // owner or an approved operator of the borrower
    pub(super) fn ensure_acts_for(
        ledger: &Ledger,
        caller: Address,
        owner: Address,
        trade_id: Option<TradeId>,
    ) -> Result<(), LendingError> {
        if !ledger.is_authorized(caller, owner) {
            return Err(LendingError::Unauthorized { caller, trade_id });
        }
        Ok(())
    }

    pub(super) fn emit_event(&mut self, now: Timestamp, payload: LendingEvent) {
        self.events.emit(Some(now), payload);
    }

    // record a failed call for audit and hand the error back unchanged
    pub(super) fn reject(
        &mut self,
        operation: &str,
        trade_id: Option<TradeId>,
        caller: Address,
        now: Timestamp,
        err: LendingError,
    ) -> LendingError {
        tracing::warn!(operation, ?trade_id, %caller, code = %err.code(), error = %err, "operation rejected");
        self.emit_event(
            now,
            LendingEvent::OperationRejected(OperationRejectedEvent {
                operation: operation.to_string(),
                trade_id,
                caller,
                code: err.code(),
                reason: err.to_string(),
            }),
        );
        err
    }
}
