//! Trade opening, financing and principal disbursement.

use super::core::LendingEngine;
use super::results::{FinancingResult, LendingError, OpenTradeRequest};
use crate::config::Disbursement;
use crate::events::{LendingEvent, PrincipalClaimedEvent, TradeFinancedEvent, TradeOpenedEvent};
use crate::ledger::{Ledger, TransferLeg};
use crate::trade::{Trade, TradeState};
use crate::types::{Address, Timestamp, TradeId};

impl LendingEngine {
    /// Lock one collateral unit from the borrower and record an OPEN trade.
    /// The borrower must have approved the engine as an operator on the ledger.
    pub fn open_trade(
        &mut self,
        ledger: &mut Ledger,
        caller: Address,
        request: OpenTradeRequest,
        now: Timestamp,
    ) -> Result<TradeId, LendingError> {
        self.try_open_trade(ledger, caller, request, now)
            .map_err(|e| self.reject("open_trade", None, caller, now, e))
    }

    fn try_open_trade(
        &mut self,
        ledger: &mut Ledger,
        caller: Address,
        request: OpenTradeRequest,
        now: Timestamp,
    ) -> Result<TradeId, LendingError> {
        self.ensure_ledger(ledger)?;
        Self::ensure_acts_for(ledger, caller, request.borrower, None)?;

        if request.nft_id == self.config.currency_token {
            return Err(LendingError::InvalidCollateral(request.nft_id));
        }
        if request.borrowing_amount == 0 {
            return Err(LendingError::InvalidAmount);
        }

        let required = self.config.collateral_per_trade;
        let available = ledger.balance_of(request.borrower, request.nft_id);
        if available < required {
            return Err(LendingError::InsufficientCollateral {
                borrower: request.borrower,
                nft_id: request.nft_id,
                available,
                required,
            });
        }

        ledger.safe_transfer_from(
            self.address,
            request.borrower,
            self.address,
            request.nft_id,
            required,
            b"",
        )?;

        let trade_id = self.next_trade_id();
        self.trades.push(Trade::new(
            trade_id,
            request.nft_id,
            required,
            request.borrower,
            request.borrowing_amount,
            request.apy,
            now,
        ));

        tracing::info!(
            %trade_id,
            borrower = %request.borrower,
            nft_id = %request.nft_id,
            borrowing_amount = request.borrowing_amount,
            apy = %request.apy,
            "trade opened"
        );
        self.emit_event(
            now,
            LendingEvent::TradeOpened(TradeOpenedEvent {
                trade_id,
                borrower: request.borrower,
                nft_id: request.nft_id,
                borrowing_amount: request.borrowing_amount,
                apy: request.apy,
            }),
        );

        Ok(trade_id)
    }

    /// Fund an OPEN trade with the caller's currency. Exactly one lender wins.
    pub fn lend_to_trade(
        &mut self,
        ledger: &mut Ledger,
        caller: Address,
        trade_id: TradeId,
        now: Timestamp,
    ) -> Result<FinancingResult, LendingError> {
        self.try_lend_to_trade(ledger, caller, trade_id, now)
            .map_err(|e| self.reject("lend_to_trade", Some(trade_id), caller, now, e))
    }

    fn try_lend_to_trade(
        &mut self,
        ledger: &mut Ledger,
        caller: Address,
        trade_id: TradeId,
        now: Timestamp,
    ) -> Result<FinancingResult, LendingError> {
        self.ensure_ledger(ledger)?;
        let trade = self.trade(trade_id)?;
        Self::expect_state(trade, TradeState::Open)?;

        let currency = self.config.currency_token;
        let principal = trade.borrowing_amount;
        let borrower = trade.borrower;
        let disbursed = self.config.disbursement == Disbursement::Immediate;

        let mut legs = vec![TransferLeg::new(caller, self.address, currency, principal)];
        if disbursed {
            legs.push(TransferLeg::new(self.address, borrower, currency, principal));
        }
        ledger.settle(self.address, &legs)?;

        let trade = self.trade_mut(trade_id)?;
        trade.lender = Some(caller);
        trade.start_time = Some(now);
        trade.principal_claimed = disbursed;
        trade.state = TradeState::Financed;

        tracing::info!(%trade_id, lender = %caller, principal, disbursed, "trade financed");
        self.emit_event(
            now,
            LendingEvent::TradeFinanced(TradeFinancedEvent {
                trade_id,
                lender: caller,
                principal,
                disbursed,
            }),
        );

        Ok(FinancingResult {
            trade_id,
            lender: caller,
            start_time: now,
            disbursed,
        })
    }

    /// Release escrowed principal to the borrower. Once per trade, FINANCED only.
    pub fn claim_principal(
        &mut self,
        ledger: &mut Ledger,
        caller: Address,
        trade_id: TradeId,
        now: Timestamp,
    ) -> Result<(), LendingError> {
        self.try_claim_principal(ledger, caller, trade_id, now)
            .map_err(|e| self.reject("claim_principal", Some(trade_id), caller, now, e))
    }

    fn try_claim_principal(
        &mut self,
        ledger: &mut Ledger,
        caller: Address,
        trade_id: TradeId,
        now: Timestamp,
    ) -> Result<(), LendingError> {
        self.ensure_ledger(ledger)?;
        let trade = self.trade(trade_id)?;
        Self::expect_state(trade, TradeState::Financed)?;
        Self::ensure_acts_for(ledger, caller, trade.borrower, Some(trade_id))?;
        if trade.principal_claimed {
            return Err(LendingError::PrincipalAlreadyClaimed(trade_id));
        }

        let borrower = trade.borrower;
        let amount = trade.borrowing_amount;
        ledger.settle(
            self.address,
            &[TransferLeg::new(self.address, borrower, self.config.currency_token, amount)],
        )?;

        self.trade_mut(trade_id)?.principal_claimed = true;

        tracing::info!(%trade_id, %borrower, amount, "principal claimed");
        self.emit_event(
            now,
            LendingEvent::PrincipalClaimed(PrincipalClaimedEvent {
                trade_id,
                borrower,
                amount,
            }),
        );
        Ok(())
    }
}
