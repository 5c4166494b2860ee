//! Repayment and closure.

use super::core::LendingEngine;
use super::results::{LendingError, RepaymentResult};
use crate::config::Settlement;
use crate::events::{LendingEvent, RepaymentReceivedEvent, TradeClosedEvent};
use crate::ledger::{Ledger, TransferLeg};
use crate::trade::TradeState;
use crate::types::{Address, Amount, Timestamp, TradeId};

impl LendingEngine {
    /// What the borrower must have paid in total before the trade closes.
    pub fn amount_owed(&self, trade_id: TradeId, now: Timestamp) -> Result<Amount, LendingError> {
        let trade = self.trade(trade_id)?;
        match self.config.settlement {
            Settlement::PrincipalOnly => Ok(trade.borrowing_amount),
            Settlement::PrincipalPlusInterest => trade
                .amount_owed_with_interest(now)
                .ok_or(LendingError::ArithmeticOverflow),
        }
    }

    /// Move `amount` currency from the borrower into custody. Once the total paid
    /// reaches the amount owed the trade closes in the same atomic step: the
    /// collateral goes back to the borrower, the lender is paid, and any
    /// overpayment or unclaimed principal is refunded to the borrower.
    pub fn pay_interest(
        &mut self,
        ledger: &mut Ledger,
        caller: Address,
        trade_id: TradeId,
        amount: Amount,
        now: Timestamp,
    ) -> Result<RepaymentResult, LendingError> {
        self.try_pay_interest(ledger, caller, trade_id, amount, now)
            .map_err(|e| self.reject("pay_interest", Some(trade_id), caller, now, e))
    }

    fn try_pay_interest(
        &mut self,
        ledger: &mut Ledger,
        caller: Address,
        trade_id: TradeId,
        amount: Amount,
        now: Timestamp,
    ) -> Result<RepaymentResult, LendingError> {
        self.ensure_ledger(ledger)?;
        let trade = self.trade(trade_id)?;
        Self::expect_state(trade, TradeState::Financed)?;
        if amount == 0 {
            return Err(LendingError::InvalidAmount);
        }
        Self::ensure_acts_for(ledger, caller, trade.borrower, Some(trade_id))?;
        let lender = trade.lender.ok_or(LendingError::InvalidState {
            trade_id,
            state: trade.state,
            expected: TradeState::Financed,
        })?;

        let paid_back_amount = trade
            .paid_back_amount
            .checked_add(amount)
            .ok_or(LendingError::ArithmeticOverflow)?;
        let amount_owed = self.amount_owed(trade_id, now)?;
        let closes = paid_back_amount >= amount_owed;

        let currency = self.config.currency_token;
        let custody = self.address;
        let borrower = trade.borrower;

        let mut legs = vec![TransferLeg::new(borrower, custody, currency, amount)];
        let (paid_to_lender, refunded_to_borrower) = if closes {
            let refund = (paid_back_amount - amount_owed)
                .checked_add(trade.escrowed_principal())
                .ok_or(LendingError::ArithmeticOverflow)?;
            legs.push(TransferLeg::new(custody, borrower, trade.nft_id, trade.collateral_amount));
            legs.push(TransferLeg::new(custody, lender, currency, amount_owed));
            if refund > 0 {
                legs.push(TransferLeg::new(custody, borrower, currency, refund));
            }
            (amount_owed, refund)
        } else {
            (0, 0)
        };

        ledger.settle(self.address, &legs)?;

        let trade = self.trade_mut(trade_id)?;
        trade.paid_back_amount = paid_back_amount;
        if closes {
            trade.state = TradeState::Closed;
        }
        let state = trade.state;

        tracing::info!(%trade_id, %caller, amount, paid_back_amount, amount_owed, "repayment received");
        self.emit_event(
            now,
            LendingEvent::RepaymentReceived(RepaymentReceivedEvent {
                trade_id,
                payer: borrower,
                amount,
                paid_back_amount,
                amount_owed,
            }),
        );

        if closes {
            tracing::info!(%trade_id, %borrower, %lender, paid_to_lender, refunded_to_borrower, "trade closed");
            self.emit_event(
                now,
                LendingEvent::TradeClosed(TradeClosedEvent {
                    trade_id,
                    borrower,
                    lender,
                    paid_to_lender,
                    refunded_to_borrower,
                }),
            );
        }

        Ok(RepaymentResult {
            trade_id,
            paid_back_amount,
            amount_owed,
            state,
            paid_to_lender,
            refunded_to_borrower,
        })
    }
}
