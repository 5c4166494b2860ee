//! Liquidation of financed trades.

use super::core::LendingEngine;
use super::results::{LendingError, LiquidationResult};
use crate::events::{LendingEvent, TradeLiquidatedEvent};
use crate::ledger::{Ledger, TransferLeg};
use crate::trade::TradeState;
use crate::types::{Address, Timestamp, TradeId};

impl LendingEngine {
    /// Earliest time the lender may liquidate. `None` until the trade is financed.
    pub fn liquidation_eligible_at(&self, trade_id: TradeId) -> Result<Option<Timestamp>, LendingError> {
        let trade = self.trade(trade_id)?;
        Ok(trade
            .start_time
            .map(|start| start.plus_secs(self.config.liquidation_delay_secs)))
    }

    /// Hand the escrowed collateral to the lender. Lender only, FINANCED only,
    /// and not before the configured delay has passed since financing.
    /// Partial repayments and unclaimed principal still in custody go to the lender too.
    pub fn liquidate_trade(
        &mut self,
        ledger: &mut Ledger,
        caller: Address,
        trade_id: TradeId,
        now: Timestamp,
    ) -> Result<LiquidationResult, LendingError> {
        self.try_liquidate_trade(ledger, caller, trade_id, now)
            .map_err(|e| self.reject("liquidate_trade", Some(trade_id), caller, now, e))
    }

    fn try_liquidate_trade(
        &mut self,
        ledger: &mut Ledger,
        caller: Address,
        trade_id: TradeId,
        now: Timestamp,
    ) -> Result<LiquidationResult, LendingError> {
        self.ensure_ledger(ledger)?;
        let trade = self.trade(trade_id)?;
        if trade.lender != Some(caller) {
            return Err(LendingError::Unauthorized {
                caller,
                trade_id: Some(trade_id),
            });
        }
        Self::expect_state(trade, TradeState::Financed)?;

        if let Some(eligible_at) = self.liquidation_eligible_at(trade_id)? {
            if now < eligible_at {
                return Err(LendingError::NotYetLiquidatable {
                    trade_id,
                    eligible_at,
                });
            }
        }

        let released_currency = trade
            .paid_back_amount
            .checked_add(trade.escrowed_principal())
            .ok_or(LendingError::ArithmeticOverflow)?;
        let nft_id = trade.nft_id;
        let collateral = trade.collateral_amount;

        let mut legs = vec![TransferLeg::new(self.address, caller, nft_id, collateral)];
        if released_currency > 0 {
            legs.push(TransferLeg::new(
                self.address,
                caller,
                self.config.currency_token,
                released_currency,
            ));
        }
        ledger.settle(self.address, &legs)?;

        self.trade_mut(trade_id)?.state = TradeState::Liquidated;

        tracing::info!(%trade_id, lender = %caller, %nft_id, released_currency, "trade liquidated");
        self.emit_event(
            now,
            LendingEvent::TradeLiquidated(TradeLiquidatedEvent {
                trade_id,
                lender: caller,
                nft_id,
                collateral,
                released_currency,
            }),
        );

        Ok(LiquidationResult {
            trade_id,
            lender: caller,
            nft_id,
            collateral,
            released_currency,
        })
    }
}
