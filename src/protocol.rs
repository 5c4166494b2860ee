//! Ledger and lending engine bundled behind one entry point.
//!
//! `Protocol` owns both halves and dispatches `Command`s and `Query`s.
//! `SharedProtocol` puts it behind a single mutex so that every mutating call
//! from any thread runs to completion before the next one starts. That is what
//! makes two lenders racing for the same OPEN trade resolve to exactly one
//! winner.

use crate::api::{ApiError, ApiResponse, Command, Query};
use crate::config::{ConfigError, ProtocolConfig};
use crate::engine::{
    FinancingResult, LendingEngine, LendingError, LiquidationResult, OpenTradeRequest,
    RepaymentResult,
};
use crate::interest::calculate_return_amount;
use crate::ledger::{Ledger, LedgerError};
use crate::types::{Address, Amount, Timestamp, TokenId, TradeId};
use parking_lot::Mutex;
use std::sync::Arc;

pub const LEDGER_ADDRESS: Address = Address(0x1ed9e7);
pub const ENGINE_ADDRESS: Address = Address(0xde71);

#[derive(Debug)]
pub struct Protocol {
    ledger: Ledger,
    engine: LendingEngine,
}

impl Protocol {
    pub fn new(config: ProtocolConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let ledger = Ledger::with_genesis(LEDGER_ADDRESS, &config.genesis).map_err(|e| {
            ConfigError::InvalidGenesis {
                reason: e.to_string(),
            }
        })?;
        let engine = LendingEngine::new(config.lending, ENGINE_ADDRESS, &ledger);

        tracing::info!(
            ledger = %ledger.address(),
            engine = %engine.custody_address(),
            token_types = ledger.token_type_count(),
            "protocol initialized"
        );
        Ok(Self { ledger, engine })
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    // direct ledger access for collaborators that only move tokens
    pub fn ledger_mut(&mut self) -> &mut Ledger {
        &mut self.ledger
    }

    pub fn engine(&self) -> &LendingEngine {
        &self.engine
    }

    pub fn reserve_transfer(
        &mut self,
        from: Address,
        to: Address,
        token_id: TokenId,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        self.ledger.safe_transfer_from(from, from, to, token_id, amount, b"")
    }

    pub fn open_trade(
        &mut self,
        caller: Address,
        request: OpenTradeRequest,
        now: Timestamp,
    ) -> Result<TradeId, LendingError> {
        self.engine.open_trade(&mut self.ledger, caller, request, now)
    }

    pub fn lend_to_trade(
        &mut self,
        caller: Address,
        trade_id: TradeId,
        now: Timestamp,
    ) -> Result<FinancingResult, LendingError> {
        self.engine.lend_to_trade(&mut self.ledger, caller, trade_id, now)
    }

    pub fn claim_principal(
        &mut self,
        caller: Address,
        trade_id: TradeId,
        now: Timestamp,
    ) -> Result<(), LendingError> {
        self.engine.claim_principal(&mut self.ledger, caller, trade_id, now)
    }

    pub fn pay_interest(
        &mut self,
        caller: Address,
        trade_id: TradeId,
        amount: Amount,
        now: Timestamp,
    ) -> Result<RepaymentResult, LendingError> {
        self.engine.pay_interest(&mut self.ledger, caller, trade_id, amount, now)
    }

    pub fn liquidate_trade(
        &mut self,
        caller: Address,
        trade_id: TradeId,
        now: Timestamp,
    ) -> Result<LiquidationResult, LendingError> {
        self.engine.liquidate_trade(&mut self.ledger, caller, trade_id, now)
    }

    pub fn execute(
        &mut self,
        caller: Address,
        command: Command,
        now: Timestamp,
    ) -> Result<ApiResponse, ApiError> {
        tracing::debug!(%caller, command = command.name(), "execute");
        let response = match command {
            Command::Mint { supply } => ApiResponse::TokenMinted {
                token_id: self.ledger.mint(caller, supply)?,
            },
            Command::SetApprovalForAll { operator, approved } => {
                self.ledger.set_approval_for_all(caller, operator, approved);
                ApiResponse::Done
            }
            Command::SafeTransferFrom {
                from,
                to,
                token_id,
                amount,
                data,
            } => {
                self.ledger
                    .safe_transfer_from(caller, from, to, token_id, amount, &data)?;
                ApiResponse::Done
            }
            Command::SafeBatchTransferFrom {
                from,
                to,
                token_ids,
                amounts,
                data,
            } => {
                self.ledger
                    .safe_batch_transfer_from(caller, from, to, &token_ids, &amounts, &data)?;
                ApiResponse::Done
            }
            Command::OpenTrade {
                nft_id,
                borrower,
                borrowing_amount,
                apy,
            } => {
                let request = OpenTradeRequest {
                    nft_id,
                    borrower,
                    borrowing_amount,
                    apy,
                };
                ApiResponse::TradeOpened {
                    trade_id: self.open_trade(caller, request, now)?,
                }
            }
            Command::LendToTrade { trade_id } => {
                ApiResponse::TradeFinanced(self.lend_to_trade(caller, trade_id, now)?)
            }
            Command::ClaimPrincipal { trade_id } => {
                self.claim_principal(caller, trade_id, now)?;
                ApiResponse::Done
            }
            Command::PayInterest { trade_id, amount } => {
                ApiResponse::Repayment(self.pay_interest(caller, trade_id, amount, now)?)
            }
            Command::LiquidateTrade { trade_id } => {
                ApiResponse::Liquidation(self.liquidate_trade(caller, trade_id, now)?)
            }
        };
        Ok(response)
    }

    pub fn query(&self, query: Query, now: Timestamp) -> Result<ApiResponse, ApiError> {
        let response = match query {
            Query::BalanceOf { account, token_id } => ApiResponse::Amount {
                amount: self.ledger.balance_of(account, token_id),
            },
            Query::BalanceOfBatch {
                accounts,
                token_ids,
            } => ApiResponse::Amounts {
                amounts: self.ledger.balance_of_batch(&accounts, &token_ids)?,
            },
            Query::IsApprovedForAll { owner, operator } => ApiResponse::Approved {
                approved: self.ledger.is_approved_for_all(owner, operator),
            },
            Query::TokenTypeCount => ApiResponse::Count {
                count: self.ledger.token_type_count(),
            },
            Query::TokenType { token_id } => ApiResponse::TokenType {
                token_type: self
                    .ledger
                    .token_type(token_id)
                    .cloned()
                    .ok_or(LedgerError::UnknownToken(token_id))?,
            },
            Query::Trade { trade_id } => ApiResponse::Trade {
                trade: self
                    .engine
                    .trades(trade_id)
                    .cloned()
                    .ok_or(LendingError::TradeNotFound(trade_id))?,
            },
            Query::TradeCount => ApiResponse::Count {
                count: self.engine.trade_count(),
            },
            Query::TokensContract => ApiResponse::Address {
                address: self.engine.tokens_contract(),
            },
            Query::CustodyAddress => ApiResponse::Address {
                address: self.engine.custody_address(),
            },
            Query::AmountOwed { trade_id } => ApiResponse::Amount {
                amount: self.engine.amount_owed(trade_id, now)?,
            },
            Query::CalculateReturnAmount {
                elapsed_secs,
                principal,
                apy,
            } => ApiResponse::Amount {
                amount: calculate_return_amount(elapsed_secs, principal, apy)
                    .ok_or(LendingError::ArithmeticOverflow)?,
            },
        };
        Ok(response)
    }
}

/// Cloneable handle; all access is serialized through one lock.
#[derive(Debug, Clone)]
pub struct SharedProtocol {
    inner: Arc<Mutex<Protocol>>,
}

impl SharedProtocol {
    pub fn new(protocol: Protocol) -> Self {
        Self {
            inner: Arc::new(Mutex::new(protocol)),
        }
    }

    pub fn execute(
        &self,
        caller: Address,
        command: Command,
        now: Timestamp,
    ) -> Result<ApiResponse, ApiError> {
        self.inner.lock().execute(caller, command, now)
    }

    pub fn query(&self, query: Query, now: Timestamp) -> Result<ApiResponse, ApiError> {
        self.inner.lock().query(query, now)
    }

    /// Run `f` with exclusive access, e.g. to read several values consistently.
    pub fn with<R>(&self, f: impl FnOnce(&mut Protocol) -> R) -> R {
        let mut guard = self.inner.lock();
        f(&mut *guard)
    }
}
