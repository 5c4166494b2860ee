// 11.0: every state change produces an event. used for audit trails and notifying
// external collaborators (governance, staking) that watch the ledger.
// LedgerEvent and LendingEvent list all event types.

use crate::api::ErrorCode;
use crate::types::{Address, Amount, Apy, Timestamp, TokenId, TokenKind, TradeId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(pub u64);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event<T> {
    pub id: EventId,
    pub timestamp: Option<Timestamp>,
    pub payload: T,
}

impl<T> Event<T> {
    pub fn new(id: EventId, timestamp: Option<Timestamp>, payload: T) -> Self {
        Self {
            id,
            timestamp,
            payload,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerEvent {
    TokenMinted(TokenMintedEvent),
    TransferSingle(TransferSingleEvent),
    TransferBatch(TransferBatchEvent),
    ApprovalForAll(ApprovalForAllEvent),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenMintedEvent {
    pub token_id: TokenId,
    pub creator: Address,
    pub supply: Amount,
    pub kind: TokenKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferSingleEvent {
    pub operator: Address,
    pub from: Address,
    pub to: Address,
    pub token_id: TokenId,
    pub amount: Amount,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferBatchEvent {
    pub operator: Address,
    pub from: Address,
    pub to: Address,
    pub token_ids: Vec<TokenId>,
    pub amounts: Vec<Amount>,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalForAllEvent {
    pub owner: Address,
    pub operator: Address,
    pub approved: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LendingEvent {
    // Lifecycle events
    TradeOpened(TradeOpenedEvent),
    TradeFinanced(TradeFinancedEvent),
    TradeClosed(TradeClosedEvent),
    TradeLiquidated(TradeLiquidatedEvent),

    // Fund movement events
    PrincipalClaimed(PrincipalClaimedEvent),
    RepaymentReceived(RepaymentReceivedEvent),

    // Rejections are kept for audit
    OperationRejected(OperationRejectedEvent),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeOpenedEvent {
    pub trade_id: TradeId,
    pub borrower: Address,
    pub nft_id: TokenId,
    pub borrowing_amount: Amount,
    pub apy: Apy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeFinancedEvent {
    pub trade_id: TradeId,
    pub lender: Address,
    pub principal: Amount,
    pub disbursed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrincipalClaimedEvent {
    pub trade_id: TradeId,
    pub borrower: Address,
    pub amount: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepaymentReceivedEvent {
    pub trade_id: TradeId,
    pub payer: Address,
    pub amount: Amount,
    pub paid_back_amount: Amount,
    pub amount_owed: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeClosedEvent {
    pub trade_id: TradeId,
    pub borrower: Address,
    pub lender: Address,
    pub paid_to_lender: Amount,
    pub refunded_to_borrower: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeLiquidatedEvent {
    pub trade_id: TradeId,
    pub lender: Address,
    pub nft_id: TokenId,
    pub collateral: Amount,
    pub released_currency: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationRejectedEvent {
    pub operation: String,
    pub trade_id: Option<TradeId>,
    pub caller: Address,
    pub code: ErrorCode,
    pub reason: String,
}

// bounded in-memory log. oldest events are dropped once max_events is exceeded.
#[derive(Debug, Clone)]
pub struct EventLog<T> {
    events: Vec<Event<T>>,
    next_id: u64,
    max_events: usize,
}

impl<T: std::fmt::Debug> EventLog<T> {
    pub fn new(max_events: usize) -> Self {
        Self {
            events: Vec::new(),
            next_id: 1,
            max_events,
        }
    }

    pub fn emit(&mut self, timestamp: Option<Timestamp>, payload: T) -> EventId {
        let id = EventId(self.next_id);
        self.next_id += 1;

        tracing::debug!(event_id = id.0, payload = ?payload, "event");
        self.events.push(Event::new(id, timestamp, payload));

        if self.events.len() > self.max_events {
            let drain_count = self.events.len() - self.max_events;
            self.events.drain(0..drain_count);
        }
        id
    }

    pub fn events(&self) -> &[Event<T>] {
        &self.events
    }

    pub fn recent(&self, count: usize) -> &[Event<T>] {
        let start = self.events.len().saturating_sub(count);
        &self.events[start..]
    }

    pub fn last(&self) -> Option<&Event<T>> {
        self.events.last()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}
