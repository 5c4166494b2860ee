//! Multi-asset token ledger.
//!
//! One registry holds every token type: the fungible currency (id 0) and all
//! collateral-grade types minted after it. Balances are keyed by
//! (holder, token id) and every movement goes through an authorization check
//! against the owner/operator approval table.
//!
//! All transfers, single or batched, are staged against a scratch copy of the
//! touched balances and only committed once every leg has been validated, so a
//! failed call never leaves a partial debit behind.

use crate::api::ErrorCode;
use crate::config::GenesisConfig;
use crate::events::{
    ApprovalForAllEvent, EventLog, LedgerEvent, TokenMintedEvent, TransferBatchEvent,
    TransferSingleEvent,
};
use crate::types::{Address, Amount, TokenId, TokenKind};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

const DEFAULT_MAX_EVENTS: usize = 100_000;

/// A class of asset. Supply is fixed at mint time and never changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenType {
    pub id: TokenId,
    pub total_supply: Amount,
    pub kind: TokenKind,
    pub name: Option<String>,
    pub creator: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("{caller} is not the owner or an approved operator of {owner}")]
    Unauthorized { caller: Address, owner: Address },

    #[error("insufficient balance of {token_id} for {account}: available {available}, requested {requested}")]
    InsufficientBalance {
        account: Address,
        token_id: TokenId,
        available: Amount,
        requested: Amount,
    },

    #[error("input lengths differ: {left} vs {right}")]
    LengthMismatch { left: usize, right: usize },

    #[error("token {0} does not exist")]
    UnknownToken(TokenId),

    #[error("amount must be positive")]
    InvalidAmount,

    #[error("balance overflow on {token_id} for {account}")]
    Overflow { account: Address, token_id: TokenId },
}

impl LedgerError {
    pub fn code(&self) -> ErrorCode {
        match self {
            LedgerError::Unauthorized { .. } => ErrorCode::Unauthorized,
            LedgerError::InsufficientBalance { .. } => ErrorCode::InsufficientBalance,
            LedgerError::LengthMismatch { .. } => ErrorCode::LengthMismatch,
            LedgerError::UnknownToken(_) => ErrorCode::UnknownToken,
            LedgerError::InvalidAmount => ErrorCode::InvalidAmount,
            LedgerError::Overflow { .. } => ErrorCode::ArithmeticOverflow,
        }
    }
}

/// One (from, to, id, amount) movement inside a multi-leg settlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferLeg {
    pub from: Address,
    pub to: Address,
    pub token_id: TokenId,
    pub amount: Amount,
}

impl TransferLeg {
    pub fn new(from: Address, to: Address, token_id: TokenId, amount: Amount) -> Self {
        Self {
            from,
            to,
            token_id,
            amount,
        }
    }
}

#[derive(Debug)]
pub struct Ledger {
    address: Address,
    token_types: Vec<TokenType>,
    balances: HashMap<(Address, TokenId), Amount>,
    // (owner, operator) pairs currently approved
    approvals: HashSet<(Address, Address)>,
    events: EventLog<LedgerEvent>,
}

impl Ledger {
    pub fn new(address: Address) -> Self {
        Self::with_max_events(address, DEFAULT_MAX_EVENTS)
    }

    pub fn with_max_events(address: Address, max_events: usize) -> Self {
        Self {
            address,
            token_types: Vec::new(),
            balances: HashMap::new(),
            approvals: HashSet::new(),
            events: EventLog::new(max_events),
        }
    }

    /// Build a ledger with the genesis token types minted to `genesis.reserve`,
    /// in order, so the first entry becomes id 0.
    pub fn with_genesis(address: Address, genesis: &GenesisConfig) -> Result<Self, LedgerError> {
        let mut ledger = Self::with_max_events(address, genesis.max_events);
        for token in &genesis.tokens {
            ledger.mint_with_kind(genesis.reserve, token.supply, token.kind, Some(token.name.clone()))?;
        }
        Ok(ledger)
    }

    /// Handle identifying this ledger instance.
    pub fn address(&self) -> Address {
        self.address
    }

    /// Mint a new token type with the whole supply credited to `caller`.
    pub fn mint(&mut self, caller: Address, supply: Amount) -> Result<TokenId, LedgerError> {
        let kind = TokenKind::infer(self.next_token_id());
        self.mint_with_kind(caller, supply, kind, None)
    }

    pub fn mint_with_kind(
        &mut self,
        caller: Address,
        supply: Amount,
        kind: TokenKind,
        name: Option<String>,
    ) -> Result<TokenId, LedgerError> {
        if supply == 0 {
            return Err(LedgerError::InvalidAmount);
        }

        let id = self.next_token_id();
        self.token_types.push(TokenType {
            id,
            total_supply: supply,
            kind,
            name,
            creator: caller,
        });
        self.balances.insert((caller, id), supply);

        tracing::info!(token_id = id.0, %caller, supply, ?kind, "token type minted");
        self.events.emit(
            None,
            LedgerEvent::TokenMinted(TokenMintedEvent {
                token_id: id,
                creator: caller,
                supply,
                kind,
            }),
        );
        Ok(id)
    }

    pub fn token_type_count(&self) -> usize {
        self.token_types.len()
    }

    pub fn token_type(&self, id: TokenId) -> Option<&TokenType> {
        usize::try_from(id.0).ok().and_then(|i| self.token_types.get(i))
    }

    pub fn token_types(&self) -> &[TokenType] {
        &self.token_types
    }

    pub fn total_supply(&self, id: TokenId) -> Option<Amount> {
        self.token_type(id).map(|t| t.total_supply)
    }

    /// Zero for accounts that never held the type, including unknown ids.
    pub fn balance_of(&self, account: Address, id: TokenId) -> Amount {
        self.balances.get(&(account, id)).copied().unwrap_or(0)
    }

    /// Parallel lookup. Order follows the input; duplicates resolve independently.
    pub fn balance_of_batch(
        &self,
        accounts: &[Address],
        ids: &[TokenId],
    ) -> Result<Vec<Amount>, LedgerError> {
        if accounts.len() != ids.len() {
            return Err(LedgerError::LengthMismatch {
                left: accounts.len(),
                right: ids.len(),
            });
        }
        Ok(accounts
            .iter()
            .zip(ids)
            .map(|(account, id)| self.balance_of(*account, *id))
            .collect())
    }

    /// Sum of every holder's balance for `id`. Equals total supply at all times.
    pub fn circulating_supply(&self, id: TokenId) -> Amount {
        self.balances
            .iter()
            .filter(|((_, token), _)| *token == id)
            .map(|(_, amount)| *amount)
            .sum()
    }

    /// Holders with a non-zero balance of `id`, sorted by address.
    pub fn holders(&self, id: TokenId) -> Vec<(Address, Amount)> {
        let mut holders: Vec<_> = self
            .balances
            .iter()
            .filter(|((_, token), amount)| *token == id && **amount > 0)
            .map(|((holder, _), amount)| (*holder, *amount))
            .collect();
        holders.sort();
        holders
    }

    pub fn set_approval_for_all(&mut self, caller: Address, operator: Address, approved: bool) {
        if approved {
            self.approvals.insert((caller, operator));
        } else {
            self.approvals.remove(&(caller, operator));
        }

        self.events.emit(
            None,
            LedgerEvent::ApprovalForAll(ApprovalForAllEvent {
                owner: caller,
                operator,
                approved,
            }),
        );
    }

    pub fn is_approved_for_all(&self, owner: Address, operator: Address) -> bool {
        self.approvals.contains(&(owner, operator))
    }

    /// True when `caller` may move `owner`'s balances.
    pub fn is_authorized(&self, caller: Address, owner: Address) -> bool {
        caller == owner || self.is_approved_for_all(owner, caller)
    }

    pub fn safe_transfer_from(
        &mut self,
        caller: Address,
        from: Address,
        to: Address,
        id: TokenId,
        amount: Amount,
        data: &[u8],
    ) -> Result<(), LedgerError> {
        self.apply(caller, &[TransferLeg::new(from, to, id, amount)])?;

        self.events.emit(
            None,
            LedgerEvent::TransferSingle(TransferSingleEvent {
                operator: caller,
                from,
                to,
                token_id: id,
                amount,
                data: data.to_vec(),
            }),
        );
        Ok(())
    }

    /// All (id, amount) pairs move or none do.
    pub fn safe_batch_transfer_from(
        &mut self,
        caller: Address,
        from: Address,
        to: Address,
        ids: &[TokenId],
        amounts: &[Amount],
        data: &[u8],
    ) -> Result<(), LedgerError> {
        if ids.len() != amounts.len() {
            return Err(LedgerError::LengthMismatch {
                left: ids.len(),
                right: amounts.len(),
            });
        }

        let legs: Vec<TransferLeg> = ids
            .iter()
            .zip(amounts)
            .map(|(id, amount)| TransferLeg::new(from, to, *id, *amount))
            .collect();
        self.apply(caller, &legs)?;

        self.events.emit(
            None,
            LedgerEvent::TransferBatch(TransferBatchEvent {
                operator: caller,
                from,
                to,
                token_ids: ids.to_vec(),
                amounts: amounts.to_vec(),
                data: data.to_vec(),
            }),
        );
        Ok(())
    }

    /// Apply several legs with independent endpoints as one atomic step.
    /// Legs run in order, so a leg may spend what an earlier leg credited.
    /// Each committed leg is logged as a TransferSingle with `caller` as operator.
    pub fn settle(&mut self, caller: Address, legs: &[TransferLeg]) -> Result<(), LedgerError> {
        self.apply(caller, legs)?;

        for leg in legs.iter().filter(|l| l.amount > 0) {
            self.events.emit(
                None,
                LedgerEvent::TransferSingle(TransferSingleEvent {
                    operator: caller,
                    from: leg.from,
                    to: leg.to,
                    token_id: leg.token_id,
                    amount: leg.amount,
                    data: Vec::new(),
                }),
            );
        }
        Ok(())
    }

    /// Dry run of `settle`: same checks, no state change.
    pub fn check_settlement(&self, caller: Address, legs: &[TransferLeg]) -> Result<(), LedgerError> {
        self.stage(caller, legs).map(|_| ())
    }

    pub fn events(&self) -> &[crate::events::Event<LedgerEvent>] {
        self.events.events()
    }

    fn next_token_id(&self) -> TokenId {
        TokenId(self.token_types.len() as u64)
    }

    fn apply(&mut self, caller: Address, legs: &[TransferLeg]) -> Result<(), LedgerError> {
        let staged = self.stage(caller, legs)?;
        for (key, amount) in staged {
            if amount == 0 {
                self.balances.remove(&key);
            } else {
                self.balances.insert(key, amount);
            }
        }
        Ok(())
    }

    // validate every leg against a scratch copy of the touched balances
    fn stage(
        &self,
        caller: Address,
        legs: &[TransferLeg],
    ) -> Result<HashMap<(Address, TokenId), Amount>, LedgerError> {
        let mut scratch: HashMap<(Address, TokenId), Amount> = HashMap::new();

        for leg in legs {
            if !self.is_authorized(caller, leg.from) {
                return Err(LedgerError::Unauthorized {
                    caller,
                    owner: leg.from,
                });
            }
            if self.token_type(leg.token_id).is_none() {
                return Err(LedgerError::UnknownToken(leg.token_id));
            }

            let from_key = (leg.from, leg.token_id);
            let available = *scratch
                .entry(from_key)
                .or_insert_with(|| self.balance_of(leg.from, leg.token_id));
            let remaining = available.checked_sub(leg.amount).ok_or(
                LedgerError::InsufficientBalance {
                    account: leg.from,
                    token_id: leg.token_id,
                    available,
                    requested: leg.amount,
                },
            )?;
            scratch.insert(from_key, remaining);

            let to_key = (leg.to, leg.token_id);
            let current = *scratch
                .entry(to_key)
                .or_insert_with(|| self.balance_of(leg.to, leg.token_id));
            let credited = current.checked_add(leg.amount).ok_or(LedgerError::Overflow {
                account: leg.to,
                token_id: leg.token_id,
            })?;
            scratch.insert(to_key, credited);
        }

        Ok(scratch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESERVE: Address = Address(100);
    const ALICE: Address = Address(1);
    const BOB: Address = Address(2);
    const CAROL: Address = Address(3);

    // currency (id 0) and one collateral type (id 1), both held by RESERVE
    fn setup() -> Ledger {
        let mut ledger = Ledger::new(Address(999));
        ledger.mint(RESERVE, 10_000).unwrap();
        ledger.mint(RESERVE, 10).unwrap();
        ledger
    }

    #[test]
    fn mint_assigns_sequential_ids() {
        let mut ledger = setup();
        assert_eq!(ledger.token_type_count(), 2);

        let id = ledger.mint(ALICE, 500).unwrap();
        assert_eq!(id, TokenId(2));
        assert_eq!(ledger.token_type_count(), 3);
        assert_eq!(ledger.balance_of(ALICE, id), 500);
        assert_eq!(ledger.total_supply(id), Some(500));
        assert_eq!(ledger.token_type(TokenId(0)).unwrap().kind, TokenKind::Fungible);
        assert_eq!(ledger.token_type(id).unwrap().kind, TokenKind::NonFungible);
    }

    #[test]
    fn mint_rejects_zero_supply() {
        let mut ledger = setup();
        assert_eq!(ledger.mint(ALICE, 0), Err(LedgerError::InvalidAmount));
        assert_eq!(ledger.token_type_count(), 2);
    }

    #[test]
    fn genesis_tokens_go_to_reserve() {
        let genesis = GenesisConfig::default();
        let ledger = Ledger::with_genesis(Address(999), &genesis).unwrap();

        assert_eq!(ledger.token_type_count(), genesis.tokens.len());
        for (i, token) in genesis.tokens.iter().enumerate() {
            let id = TokenId(i as u64);
            assert_eq!(ledger.balance_of(genesis.reserve, id), token.supply);
            assert_eq!(ledger.token_type(id).unwrap().name.as_deref(), Some(token.name.as_str()));
        }
    }

    #[test]
    fn balance_of_unknown_is_zero() {
        let ledger = setup();
        assert_eq!(ledger.balance_of(ALICE, TokenId(0)), 0);
        assert_eq!(ledger.balance_of(ALICE, TokenId(77)), 0);
    }

    #[test]
    fn batch_balance_preserves_order_and_duplicates() {
        let ledger = setup();
        let balances = ledger
            .balance_of_batch(&[RESERVE, ALICE, RESERVE, RESERVE], &[TokenId(1), TokenId(0), TokenId(0), TokenId(1)])
            .unwrap();
        assert_eq!(balances, vec![10, 0, 10_000, 10]);

        let err = ledger.balance_of_batch(&[RESERVE], &[TokenId(0), TokenId(1)]);
        assert_eq!(err, Err(LedgerError::LengthMismatch { left: 1, right: 2 }));
    }

    #[test]
    fn owner_transfer_moves_balance() {
        let mut ledger = setup();
        ledger.safe_transfer_from(RESERVE, RESERVE, ALICE, TokenId(0), 2_500, b"").unwrap();

        assert_eq!(ledger.balance_of(RESERVE, TokenId(0)), 7_500);
        assert_eq!(ledger.balance_of(ALICE, TokenId(0)), 2_500);
        assert_eq!(ledger.circulating_supply(TokenId(0)), 10_000);
    }

    #[test]
    fn transfer_with_insufficient_balance_fails() {
        let mut ledger = setup();
        let err = ledger.safe_transfer_from(ALICE, ALICE, RESERVE, TokenId(1), 2, b"").unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientBalance { available: 0, requested: 2, .. }));
    }

    #[test]
    fn unapproved_operator_is_rejected() {
        let mut ledger = setup();
        let err = ledger.safe_transfer_from(ALICE, RESERVE, BOB, TokenId(0), 100, b"").unwrap_err();
        assert_eq!(err, LedgerError::Unauthorized { caller: ALICE, owner: RESERVE });
        assert_eq!(ledger.balance_of(BOB, TokenId(0)), 0);
    }

    #[test]
    fn approval_grants_and_revokes() {
        let mut ledger = setup();
        ledger.set_approval_for_all(RESERVE, ALICE, true);
        assert!(ledger.is_approved_for_all(RESERVE, ALICE));
        assert!(!ledger.is_approved_for_all(ALICE, RESERVE));

        // idempotent
        ledger.set_approval_for_all(RESERVE, ALICE, true);
        assert!(ledger.is_approved_for_all(RESERVE, ALICE));

        ledger.safe_transfer_from(ALICE, RESERVE, BOB, TokenId(0), 7_500, b"").unwrap();
        assert_eq!(ledger.balance_of(BOB, TokenId(0)), 7_500);

        ledger.set_approval_for_all(RESERVE, ALICE, false);
        assert!(!ledger.is_approved_for_all(RESERVE, ALICE));
        let err = ledger.safe_transfer_from(ALICE, RESERVE, BOB, TokenId(0), 100, b"").unwrap_err();
        assert!(matches!(err, LedgerError::Unauthorized { .. }));
    }

    #[test]
    fn batch_transfer_is_all_or_nothing() {
        let mut ledger = setup();
        // second leg overdraws collateral, first leg must not apply
        let err = ledger
            .safe_batch_transfer_from(RESERVE, RESERVE, ALICE, &[TokenId(0), TokenId(1)], &[100, 11], b"")
            .unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientBalance { .. }));
        assert_eq!(ledger.balance_of(RESERVE, TokenId(0)), 10_000);
        assert_eq!(ledger.balance_of(ALICE, TokenId(0)), 0);

        ledger
            .safe_batch_transfer_from(RESERVE, RESERVE, ALICE, &[TokenId(0), TokenId(1)], &[100, 2], b"")
            .unwrap();
        assert_eq!(ledger.balance_of(ALICE, TokenId(0)), 100);
        assert_eq!(ledger.balance_of(ALICE, TokenId(1)), 2);
    }

    #[test]
    fn batch_transfer_with_duplicate_ids_checks_cumulative_amount() {
        let mut ledger = setup();
        let err = ledger
            .safe_batch_transfer_from(RESERVE, RESERVE, ALICE, &[TokenId(1), TokenId(1)], &[6, 6], b"")
            .unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientBalance { available: 4, requested: 6, .. }));
        assert_eq!(ledger.balance_of(RESERVE, TokenId(1)), 10);
    }

    #[test]
    fn batch_length_mismatch() {
        let mut ledger = setup();
        let err = ledger
            .safe_batch_transfer_from(RESERVE, RESERVE, ALICE, &[TokenId(0)], &[1, 2], b"")
            .unwrap_err();
        assert_eq!(err, LedgerError::LengthMismatch { left: 1, right: 2 });
    }

    #[test]
    fn unknown_token_transfer_fails() {
        let mut ledger = setup();
        let err = ledger.safe_transfer_from(RESERVE, RESERVE, ALICE, TokenId(9), 0, b"").unwrap_err();
        assert_eq!(err, LedgerError::UnknownToken(TokenId(9)));
    }

    #[test]
    fn settle_runs_legs_in_order() {
        let mut ledger = setup();
        ledger.safe_transfer_from(RESERVE, RESERVE, ALICE, TokenId(0), 500, b"").unwrap();
        ledger.set_approval_for_all(ALICE, CAROL, true);

        // CAROL pulls from ALICE into her own account, then forwards it to BOB
        let legs = [
            TransferLeg::new(ALICE, CAROL, TokenId(0), 300),
            TransferLeg::new(CAROL, BOB, TokenId(0), 300),
        ];
        ledger.settle(CAROL, &legs).unwrap();

        assert_eq!(ledger.balance_of(ALICE, TokenId(0)), 200);
        assert_eq!(ledger.balance_of(CAROL, TokenId(0)), 0);
        assert_eq!(ledger.balance_of(BOB, TokenId(0)), 300);
    }

    #[test]
    fn failed_settlement_leaves_no_trace() {
        let mut ledger = setup();
        ledger.safe_transfer_from(RESERVE, RESERVE, ALICE, TokenId(0), 500, b"").unwrap();
        let events_before = ledger.events().len();

        // second leg is not authorized for ALICE
        let legs = [
            TransferLeg::new(ALICE, BOB, TokenId(0), 100),
            TransferLeg::new(RESERVE, BOB, TokenId(0), 100),
        ];
        assert!(ledger.check_settlement(ALICE, &legs).is_err());
        let err = ledger.settle(ALICE, &legs).unwrap_err();

        assert!(matches!(err, LedgerError::Unauthorized { .. }));
        assert_eq!(ledger.balance_of(ALICE, TokenId(0)), 500);
        assert_eq!(ledger.balance_of(BOB, TokenId(0)), 0);
        assert_eq!(ledger.events().len(), events_before);
    }

    #[test]
    fn self_transfer_keeps_balance() {
        let mut ledger = setup();
        ledger.safe_transfer_from(RESERVE, RESERVE, RESERVE, TokenId(1), 10, b"").unwrap();
        assert_eq!(ledger.balance_of(RESERVE, TokenId(1)), 10);
    }

    #[test]
    fn holders_lists_non_zero_balances() {
        let mut ledger = setup();
        ledger.safe_transfer_from(RESERVE, RESERVE, BOB, TokenId(1), 3, b"").unwrap();
        ledger.safe_transfer_from(RESERVE, RESERVE, ALICE, TokenId(1), 7, b"").unwrap();

        assert_eq!(ledger.holders(TokenId(1)), vec![(ALICE, 7), (BOB, 3)]);
    }

    #[test]
    fn transfers_are_logged() {
        let mut ledger = setup();
        ledger.safe_transfer_from(RESERVE, RESERVE, ALICE, TokenId(0), 1, b"\x01").unwrap();

        match &ledger.events().last().unwrap().payload {
            LedgerEvent::TransferSingle(e) => {
                assert_eq!(e.operator, RESERVE);
                assert_eq!(e.to, ALICE);
                assert_eq!(e.data, vec![1]);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }
}
