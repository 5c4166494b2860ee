// 1.0: all the primitives live here. nothing in the ledger or engine works without these types.
// addresses, token ids, trade ids, rates, timestamps. ids are newtypes so the compiler catches mixups.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

// token quantities. balances are never negative, so unsigned.
pub type Amount = u128;

// an account on the ledger. users, the engine's custody account and the ledger itself all have one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Address(pub u64);

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016x}", self.0)
    }
}

// 1.1: token type id. 0 is reserved for the fungible currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TokenId(pub u64);

impl TokenId {
    pub const CURRENCY: TokenId = TokenId(0);
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TradeId(pub u64);

impl fmt::Display for TradeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "trade-{}", self.0)
    }
}

// 1.2: descriptive tag only. every kind moves through the same quantity-based balance model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Fungible,
    NonFungible,
}

impl TokenKind {
    // id 0 is the currency, everything minted after it is collateral-grade
    pub fn infer(id: TokenId) -> Self {
        if id == TokenId::CURRENCY {
            TokenKind::Fungible
        } else {
            TokenKind::NonFungible
        }
    }
}

// 1.3: yearly interest multiplier. 1 = 100%/year, 2 = 200%/year. simple, never compounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Apy(pub u32);

impl Apy {
    pub fn value(&self) -> u32 {
        self.0
    }

    // 2 → 200%
    pub fn as_percent(&self) -> Decimal {
        Decimal::from(self.0) * Decimal::ONE_HUNDRED
    }
}

impl fmt::Display for Apy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x", self.0)
    }
}

// 1.4: unix timestamp in seconds. interest accrues per second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub fn now() -> Self {
        Self(chrono::Utc::now().timestamp())
    }

    pub fn from_secs(secs: i64) -> Self {
        Self(secs)
    }

    pub fn as_secs(&self) -> i64 {
        self.0
    }

    pub fn plus_secs(&self, secs: u64) -> Self {
        Self(self.0.saturating_add(i64::try_from(secs).unwrap_or(i64::MAX)))
    }

    // clock skew backwards counts as zero elapsed
    pub fn seconds_since(&self, earlier: Timestamp) -> u64 {
        u64::try_from(self.0.saturating_sub(earlier.0)).unwrap_or(0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match chrono::DateTime::from_timestamp(self.0, 0) {
            Some(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S UTC")),
            None => write!(f, "{}s", self.0),
        }
    }
}
