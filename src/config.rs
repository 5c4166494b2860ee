// 7.0 config.rs: all settings in one place. engine policy, genesis tokens, env presets.
// 7.1 LendingConfig picks the open protocol choices: when principal is paid out,
// whether interest is settled, and how long before a lender may liquidate.

use serde::{Deserialize, Serialize};

use crate::types::{Address, Amount, TokenId, TokenKind};

pub const SECONDS_PER_DAY: u64 = 86_400;

// When the lender's principal reaches the borrower
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Disbursement {
    // held in engine custody until the borrower claims it
    Escrow,
    // forwarded to the borrower as part of financing
    Immediate,
}

// What the borrower must repay before the trade closes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Settlement {
    PrincipalOnly,
    // principal plus simple interest accrued since financing
    PrincipalPlusInterest,
}

/** 7.2: lending engine policy */
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LendingConfig {
    // Token type used for principal and repayment
    pub currency_token: TokenId,
    // Collateral units locked per trade
    pub collateral_per_trade: Amount,
    pub disbursement: Disbursement,
    pub settlement: Settlement,
    // Seconds after financing before the lender may liquidate
    pub liquidation_delay_secs: u64,
    // Maximum number of engine events kept in memory
    pub max_events: usize,
}

impl Default for LendingConfig {
    fn default() -> Self {
        Self {
            currency_token: TokenId::CURRENCY,
            collateral_per_trade: 1,
            disbursement: Disbursement::Escrow,
            settlement: Settlement::PrincipalOnly,
            liquidation_delay_secs: 30 * SECONDS_PER_DAY,
            max_events: 100_000,
        }
    }
}

impl LendingConfig {
    // Lender may liquidate right after financing
    pub fn development() -> Self {
        Self {
            liquidation_delay_secs: 0,
            ..Self::default()
        }
    }

    pub fn testnet() -> Self {
        Self {
            liquidation_delay_secs: SECONDS_PER_DAY,
            disbursement: Disbursement::Immediate,
            ..Self::default()
        }
    }

    // Interest-aware settlement with a long grace period
    pub fn production() -> Self {
        Self {
            disbursement: Disbursement::Immediate,
            settlement: Settlement::PrincipalPlusInterest,
            liquidation_delay_secs: 90 * SECONDS_PER_DAY,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.collateral_per_trade == 0 {
            return Err(ConfigError::InvalidLending {
                reason: "collateral per trade must be positive".to_string(),
            });
        }

        if self.max_events == 0 {
            return Err(ConfigError::InvalidLending {
                reason: "event log needs room for at least one event".to_string(),
            });
        }

        if i64::try_from(self.liquidation_delay_secs).is_err() {
            return Err(ConfigError::InvalidLending {
                reason: "liquidation delay out of range".to_string(),
            });
        }

        Ok(())
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}

// One token type created when the ledger is built
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenesisToken {
    pub name: String,
    pub supply: Amount,
    pub kind: TokenKind,
}

/** 7.3: initial ledger contents. first entry becomes id 0 */
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenesisConfig {
    // Account credited with every genesis supply
    pub reserve: Address,
    pub tokens: Vec<GenesisToken>,
    pub max_events: usize,
}

impl Default for GenesisConfig {
    fn default() -> Self {
        Self {
            reserve: Address(1),
            tokens: vec![
                GenesisToken {
                    name: "EMERALDS".to_string(),
                    supply: 1_000_000,
                    kind: TokenKind::Fungible,
                },
                GenesisToken {
                    name: "GOVERNANCE".to_string(),
                    supply: 1_000,
                    kind: TokenKind::Fungible,
                },
            ],
            max_events: 100_000,
        }
    }
}

impl GenesisConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.tokens.first() {
            None => {
                return Err(ConfigError::InvalidGenesis {
                    reason: "currency token (id 0) must be declared".to_string(),
                })
            }
            Some(currency) if currency.kind != TokenKind::Fungible => {
                return Err(ConfigError::InvalidGenesis {
                    reason: "token id 0 must be fungible".to_string(),
                })
            }
            Some(_) => {}
        }

        if let Some(token) = self.tokens.iter().find(|t| t.supply == 0) {
            return Err(ConfigError::InvalidGenesis {
                reason: format!("{} has zero supply", token.name),
            });
        }

        Ok(())
    }
}

// Ledger genesis plus engine policy
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProtocolConfig {
    pub genesis: GenesisConfig,
    pub lending: LendingConfig,
}

impl ProtocolConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.genesis.validate()?;
        self.lending.validate()?;

        let currency = usize::try_from(self.lending.currency_token.0).unwrap_or(usize::MAX);
        if currency >= self.genesis.tokens.len() {
            return Err(ConfigError::InvalidLending {
                reason: format!("currency {} is not a genesis token", self.lending.currency_token),
            });
        }

        Ok(())
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid lending config: {reason}")]
    InvalidLending { reason: String },

    #[error("invalid genesis config: {reason}")]
    InvalidGenesis { reason: String },

    #[error("config parse error: {0}")]
    Parse(String),
}

// Environment presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    Development,
    Testnet,
    Production,
}

impl Environment {
    pub fn config(&self) -> ProtocolConfig {
        let lending = match self {
            Environment::Development => LendingConfig::development(),
            Environment::Testnet => LendingConfig::testnet(),
            Environment::Production => LendingConfig::production(),
        };
        ProtocolConfig {
            genesis: GenesisConfig::default(),
            lending,
        }
    }
}
