// lending-core: collateralized peer-to-peer lending over a multi-asset token ledger.
// ledger-first architecture: every value movement is an authorized, atomic ledger transfer.
// all computation is deterministic with no external I/O; callers pass the time in.
//
// file map (search X.0 for structs, X.1+ for logic):
//   1.x  types.rs: primitives: Address, TokenId, TradeId, Apy, Timestamp
//   2.x  ledger.rs: token registry, balances, operator approvals, atomic settlement
//   3.x  trade.rs: loan record and state transition table
//   4.x  interest.rs: simple interest math
//   7.x  config.rs: engine policy, genesis tokens, env presets
//   8.x  engine/: lending engine: open, finance, repay, liquidate
//   11.x events.rs: state transition events for audit
//   12.x api.rs: command/query surface and error codes
//   13.x protocol.rs: ledger + engine bundle, serialized shared handle

// core modules
pub mod engine;
pub mod events;
pub mod interest;
pub mod ledger;
pub mod trade;
pub mod types;

// integration modules
pub mod api;
pub mod config;
pub mod protocol;

// re exports for convenience
pub use engine::*;
pub use events::*;
pub use interest::*;
pub use ledger::*;
pub use trade::*;
pub use types::*;
pub use api::{ApiError, ApiResponse, Command, ErrorCode, Query};
pub use config::{
    ConfigError, Disbursement, Environment, GenesisConfig, GenesisToken, LendingConfig,
    ProtocolConfig, Settlement,
};
pub use protocol::{Protocol, SharedProtocol, ENGINE_ADDRESS, LEDGER_ADDRESS};
