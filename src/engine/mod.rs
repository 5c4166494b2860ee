// 8.0: lending engine. coordinates the trade lifecycle: opening, financing,
// repayment, closure and liquidation. every value movement goes through the ledger.
// deterministic, callers pass the current time in.

mod core;
mod liquidations;
mod repayment;
mod results;
mod trades;

pub use core::LendingEngine;
pub use results::{
    FinancingResult, LendingError, LiquidationResult, OpenTradeRequest, RepaymentResult,
};
