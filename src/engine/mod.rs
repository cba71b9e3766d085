//! Pure computation engines for deterministic journal logic.
//!
//! None of these touch storage: the compiler feeds them one date's rows and
//! persists what they return.

pub mod daily_aggregator;
pub mod fifo_matcher;
pub mod rollup;

pub use daily_aggregator::{classify, summarize, TradeOutcome};
pub use fifo_matcher::{match_executions, MatchOutcome, Residual};
pub use rollup::{period_stats, setup_performance};
