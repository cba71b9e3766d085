//! Domain types for the options trade journal.
//!
//! This module provides:
//! - Lossless currency math via the Decimal wrapper
//! - Contract primitives: ContractKey, OptionType, TransactionType
//! - The compact option-symbol codec
//! - Executions, round trips and daily summaries
//! - Deterministic FIFO queue ordering

pub mod decimal;
pub mod execution;
pub mod ordering;
pub mod primitives;
pub mod round_trip;
pub mod summary;
pub mod symbol;

pub use decimal::Decimal;
pub use execution::{Execution, FillError, ParsedExecution, MAX_FILL_CASH};
pub use ordering::{sort_fifo_queue, ExecutionOrderingKey};
pub use primitives::{ContractKey, ImportSource, OptionType, TransactionType, CONTRACT_MULTIPLIER};
pub use round_trip::{Review, ReviewUpdate, RoundTrip, RoundTripRecord};
pub use summary::{DailySummary, PeriodStats, SetupPerformance};
pub use symbol::SymbolError;
