//! Compile pipeline turning a date's executions into derived tables.
//!
//! This module provides:
//! - Per-date recomputation: load, FIFO match, aggregate, replace
//! - A report of what each recompute produced

use crate::domain::DailySummary;
use crate::engine::Residual;
use chrono::NaiveDate;

pub mod date_compiler;

pub use date_compiler::Compiler;

/// Outcome of recompiling one trade date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileReport {
    pub date: NaiveDate,
    /// Executions loaded for the date.
    pub executions: usize,
    pub round_trips: usize,
    /// Quantity left unmatched and discarded.
    pub residuals: Vec<Residual>,
    /// Summary written for the date, `None` when the day produced no round trips.
    pub summary: Option<DailySummary>,
}

impl CompileReport {
    pub fn has_residuals(&self) -> bool {
        !self.residuals.is_empty()
    }
}
