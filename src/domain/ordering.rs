//! FIFO queue ordering for executions within one contract and date.

use crate::domain::Execution;
use chrono::NaiveTime;

/// Ordering key for one side (buys or sells) of a contract's FIFO queue.
///
/// Ordering: time -> id when every execution on the side carries a time,
/// id (insertion order) otherwise. Mixing timed and untimed rows on one side
/// would not give a total order, so a single missing time drops the whole
/// side back to insertion order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ExecutionOrderingKey {
    /// Time of day (primary sort, only populated in timed mode).
    pub time: Option<NaiveTime>,
    /// Surrogate id (tie-breaker and fallback).
    pub id: i64,
}

impl ExecutionOrderingKey {
    pub fn from_execution(execution: &Execution, timed: bool) -> Self {
        ExecutionOrderingKey {
            time: if timed { execution.time } else { None },
            id: execution.id,
        }
    }
}

/// Sort one side of a FIFO queue deterministically.
pub fn sort_fifo_queue(executions: &mut [Execution]) {
    let timed = !executions.is_empty() && executions.iter().all(|e| e.time.is_some());
    executions.sort_by_key(|e| ExecutionOrderingKey::from_execution(e, timed));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ContractKey, Decimal, ImportSource, OptionType, TransactionType};
    use chrono::NaiveDate;

    fn exec(id: i64, time: Option<(u32, u32)>) -> Execution {
        Execution {
            id,
            date: NaiveDate::from_ymd_opt(2026, 2, 2).unwrap(),
            time: time.and_then(|(h, m)| NaiveTime::from_hms_opt(h, m, 0)),
            transaction_type: TransactionType::Bought,
            contract: ContractKey::new(
                "SPY",
                NaiveDate::from_ymd_opt(2026, 2, 2).unwrap(),
                Decimal::from_int(600),
                OptionType::Put,
            ),
            quantity: 1,
            price: Decimal::one(),
            amount: Decimal::from_int(-100),
            commission: Decimal::zero(),
            symbol: format!("SPY-{}", id),
            description: String::new(),
            source: ImportSource::Csv,
        }
    }

    fn ids(executions: &[Execution]) -> Vec<i64> {
        executions.iter().map(|e| e.id).collect()
    }

    #[test]
    fn test_timed_side_sorts_by_time_then_id() {
        let mut q = vec![
            exec(1, Some((10, 30))),
            exec(2, Some((9, 45))),
            exec(3, Some((9, 45))),
        ];
        sort_fifo_queue(&mut q);
        assert_eq!(ids(&q), vec![2, 3, 1]);
    }

    #[test]
    fn test_any_missing_time_falls_back_to_insertion_order() {
        let mut q = vec![exec(3, Some((9, 0))), exec(1, None), exec(2, Some((8, 0)))];
        sort_fifo_queue(&mut q);
        assert_eq!(ids(&q), vec![1, 2, 3]);
    }

    #[test]
    fn test_untimed_side_keeps_insertion_order() {
        let mut q = vec![exec(5, None), exec(4, None)];
        sort_fifo_queue(&mut q);
        assert_eq!(ids(&q), vec![4, 5]);
    }
}
