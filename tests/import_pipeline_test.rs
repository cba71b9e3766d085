//! End-to-end tests for the import pipeline over a real SQLite database.

use chrono::{NaiveDate, NaiveTime};
use optjournal::db::{init_db, EmptyDayPolicy, Repository};
use optjournal::domain::{Decimal, ReviewUpdate, RoundTrip};
use optjournal::ImportOrchestrator;
use std::str::FromStr;
use std::sync::Arc;
use tempfile::TempDir;

// =============================================================================
// Fixtures
// =============================================================================

const EXPORT: &str = "\
For Account:,####1234

Activity Types:,All

TransactionDate,TransactionType,SecurityType,Symbol,Quantity,Amount,Price,Commission,Description
02/02/26,Bought,OPTN,QQQ---260205C00609000,2,-251.30,1.25,1.30,CALL QQQ 02/05/26 609.000
02/02/26,Sold,OPTN,QQQ---260205C00609000,-2,298.70,1.50,1.30,CALL QQQ 02/05/26 609.000
02/03/26,Bought,OPTN,SPY---260203P00600000,1,-50.65,0.50,0.65,PUT SPY 02/03/26 600.000
02/03/26,Sold,OPTN,SPY---260203P00600000,-1,49.35,0.50,0.65,PUT SPY 02/03/26 600.000
02/03/26,Bought,EQ,AAPL,10,-2300.00,230.00,0,APPLE INC
";

const PASTE_MATCHING_EXPORT: &str = "\
Status\tOrder\tDate/Time\tFilled\tPrice\tCommission
Executed\tBuy Open 2 QQQ Feb 05 '26 $609 Call Limit\t02/02/26 9:41:07 AM EST\t2\t$1.25\t$1.30
Executed\tSell Close 2 QQQ Feb 05 '26 $609 Call Limit\t02/02/26 10:11:30 AM EST\t2\t$1.50\t$1.30
Cancelled\tSell Close 2 QQQ Feb 05 '26 $609 Call Limit\t02/02/26 10:00:00 AM EST\t0\t--\t
";

const PASTE_ONLY: &str = "\
Executed\tBuy Open 1 SPY Feb 04 '26 $605 Put Limit\t02/04/26 1:00:00 PM EST\t1\t2.00\t0.65
Executed\tSell Close 1 SPY Feb 04 '26 $605 Put Limit\t02/04/26 1:30:00 PM EST\t1\t2.40\t0.65
";

async fn setup_test_db() -> (Arc<Repository>, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir
        .path()
        .join("test.db")
        .to_string_lossy()
        .to_string();
    let pool = init_db(&db_path).await.expect("init_db failed");
    (Arc::new(Repository::new(pool)), temp_dir)
}

fn orchestrator(repo: &Arc<Repository>, policy: EmptyDayPolicy) -> ImportOrchestrator {
    ImportOrchestrator::new(repo.clone(), policy)
}

fn d(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 2, day).unwrap()
}

async fn trips(repo: &Repository, day: u32) -> Vec<RoundTrip> {
    repo.round_trips_for_date(date(day))
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.trip)
        .collect()
}

// =============================================================================
// CSV import
// =============================================================================

#[tokio::test]
async fn test_csv_import_builds_round_trips_and_summaries() {
    let (repo, _temp) = setup_test_db().await;
    let orch = orchestrator(&repo, EmptyDayPolicy::Keep);

    let summary = orch.import_csv(EXPORT).await.unwrap();
    assert_eq!(summary.imported, 4);
    assert_eq!(summary.skipped, 0);
    assert_eq!(summary.rejected, 0);
    assert_eq!(summary.dates, vec![date(2), date(3)]);

    let day2 = trips(&repo, 2).await;
    assert_eq!(day2.len(), 1);
    assert_eq!(day2[0].quantity, 2);
    assert_eq!(day2[0].gross_pnl, d("50"));
    assert_eq!(day2[0].net_pnl, d("47.40"));
    assert_eq!(day2[0].hold_minutes, None);

    let s2 = repo.daily_summary(date(2)).await.unwrap().unwrap();
    assert_eq!(s2.winners, 1);
    assert_eq!(s2.net_pnl, d("47.4"));

    let s3 = repo.daily_summary(date(3)).await.unwrap().unwrap();
    assert_eq!(s3.losers, 1);
    assert_eq!(s3.net_pnl, d("-1.3"));
}

#[tokio::test]
async fn test_csv_reimport_is_idempotent() {
    let (repo, _temp) = setup_test_db().await;
    let orch = orchestrator(&repo, EmptyDayPolicy::Keep);

    orch.import_csv(EXPORT).await.unwrap();
    let before = (trips(&repo, 2).await, trips(&repo, 3).await);
    let summary_before = repo.daily_summary(date(2)).await.unwrap();

    let again = orch.import_csv(EXPORT).await.unwrap();
    assert_eq!(again.imported, 0);
    assert_eq!(again.skipped, 4);
    // Dates are recompiled even though every row was a duplicate.
    assert_eq!(again.dates, vec![date(2), date(3)]);

    assert_eq!((trips(&repo, 2).await, trips(&repo, 3).await), before);
    assert_eq!(repo.daily_summary(date(2)).await.unwrap(), summary_before);
    assert_eq!(repo.executions_for_date(date(2)).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_malformed_date_row_is_rejected_and_others_import() {
    let (repo, _temp) = setup_test_db().await;
    let orch = orchestrator(&repo, EmptyDayPolicy::Keep);

    let export = EXPORT.replace(
        "02/03/26,Bought,EQ,AAPL",
        "13/45/26,Bought,OPTN,SPY---260203P00600000,1,-50.65,0.50,0.65,PUT SPY\n02/03/26,Bought,EQ,AAPL",
    );
    let summary = orch.import_csv(&export).await.unwrap();
    assert_eq!(summary.imported, 4);
    assert_eq!(summary.rejected, 1);
    assert_eq!(summary.dates, vec![date(2), date(3)]);

    assert_eq!(trips(&repo, 2).await[0].net_pnl, d("47.40"));
    assert_eq!(trips(&repo, 3).await[0].net_pnl, d("-1.30"));
}

#[tokio::test]
async fn test_oversized_price_row_is_rejected_and_day_still_compiles() {
    let (repo, _temp) = setup_test_db().await;
    let orch = orchestrator(&repo, EmptyDayPolicy::Keep);

    let export = format!(
        "{}02/02/26,Sold,OPTN,QQQ---260205C00609000,-1,150.00,1000000000000000000000000000,0,CALL QQQ\n",
        EXPORT
    );
    let summary = orch.import_csv(&export).await.unwrap();
    assert_eq!(summary.imported, 4);
    assert_eq!(summary.rejected, 1);
    assert_eq!(repo.executions_for_date(date(2)).await.unwrap().len(), 2);

    let day2 = trips(&repo, 2).await;
    assert_eq!(day2.len(), 1);
    assert_eq!(day2[0].net_pnl, d("47.40"));

    // Later recomputes of the date keep working.
    orch.recompute(&[date(2)]).await.unwrap();
    assert_eq!(trips(&repo, 2).await, day2);
}

#[tokio::test]
async fn test_identical_rows_in_one_export_collapse() {
    let (repo, _temp) = setup_test_db().await;
    let orch = orchestrator(&repo, EmptyDayPolicy::Keep);

    let text = "\
TransactionDate,TransactionType,SecurityType,Symbol,Quantity,Amount,Price,Commission,Description
02/02/26,Bought,OPTN,QQQ---260205C00609000,1,-125.65,1.25,0.65,x
02/02/26,Bought,OPTN,QQQ---260205C00609000,1,-125.65,1.25,0.65,x
";
    let summary = orch.import_csv(text).await.unwrap();
    assert_eq!(summary.imported, 1);
    assert_eq!(summary.skipped, 1);
}

#[tokio::test]
async fn test_fifo_lot_order_through_pipeline() {
    let (repo, _temp) = setup_test_db().await;
    let orch = orchestrator(&repo, EmptyDayPolicy::Keep);

    let text = "\
TransactionDate,TransactionType,SecurityType,Symbol,Quantity,Amount,Price,Commission,Description
02/05/26,Bought,OPTN,IWM---260206C00230000,2,-200.00,1.00,0,first lot
02/05/26,Bought,OPTN,IWM---260206C00230000,3,-600.00,2.00,0,second lot
02/05/26,Sold,OPTN,IWM---260206C00230000,-4,1200.00,3.00,0,exit
";
    orch.import_csv(text).await.unwrap();

    let day = trips(&repo, 5).await;
    assert_eq!(day.len(), 2);
    assert_eq!((day[0].quantity, day[0].entry_price), (2, d("1")));
    assert_eq!((day[1].quantity, day[1].entry_price), (2, d("2")));
    assert_eq!(day[0].net_pnl, d("400"));
    assert_eq!(day[1].net_pnl, d("200"));

    let reports = orch.recompute(&[date(5)]).await.unwrap();
    assert_eq!(reports[0].residuals[0].quantity, 1);
}

#[tokio::test]
async fn test_profit_factor_finite_with_only_winners() {
    let (repo, _temp) = setup_test_db().await;
    let orch = orchestrator(&repo, EmptyDayPolicy::Keep);

    let text = "\
TransactionDate,TransactionType,SecurityType,Symbol,Quantity,Amount,Price,Commission,Description
02/06/26,Bought,OPTN,SPY---260206C00600000,1,-100.00,1.00,0,x
02/06/26,Sold,OPTN,SPY---260206C00600000,-1,150.00,1.50,0,x
";
    orch.import_csv(text).await.unwrap();

    let summary = repo.daily_summary(date(6)).await.unwrap().unwrap();
    assert_eq!(summary.profit_factor, d("5000"));
    assert_eq!(summary.avg_loser, None);
}

#[tokio::test]
async fn test_scratch_deadband_in_summary() {
    let (repo, _temp) = setup_test_db().await;
    let orch = orchestrator(&repo, EmptyDayPolicy::Keep);

    let text = "\
TransactionDate,TransactionType,SecurityType,Symbol,Quantity,Amount,Price,Commission,Description
02/09/26,Bought,OPTN,SPY---260209C00600000,1,-100.00,1.00,0,scratch
02/09/26,Sold,OPTN,SPY---260209C00600000,-1,100.50,1.005,0,scratch
02/09/26,Bought,OPTN,SPY---260209P00590000,1,-100.00,1.00,0,winner
02/09/26,Sold,OPTN,SPY---260209P00590000,-1,101.01,1.0101,0,winner
";
    orch.import_csv(text).await.unwrap();

    let summary = repo.daily_summary(date(9)).await.unwrap().unwrap();
    assert_eq!(summary.total_trades, 2);
    assert_eq!(summary.scratches, 1);
    assert_eq!(summary.winners, 1);
    assert_eq!(summary.losers, 0);
}

// =============================================================================
// Paste reconciliation
// =============================================================================

#[tokio::test]
async fn test_paste_backfills_times_on_csv_rows() {
    let (repo, _temp) = setup_test_db().await;
    let orch = orchestrator(&repo, EmptyDayPolicy::Keep);
    orch.import_csv(EXPORT).await.unwrap();

    let summary = orch.import_paste(PASTE_MATCHING_EXPORT).await.unwrap();
    assert_eq!(summary.updated, 2);
    assert_eq!(summary.inserted, 0);
    assert_eq!(summary.skipped, 0);
    assert_eq!(summary.rejected, 0);
    assert_eq!(summary.dates, vec![date(2)]);

    let executions = repo.executions_for_date(date(2)).await.unwrap();
    assert_eq!(executions.len(), 2);
    assert_eq!(executions[0].time, NaiveTime::from_hms_opt(9, 41, 7));
    // The CSV amount is kept; only the time is filled in.
    assert_eq!(executions[0].amount, d("-251.30"));

    let day2 = trips(&repo, 2).await;
    assert_eq!(day2[0].hold_minutes, Some(30));
    assert_eq!(day2[0].entry_time, NaiveTime::from_hms_opt(9, 41, 7));
}

#[tokio::test]
async fn test_repaste_is_idempotent() {
    let (repo, _temp) = setup_test_db().await;
    let orch = orchestrator(&repo, EmptyDayPolicy::Keep);
    orch.import_csv(EXPORT).await.unwrap();
    orch.import_paste(PASTE_MATCHING_EXPORT).await.unwrap();
    let before = trips(&repo, 2).await;

    let again = orch.import_paste(PASTE_MATCHING_EXPORT).await.unwrap();
    assert_eq!(again.updated, 0);
    assert_eq!(again.inserted, 0);
    assert_eq!(again.skipped, 2);

    assert_eq!(repo.executions_for_date(date(2)).await.unwrap().len(), 2);
    assert_eq!(trips(&repo, 2).await, before);
}

#[tokio::test]
async fn test_paste_without_csv_inserts_with_computed_amounts() {
    let (repo, _temp) = setup_test_db().await;
    let orch = orchestrator(&repo, EmptyDayPolicy::Keep);

    let summary = orch.import_paste(PASTE_ONLY).await.unwrap();
    assert_eq!(summary.inserted, 2);
    assert_eq!(summary.updated, 0);

    let executions = repo.executions_for_date(date(4)).await.unwrap();
    assert_eq!(executions[0].amount, d("-200.65"));
    assert_eq!(executions[0].symbol, "SPY---260204P00605000");
    assert_eq!(executions[1].amount, d("239.35"));

    let day4 = trips(&repo, 4).await;
    assert_eq!(day4[0].net_pnl, d("38.70"));
    assert_eq!(day4[0].hold_minutes, Some(30));
}

#[tokio::test]
async fn test_paste_rejects_priceless_and_unencodable_rows() {
    let (repo, _temp) = setup_test_db().await;
    let orch = orchestrator(&repo, EmptyDayPolicy::Keep);

    let paste = "\
Executed\tBuy Open 1 SPY Feb 04 '26 $605 Put Limit\t02/04/26 1:00:00 PM EST\t1\t2.00\t0.65
Executed\tSell Close 1 SPY Feb 04 '26 $605 Put Limit\t02/04/26 1:30:00 PM EST\t1\t-\t0.65
Executed\tBuy Open 1 QQQ Feb 05 '26 $609.0005 Call Limit\t02/04/26 1:45:00 PM EST\t1\t1.00\t0.65
";
    let summary = orch.import_paste(paste).await.unwrap();
    assert_eq!(summary.inserted, 1);
    assert_eq!(summary.rejected, 2);

    let executions = repo.executions_for_date(date(4)).await.unwrap();
    assert_eq!(executions.len(), 1);
    assert_eq!(executions[0].symbol, "SPY---260204P00605000");
    assert_eq!(executions[0].price, d("2.00"));
}

#[tokio::test]
async fn test_paste_structural_failure_writes_nothing() {
    let (repo, _temp) = setup_test_db().await;
    let orch = orchestrator(&repo, EmptyDayPolicy::Keep);

    assert!(orch.import_paste("hello world\nno tabs here").await.is_err());
    assert!(repo.execution_dates().await.unwrap().is_empty());
}

// =============================================================================
// Review and summary policy
// =============================================================================

#[tokio::test]
async fn test_review_fields_survive_recompute() {
    let (repo, _temp) = setup_test_db().await;
    let orch = orchestrator(&repo, EmptyDayPolicy::Keep);
    orch.import_csv(EXPORT).await.unwrap();

    let id = repo.round_trips_for_date(date(2)).await.unwrap()[0].id;
    orch.set_review(
        id,
        &ReviewUpdate {
            setup_type: Some("ORB".to_string()),
            notes: Some("clean entry".to_string()),
            grade: Some("A".to_string()),
        },
    )
    .await
    .unwrap();
    orch.set_day_notes(date(2), Some("patient day")).await.unwrap();

    orch.import_csv(EXPORT).await.unwrap();
    orch.import_paste(PASTE_MATCHING_EXPORT).await.unwrap();
    orch.recompute_all().await.unwrap();

    let records = repo.round_trips_for_date(date(2)).await.unwrap();
    assert_eq!(records[0].review.setup_type.as_deref(), Some("ORB"));
    assert_eq!(records[0].review.notes.as_deref(), Some("clean entry"));
    assert_eq!(records[0].review.grade.as_deref(), Some("A"));
    assert_eq!(records[0].trip.hold_minutes, Some(30));

    let summary = repo.daily_summary(date(2)).await.unwrap().unwrap();
    assert_eq!(summary.notes.as_deref(), Some("patient day"));

    let setups = orch.setup_performance().await.unwrap();
    assert_eq!(setups.len(), 1);
    assert_eq!(setups[0].setup_type, "ORB");
    assert_eq!(setups[0].total_pnl, d("47.4"));
}

#[tokio::test]
async fn test_unknown_round_trip_review_is_not_found() {
    let (repo, _temp) = setup_test_db().await;
    let err = repo
        .set_review(999, &ReviewUpdate::default())
        .await
        .unwrap_err();
    assert!(matches!(err, optjournal::db::StoreError::NotFound(_)));
}

/// Leaves a summary behind for a date that has no executions.
async fn seed_stale_summary(repo: &Repository, day: NaiveDate) {
    let trip_summary = optjournal::engine::summarize(
        day,
        &[RoundTrip {
            date: day,
            contract: optjournal::ContractKey::new(
                "SPY",
                day,
                Decimal::from_int(600),
                optjournal::OptionType::Call,
            ),
            match_seq: 1,
            quantity: 1,
            entry_price: d("1"),
            exit_price: d("2"),
            entry_amount: d("100"),
            exit_amount: d("200"),
            gross_pnl: d("100"),
            net_pnl: d("100"),
            commission_total: Decimal::zero(),
            pnl_percent: d("100"),
            entry_time: None,
            exit_time: None,
            hold_minutes: None,
        }],
    );
    repo.replace_derived_for_date(day, &[], trip_summary.as_ref(), EmptyDayPolicy::Keep)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_empty_day_policy_keep_leaves_summary() {
    let (repo, _temp) = setup_test_db().await;
    seed_stale_summary(&repo, date(10)).await;

    orchestrator(&repo, EmptyDayPolicy::Keep)
        .recompute(&[date(10)])
        .await
        .unwrap();

    assert!(repo.daily_summary(date(10)).await.unwrap().is_some());
}

#[tokio::test]
async fn test_empty_day_policy_clear_removes_summary() {
    let (repo, _temp) = setup_test_db().await;
    seed_stale_summary(&repo, date(10)).await;

    orchestrator(&repo, EmptyDayPolicy::Clear)
        .recompute(&[date(10)])
        .await
        .unwrap();

    assert!(repo.daily_summary(date(10)).await.unwrap().is_none());
}

#[tokio::test]
async fn test_period_stats_across_imported_days() {
    let (repo, _temp) = setup_test_db().await;
    let orch = orchestrator(&repo, EmptyDayPolicy::Keep);
    orch.import_csv(EXPORT).await.unwrap();
    orch.import_paste(PASTE_ONLY).await.unwrap();

    let stats = orch.period_stats(date(1), date(28)).await.unwrap();
    assert_eq!(stats.days_traded, 3);
    assert_eq!(stats.total_trades, 3);
    assert_eq!(stats.winners, 2);
    assert_eq!(stats.losers, 1);
    assert_eq!(stats.net_pnl, d("84.8"));
    assert_eq!(stats.best_day, Some(d("47.4")));
    assert_eq!(stats.worst_day, Some(d("-1.3")));
}
