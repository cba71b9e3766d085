use chrono::{NaiveDate, NaiveTime};
use optjournal::domain::ImportSource;
use optjournal::engine::{match_executions, summarize};
use optjournal::{
    Compiler, ContractKey, Decimal, EmptyDayPolicy, Execution, JournalStore, MemoryStore,
    OptionType, TransactionType,
};
use std::str::FromStr;

fn d(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn trade_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 2, 2).unwrap()
}

fn contract(strike: i64, option_type: OptionType) -> ContractKey {
    ContractKey::new(
        "QQQ",
        NaiveDate::from_ymd_opt(2026, 2, 5).unwrap(),
        Decimal::from_int(strike),
        option_type,
    )
}

fn execution(
    id: i64,
    key: &ContractKey,
    transaction_type: TransactionType,
    quantity: i64,
    price: &str,
    commission: &str,
    time: Option<(u32, u32, u32)>,
) -> Execution {
    let price = d(price);
    let commission = d(commission);
    let gross = price * Decimal::from_int(quantity * 100);
    let amount = match transaction_type {
        TransactionType::Bought => -gross - commission,
        TransactionType::Sold => gross - commission,
    };
    Execution {
        id,
        date: trade_date(),
        time: time.and_then(|(h, m, s)| NaiveTime::from_hms_opt(h, m, s)),
        transaction_type,
        contract: key.clone(),
        quantity,
        price,
        amount,
        commission,
        symbol: optjournal::domain::symbol::encode(key).unwrap(),
        description: String::new(),
        source: ImportSource::Csv,
    }
}

fn buy(id: i64, key: &ContractKey, qty: i64, price: &str) -> Execution {
    execution(id, key, TransactionType::Bought, qty, price, "0", None)
}

fn sell(id: i64, key: &ContractKey, qty: i64, price: &str) -> Execution {
    execution(id, key, TransactionType::Sold, qty, price, "0", None)
}

#[test]
fn test_scale_in_scale_out_across_contracts() {
    let call = contract(609, OptionType::Call);
    let put = contract(600, OptionType::Put);

    let executions = vec![
        buy(1, &call, 1, "1.00"),
        buy(2, &put, 2, "3.00"),
        buy(3, &call, 1, "1.20"),
        sell(4, &put, 2, "2.50"),
        sell(5, &call, 2, "1.50"),
    ];

    let outcome = match_executions(trade_date(), &executions);
    assert!(outcome.residuals.is_empty());
    assert_eq!(outcome.round_trips.len(), 3);

    let calls: Vec<_> = outcome
        .round_trips
        .iter()
        .filter(|t| t.contract == call)
        .collect();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].match_seq, 1);
    assert_eq!(calls[0].net_pnl, d("50"));
    assert_eq!(calls[1].match_seq, 2);
    assert_eq!(calls[1].net_pnl, d("30"));

    let puts: Vec<_> = outcome
        .round_trips
        .iter()
        .filter(|t| t.contract == put)
        .collect();
    assert_eq!(puts.len(), 1);
    assert_eq!(puts[0].quantity, 2);
    assert_eq!(puts[0].net_pnl, d("-100"));

    let summary = summarize(trade_date(), &outcome.round_trips).unwrap();
    assert_eq!(summary.total_trades, 3);
    assert_eq!(summary.winners, 2);
    assert_eq!(summary.losers, 1);
    assert_eq!(summary.net_pnl, d("-20"));
    assert_eq!(summary.profit_factor, d("0.8"));
    assert_eq!(summary.largest_loss, d("-100"));
}

#[test]
fn test_matched_quantity_never_exceeds_either_side() {
    let call = contract(609, OptionType::Call);
    let executions = vec![
        buy(1, &call, 3, "1.00"),
        sell(2, &call, 1, "1.10"),
        sell(3, &call, 1, "1.20"),
        buy(4, &call, 2, "1.05"),
        sell(5, &call, 4, "1.30"),
        sell(6, &call, 1, "1.40"),
    ];

    let outcome = match_executions(trade_date(), &executions);
    let matched: i64 = outcome.round_trips.iter().map(|t| t.quantity).sum();
    assert_eq!(matched, 5);
    assert_eq!(outcome.residuals.len(), 1);
    assert_eq!(outcome.residuals[0].transaction_type, TransactionType::Sold);
    assert_eq!(outcome.residuals[0].quantity, 2);

    let seqs: Vec<i64> = outcome.round_trips.iter().map(|t| t.match_seq).collect();
    assert_eq!(seqs, (1..=seqs.len() as i64).collect::<Vec<_>>());
}

#[test]
fn test_commissions_split_per_contract() {
    let call = contract(609, OptionType::Call);
    let executions = vec![
        execution(1, &call, TransactionType::Bought, 2, "1.25", "1.30", Some((9, 41, 7))),
        execution(2, &call, TransactionType::Sold, 1, "1.50", "0.65", Some((10, 0, 0))),
        execution(3, &call, TransactionType::Sold, 1, "1.60", "0.65", Some((10, 30, 0))),
    ];

    let outcome = match_executions(trade_date(), &executions);
    assert_eq!(outcome.round_trips.len(), 2);

    let first = &outcome.round_trips[0];
    assert_eq!(first.commission_total, d("1.30"));
    assert_eq!(first.gross_pnl, d("25"));
    assert_eq!(first.net_pnl, d("23.70"));
    assert_eq!(first.hold_minutes, Some(18));

    let second = &outcome.round_trips[1];
    assert_eq!(second.net_pnl, d("33.70"));
    assert_eq!(second.hold_minutes, Some(48));
}

#[test]
fn test_compile_date_against_memory_store() {
    let store = MemoryStore::new();
    let date = trade_date();

    let parsed = optjournal::normalize::parse_csv_export(
        "\
TransactionDate,TransactionType,SecurityType,Symbol,Quantity,Amount,Price,Commission,Description
02/02/26,Bought,OPTN,QQQ---260205C00609000,2,-251.30,1.25,1.30,CALL QQQ
02/02/26,Sold,OPTN,QQQ---260205C00609000,-2,298.70,1.50,1.30,CALL QQQ
",
    )
    .unwrap();

    let report = tokio_test::block_on(async {
        store
            .insert_csv_executions(&parsed.executions)
            .await
            .unwrap();
        Compiler::compile_date(&store, date, EmptyDayPolicy::Keep)
            .await
            .unwrap()
    });

    assert_eq!(report.executions, 2);
    assert_eq!(report.round_trips, 1);
    assert!(!report.has_residuals());
    assert_eq!(report.summary.unwrap().net_pnl, d("47.4"));
}

#[test]
fn test_store_refuses_fills_outside_cash_range() {
    let store = MemoryStore::new();
    let key = contract(609, OptionType::Call);
    let fill = |price: &str, amount: Option<Decimal>| optjournal::domain::ParsedExecution {
        date: trade_date(),
        time: None,
        transaction_type: TransactionType::Sold,
        contract: key.clone(),
        quantity: 1,
        price: d(price),
        amount,
        commission: Decimal::zero(),
        symbol: None,
        description: String::new(),
        source: ImportSource::Csv,
    };

    let outcome = tokio_test::block_on(store.insert_csv_executions(&[
        fill("1.50", Some(d("150"))),
        fill("1000000000000000000000000000", Some(d("150"))),
        fill("1.60", Some(d("79228162514264337593543950335"))),
    ]))
    .unwrap();

    assert_eq!(outcome.inserted, 1);
    assert_eq!(outcome.failed, 2);
    let stored = tokio_test::block_on(store.executions_for_date(trade_date())).unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].amount, d("150"));
}
