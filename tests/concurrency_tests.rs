mod common;

use common::captured;
use rust_decimal_macros::dec;
use std::sync::Arc;
use trailpay::application::balances::BalanceAggregator;
use trailpay::application::ledger::PaymentLedger;
use trailpay::application::release::ReleaseEngine;
use trailpay::domain::money::Balance;
use trailpay::domain::ports::PaymentStoreArc;
use trailpay::error::PaymentError;
use trailpay::infrastructure::in_memory::InMemoryPaymentStore;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_release_has_exactly_one_winner() {
    let store: PaymentStoreArc = Arc::new(InMemoryPaymentStore::new());
    let ledger = PaymentLedger::new(store.clone());
    let engine = ReleaseEngine::new(store.clone());
    let aggregator = BalanceAggregator::new(store);

    ledger.insert(captured("pay_1", 7, dec!(1000), dec!(100))).await.unwrap();
    engine.verify_payment("pay_1", "admin").await.unwrap();

    let first = engine.clone();
    let second = engine.clone();
    let task_a =
        tokio::spawn(async move { first.release_payment("pay_1", "alice", "BANK-REF-A").await });
    let task_b =
        tokio::spawn(async move { second.release_payment("pay_1", "bobby", "BANK-REF-B").await });

    let result_a = task_a.await.unwrap();
    let result_b = task_b.await.unwrap();

    let winners = [&result_a, &result_b]
        .iter()
        .filter(|result| result.is_ok())
        .count();
    assert_eq!(winners, 1);

    let loser = if result_a.is_ok() { result_b } else { result_a };
    assert!(matches!(
        loser,
        Err(PaymentError::StateConflict { .. }) | Err(PaymentError::AlreadyReleased(_))
    ));

    // The organizer is credited exactly once.
    let balance = aggregator.balance_for(7).await.unwrap();
    assert_eq!(balance.released_amount, Balance::new(dec!(900)));
    assert_eq!(balance.pending_amount, Balance::ZERO);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_releases_of_distinct_payments_all_land() {
    let store: PaymentStoreArc = Arc::new(InMemoryPaymentStore::new());
    let ledger = PaymentLedger::new(store.clone());
    let engine = ReleaseEngine::new(store.clone());
    let aggregator = BalanceAggregator::new(store);

    for i in 1..=8 {
        ledger
            .insert(captured(&format!("pay_{i}"), 7, dec!(100), dec!(10)))
            .await
            .unwrap();
        engine.verify_payment(&format!("pay_{i}"), "admin").await.unwrap();
    }

    let mut tasks = Vec::new();
    for i in 1..=8 {
        let engine = engine.clone();
        tasks.push(tokio::spawn(async move {
            engine
                .release_payment(&format!("pay_{i}"), "admin", "BANK-REF-1")
                .await
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let balance = aggregator.balance_for(7).await.unwrap();
    assert_eq!(balance.released_amount, Balance::new(dec!(720)));
    assert_eq!(balance.pending_payments, 0);
}
