mod common;

use bullion_ledger::application::withdrawal::Decision;
use bullion_ledger::domain::withdrawal::ResourceKind;
use common::{bank, engine};
use rand::Rng;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Random mix of deposits, withdrawals, and resolutions; afterwards the
/// balance must equal deposits minus everything withdrawn and not rejected.
#[tokio::test]
async fn test_random_activity_conserves_money() {
    let engine = engine();
    let mut rng = rand::thread_rng();

    let mut expected = Decimal::ZERO;
    for _ in 0..50 {
        let cents: i64 = rng.gen_range(100..100_000);
        let amount = Decimal::new(cents, 2);

        if rng.gen_bool(0.6) {
            let intent = engine
                .reconciler
                .create(1, amount.try_into().unwrap())
                .await
                .unwrap();
            engine.reconciler.settle(&intent.txn_id).await.unwrap();
            expected += amount;
        } else if let Ok(request) = engine
            .withdrawals
            .create(1, ResourceKind::Balance, amount.try_into().unwrap(), bank())
            .await
        {
            expected -= amount;
            match rng.gen_range(0..3) {
                0 => {
                    engine
                        .withdrawals
                        .resolve(request.id, Decision::Rejected)
                        .await
                        .unwrap();
                    expected += amount;
                }
                1 => {
                    engine
                        .withdrawals
                        .resolve(request.id, Decision::Approved)
                        .await
                        .unwrap();
                }
                _ => {} // leave pending
            }
        }
    }

    let balance = engine.ledger.balance(1).await.unwrap();
    assert_eq!(balance, expected);
    assert!(balance >= dec!(0));
}
