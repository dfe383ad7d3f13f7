//! Property test: a key's quantity always equals the sum of its ledger
//! entry deltas, whatever sequence of operations produced it.

use common::ReferenceId;
use ledger::{InMemoryStockStore, LedgerEngine, LedgerError, StockKey};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Receive(u32),
    Reserve(u32),
    Release(u32),
    Adjust(i64),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (1u32..=20).prop_map(Op::Receive),
        (1u32..=20).prop_map(Op::Reserve),
        (1u32..=20).prop_map(Op::Release),
        (-20i64..=20).prop_map(Op::Adjust),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn quantity_equals_sum_of_entry_deltas(ops in proptest::collection::vec(op_strategy(), 1..40)) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        rt.block_on(async move {
            let engine = LedgerEngine::new(InMemoryStockStore::new());
            let key = StockKey::product(1u64);

            for (i, op) in ops.into_iter().enumerate() {
                // distinct references keep release idempotency out of play
                let reference = ReferenceId::new(format!("ref-{i}"));
                let result = match op {
                    Op::Receive(qty) => engine.receive(key, qty, reference).await,
                    Op::Reserve(qty) => engine.reserve(key, qty, reference).await,
                    Op::Release(qty) => engine.release(key, qty, reference).await,
                    Op::Adjust(delta) => engine.adjust(key, delta, reference, "audit").await,
                };
                match result {
                    Ok(_) => {}
                    Err(LedgerError::InsufficientStock { .. }) => {}
                    Err(e) => panic!("unexpected error: {e}"),
                }
            }

            let quantity = engine
                .stock(&key)
                .await
                .unwrap()
                .map_or(0, |row| row.quantity);
            let history = engine.history(key.product, None).await.unwrap();

            // core invariant: the ledger is the source of truth
            let sum: i64 = history.iter().map(|e| e.quantity_change).sum();
            assert_eq!(quantity, sum);

            // non-negativity held at every step
            let mut running = 0i64;
            for entry in &history {
                running += entry.quantity_change;
                assert_eq!(entry.balance_after, running);
                assert!(running >= 0);
            }
        });
    }
}
