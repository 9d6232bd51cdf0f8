//! Tests for the pending-request registry

use super::*;
use proptest::prelude::*;
use std::sync::Arc;
use std::thread;

fn bound(url: &str) -> Callback {
    let callback = Callback::new(|_| {});
    callback.bind_url(url);
    callback
}

#[test]
fn test_register_keeps_dispatch_order() {
    let registry = PendingRegistry::new();

    registry.register(&bound("https://a.example"));
    registry.register(&bound("https://b.example"));
    registry.register(&bound("https://c.example"));

    assert_eq!(
        registry.pending_urls(),
        vec!["https://a.example", "https://b.example", "https://c.example"]
    );
}

#[test]
fn test_same_url_registers_once() {
    let registry = PendingRegistry::new();
    let first = bound("https://example.com/v");
    let second = bound("https://example.com/v");

    assert!(registry.register(&first));
    assert!(!registry.register(&second));
    assert!(!registry.register(&first));

    assert_eq!(registry.len(), 1);
}

#[test]
fn test_unregister_is_idempotent() {
    let registry = PendingRegistry::new();
    let callback = bound("https://example.com/v");
    registry.register(&callback);

    assert!(registry.unregister(&callback));
    assert!(!registry.unregister(&callback));
    assert!(registry.is_empty());
}

#[test]
fn test_removed_callback_is_never_reinserted() {
    let registry = PendingRegistry::new();
    let callback = bound("https://example.com/v");

    registry.register(&callback);
    registry.unregister(&callback);

    assert!(!registry.register(&callback));
    assert!(!registry.contains(&callback));
}

#[test]
fn test_cancel_all_drains_and_aborts() {
    let registry = PendingRegistry::new();
    let callbacks: Vec<Callback> = (0..3)
        .map(|i| bound(&format!("https://example.com/{}", i)))
        .collect();
    for callback in &callbacks {
        registry.register(callback);
    }

    assert_eq!(registry.cancel_all(), 3);

    assert!(registry.is_empty());
    assert!(callbacks.iter().all(Callback::is_aborted));
    assert!(callbacks.iter().all(|c| !registry.register(c)));
}

#[test]
fn test_cancel_all_on_empty_registry() {
    let registry = PendingRegistry::new();
    assert_eq!(registry.cancel_all(), 0);
}

#[test]
fn test_exact_removal_ignores_equal_callbacks() {
    let registry = PendingRegistry::new();
    let pending = bound("https://a.example");
    let same_url = bound("https://a.example");
    registry.register(&pending);

    assert!(registry.contains(&same_url));
    assert!(!registry.holds_exact(&same_url));
    assert!(!registry.remove_exact(&same_url));

    assert!(registry.holds_exact(&pending));
    assert!(!pending.is_retired());
    assert!(registry.remove_exact(&pending));
    assert!(pending.is_retired());
    assert!(registry.is_empty());
}

#[test]
fn test_concurrent_register_and_cancel_all() {
    let registry = Arc::new(PendingRegistry::new());

    let writers: Vec<_> = (0..4)
        .map(|t| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                (0..50)
                    .map(|i| {
                        let callback = bound(&format!("https://example.com/{}/{}", t, i));
                        registry.register(&callback);
                        callback
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();
    let canceller = {
        let registry = Arc::clone(&registry);
        thread::spawn(move || {
            for _ in 0..20 {
                registry.cancel_all();
                thread::yield_now();
            }
        })
    };

    let callbacks: Vec<Callback> = writers
        .into_iter()
        .flat_map(|w| w.join().unwrap())
        .collect();
    canceller.join().unwrap();
    registry.cancel_all();

    // Every callback was swept by some cancel_all, and none is still tracked
    assert!(registry.is_empty());
    assert!(callbacks.iter().all(Callback::is_aborted));
}

#[derive(Debug, Clone)]
enum Op {
    Register(usize),
    Unregister(usize),
    CancelAll,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0usize..6).prop_map(Op::Register),
        3 => (0usize..6).prop_map(Op::Unregister),
        1 => Just(Op::CancelAll),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // The registry never holds duplicates, never readmits a removed callback,
    // and an aborted flag never clears.
    #[test]
    fn prop_registry_invariants(ops in prop::collection::vec(op_strategy(), 0..40)) {
        let registry = PendingRegistry::new();
        let callbacks: Vec<Callback> = (0..6)
            .map(|i| bound(&format!("https://example.com/{}", i)))
            .collect();
        let mut removed = vec![false; callbacks.len()];
        let mut aborted = vec![false; callbacks.len()];

        for op in ops {
            match op {
                Op::Register(i) => {
                    let added = registry.register(&callbacks[i]);
                    if removed[i] {
                        prop_assert!(!added, "removed callback {} was readmitted", i);
                    }
                }
                Op::Unregister(i) => {
                    if registry.unregister(&callbacks[i]) {
                        removed[i] = true;
                    }
                }
                Op::CancelAll => {
                    for (i, callback) in callbacks.iter().enumerate() {
                        if registry.contains(callback) {
                            removed[i] = true;
                        }
                    }
                    registry.cancel_all();
                    prop_assert!(registry.is_empty());
                }
            }

            let urls = registry.pending_urls();
            let mut deduped = urls.clone();
            deduped.sort();
            deduped.dedup();
            prop_assert_eq!(urls.len(), deduped.len());

            for (i, callback) in callbacks.iter().enumerate() {
                if aborted[i] {
                    prop_assert!(callback.is_aborted());
                }
                aborted[i] = callback.is_aborted();
            }
        }
    }
}
