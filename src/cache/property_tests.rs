//! Property-Based Tests for the Cache Contract
//!
//! Drives the embedded backend through the `Cache` handle and compares it
//! against a plain map model.

use proptest::prelude::*;
use std::cell::Cell;
use std::collections::HashMap;
use std::time::Duration;

use crate::cache::{Cache, NO_EXPIRY};
use crate::memory::MemoryCache;

// == Strategies ==
/// Generates cache keys, including ones that look namespaced
fn key_strategy() -> impl Strategy<Value = String> {
    "[a-z]{1,3}(:[a-z0-9]{1,4})?".prop_map(|s| s)
}

/// Generates text values, including the empty string
fn value_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 {}\":]{0,64}".prop_map(|s| s)
}

#[derive(Debug, Clone)]
enum CacheOp {
    Set { key: String, value: String },
    SetIfAbsent { key: String, value: String },
    Get { key: String },
    Del { key: String },
    DelAll,
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        4 => (key_strategy(), value_strategy())
            .prop_map(|(key, value)| CacheOp::Set { key, value }),
        2 => (key_strategy(), value_strategy())
            .prop_map(|(key, value)| CacheOp::SetIfAbsent { key, value }),
        4 => key_strategy().prop_map(|key| CacheOp::Get { key }),
        2 => key_strategy().prop_map(|key| CacheOp::Del { key }),
        1 => Just(CacheOp::DelAll),
    ]
}

fn new_cache() -> Cache {
    Cache::new(MemoryCache::new())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Storing a value without expiry and reading it back returns it unchanged.
    #[test]
    fn prop_roundtrip_storage(key in key_strategy(), value in value_strategy()) {
        let cache = new_cache();

        let read = tokio_test::block_on(async {
            cache.set_text(&key, &value, NO_EXPIRY).await.unwrap();
            cache.get(&key).await
        });

        prop_assert_eq!(read.unwrap(), value.into_bytes());
    }

    // After `del`, the key no longer exists and reads miss.
    #[test]
    fn prop_delete_removes_entry(key in key_strategy(), value in value_strategy()) {
        let cache = new_cache();

        let (exists, read) = tokio_test::block_on(async {
            cache.set_text(&key, &value, NO_EXPIRY).await.unwrap();
            cache.del(&key).await.unwrap();
            (cache.exists(&key).await.unwrap(), cache.get(&key).await)
        });

        prop_assert!(!exists);
        prop_assert!(read.unwrap_err().is_not_found());
    }

    // A second `set` replaces the first; `set_if_absent` never does.
    #[test]
    fn prop_overwrite_semantics(
        key in key_strategy(),
        value1 in value_strategy(),
        value2 in value_strategy(),
        value3 in value_strategy()
    ) {
        let cache = new_cache();

        let (after_set, wrote, after_nx) = tokio_test::block_on(async {
            cache.set_text(&key, &value1, NO_EXPIRY).await.unwrap();
            cache.set_text(&key, &value2, NO_EXPIRY).await.unwrap();
            let after_set = cache.get_value(&key).await.unwrap();
            let wrote = cache.set_text_if_absent(&key, &value3, NO_EXPIRY).await.unwrap();
            (after_set, wrote, cache.get_value(&key).await.unwrap())
        });

        prop_assert_eq!(&after_set, &value2);
        prop_assert!(!wrote);
        prop_assert_eq!(after_nx, value2);
    }

    // `del_all` leaves no previously set key behind.
    #[test]
    fn prop_del_all_clears_everything(
        entries in prop::collection::vec((key_strategy(), value_strategy()), 1..30)
    ) {
        let cache = new_cache();

        let survivors = tokio_test::block_on(async {
            for (key, value) in &entries {
                cache.set_text(key, value, Duration::from_secs(60)).await.unwrap();
            }
            cache.del_all().await.unwrap();

            let mut survivors = Vec::new();
            for (key, _) in &entries {
                if cache.exists(key).await.unwrap() {
                    survivors.push(key.clone());
                }
            }
            survivors
        });

        prop_assert!(survivors.is_empty(), "keys survived del_all: {:?}", survivors);
    }

    // Integers written as text come back through `get_int64`.
    #[test]
    fn prop_int64_roundtrip(key in key_strategy(), n in any::<i64>()) {
        let cache = new_cache();

        let read = tokio_test::block_on(async {
            cache.set(&key, n, NO_EXPIRY).await.unwrap();
            cache.get_int64(&key).await
        });

        prop_assert_eq!(read.unwrap(), n);
    }

    // Any sequence of operations agrees with a map model.
    #[test]
    fn prop_matches_map_model(ops in prop::collection::vec(cache_op_strategy(), 1..60)) {
        let cache = new_cache();
        let mut model: HashMap<String, String> = HashMap::new();

        for op in ops {
            match op {
                CacheOp::Set { key, value } => {
                    tokio_test::block_on(cache.set_text(&key, &value, NO_EXPIRY)).unwrap();
                    model.insert(key, value);
                }
                CacheOp::SetIfAbsent { key, value } => {
                    let wrote = tokio_test::block_on(
                        cache.set_text_if_absent(&key, &value, NO_EXPIRY),
                    )
                    .unwrap();
                    prop_assert_eq!(wrote, !model.contains_key(&key));
                    model.entry(key).or_insert(value);
                }
                CacheOp::Get { key } => {
                    let read = tokio_test::block_on(cache.get_value(&key));
                    match model.get(&key) {
                        Some(expected) => prop_assert_eq!(&read.unwrap(), expected),
                        None => prop_assert!(read.unwrap_err().is_not_found()),
                    }
                }
                CacheOp::Del { key } => {
                    tokio_test::block_on(cache.del(&key)).unwrap();
                    model.remove(&key);
                }
                CacheOp::DelAll => {
                    tokio_test::block_on(cache.del_all()).unwrap();
                    model.clear();
                }
            }
        }

        for (key, value) in &model {
            let read = tokio_test::block_on(cache.get_value(key)).unwrap();
            prop_assert_eq!(&read, value);
        }
    }

    // `remember` on a present key never runs the compute step.
    #[test]
    fn prop_remember_keeps_present_value(
        key in key_strategy(),
        stored in value_strategy(),
        candidate in value_strategy()
    ) {
        let cache = new_cache();

        let (read, computed) = tokio_test::block_on(async {
            cache.set_text(&key, &stored, NO_EXPIRY).await.unwrap();
            let computed = Cell::new(false);
            let read = cache
                .remember(&key, || async {
                    computed.set(true);
                    cache.set_text(&key, &candidate, NO_EXPIRY).await?;
                    Ok(())
                })
                .await
                .unwrap();
            (read, computed.get())
        });

        prop_assert!(!computed);
        prop_assert_eq!(read, stored.into_bytes());
    }
}
