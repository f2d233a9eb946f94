use proptest::prelude::*;

/// Strategy for generating ordered, distinct building identifiers
pub fn building_ids_strategy(max_len: usize) -> impl Strategy<Value = Vec<i64>> {
    prop::collection::btree_set(1i64..1_000_000, 0..max_len)
        .prop_map(|ids| ids.into_iter().collect())
}

/// Strategy for generating identifiers in arbitrary (unsorted, possibly repeated) order
pub fn raw_ids_strategy(max_len: usize) -> impl Strategy<Value = Vec<i64>> {
    prop::collection::vec(any::<i64>(), 0..max_len)
}

/// Strategy for generating valid batch sizes
pub fn batch_size_strategy() -> impl Strategy<Value = i64> {
    1i64..=64
}

/// Strategy for generating worker counts, including more workers than pipelines
pub fn worker_count_strategy() -> impl Strategy<Value = i64> {
    prop_oneof![Just(1i64), Just(2), Just(8), Just(32), 1i64..=16]
}
