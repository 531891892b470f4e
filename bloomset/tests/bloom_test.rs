// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! Bloom Filter Integration Tests
//!
//! These tests exercise the public API of BloomFilter and ConcurrentBloomFilter:
//! - Chained typed adds and membership tests
//! - No false negatives over large random key sets
//! - Concurrent writers and readers
//! - Empirical false positive ratio against the estimate
//! - Merge, batch and reset properties

mod common;

use std::collections::HashSet;
use std::sync::Arc;

use bloomset::bloom::BloomFilter;
use bloomset::bloom::BloomFilterBuilder;
use bloomset::error::ErrorKind;
use common::distinct_strings;
use common::init_logging;
use common::rng;
use googletest::assert_that;
use googletest::prelude::eq;
use googletest::prelude::ge;
use googletest::prelude::le;
use googletest::prelude::lt;
use googletest::prelude::near;

const STRING_LEN: usize = 30;

#[test]
fn test_chained_adds() {
    let mut filter = BloomFilter::new(1024, 3);
    filter
        .add(b"bloom")
        .add_str("filter")
        .add_u16(1)
        .add_u32(2)
        .add_u64(4)
        .add_u16_batch(&[17, 21, 38])
        .add_u32_batch(&[22, 31, 109])
        .add_u64_batch(&[35, 29, 91]);

    assert!(filter.test(b"bloom"));
    assert!(filter.test_str("filter"));
    assert!(filter.test_u16(1));
    assert!(filter.test_u16(17));
    assert!(filter.test_u32(2));
    assert!(filter.test_u32(22));
    assert!(filter.test_u64(4));
    assert!(filter.test_u64(35));
    assert_that!(filter.len(), eq(14_u64));

    assert!(!filter.test_str("zzz-not-added"));
}

#[test]
fn test_no_false_negatives() {
    let mut rng = rng(1);
    let keys = distinct_strings(&mut rng, 100_000, STRING_LEN, &HashSet::new());

    let mut filter = BloomFilter::new(100_000, 3);
    for key in &keys {
        filter.add_str(key);
    }

    assert_that!(filter.len(), eq(100_000_u64));
    for key in &keys {
        assert!(filter.test_str(key), "key {key} not found");
    }
}

#[test]
fn test_concurrent_writers_and_readers() {
    const THREADS: u64 = 10;
    const PER_THREAD: usize = 10_000;

    let filter = Arc::new(BloomFilterBuilder::with_size(100_000, 3).build_concurrent());

    let per_thread: Vec<HashSet<String>> = (0..THREADS)
        .map(|t| distinct_strings(&mut rng(100 + t), PER_THREAD, STRING_LEN, &HashSet::new()))
        .collect();

    std::thread::scope(|s| {
        for keys in &per_thread {
            let filter = Arc::clone(&filter);
            s.spawn(move || {
                for key in keys {
                    filter.add_str(key);
                    assert!(filter.test_str(key), "key {key} not found");
                }
            });
        }
    });

    assert_that!(filter.len(), eq(THREADS * PER_THREAD as u64));
    for key in per_thread.iter().flatten() {
        assert!(filter.test_str(key));
    }
}

#[test]
fn test_concurrent_batches_are_atomic() {
    let filter = Arc::new(BloomFilterBuilder::with_size(4096, 3).build_concurrent());

    std::thread::scope(|s| {
        for t in 0..4_u64 {
            let filter = Arc::clone(&filter);
            s.spawn(move || {
                let batch: Vec<u64> = (0..1_000).map(|i| t * 10_000 + i).collect();
                filter.add_u64_batch(&batch);
            });
        }
        // every observed count is a whole number of batches
        let observer = Arc::clone(&filter);
        s.spawn(move || {
            for _ in 0..1_000 {
                assert_that!(observer.len() % 1_000, eq(0_u64));
            }
        });
    });

    assert_that!(filter.len(), eq(4_000_u64));
}

#[test]
fn test_false_positive_ratio() {
    let mut rng = rng(7);
    let members = distinct_strings(&mut rng, 100_000, STRING_LEN, &HashSet::new());
    let non_members = distinct_strings(&mut rng, 10_000, STRING_LEN, &members);

    let mut filter = BloomFilter::new(100_000, 3);
    for key in &members {
        filter.add_str(key);
    }

    let false_positives = non_members.iter().filter(|k| filter.test_str(k)).count();
    let ratio = false_positives as f64 / non_members.len() as f64;

    // 2^17 bytes hold 2^20 bits: about 1.5% expected
    assert_that!(ratio, lt(0.05));
    // the estimate counts one bit per byte and stays above the measurement
    assert_that!(ratio, le(filter.false_positive_rate()));
}

#[test]
fn test_false_positive_rate_estimate() {
    let mut filter = BloomFilter::new(1024, 3);
    assert_that!(filter.false_positive_rate(), eq(0.0));

    let mut previous = 0.0;
    for i in 0..1_024_u64 {
        filter.add_u64(i);
        let rate = filter.false_positive_rate();
        assert_that!(rate, ge(previous));
        previous = rate;
    }

    // n = m: (1 - e^-3)^3
    let expected = (1.0 - (-3.0_f64).exp()).powi(3);
    assert_that!(filter.false_positive_rate(), near(expected, 1e-12));
}

#[test]
fn test_duplicates_inflate_count_only() {
    let mut once = BloomFilter::new(2048, 4);
    let mut twice = BloomFilter::new(2048, 4);
    once.add_str("key");
    twice.add_str("key").add_str("key");

    assert_that!(once.bits_used(), eq(twice.bits_used()));
    assert_that!(twice.len(), eq(2_u64));
    assert!(twice.false_positive_rate() > once.false_positive_rate());
}

#[test]
fn test_capacity_is_smallest_power_of_two() {
    for requested in (1..=4_100_u64).chain([65_535, 65_536, 65_537, 1_000_000]) {
        let filter = BloomFilter::new(requested, 1);
        let capacity = filter.capacity();
        assert!(capacity.is_power_of_two());
        assert!(capacity >= requested);
        assert!(capacity / 2 < requested, "requested {requested}, got {capacity}");
        assert_that!(1_u64 << filter.log2_capacity(), eq(capacity));
    }
}

#[test]
fn test_batch_equivalence() {
    let mut rng = rng(3);
    let keys: Vec<String> = distinct_strings(&mut rng, 500, 12, &HashSet::new())
        .into_iter()
        .collect();

    let mut batched = BloomFilter::new(4096, 5);
    batched.add_batch(&keys);
    let mut single = BloomFilter::new(4096, 5);
    for key in &keys {
        single.add(key.as_bytes());
    }
    assert_eq!(batched, single);

    let concurrent = BloomFilterBuilder::with_size(4096, 5).build_concurrent();
    concurrent.add_batch(&keys);
    assert_eq!(concurrent.snapshot(), batched);
}

#[test]
fn test_merge_monotonicity() {
    init_logging();

    let mut rng = rng(11);
    let keys_a = distinct_strings(&mut rng, 2_000, 16, &HashSet::new());
    let keys_b = distinct_strings(&mut rng, 2_000, 16, &keys_a);
    let probes = distinct_strings(&mut rng, 2_000, 16, &HashSet::new());

    let mut a = BloomFilter::new(8192, 4);
    let mut b = BloomFilter::new(8192, 4);
    keys_a.iter().for_each(|k| {
        a.add_str(k);
    });
    keys_b.iter().for_each(|k| {
        b.add_str(k);
    });

    let before: Vec<(&String, bool)> = probes
        .iter()
        .chain(&keys_a)
        .chain(&keys_b)
        .map(|k| (k, a.test_str(k) || b.test_str(k)))
        .collect();

    a.merge(&b).unwrap();

    for (key, was_present) in before {
        if was_present {
            assert!(a.test_str(key), "key {key} lost by merge");
        }
    }
    assert_that!(a.len(), eq(2_000_u64));
}

#[test]
fn test_merge_incompatibility_leaves_target_untouched() {
    init_logging();

    let mut target = BloomFilter::new(1024, 3);
    target.add_str("kept");
    let before = target.clone();

    let err = target.merge(&BloomFilter::new(512, 3)).unwrap_err();
    assert_that!(err.kind(), eq(ErrorKind::Incompatible));

    let err = target.merge(&BloomFilter::new(1024, 2)).unwrap_err();
    assert_that!(err.kind(), eq(ErrorKind::Incompatible));

    let concurrent = BloomFilterBuilder::with_size(1024, 3).build_concurrent();
    concurrent.add_str("other");
    let err = target.merge(&concurrent).unwrap_err();
    assert_that!(err.kind(), eq(ErrorKind::Unsupported));

    assert_eq!(target, before);
}

#[test]
fn test_reset_clears_state() {
    init_logging();

    let mut rng = rng(5);
    let keys = distinct_strings(&mut rng, 1_000, 10, &HashSet::new());
    let mut filter = BloomFilter::new(1024, 3);
    for key in &keys {
        filter.add_str(key);
    }

    filter.reset();
    assert_that!(filter.len(), eq(0_u64));
    assert_that!(filter.bits_used(), eq(0_u64));
    for key in &keys {
        assert!(!filter.test_str(key));
    }

    filter.add_str("again");
    assert!(filter.test_str("again"));
    assert_that!(filter.len(), eq(1_u64));
}
