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

use parking_lot::RwLock;

use super::BloomFilter;
use super::MergeSource;
use crate::codec;
use crate::codec::KeyBytes;
use crate::error::Error;
use crate::hash::base_hash;

/// A [`BloomFilter`] guarded by a reader-writer lock.
///
/// Every operation takes `&self`, so the filter can be shared across threads (for example behind
/// an `Arc`). Adds, batch adds, merges and resets hold the write lock for their whole duration;
/// tests and statistics hold the read lock, so concurrent tests proceed in parallel. A batch add
/// is a single critical section.
///
/// Keys are hashed before the lock is taken; only the bit updates and lookups run under it.
///
/// # Examples
///
/// ```
/// # use std::sync::Arc;
/// # use bloomset::bloom::BloomFilterBuilder;
/// let filter = Arc::new(BloomFilterBuilder::with_size(1024, 3).build_concurrent());
///
/// std::thread::scope(|s| {
///     for t in 0..4_u32 {
///         let filter = &filter;
///         s.spawn(move || {
///             filter.add_u32(t);
///         });
///     }
/// });
///
/// assert_eq!(filter.len(), 4);
/// assert!(filter.test_u32(3));
/// ```
#[derive(Debug)]
pub struct ConcurrentBloomFilter {
    /// Copy of the immutable capacity, readable without the lock.
    capacity: u64,
    num_hashes: u16,
    inner: RwLock<BloomFilter>,
}

impl From<BloomFilter> for ConcurrentBloomFilter {
    fn from(filter: BloomFilter) -> Self {
        ConcurrentBloomFilter {
            capacity: filter.capacity(),
            num_hashes: filter.num_hashes(),
            inner: RwLock::new(filter),
        }
    }
}

impl ConcurrentBloomFilter {
    /// Adds a byte key. See [`BloomFilter::add()`].
    pub fn add(&self, data: &[u8]) -> &Self {
        let h = base_hash(data);
        self.inner.write().add_hashed(h);
        self
    }

    /// Adds a string key.
    pub fn add_str(&self, s: &str) -> &Self {
        self.add(codec::str_bytes(s))
    }

    /// Adds a `u16` key.
    pub fn add_u16(&self, n: u16) -> &Self {
        self.add(&codec::encode_u16(n))
    }

    /// Adds a `u32` key.
    pub fn add_u32(&self, n: u32) -> &Self {
        self.add(&codec::encode_u32(n))
    }

    /// Adds a `u64` key.
    pub fn add_u64(&self, n: u64) -> &Self {
        self.add(&codec::encode_u64(n))
    }

    /// Adds any key with a canonical byte encoding.
    pub fn insert<K: KeyBytes + ?Sized>(&self, key: &K) -> &Self {
        let h = key.with_key_bytes(base_hash);
        self.inner.write().add_hashed(h);
        self
    }

    /// Adds every key of `keys` under a single write lock.
    ///
    /// Other callers observe either none or all of the batch. The keys are drained and hashed
    /// before the lock is taken, so `keys` may itself read this filter.
    pub fn add_batch<I>(&self, keys: I) -> &Self
    where
        I: IntoIterator,
        I::Item: AsRef<[u8]>,
    {
        let hashes: Vec<[u64; 4]> = keys.into_iter().map(|k| base_hash(k.as_ref())).collect();
        self.add_hashed_batch(&hashes)
    }

    /// Adds every `u16` of `nums` under a single write lock.
    pub fn add_u16_batch(&self, nums: &[u16]) -> &Self {
        self.add_batch(nums.iter().map(|&n| codec::encode_u16(n)))
    }

    /// Adds every `u32` of `nums` under a single write lock.
    pub fn add_u32_batch(&self, nums: &[u32]) -> &Self {
        self.add_batch(nums.iter().map(|&n| codec::encode_u32(n)))
    }

    /// Adds every `u64` of `nums` under a single write lock.
    pub fn add_u64_batch(&self, nums: &[u64]) -> &Self {
        self.add_batch(nums.iter().map(|&n| codec::encode_u64(n)))
    }

    fn add_hashed_batch(&self, hashes: &[[u64; 4]]) -> &Self {
        let mut filter = self.inner.write();
        for &h in hashes {
            filter.add_hashed(h);
        }
        self
    }

    /// Tests whether a byte key is possibly in the set. See [`BloomFilter::test()`].
    pub fn test(&self, data: &[u8]) -> bool {
        let h = base_hash(data);
        self.inner.read().test_hashed(h)
    }

    /// Tests a string key.
    pub fn test_str(&self, s: &str) -> bool {
        self.test(codec::str_bytes(s))
    }

    /// Tests a `u16` key.
    pub fn test_u16(&self, n: u16) -> bool {
        self.test(&codec::encode_u16(n))
    }

    /// Tests a `u32` key.
    pub fn test_u32(&self, n: u32) -> bool {
        self.test(&codec::encode_u32(n))
    }

    /// Tests a `u64` key.
    pub fn test_u64(&self, n: u64) -> bool {
        self.test(&codec::encode_u64(n))
    }

    /// Tests any key with a canonical byte encoding.
    pub fn contains<K: KeyBytes + ?Sized>(&self, key: &K) -> bool {
        let h = key.with_key_bytes(base_hash);
        self.inner.read().test_hashed(h)
    }

    /// Merges an unsynchronized filter into this one under the write lock.
    ///
    /// The parameters are checked before the lock is taken; on error nothing is modified.
    ///
    /// # Errors
    ///
    /// Same conditions as [`BloomFilter::merge()`]. In particular, merging a
    /// `ConcurrentBloomFilter` (including `self`) is refused with
    /// [`ErrorKind::Unsupported`](crate::error::ErrorKind::Unsupported).
    pub fn merge<S: MergeSource + ?Sized>(&self, other: &S) -> Result<(), Error> {
        let source = super::merge::checked_source(self.capacity, self.num_hashes, other)?;
        self.inner.write().union_bits(source);
        Ok(())
    }

    /// Clears all bits and the insertion count under the write lock.
    pub fn reset(&self) {
        self.inner.write().reset();
    }

    /// Returns a copy of the current state, taken under the read lock.
    ///
    /// The copy is an unsynchronized [`BloomFilter`] and can be merged into other filters.
    pub fn snapshot(&self) -> BloomFilter {
        self.inner.read().clone()
    }

    /// Consumes the guard and returns the inner filter.
    pub fn into_inner(self) -> BloomFilter {
        self.inner.into_inner()
    }

    /// Returns the capacity. See [`BloomFilter::capacity()`].
    pub fn capacity(&self) -> u64 {
        self.inner.read().capacity()
    }

    /// Returns log2 of the capacity.
    pub fn log2_capacity(&self) -> u32 {
        self.inner.read().log2_capacity()
    }

    /// Returns the number of hash probes per key.
    pub fn num_hashes(&self) -> u16 {
        self.num_hashes
    }

    /// Returns the number of add calls since construction or the last reset.
    pub fn len(&self) -> u64 {
        self.inner.read().len()
    }

    /// Returns whether no bit is set.
    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    /// Returns the number of bits set to 1.
    pub fn bits_used(&self) -> u64 {
        self.inner.read().bits_used()
    }

    /// Always `true`.
    pub fn is_concurrent(&self) -> bool {
        true
    }

    /// Estimates the current false positive probability under the read lock.
    /// See [`BloomFilter::false_positive_rate()`].
    pub fn false_positive_rate(&self) -> f64 {
        self.inner.read().false_positive_rate()
    }

    pub(super) fn fixed_capacity(&self) -> u64 {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::mpsc;
    use std::time::Duration;

    use crate::bloom::BloomFilter;
    use crate::bloom::BloomFilterBuilder;
    use crate::error::ErrorKind;

    #[test]
    fn test_add_and_test() {
        let filter = BloomFilterBuilder::with_size(1024, 3).build_concurrent();
        filter.add(b"bloom").add_str("filter").add_u16(1);

        assert!(filter.test(b"bloom"));
        assert!(filter.test_str("filter"));
        assert!(filter.test_u16(1));
        assert!(filter.contains("filter"));
        assert_eq!(filter.len(), 3);
    }

    #[test]
    fn test_matches_unsynchronized_state() {
        let concurrent = BloomFilterBuilder::with_size(256, 4).build_concurrent();
        let mut plain = BloomFilter::new(256, 4);

        concurrent.add_u32_batch(&[1, 2, 3]).add_u64(9);
        plain.add_u32_batch(&[1, 2, 3]).add_u64(9);
        assert_eq!(concurrent.snapshot(), plain);
        assert_eq!(concurrent.into_inner(), plain);
    }

    #[test]
    fn test_merge_into_concurrent() {
        let target = BloomFilterBuilder::with_size(1024, 3).build_concurrent();
        let mut source = BloomFilter::new(1024, 3);
        source.add_str("from source");

        target.merge(&source).unwrap();
        assert!(target.test_str("from source"));
        assert_eq!(target.len(), 0);
    }

    #[test]
    fn test_merge_self_is_refused() {
        let filter = BloomFilterBuilder::with_size(1024, 3).build_concurrent();
        filter.add_str("x");
        let err = filter.merge(&filter).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unsupported);
    }

    #[test]
    fn test_merge_mismatch_checked_first() {
        let target = BloomFilterBuilder::with_size(1024, 3).build_concurrent();
        let other = BloomFilterBuilder::with_size(512, 3).build_concurrent();
        let err = target.merge(&other).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Incompatible);
    }

    #[test]
    fn test_add_batch_keys_may_read_filter() {
        let filter = Arc::new(BloomFilterBuilder::with_size(1024, 3).build_concurrent());
        filter.add_str("seen");

        let (tx, rx) = mpsc::channel();
        let worker = Arc::clone(&filter);
        std::thread::spawn(move || {
            let keys = ["seen", "new"];
            worker.add_batch(keys.iter().filter(|k| !worker.test_str(k)));
            let _ = tx.send(());
        });

        rx.recv_timeout(Duration::from_secs(10))
            .expect("add_batch did not finish while its keys read the filter");
        assert!(filter.test_str("new"));
        assert_eq!(filter.len(), 2);
    }

    #[test]
    fn test_typed_batches_count_each_key() {
        let filter = BloomFilterBuilder::with_size(1024, 3).build_concurrent();
        filter
            .add_u16_batch(&[17, 21])
            .add_u32_batch(&[22])
            .add_u64_batch(&[]);
        assert_eq!(filter.len(), 3);
        assert!(filter.test_u16(21));
        assert!(filter.test_u32(22));
    }

    #[test]
    fn test_reset() {
        let filter = BloomFilterBuilder::with_size(64, 2).build_concurrent();
        filter.add_u64_batch(&[1, 2, 3]);
        assert!(!filter.is_empty());

        filter.reset();
        assert!(filter.is_empty());
        assert_eq!(filter.len(), 0);
        assert!(!filter.test_u64(1));
        assert_eq!(filter.false_positive_rate(), 0.0);
    }

    #[test]
    fn test_parallel_writers_and_readers() {
        let filter = Arc::new(BloomFilterBuilder::with_size(1 << 14, 3).build_concurrent());

        std::thread::scope(|s| {
            for t in 0..8_u64 {
                let filter = &filter;
                s.spawn(move || {
                    for i in 0..500_u64 {
                        let key = t * 1_000 + i;
                        filter.add_u64(key);
                        assert!(filter.test_u64(key));
                    }
                });
            }
        });

        assert_eq!(filter.len(), 8 * 500);
        for t in 0..8_u64 {
            for i in 0..500_u64 {
                assert!(filter.test_u64(t * 1_000 + i));
            }
        }
    }
}
