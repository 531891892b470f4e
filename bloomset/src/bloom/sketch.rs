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

use tracing::Level;
use tracing::event;

use super::BloomFilterBuilder;
use super::MergeSource;
use super::bits::BitArray;
use crate::codec;
use crate::codec::KeyBytes;
use crate::error::Error;
use crate::hash::base_hash;
use crate::hash::probe_positions;

/// A Bloom filter for probabilistic set membership testing.
///
/// Provides fast membership queries with:
/// - No false negatives (added keys always test `true` until [`reset()`](Self::reset))
/// - A false positive rate governed by capacity, probe count and insertions
/// - Constant space usage, fixed at construction
///
/// Mutating operations take `&mut self`; share the filter across threads through
/// [`ConcurrentBloomFilter`](super::ConcurrentBloomFilter) instead.
///
/// Use [`BloomFilterBuilder`] or [`BloomFilter::new()`] to construct instances.
#[derive(Debug, Clone, PartialEq)]
pub struct BloomFilter {
    /// log2 of the capacity, kept for diagnostics
    pub(super) log2_capacity: u32,
    /// Number of probes per key (k)
    pub(super) num_hashes: u16,
    /// Number of add calls since construction or the last reset (n)
    pub(super) num_items: u64,
    /// Storage; its byte length is the reported capacity (m)
    pub(super) bits: BitArray,
}

impl BloomFilter {
    /// Creates an unsynchronized filter.
    ///
    /// Shorthand for `BloomFilterBuilder::with_size(requested_capacity, num_hashes).build()`.
    ///
    /// # Panics
    ///
    /// Panics if `requested_capacity` or `num_hashes` is 0, or if `requested_capacity` exceeds
    /// [`MAX_CAPACITY`](super::MAX_CAPACITY).
    ///
    /// # Examples
    ///
    /// ```
    /// # use bloomset::bloom::BloomFilter;
    /// let mut filter = BloomFilter::new(1024, 3);
    /// filter.add(b"bloom");
    /// assert!(filter.test(b"bloom"));
    /// ```
    pub fn new(requested_capacity: u64, num_hashes: u16) -> Self {
        BloomFilterBuilder::with_size(requested_capacity, num_hashes).build()
    }

    /// Adds a byte key to the filter.
    ///
    /// Every call counts as one insertion, whether or not the key was already present.
    /// Returns the filter so calls can be chained.
    ///
    /// # Examples
    ///
    /// ```
    /// # use bloomset::bloom::BloomFilter;
    /// let mut filter = BloomFilter::new(1024, 3);
    /// filter.add(b"bloom").add_str("filter").add_u64(4);
    /// assert_eq!(filter.len(), 3);
    /// ```
    pub fn add(&mut self, data: &[u8]) -> &mut Self {
        self.add_hashed(base_hash(data));
        self
    }

    /// Adds a string key, hashing its UTF-8 bytes in place.
    pub fn add_str(&mut self, s: &str) -> &mut Self {
        self.add(codec::str_bytes(s))
    }

    /// Adds a `u16` key in its little-endian encoding.
    pub fn add_u16(&mut self, n: u16) -> &mut Self {
        self.add(&codec::encode_u16(n))
    }

    /// Adds a `u32` key in its little-endian encoding.
    pub fn add_u32(&mut self, n: u32) -> &mut Self {
        self.add(&codec::encode_u32(n))
    }

    /// Adds a `u64` key in its little-endian encoding.
    pub fn add_u64(&mut self, n: u64) -> &mut Self {
        self.add(&codec::encode_u64(n))
    }

    /// Adds any key with a canonical byte encoding.
    ///
    /// `filter.insert(&42_u32)` is equivalent to `filter.add_u32(42)`.
    pub fn insert<K: KeyBytes + ?Sized>(&mut self, key: &K) -> &mut Self {
        self.add_hashed(key.with_key_bytes(base_hash));
        self
    }

    /// Adds every key of `keys` in order.
    ///
    /// The resulting bits equal those of calling [`add()`](Self::add) once per key, and the
    /// insertion count grows by the number of keys.
    ///
    /// # Examples
    ///
    /// ```
    /// # use bloomset::bloom::BloomFilter;
    /// let mut filter = BloomFilter::new(1024, 3);
    /// filter.add_batch(["a", "b", "c"]);
    /// assert!(filter.test(b"b"));
    /// assert_eq!(filter.len(), 3);
    /// ```
    pub fn add_batch<I>(&mut self, keys: I) -> &mut Self
    where
        I: IntoIterator,
        I::Item: AsRef<[u8]>,
    {
        for key in keys {
            self.add_hashed(base_hash(key.as_ref()));
        }
        self
    }

    /// Adds every `u16` of `nums`.
    pub fn add_u16_batch(&mut self, nums: &[u16]) -> &mut Self {
        self.add_batch(nums.iter().map(|&n| codec::encode_u16(n)))
    }

    /// Adds every `u32` of `nums`.
    pub fn add_u32_batch(&mut self, nums: &[u32]) -> &mut Self {
        self.add_batch(nums.iter().map(|&n| codec::encode_u32(n)))
    }

    /// Adds every `u64` of `nums`.
    pub fn add_u64_batch(&mut self, nums: &[u64]) -> &mut Self {
        self.add_batch(nums.iter().map(|&n| codec::encode_u64(n)))
    }

    /// Tests whether a byte key is possibly in the set.
    ///
    /// Returns:
    /// - `true`: the key was **possibly** added (or is a false positive)
    /// - `false`: the key was **definitely not** added
    pub fn test(&self, data: &[u8]) -> bool {
        self.test_hashed(base_hash(data))
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
        self.test_hashed(key.with_key_bytes(base_hash))
    }

    /// Merges another filter into this one via bitwise OR (union).
    ///
    /// After merging, this filter recognizes keys from either filter (plus any false positives
    /// from either). The insertion count of `other` is not carried over.
    ///
    /// # Errors
    ///
    /// Nothing is modified when an error is returned:
    /// - [`ErrorKind::Incompatible`](crate::error::ErrorKind::Incompatible) if the capacities or
    ///   the numbers of hashes differ
    /// - [`ErrorKind::Unsupported`](crate::error::ErrorKind::Unsupported) if `other` is a
    ///   [`ConcurrentBloomFilter`](super::ConcurrentBloomFilter); merge its
    ///   [`snapshot()`](super::ConcurrentBloomFilter::snapshot) instead
    ///
    /// # Examples
    ///
    /// ```
    /// # use bloomset::bloom::BloomFilter;
    /// let mut f1 = BloomFilter::new(1024, 3);
    /// let mut f2 = BloomFilter::new(1024, 3);
    /// f1.add_str("a");
    /// f2.add_str("b");
    ///
    /// f1.merge(&f2).unwrap();
    /// assert!(f1.test_str("a"));
    /// assert!(f1.test_str("b"));
    /// ```
    pub fn merge<S: MergeSource + ?Sized>(&mut self, other: &S) -> Result<(), Error> {
        let source = super::merge::checked_source(self.capacity(), self.num_hashes, other)?;
        self.union_bits(source);
        Ok(())
    }

    /// Resets the filter to its initial empty state.
    ///
    /// Clears all bits and the insertion count while preserving capacity and number of hashes.
    pub fn reset(&mut self) {
        self.bits.clear();
        self.num_items = 0;
        event!(Level::DEBUG, capacity = self.capacity(), "bloom filter reset");
    }

    /// Returns the capacity: the size of the storage region, a power of two.
    ///
    /// This is the `m` of [`false_positive_rate()`](Self::false_positive_rate). The storage holds
    /// 8 addressable bits per unit of capacity.
    pub fn capacity(&self) -> u64 {
        self.bits.num_bytes()
    }

    /// Returns log2 of the capacity.
    pub fn log2_capacity(&self) -> u32 {
        self.log2_capacity
    }

    /// Returns the number of bytes of storage. Equal to [`capacity()`](Self::capacity).
    pub fn num_bytes(&self) -> u64 {
        self.bits.num_bytes()
    }

    /// Returns the number of hash probes per key.
    pub fn num_hashes(&self) -> u16 {
        self.num_hashes
    }

    /// Returns the number of add calls since construction or the last reset.
    ///
    /// Duplicate keys are counted each time they are added.
    pub fn len(&self) -> u64 {
        self.num_items
    }

    /// Returns whether no bit is set.
    pub fn is_empty(&self) -> bool {
        self.bits.is_clear()
    }

    /// Returns the number of bits set to 1.
    pub fn bits_used(&self) -> u64 {
        self.bits.count_ones()
    }

    /// Always `false`: this filter carries no lock.
    pub fn is_concurrent(&self) -> bool {
        false
    }

    /// Checks if two filters can be merged: same capacity and number of hashes.
    pub fn is_compatible(&self, other: &BloomFilter) -> bool {
        self.capacity() == other.capacity() && self.num_hashes == other.num_hashes
    }

    /// Estimates the current false positive probability.
    ///
    /// Formula: `(1 - e^(-k * n / m))^k`
    /// where k = [`num_hashes()`](Self::num_hashes), n = [`len()`](Self::len) and
    /// m = [`capacity()`](Self::capacity).
    ///
    /// Since `n` counts duplicate insertions, the estimate leans high when keys repeat.
    pub fn false_positive_rate(&self) -> f64 {
        let k = f64::from(self.num_hashes);
        let n = self.num_items as f64;
        let m = self.capacity() as f64;

        let exponent = -(k * n) / m;
        (1.0 - exponent.exp()).powf(k)
    }

    pub(super) fn add_hashed(&mut self, h: [u64; 4]) {
        for position in probe_positions(h, self.num_hashes) {
            self.bits.set_bit(position);
        }
        self.num_items += 1;
    }

    pub(super) fn test_hashed(&self, h: [u64; 4]) -> bool {
        probe_positions(h, self.num_hashes).all(|position| self.bits.get_bit(position))
    }

    pub(super) fn union_bits(&mut self, other: &BloomFilter) {
        self.bits.union(&other.bits);
        event!(
            Level::DEBUG,
            capacity = self.capacity(),
            num_hashes = self.num_hashes,
            "bloom filter merged"
        );
    }
}
