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

use super::BloomFilter;
use super::ConcurrentBloomFilter;
use super::bits::BitArray;
use crate::error::Error;

/// Smallest capacity a filter can be requested with.
pub const MIN_CAPACITY: u64 = 1;
/// Largest capacity a filter can be requested with.
pub const MAX_CAPACITY: u64 = 1 << 40;
/// Smallest number of hash probes per key.
pub const MIN_NUM_HASHES: u16 = 1;
/// Largest number of hash probes per key.
pub const MAX_NUM_HASHES: u16 = u16::MAX;

/// Builder for creating [`BloomFilter`] and [`ConcurrentBloomFilter`] instances.
///
/// Provides two construction modes:
/// - [`with_size()`](Self::with_size): Specify the requested capacity and number of hash probes
/// - [`with_accuracy()`](Self::with_accuracy): Derive both from a target item count and false
///   positive rate
///
/// The requested capacity is rounded up to the next power of two. The choice between
/// [`build()`](Self::build) and [`build_concurrent()`](Self::build_concurrent) decides whether the
/// filter carries a reader-writer lock.
#[derive(Debug, Clone)]
pub struct BloomFilterBuilder {
    requested_capacity: u64,
    num_hashes: u16,
}

impl BloomFilterBuilder {
    /// Creates a builder with manual size specification.
    ///
    /// The filter allocates `requested_capacity` rounded up to a power of two bytes of storage and
    /// reports that rounded value as its [`capacity()`](BloomFilter::capacity).
    ///
    /// # Examples
    ///
    /// ```
    /// # use bloomset::bloom::BloomFilterBuilder;
    /// let filter = BloomFilterBuilder::with_size(1000, 3).build();
    /// assert_eq!(filter.capacity(), 1024);
    /// assert_eq!(filter.num_hashes(), 3);
    /// ```
    pub fn with_size(requested_capacity: u64, num_hashes: u16) -> Self {
        BloomFilterBuilder {
            requested_capacity,
            num_hashes,
        }
    }

    /// Creates a builder sized for a target accuracy.
    ///
    /// Uses [`suggest_num_bits()`](Self::suggest_num_bits) as the requested capacity and
    /// [`suggest_num_hashes_from_accuracy()`](Self::suggest_num_hashes_from_accuracy) as the
    /// number of probes.
    ///
    /// # Panics
    ///
    /// Panics if `max_items` is 0 or `fpp` is not in (0.0, 1.0].
    ///
    /// # Examples
    ///
    /// ```
    /// # use bloomset::bloom::BloomFilterBuilder;
    /// let filter = BloomFilterBuilder::with_accuracy(1000, 0.01).build();
    /// assert_eq!(filter.capacity(), 16384);
    /// assert_eq!(filter.num_hashes(), 7);
    /// ```
    pub fn with_accuracy(max_items: u64, fpp: f64) -> Self {
        assert!(max_items > 0, "max_items must be greater than 0");
        assert!(
            fpp > 0.0 && fpp <= 1.0,
            "fpp must be between 0.0 and 1.0 (inclusive of 1.0)"
        );

        let requested_capacity = Self::suggest_num_bits(max_items, fpp);
        let num_hashes = Self::suggest_num_hashes_from_accuracy(max_items, requested_capacity);
        Self::with_size(requested_capacity, num_hashes)
    }

    /// Builds an unsynchronized filter.
    ///
    /// # Panics
    ///
    /// Panics if the configuration is invalid, see [`try_build()`](Self::try_build).
    pub fn build(self) -> BloomFilter {
        match self.try_build() {
            Ok(filter) => filter,
            Err(err) => panic!("invalid bloom filter configuration: {err}"),
        }
    }

    /// Builds a filter guarded by a reader-writer lock.
    ///
    /// # Panics
    ///
    /// Panics if the configuration is invalid, see [`try_build()`](Self::try_build).
    pub fn build_concurrent(self) -> ConcurrentBloomFilter {
        match self.try_build_concurrent() {
            Ok(filter) => filter,
            Err(err) => panic!("invalid bloom filter configuration: {err}"),
        }
    }

    /// Builds an unsynchronized filter, validating the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidArgument`](crate::error::ErrorKind::InvalidArgument) if any of:
    /// - the requested capacity is below [`MIN_CAPACITY`] or above [`MAX_CAPACITY`]
    /// - the number of hashes is below [`MIN_NUM_HASHES`]
    /// - the bit region cannot be allocated
    pub fn try_build(self) -> Result<BloomFilter, Error> {
        self.validate()?;
        self.allocate(false)
    }

    /// Builds a lock-guarded filter, validating the configuration.
    ///
    /// # Errors
    ///
    /// Same conditions as [`try_build()`](Self::try_build).
    pub fn try_build_concurrent(self) -> Result<ConcurrentBloomFilter, Error> {
        self.validate()?;
        self.allocate(true).map(ConcurrentBloomFilter::from)
    }

    fn validate(&self) -> Result<(), Error> {
        if self.requested_capacity < MIN_CAPACITY {
            return Err(
                Error::invalid_argument(format!("capacity must be at least {MIN_CAPACITY}"))
                    .with_context("requested_capacity", self.requested_capacity),
            );
        }
        if self.requested_capacity > MAX_CAPACITY {
            return Err(
                Error::invalid_argument(format!("capacity must not exceed {MAX_CAPACITY}"))
                    .with_context("requested_capacity", self.requested_capacity),
            );
        }
        if self.num_hashes < MIN_NUM_HASHES {
            return Err(Error::invalid_argument(format!(
                "num_hashes must be at least {MIN_NUM_HASHES}"
            ))
            .with_context("num_hashes", self.num_hashes));
        }
        Ok(())
    }

    fn allocate(&self, concurrent: bool) -> Result<BloomFilter, Error> {
        let capacity = self.requested_capacity.next_power_of_two();
        let log2_capacity = capacity.trailing_zeros();
        let bits = BitArray::try_new(capacity).map_err(|err| {
            Error::invalid_argument(format!("cannot allocate bit region: {err}"))
                .with_context("capacity", capacity)
        })?;

        event!(
            Level::DEBUG,
            requested_capacity = self.requested_capacity,
            capacity,
            log2_capacity,
            num_hashes = self.num_hashes,
            concurrent,
            "bloom filter created"
        );

        Ok(BloomFilter {
            log2_capacity,
            num_hashes: self.num_hashes,
            num_items: 0,
            bits,
        })
    }

    /// Suggests optimal number of bits given max items and target FPP.
    ///
    /// Formula: `m = -n * ln(p) / (ln(2)^2)`
    /// where n = max_items, p = fpp
    ///
    /// # Examples
    ///
    /// ```
    /// # use bloomset::bloom::BloomFilterBuilder;
    /// let bits = BloomFilterBuilder::suggest_num_bits(1000, 0.01);
    /// assert!(bits > 9000 && bits < 10000); // ~9586 bits
    /// ```
    pub fn suggest_num_bits(max_items: u64, fpp: f64) -> u64 {
        let n = max_items as f64;
        let ln2_squared = std::f64::consts::LN_2 * std::f64::consts::LN_2;

        let bits = (-n * fpp.ln() / ln2_squared).ceil() as u64;
        bits.clamp(MIN_CAPACITY, MAX_CAPACITY)
    }

    /// Suggests optimal number of hash functions given max items and bit count.
    ///
    /// Formula: `k = (m/n) * ln(2)`, rounded up
    ///
    /// # Examples
    ///
    /// ```
    /// # use bloomset::bloom::BloomFilterBuilder;
    /// assert_eq!(BloomFilterBuilder::suggest_num_hashes_from_accuracy(1000, 10000), 7);
    /// ```
    pub fn suggest_num_hashes_from_accuracy(max_items: u64, num_bits: u64) -> u16 {
        let m = num_bits as f64;
        let n = max_items as f64;

        // Ceil to avoid selecting too few hashes.
        clamp_num_hashes((m / n * std::f64::consts::LN_2).ceil())
    }

    /// Suggests optimal number of hash functions from target FPP.
    ///
    /// Formula: `k = -log2(p)`, rounded up
    ///
    /// An `fpp` outside (0.0, 1.0], including NaN, yields [`MIN_NUM_HASHES`] or, for 0.0,
    /// [`MAX_NUM_HASHES`].
    ///
    /// # Examples
    ///
    /// ```
    /// # use bloomset::bloom::BloomFilterBuilder;
    /// assert_eq!(BloomFilterBuilder::suggest_num_hashes_from_fpp(0.01), 7);
    /// ```
    pub fn suggest_num_hashes_from_fpp(fpp: f64) -> u16 {
        clamp_num_hashes((-fpp.log2()).ceil())
    }
}

/// Clamps a suggested hash count into the supported range; NaN maps to the minimum.
fn clamp_num_hashes(k: f64) -> u16 {
    if k.is_nan() {
        return MIN_NUM_HASHES;
    }
    k.clamp(f64::from(MIN_NUM_HASHES), f64::from(MAX_NUM_HASHES)) as u16
}
