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
use crate::error::Error;

mod sealed {
    pub trait Sealed {}

    impl Sealed for super::BloomFilter {}
    impl Sealed for super::ConcurrentBloomFilter {}
}

/// A filter that can be passed to `merge`.
///
/// Implemented by [`BloomFilter`], whose bits are folded into the target, and by
/// [`ConcurrentBloomFilter`], which is always refused: it may be written to while the merge reads
/// it, and locking two filters at once is not attempted. Merge a
/// [`snapshot()`](ConcurrentBloomFilter::snapshot) of it instead.
///
/// This trait is sealed and cannot be implemented outside of this crate.
pub trait MergeSource: sealed::Sealed {
    /// Capacity of the source filter.
    fn source_capacity(&self) -> u64;

    /// Number of hash probes of the source filter.
    fn source_num_hashes(&self) -> u16;

    /// The filter whose bits can be read without synchronization, if any.
    fn source_filter(&self) -> Option<&BloomFilter>;
}

impl MergeSource for BloomFilter {
    fn source_capacity(&self) -> u64 {
        self.capacity()
    }

    fn source_num_hashes(&self) -> u16 {
        self.num_hashes()
    }

    fn source_filter(&self) -> Option<&BloomFilter> {
        Some(self)
    }
}

impl MergeSource for ConcurrentBloomFilter {
    fn source_capacity(&self) -> u64 {
        self.fixed_capacity()
    }

    fn source_num_hashes(&self) -> u16 {
        self.num_hashes()
    }

    fn source_filter(&self) -> Option<&BloomFilter> {
        None
    }
}

/// Validates a merge into a filter with the given parameters and returns the source bits.
///
/// Checks capacity, then number of hashes, then whether the source is lock-free.
pub(super) fn checked_source<S: MergeSource + ?Sized>(
    capacity: u64,
    num_hashes: u16,
    other: &S,
) -> Result<&BloomFilter, Error> {
    let result = if capacity != other.source_capacity() {
        Err(Error::capacity_mismatch(capacity, other.source_capacity()))
    } else if num_hashes != other.source_num_hashes() {
        Err(Error::num_hashes_mismatch(num_hashes, other.source_num_hashes()))
    } else {
        other.source_filter().ok_or_else(Error::merge_concurrent)
    };

    if let Err(err) = &result {
        event!(Level::WARN, error = %err, "bloom filter merge rejected");
    }
    result
}
