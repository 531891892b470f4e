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

//! Bloom filter for probabilistic set membership testing.
//!
//! A Bloom filter answers whether a key is a member of a set with either "possibly in set" or
//! "definitely not in set". False positive matches are possible, false negatives are not.
//!
//! # Properties
//!
//! - **No false negatives**: once a key was added, `test()` returns `true` until `reset()`
//! - **Possible false positives**: `test()` may return `true` for keys never added
//! - **Fixed size**: the storage is a power-of-two region allocated once and never resized
//! - **Raw insertion count**: `len()` counts add calls, duplicates included
//!
//! # Usage
//!
//! ```rust
//! use bloomset::bloom::BloomFilter;
//!
//! let mut filter = BloomFilter::new(1024, 3);
//!
//! filter
//!     .add(b"bloom")
//!     .add_str("filter")
//!     .add_u64(42)
//!     .add_u32_batch(&[22, 31, 109]);
//!
//! assert!(filter.test(b"bloom"));
//! assert!(filter.test_u32(31));
//! assert!(!filter.test_str("zzz-not-added")); // false, barring a collision
//!
//! println!("Capacity: {}", filter.capacity());
//! println!("Inserted: {}", filter.len());
//! println!("Est. FPP: {:.6}%", filter.false_positive_rate() * 100.0);
//! ```
//!
//! # Sharing Between Threads
//!
//! [`BloomFilterBuilder::build_concurrent()`] returns a [`ConcurrentBloomFilter`], which owns a
//! reader-writer lock and exposes the same operations on `&self`. The plain [`BloomFilter`]
//! carries no lock at all; its mutating methods take `&mut self`.
//!
//! ```rust
//! # use bloomset::bloom::BloomFilterBuilder;
//! let filter = BloomFilterBuilder::with_size(1 << 16, 3).build_concurrent();
//! filter.add_str("shared");
//! assert!(filter.test_str("shared"));
//! ```
//!
//! # Merging
//!
//! Filters with the same capacity and number of hashes can be merged with a bitwise OR. A
//! concurrent filter is never read as a merge source; merge its snapshot instead:
//!
//! ```rust
//! # use bloomset::bloom::BloomFilter;
//! # use bloomset::bloom::BloomFilterBuilder;
//! # use bloomset::error::ErrorKind;
//! let mut target = BloomFilter::new(1024, 3);
//! let shared = BloomFilterBuilder::with_size(1024, 3).build_concurrent();
//! shared.add_str("b");
//!
//! let err = target.merge(&shared).unwrap_err();
//! assert_eq!(err.kind(), ErrorKind::Unsupported);
//!
//! target.merge(&shared.snapshot()).unwrap();
//! assert!(target.test_str("b"));
//! ```
//!
//! # Implementation Details
//!
//! - Hashes each key with MurmurHash3 x64 128 (seed 0) twice, the second time with a `1` byte
//!   appended, yielding four 64-bit base hashes
//! - Derives the `k` probe positions from those by double hashing (Kirsch-Mitzenmacher)
//! - Stores bits in bytes; a probe selects byte `(position / 8) & (capacity - 1)` and bit
//!   `position & 7`
//! - The capacity doubles as `m` in the false positive estimate, although the region holds
//!   `8 * capacity` addressable bits, so the estimate is conservative
//!
//! # References
//!
//! - Bloom, Burton H. (1970). "Space/time trade-offs in hash coding with allowable errors"
//! - Kirsch and Mitzenmacher (2008). "Less Hashing, Same Performance: Building a Better Bloom
//!   Filter"

mod bits;
mod builder;
mod concurrent;
mod merge;
mod sketch;

pub use self::builder::BloomFilterBuilder;
pub use self::builder::MAX_CAPACITY;
pub use self::builder::MAX_NUM_HASHES;
pub use self::builder::MIN_CAPACITY;
pub use self::builder::MIN_NUM_HASHES;
pub use self::concurrent::ConcurrentBloomFilter;
pub use self::merge::MergeSource;
pub use self::sketch::BloomFilter;
