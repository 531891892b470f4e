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

//! Hash derivation for filter probes.
//!
//! Every key is hashed twice with MurmurHash3 x64 128: once over the key itself and once over the
//! key followed by the byte `1`. The four resulting 64-bit words are combined with double hashing
//! (Kirsch-Mitzenmacher) to synthesize any number of probe positions.
//!
//! The probe positions are part of the filter's observable state: two filters only agree on
//! membership if they derive the same positions, so the seed and the combination below must stay
//! bit-exact.

use std::hash::Hasher;

mod murmurhash;

pub(crate) use self::murmurhash::MurmurHash3X64128;

/// Seed of the 128-bit hash. Filters built with different seeds cannot be merged, so this is
/// fixed for the whole crate.
pub(crate) const DEFAULT_SEED: u64 = 0;

/// Byte appended to the key to obtain the second pair of base hashes.
const EXTENSION_BYTE: u8 = 1;

/// Computes the four base hash values `[v1, v2, v3, v4]` of `data`.
///
/// `(v1, v2)` is the 128-bit digest of `data`, `(v3, v4)` the digest of `data` extended with a
/// single `1` byte. The hasher state is reused so the key is only scanned once.
pub(crate) fn base_hash(data: &[u8]) -> [u64; 4] {
    let mut hasher = MurmurHash3X64128::default();
    hasher.write(data);
    let (v1, v2) = hasher.finish128();
    hasher.write(&[EXTENSION_BYTE]);
    let (v3, v4) = hasher.finish128();
    [v1, v2, v3, v4]
}

/// Returns the raw position of the `i`-th probe.
///
/// ```text
/// position = h[i & 1] + i * h[2 + (((i + (i & 1)) & 3) / 2)]
/// ```
///
/// The additive term alternates between `h[0]` and `h[1]` while the multiplier cycles through
/// `h[2]` and `h[3]`. Arithmetic wraps modulo 2^64.
#[inline]
pub(crate) fn probe_position(h: &[u64; 4], i: u64) -> u64 {
    let base = h[(i & 1) as usize];
    let step = h[2 + (((i + (i & 1)) & 3) / 2) as usize];
    base.wrapping_add(i.wrapping_mul(step))
}

/// Iterates over the first `num_hashes` probe positions for the given base hashes.
#[inline]
pub(crate) fn probe_positions(h: [u64; 4], num_hashes: u16) -> impl Iterator<Item = u64> {
    (0..u64::from(num_hashes)).map(move |i| probe_position(&h, i))
}
