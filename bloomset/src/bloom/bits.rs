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

use std::collections::TryReserveError;

/// Byte-backed bit storage addressed by raw probe positions.
///
/// The length in bytes is a power of two, so a probe position maps to a byte slot with a mask
/// instead of a modulo: the position is first turned into a byte index (`/ 8`), wrapped into the
/// region (`& (len - 1)`), and the low three bits select the bit within that byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct BitArray {
    bytes: Box<[u8]>,
    slot_mask: u64,
}

impl BitArray {
    /// Allocates a zeroed region of `num_bytes` bytes, reporting allocation failure instead of
    /// aborting.
    ///
    /// `num_bytes` must be a power of two.
    pub(super) fn try_new(num_bytes: u64) -> Result<Self, TryReserveError> {
        debug_assert!(num_bytes.is_power_of_two());
        // A length beyond the address space fails the reservation below.
        let len = usize::try_from(num_bytes).unwrap_or(usize::MAX);
        let mut bytes = Vec::new();
        bytes.try_reserve_exact(len)?;
        bytes.resize(len, 0u8);
        Ok(BitArray {
            bytes: bytes.into_boxed_slice(),
            slot_mask: num_bytes - 1,
        })
    }

    #[cfg(test)]
    pub(super) fn new(num_bytes: u64) -> Self {
        Self::try_new(num_bytes).expect("test region must allocate")
    }

    /// Number of bytes in the region.
    pub(super) fn num_bytes(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Maps a probe position to its `(slot, bit offset)` pair.
    #[inline]
    pub(super) fn locate(&self, position: u64) -> (usize, u8) {
        let slot = (position >> 3) & self.slot_mask;
        let offset = (position & 7) as u8;
        (slot as usize, offset)
    }

    #[inline]
    pub(super) fn set_bit(&mut self, position: u64) {
        let (slot, offset) = self.locate(position);
        self.bytes[slot] |= 1 << offset;
    }

    #[inline]
    pub(super) fn get_bit(&self, position: u64) -> bool {
        let (slot, offset) = self.locate(position);
        self.bytes[slot] & (1 << offset) != 0
    }

    /// ORs `other` into `self`. Both regions must have the same length.
    pub(super) fn union(&mut self, other: &BitArray) {
        debug_assert_eq!(self.bytes.len(), other.bytes.len());
        for (byte, other_byte) in self.bytes.iter_mut().zip(other.bytes.iter()) {
            *byte |= *other_byte;
        }
    }

    pub(super) fn clear(&mut self) {
        self.bytes.fill(0);
    }

    /// Number of bits set to 1.
    pub(super) fn count_ones(&self) -> u64 {
        self.bytes.iter().map(|b| u64::from(b.count_ones())).sum()
    }

    pub(super) fn is_clear(&self) -> bool {
        self.bytes.iter().all(|&b| b == 0)
    }
}
