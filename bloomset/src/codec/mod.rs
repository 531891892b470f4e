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

//! Canonical byte encodings for filter keys.
//!
//! The filter hashes bytes. Integer keys are encoded with a fixed width in little-endian order
//! and strings are hashed through a borrowed view of their UTF-8 bytes, so the same logical value
//! always produces the same probes on every platform.

/// Encodes a `u16` key as 2 little-endian bytes.
#[inline]
pub fn encode_u16(n: u16) -> [u8; 2] {
    n.to_le_bytes()
}

/// Encodes a `u32` key as 4 little-endian bytes.
#[inline]
pub fn encode_u32(n: u32) -> [u8; 4] {
    n.to_le_bytes()
}

/// Encodes a `u64` key as 8 little-endian bytes.
#[inline]
pub fn encode_u64(n: u64) -> [u8; 8] {
    n.to_le_bytes()
}

/// Returns a borrowed view of the UTF-8 bytes of `s`. No copy is made.
#[inline]
pub fn str_bytes(s: &str) -> &[u8] {
    s.as_bytes()
}

/// A key type with a canonical byte encoding.
///
/// The encoded bytes are only lent to `f` for the duration of the call and are never retained.
///
/// # Examples
///
/// ```
/// # use bloomset::codec::KeyBytes;
/// let len = 7_u32.with_key_bytes(|bytes| bytes.len());
/// assert_eq!(len, 4);
/// assert!("abc".with_key_bytes(|bytes| bytes == b"abc"));
/// ```
pub trait KeyBytes {
    /// Calls `f` with the canonical encoding of `self`.
    fn with_key_bytes<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R;
}

impl KeyBytes for [u8] {
    fn with_key_bytes<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
        f(self)
    }
}

impl<const N: usize> KeyBytes for [u8; N] {
    fn with_key_bytes<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
        f(self.as_slice())
    }
}

impl KeyBytes for Vec<u8> {
    fn with_key_bytes<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
        f(self.as_slice())
    }
}

impl KeyBytes for str {
    fn with_key_bytes<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
        f(str_bytes(self))
    }
}

impl KeyBytes for String {
    fn with_key_bytes<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
        f(str_bytes(self))
    }
}

impl KeyBytes for u16 {
    fn with_key_bytes<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
        f(&encode_u16(*self))
    }
}

impl KeyBytes for u32 {
    fn with_key_bytes<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
        f(&encode_u32(*self))
    }
}

impl KeyBytes for u64 {
    fn with_key_bytes<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
        f(&encode_u64(*self))
    }
}

impl<T: KeyBytes + ?Sized> KeyBytes for &T {
    fn with_key_bytes<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
        (**self).with_key_bytes(f)
    }
}
