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

use std::collections::HashSet;

use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;

const DICT: &[u8] = b"qwertyuiopasdfghjklzxcvbnmQWERTYUIOPASDFGHJKLZXCVBNM";

/// Returns a deterministic generator so failures can be replayed.
pub fn rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

/// Returns a random ASCII-letter string of `len` characters.
pub fn random_string(rng: &mut StdRng, len: usize) -> String {
    (0..len)
        .map(|_| DICT[rng.random_range(0..DICT.len())] as char)
        .collect()
}

/// Returns `count` distinct random strings of `len` characters, none of which is in `exclude`.
pub fn distinct_strings(
    rng: &mut StdRng,
    count: usize,
    len: usize,
    exclude: &HashSet<String>,
) -> HashSet<String> {
    let mut keys = HashSet::with_capacity(count);
    while keys.len() < count {
        let key = random_string(rng, len);
        if !exclude.contains(&key) {
            keys.insert(key);
        }
    }
    keys
}

/// Routes filter events to the test output; repeated calls are no-ops.
#[allow(dead_code)] // not every test binary logs
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}
