// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2026 Jonathan D.A. Jewell
//! Arbitrary bytes through the encoding-tolerant JSON reader

#![no_main]

use libfuzzer_sys::fuzz_target;
use wreathkeeper::encoding;

fuzz_target!(|data: &[u8]| {
    let candidates = encoding::candidates_for(data);
    if let Ok(doc) = encoding::parse_bytes(data, &candidates) {
        // Whatever decoded must name an encoding from the list it was given
        assert!(candidates.contains(&doc.encoding));
    }
});
