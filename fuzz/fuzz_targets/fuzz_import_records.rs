// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2026 Jonathan D.A. Jewell
//! Arbitrary JSON documents through import record conversion

#![no_main]

use libfuzzer_sys::fuzz_target;
use wreathkeeper::import;

fuzz_target!(|data: &[u8]| {
    let Ok(value) = serde_json::from_slice::<serde_json::Value>(data) else {
        return;
    };
    let valid = import::candidates(value.clone()).iter().filter(|c| import::is_valid(c)).count();
    let records = import::records(value);
    assert!(records.len() <= valid);
    for w in &records {
        assert!(w.hashtags.iter().all(|t| *t == t.to_lowercase()));
    }
});
