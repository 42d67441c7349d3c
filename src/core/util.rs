// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright © 2022 Adrian <adrian.eddy at gmail>

use std::borrow::Cow;

pub const DEG2RAD: f64 = std::f64::consts::PI / 180.0;
pub const RAD2DEG: f64 = 180.0 / std::f64::consts::PI;

pub fn path_to_str(path: &std::path::Path) -> String {
    path.to_string_lossy().replace("\\", "/")
}

/// Logs from some drones are padded with NUL bytes, which breaks line-based parsing.
pub fn strip_null_bytes(data: &[u8]) -> Cow<'_, [u8]> {
    if data.contains(&0) {
        Cow::Owned(data.iter().copied().filter(|&b| b != 0).collect())
    } else {
        Cow::Borrowed(data)
    }
}

pub fn seconds_to_us(s: f64) -> i64 { (s * 1_000_000.0).round() as i64 }
pub fn us_to_seconds(us: i64) -> f64 { us as f64 / 1_000_000.0 }
