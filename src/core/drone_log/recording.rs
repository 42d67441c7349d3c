// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright © 2022 Adrian <adrian.eddy at gmail>

use crate::pose_timeline::RecordingInterval;

/// Interprets the `CUSTOM.isVideo` cell. Converted logs write `Recording` or leave it empty,
/// native CSV exports may contain a boolean.
pub fn is_recording_flag(value: &str) -> bool {
    let v = value.trim();
    !(v.is_empty()
        || v.eq_ignore_ascii_case("false")
        || v.eq_ignore_ascii_case("no")
        || v.eq_ignore_ascii_case("off")
        || v == "0")
}

/// Coalesces consecutive recording rows into intervals.
/// An interval opens on the first recording row and closes on the first non-recording row after it,
/// taking that row's timestamp as the end.
#[derive(Default, Debug)]
pub struct RecordingDetector {
    open_since: Option<f64>,
    last_timestamp: Option<f64>,
    intervals: Vec<RecordingInterval>,
}

impl RecordingDetector {
    pub fn new() -> Self { Self::default() }

    pub fn update(&mut self, timestamp: f64, is_recording: bool) {
        match (self.open_since, is_recording) {
            (None, true) => self.open_since = Some(timestamp),
            (Some(start), false) => {
                self.intervals.push(RecordingInterval::new(start, timestamp));
                self.open_since = None;
            }
            _ => { }
        }
        self.last_timestamp = Some(timestamp);
    }

    /// A recording still running at the end of the log ends at the last seen timestamp.
    pub fn finish(mut self) -> Vec<RecordingInterval> {
        if let (Some(start), Some(last)) = (self.open_since, self.last_timestamp) {
            self.intervals.push(RecordingInterval::new(start, last));
        }
        self.intervals
    }
}
