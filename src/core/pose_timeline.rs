// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright © 2021-2022 Adrian <adrian.eddy at gmail>

use std::collections::BTreeMap;
use chrono::NaiveDateTime;
use serde::{ Serialize, Deserialize };

use crate::util::{ seconds_to_us, us_to_seconds };

pub type TimePose = BTreeMap<i64, PoseSample>; // key is timestamp_us

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PoseSample {
    pub timestamp: f64, // unix seconds, or seconds since the recording start when rebased
    pub wall_clock: NaiveDateTime,
    pub height: f64, // meters
    pub yaw: f64, // radians
    pub pitch: f64,
    pub roll: f64,
    pub latitude: f64,
    pub longitude: f64,
}
impl PoseSample {
    pub fn rotation(&self) -> (f64, f64, f64) { (self.yaw, self.pitch, self.roll) }
    pub fn position(&self) -> (f64, f64) { (self.latitude, self.longitude) }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecordingInterval {
    pub start: f64,
    pub end: f64,
}
impl RecordingInterval {
    pub fn new(start: f64, end: f64) -> Self { Self { start, end } }
    pub fn duration(&self) -> f64 { self.end - self.start }
}

/// Time ordered pose samples of one imported log.
/// Built once per import and never modified afterwards.
#[derive(Default, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PoseTimeline {
    samples: TimePose,
}

impl PoseTimeline {
    pub fn new() -> Self { Self::default() }

    pub fn from_samples<I: IntoIterator<Item = PoseSample>>(samples: I) -> Self {
        let mut timeline = Self::new();
        for s in samples {
            timeline.insert(s);
        }
        timeline
    }

    // Duplicate timestamps: last write wins
    pub(crate) fn insert(&mut self, sample: PoseSample) {
        self.samples.insert(seconds_to_us(sample.timestamp), sample);
    }

    pub fn len(&self) -> usize { self.samples.len() }
    pub fn is_empty(&self) -> bool { self.samples.is_empty() }
    pub fn iter(&self) -> impl Iterator<Item = &PoseSample> { self.samples.values() }
    pub fn get(&self, timestamp: f64) -> Option<&PoseSample> { self.samples.get(&seconds_to_us(timestamp)) }

    pub fn first_timestamp(&self) -> Option<f64> { self.samples.keys().next().copied().map(us_to_seconds) }
    pub fn last_timestamp (&self) -> Option<f64> { self.samples.keys().next_back().copied().map(us_to_seconds) }
    pub fn duration(&self) -> f64 {
        match (self.first_timestamp(), self.last_timestamp()) {
            (Some(a), Some(b)) => b - a,
            _ => 0.0
        }
    }

    /// Sample closest to `time`. Linear scan, sampling rate is not assumed to be constant.
    /// On a tie the earlier sample wins.
    pub fn nearest(&self, time: f64) -> Option<&PoseSample> {
        let mut best = None;
        let mut best_diff = f64::INFINITY;
        for sample in self.samples.values() {
            let d = (time - sample.timestamp).abs();
            if d < best_diff {
                best_diff = d;
                best = Some(sample);
            }
        }
        best
    }

    /// Samples in `[interval.start, interval.end]`, with time shifted so that `interval.start` becomes 0.
    pub fn rebased(&self, interval: &RecordingInterval) -> Self {
        Self::from_samples(
            self.samples.range(seconds_to_us(interval.start)..)
                .map(|(_, s)| s)
                .take_while(|s| s.timestamp <= interval.end)
                .map(|s| PoseSample { timestamp: s.timestamp - interval.start, ..s.clone() })
        )
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub fn sample(timestamp: f64, height: f64) -> PoseSample {
        PoseSample {
            timestamp,
            wall_clock: chrono::DateTime::from_timestamp_micros(seconds_to_us(timestamp)).unwrap().naive_utc(),
            height,
            yaw: 0.0,
            pitch: 0.0,
            roll: 0.0,
            latitude: 55.0,
            longitude: 10.0,
        }
    }

    fn abc() -> PoseTimeline {
        PoseTimeline::from_samples([sample(10.0, 1.0), sample(20.0, 2.0), sample(30.0, 3.0)])
    }

    #[test]
    fn nearest_picks_closest() {
        assert_eq!(abc().nearest(24.0).unwrap().height, 2.0);
        assert_eq!(abc().nearest(-100.0).unwrap().height, 1.0);
        assert_eq!(abc().nearest(1000.0).unwrap().height, 3.0);
    }

    #[test]
    fn nearest_tie_goes_to_earlier_sample() {
        assert_eq!(abc().nearest(25.0).unwrap().height, 2.0);
    }

    #[test]
    fn empty_timeline_has_no_nearest() {
        assert!(PoseTimeline::new().nearest(0.0).is_none());
        assert_eq!(PoseTimeline::new().duration(), 0.0);
    }

    #[test]
    fn duplicate_timestamps_last_write_wins() {
        let t = PoseTimeline::from_samples([sample(10.0, 1.0), sample(10.0, 7.0)]);
        assert_eq!(t.len(), 1);
        assert_eq!(t.get(10.0).unwrap().height, 7.0);
    }

    #[test]
    fn rebase_keeps_interval_only() {
        let t = PoseTimeline::from_samples((0..10).map(|i| sample(100.0 + i as f64, i as f64)));
        let r = t.rebased(&RecordingInterval::new(103.0, 106.0));
        assert_eq!(r.len(), 4);
        assert_eq!(r.first_timestamp(), Some(0.0));
        assert_eq!(r.last_timestamp(), Some(3.0));
        assert_eq!(r.nearest(0.0).unwrap().height, 3.0);
        assert_eq!(r.nearest(0.0).unwrap().wall_clock, t.get(103.0).unwrap().wall_clock);
    }
}
