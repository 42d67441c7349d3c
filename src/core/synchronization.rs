// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright © 2021-2022 Adrian <adrian.eddy at gmail>

use serde::{ Serialize, Deserialize };

use crate::pose_timeline::{ PoseTimeline, RecordingInterval };
use crate::{ Result, TrackerError };

/// Recording and video durations further apart than this are likely not the same clip.
pub const MAX_DURATION_MISMATCH_S: f64 = 2.0;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoInfo {
    pub duration_s: f64,
    pub gps_tag: Option<(f64, f64)>, // (lat, lon) from the video container
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchMethod {
    Duration,
    Location,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecordingMatch {
    pub index: usize,
    pub interval: RecordingInterval,
    /// Seconds for `Duration`, summed absolute degrees for `Location`
    pub mismatch: f64,
    pub method: MatchMethod,
}
impl RecordingMatch {
    pub fn is_suspicious(&self) -> bool {
        self.method == MatchMethod::Duration && self.mismatch > MAX_DURATION_MISMATCH_S
    }
}

/// Recording whose length is closest to the video duration. First one in log order wins a tie.
pub fn match_by_duration(intervals: &[RecordingInterval], video_duration: f64) -> Option<RecordingMatch> {
    let mut best: Option<RecordingMatch> = None;
    for (index, interval) in intervals.iter().enumerate() {
        let diff = (interval.duration() - video_duration).abs();
        log::debug!("Recording #{index}: {:.3} s, video: {video_duration:.3} s, diff: {diff:.3}", interval.duration());
        if best.map_or(true, |b| diff < b.mismatch) {
            best = Some(RecordingMatch { index, interval: *interval, mismatch: diff, method: MatchMethod::Duration });
        }
    }
    best
}

/// Recording whose first pose is closest to the GPS tag of the video.
pub fn match_by_location(intervals: &[RecordingInterval], timeline: &PoseTimeline, gps_tag: (f64, f64)) -> Option<RecordingMatch> {
    let mut best: Option<RecordingMatch> = None;
    for (index, interval) in intervals.iter().enumerate() {
        let Some(pose) = timeline.nearest(interval.start) else { continue; };
        let diff = (pose.latitude - gps_tag.0).abs() + (pose.longitude - gps_tag.1).abs();
        if best.map_or(true, |b| diff < b.mismatch) {
            best = Some(RecordingMatch { index, interval: *interval, mismatch: diff, method: MatchMethod::Location });
        }
    }
    best
}

/// Picks the recording that belongs to the video. The GPS tag, when present, takes priority over the duration.
pub fn find_recording(intervals: &[RecordingInterval], timeline: &PoseTimeline, video: &VideoInfo) -> Result<RecordingMatch> {
    let found = video.gps_tag
        .and_then(|tag| match_by_location(intervals, timeline, tag))
        .or_else(|| match_by_duration(intervals, video.duration_s))
        .ok_or(TrackerError::EmptyResult("recording interval matching the video"))?;

    log::info!("Matched recording #{} ({:.3}..{:.3}) by {:?}, mismatch: {:.3}", found.index, found.interval.start, found.interval.end, found.method, found.mismatch);
    if found.is_suspicious() {
        log::warn!("Video and recording durations differ by {:.2} s, the log might not belong to this video", found.mismatch);
    }
    Ok(found)
}

/// Maps video playback positions to the time axis of the pose timeline.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncOffset {
    /// Absolute log time at video position 0
    pub video_start_time: Option<f64>,
    /// Added to every queried height
    pub height_difference: f64,
}

impl SyncOffset {
    pub fn apply_match(&mut self, m: &RecordingMatch) {
        self.video_start_time = Some(m.interval.start);
    }

    /// Manual start given in seconds from the beginning of the log, clamped to the log duration.
    /// Returns the value actually used.
    pub fn set_manual_start(&mut self, seconds_from_log_start: f64, timeline: &PoseTimeline) -> Result<f64> {
        let first = timeline.first_timestamp().ok_or(TrackerError::EmptyResult("log start time"))?;
        let v = seconds_from_log_start.clamp(0.0, timeline.duration());
        self.video_start_time = Some(first + v);
        Ok(v)
    }

    pub fn manual_start(&self, timeline: &PoseTimeline) -> Option<f64> {
        Some(self.video_start_time? - timeline.first_timestamp()?)
    }

    /// Log time for a playback position. Without a start time the video is assumed to start with the log.
    pub fn log_time(&self, video_position: f64, timeline: &PoseTimeline) -> Option<f64> {
        let start = self.video_start_time.or_else(|| timeline.first_timestamp())?;
        Some(video_position + start)
    }
}
