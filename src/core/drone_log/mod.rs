// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright © 2021-2022 Adrian <adrian.eddy at gmail>

mod converter;
mod recording;
pub use converter::LogConverter;
pub use recording::{ RecordingDetector, is_recording_flag };

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{ AtomicBool, Ordering::SeqCst };
use chrono::NaiveDateTime;
use serde::{ Serialize, Deserialize };

use crate::pose_timeline::{ PoseSample, PoseTimeline, RecordingInterval };
use crate::synchronization::{ self, RecordingMatch, VideoInfo };
use crate::util::{ self, DEG2RAD };
use crate::{ Result, TrackerError };

pub const COL_UPDATE_TIME: &str = "CUSTOM.updateTime";
pub const COL_PITCH:       &str = "GIMBAL.pitch";
pub const COL_YAW:         &str = "GIMBAL.yaw";
pub const COL_ROLL:        &str = "GIMBAL.roll";
pub const COL_HEIGHT:      &str = "OSD.height [m]";
pub const COL_IS_VIDEO:    &str = "CUSTOM.isVideo";
pub const COL_LATITUDE:    &str = "OSD.latitude";
pub const COL_LONGITUDE:   &str = "OSD.longitude";

const PROGRESS_INTERVAL_ROWS: usize = 500;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum ParseMode {
    /// Keep every row, video start is found later by the synchronizer
    #[default]
    WholeLog,
    /// Keep only the recording matching the video, with time rebased to its start
    Windowed(VideoInfo),
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ParseOptions {
    pub mode: ParseMode,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DroneLog {
    pub source: String,
    pub timeline: PoseTimeline,
    /// Recordings in absolute log time, also in windowed mode
    pub recordings: Vec<RecordingInterval>,
    pub matched_recording: Option<RecordingMatch>,
    /// Timeline starts at 0 = start of the matched recording
    pub rebased: bool,
    /// Line numbers in the CSV file (header is line 1) of rows dropped because of malformed cells
    pub skipped_rows: Vec<usize>,
}

impl DroneLog {
    pub fn is_empty(&self) -> bool { self.timeline.is_empty() }
}

struct Columns {
    update_time: usize,
    pitch: usize,
    yaw: usize,
    roll: usize,
    height: usize,
    is_video: usize,
    latitude: usize,
    longitude: usize,
}

impl Columns {
    fn from_headers(headers: &csv::ByteRecord, source_name: &str) -> Result<Self> {
        let names: Vec<String> = headers.iter().map(|h| String::from_utf8_lossy(h).trim().to_owned()).collect();
        let mut missing = Vec::new();
        let mut find = |name: &str| -> usize {
            names.iter().position(|x| x == name).unwrap_or_else(|| {
                missing.push(name.to_owned());
                usize::MAX
            })
        };
        let columns = Self {
            update_time: find(COL_UPDATE_TIME),
            pitch:       find(COL_PITCH),
            yaw:         find(COL_YAW),
            roll:        find(COL_ROLL),
            height:      find(COL_HEIGHT),
            is_video:    find(COL_IS_VIDEO),
            latitude:    find(COL_LATITUDE),
            longitude:   find(COL_LONGITUDE),
        };
        if !missing.is_empty() {
            return Err(TrackerError::Schema { missing, source_name: source_name.to_owned() });
        }
        Ok(columns)
    }
}

/// `2021/06/01 12:00:00.300`, falling back to whole seconds.
pub fn parse_update_time(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    NaiveDateTime::parse_from_str(s, "%Y/%m/%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y/%m/%d %H:%M:%S"))
        .ok()
}

struct ParsedRow {
    sample: PoseSample,
    is_recording: bool,
}

fn cell<'a>(record: &'a csv::ByteRecord, idx: usize, name: &str, row: usize) -> Result<&'a str> {
    let bytes = record.get(idx).ok_or_else(|| TrackerError::RowParse { row, reason: format!("missing {name} cell") })?;
    std::str::from_utf8(bytes).map(str::trim).map_err(|_| TrackerError::RowParse { row, reason: format!("{name} is not valid text") })
}

fn parse_row(record: &csv::ByteRecord, columns: &Columns, row: usize) -> Result<Option<ParsedRow>> {
    let number = |idx: usize, name: &str| -> Result<f64> {
        let v = cell(record, idx, name, row)?;
        v.parse::<f64>().map_err(|_| TrackerError::RowParse { row, reason: format!("invalid {name} value {v:?}") })
    };

    let update_time = cell(record, columns.update_time, COL_UPDATE_TIME, row)?;
    if update_time.is_empty() {
        return Ok(None);
    }
    let wall_clock = parse_update_time(update_time)
        .ok_or_else(|| TrackerError::RowParse { row, reason: format!("invalid {COL_UPDATE_TIME} value {update_time:?}") })?;

    let sample = PoseSample {
        timestamp: util::us_to_seconds(wall_clock.and_utc().timestamp_micros()),
        wall_clock,
        height:    number(columns.height,    COL_HEIGHT)?,
        pitch:     number(columns.pitch,     COL_PITCH)? * DEG2RAD,
        yaw:       number(columns.yaw,       COL_YAW)? * DEG2RAD,
        roll:      number(columns.roll,      COL_ROLL)? * DEG2RAD,
        latitude:  number(columns.latitude,  COL_LATITUDE)?,
        longitude: number(columns.longitude, COL_LONGITUDE)?,
    };
    let is_recording = record.get(columns.is_video).map(|v| is_recording_flag(&String::from_utf8_lossy(v))).unwrap_or(false);

    Ok(Some(ParsedRow { sample, is_recording }))
}

pub fn parse_log_file<F: Fn(f64)>(path: &Path, options: &ParseOptions, progress_cb: F, cancel_flag: Arc<AtomicBool>) -> Result<DroneLog> {
    let data = std::fs::read(path)?;
    parse_log_data(&data, &util::path_to_str(path), options, progress_cb, cancel_flag)
}

/// Parses a CSV flight log. Malformed rows are logged and skipped, a missing required column fails the whole import.
/// `progress_cb` gets the processed fraction of the input every few hundred rows.
pub fn parse_log_data<F: Fn(f64)>(data: &[u8], source_name: &str, options: &ParseOptions, progress_cb: F, cancel_flag: Arc<AtomicBool>) -> Result<DroneLog> {
    let data = util::strip_null_bytes(data);
    let total_bytes = data.len().max(1) as f64;

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(&data[..]);

    let columns = Columns::from_headers(reader.byte_headers()?, source_name)?;

    let mut timeline = PoseTimeline::new();
    let mut detector = RecordingDetector::new();
    let mut skipped_rows = Vec::new();
    let mut record = csv::ByteRecord::new();
    let mut row = 0;

    if cancel_flag.load(SeqCst) { return Err(TrackerError::Cancelled); }

    while reader.read_byte_record(&mut record)? {
        row += 1;
        if row % PROGRESS_INTERVAL_ROWS == 0 {
            if cancel_flag.load(SeqCst) {
                log::info!("{source_name}: import cancelled at row {row}");
                return Err(TrackerError::Cancelled);
            }
            progress_cb(record.position().map(|p| p.byte()).unwrap_or_default() as f64 / total_bytes);
        }
        // Quoted cells may span lines, so report the line the record starts on
        let line = record.position().map(|p| p.line() as usize).unwrap_or(row + 1);
        match parse_row(&record, &columns, line) {
            Ok(Some(parsed)) => {
                detector.update(parsed.sample.timestamp, parsed.is_recording);
                timeline.insert(parsed.sample);
            }
            Ok(None) => {
                log::warn!("{source_name}: line {line} has no {COL_UPDATE_TIME}, skipping");
            }
            Err(e) => {
                log::warn!("{source_name}: {e}, skipping");
                skipped_rows.push(line);
            }
        }
    }

    let mut log = DroneLog {
        source: source_name.to_owned(),
        timeline,
        recordings: detector.finish(),
        matched_recording: None,
        rebased: false,
        skipped_rows,
    };
    log::info!("{source_name}: {} pose samples, {} recordings, {} rows skipped", log.timeline.len(), log.recordings.len(), log.skipped_rows.len());

    if let ParseMode::Windowed(video) = &options.mode {
        log.rebased = true;
        match synchronization::find_recording(&log.recordings, &log.timeline, video) {
            Ok(m) => {
                log.timeline = log.timeline.rebased(&m.interval);
                log.matched_recording = Some(m);
            }
            Err(e) => {
                log::warn!("{source_name}: {e}, pose timeline left empty");
                log.timeline = PoseTimeline::new();
            }
        }
    }

    progress_cb(1.0);
    Ok(log)
}
