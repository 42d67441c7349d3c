// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright © 2021-2022 Adrian <adrian.eddy at gmail>

pub mod pose_timeline;
pub mod drone_log;
pub mod synchronization;
pub mod camera;
pub mod geo;
pub mod annotations;
pub mod session;
pub mod util;

pub use pose_timeline::{ PoseSample, PoseTimeline, RecordingInterval };
pub use drone_log::{ DroneLog, ParseMode, ParseOptions, LogConverter };
pub use synchronization::{ VideoInfo, SyncOffset, RecordingMatch, MatchMethod };
pub use camera::CameraModel;
pub use geo::{ UtmPoint, UtmZone };
pub use session::{ TrackerSession, PoseQuery };

pub type Result<T> = std::result::Result<T, TrackerError>;

#[derive(thiserror::Error, Debug)]
pub enum TrackerError {
    #[error("Missing required column(s) {missing:?} in {source_name}")]
    Schema { missing: Vec<String>, source_name: String },
    #[error("Row {row}: {reason}")]                 RowParse { row: usize, reason: String },
    #[error("Cannot determine {0}")]                EmptyResult(&'static str),
    #[error("Not configured: {0}")]                 NotConfigured(&'static str),
    #[error("External tool failed: {0}")]           ExternalTool(String),
    #[error("Ray does not intersect the ground")]   NoGroundIntersection,
    #[error("Coordinate out of range: {0}")]        OutOfRange(String),
    #[error("Import cancelled")]                    Cancelled,
    #[error("IO error: {0:?}")]                     IOError(#[from] std::io::Error),
    #[error("CSV error: {0:?}")]                    CsvError(#[from] csv::Error),
    #[error("JSON error: {0:?}")]                   JsonError(#[from] serde_json::Error),
}
