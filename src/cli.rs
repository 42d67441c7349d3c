// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright © 2022 Adrian <adrian.eddy at gmail>

use argh::FromArgs;
use porpoisetracker_core::{ annotations, LogConverter, ParseOptions, PoseQuery, RecordingInterval, RecordingMatch, SyncOffset, TrackerSession, VideoInfo };
use porpoisetracker_core::annotations::Rgba;
use porpoisetracker_core::camera::horizon::HorizonLine;
use serde::Serialize;
use std::error::Error;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use indicatif::{ ProgressBar, ProgressState, ProgressStyle };

use crate::util::parse_pair;

/** Porpoise Tracker
Georeferencing of drone video pixels using the flight log
*/
#[derive(FromArgs)]
pub struct Opts {
    /// flight log, CSV or raw (with --raw)
    #[argh(positional)]
    pub log: String,

    /// convert the log with the external tool before parsing
    #[argh(switch)]
    pub raw: bool,

    /// converter command for raw logs, eg. "wine drone_log/TXTlogToCSVtool"
    #[argh(option)]
    pub converter: Option<String>,

    /// CSV file with horizontal_fov and vertical_fov columns (degrees)
    #[argh(option)]
    pub fov_file: Option<String>,

    /// field of view in degrees, eg. "82.1x52.3"
    #[argh(option)]
    pub fov: Option<String>,

    /// camera calibration JSON with camera_matrix and distortion_coeffs
    #[argh(option, short = 'c')]
    pub calibration: Option<String>,

    /// video resolution, eg. "3840x2160"
    #[argh(option, short = 's')]
    pub video_size: Option<String>,

    /// video duration in seconds, used to find the recording in the log
    #[argh(option, short = 'd')]
    pub duration: Option<f64>,

    /// GPS tag of the video, "lat,lon"
    #[argh(option)]
    pub gps: Option<String>,

    /// keep only the recording matching the video, positions are relative to its start
    #[argh(switch, short = 'w')]
    pub windowed: bool,

    /// manual video start, seconds from the beginning of the log
    #[argh(option)]
    pub start: Option<f64>,

    /// added to every drone height, in meters
    #[argh(option, default = "0.0")]
    pub height_difference: f64,

    /// video position in seconds, default: 0
    #[argh(option, short = 't', default = "0.0")]
    pub position: f64,

    /// video pixel "x,y" to project, can be repeated
    #[argh(option, short = 'p')]
    pub pixel: Vec<String>,

    /// measure the line between the first two pixels instead of single points
    #[argh(switch, short = 'l')]
    pub line: bool,

    /// append the measurements to this annotation CSV
    #[argh(option, short = 'o')]
    pub annotations: Option<String>,

    /// marking name used in the annotation file, default: "marking"
    #[argh(option, default = "String::from(\"marking\")")]
    pub name: String,

    /// print the horizon reference curves at the position
    #[argh(switch)]
    pub horizon: bool,

    /// write the log to this file
    #[argh(option)]
    pub log_file: Option<String>,

    /// debug output
    #[argh(switch, short = 'v')]
    pub verbose: bool,
}

#[derive(Serialize)]
struct Report {
    source: String,
    samples: usize,
    recordings: Vec<RecordingInterval>,
    matched_recording: Option<RecordingMatch>,
    sync: SyncOffset,
    skipped_rows: Vec<usize>,
    pose: Option<PoseQuery>,
    readout: Option<String>,
    points: Vec<annotations::MeasurementData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    horizon: Option<Vec<HorizonLine>>,
}

fn progress_bar() -> ProgressBar {
    let pb = ProgressBar::new(1000);
    if let Ok(sty) = ProgressStyle::with_template("[{bar:50.cyan/blue}] {percent:>3}% {eta:11} {msg}") {
        pb.set_style(sty
            .with_key("eta", |state: &ProgressState, w: &mut dyn std::fmt::Write| { let _ = write!(w, "ETA {:.1}s", state.eta().as_secs_f64()); })
            .progress_chars("#>-"));
    }
    pb
}

pub fn run(opts: Opts) -> Result<(), Box<dyn Error>> {
    log::debug!("Porpoise Tracker {}", crate::util::get_version());
    let session = TrackerSession::new();

    if let Some(cmd) = &opts.converter {
        let mut parts = cmd.split_whitespace().map(str::to_owned);
        let program = parts.next().ok_or("empty converter command")?;
        *session.converter.write() = LogConverter { program, args: parts.collect() };
    }

    if let Some(path) = &opts.fov_file { session.load_fov_file(Path::new(path))?; }
    if let Some(fov) = &opts.fov {
        let (h, v) = parse_pair(fov, 'x')?;
        session.set_fov(h, v);
    }
    if let Some(path) = &opts.calibration { session.load_calibration(Path::new(path))?; }
    if let Some(size) = &opts.video_size {
        let (w, h) = parse_pair(size, 'x')?;
        session.set_video_size(w, h)?;
    }

    if opts.duration.is_some() || opts.gps.is_some() {
        let gps_tag = opts.gps.as_deref().map(|x| parse_pair(x, ',')).transpose()?;
        session.set_video_info(VideoInfo { duration_s: opts.duration.unwrap_or_default(), gps_tag });
    }
    let options = if opts.windowed { session.windowed_options()? } else { ParseOptions::default() };

    let pb = progress_bar();
    pb.set_message(opts.log.clone());
    let progress = |fraction: f64| pb.set_position((fraction * 1000.0) as u64);
    let cancel = Arc::new(AtomicBool::new(false));
    let log_path = Path::new(&opts.log);
    let log = if opts.raw {
        session.import_raw_log(log_path, &options, progress, cancel)?
    } else {
        session.import_log(log_path, &options, progress, cancel)?
    };
    pb.finish_and_clear();

    if let Some(start) = opts.start {
        let used = session.set_manual_start(start)?;
        if used != start {
            log::warn!("Manual start {start} s clamped to {used} s");
        }
    }
    session.set_height_difference(opts.height_difference);

    let pose = session.get_pose_at(opts.position).map_err(|e| log::warn!("{e}")).ok();

    let pixels = opts.pixel.iter().map(|p| parse_pair(p, ',')).collect::<Result<Vec<_>, _>>()?;
    let video_size = session.camera.read().video_size();
    let mut points = Vec::new();
    if !pixels.is_empty() {
        let display_size = video_size.ok_or("--video-size is required to project pixels")?;
        let video_name = Path::new(&opts.log).file_stem().map(|x| x.to_string_lossy().to_string()).unwrap_or_default();
        let gestures: Vec<((f64, f64), (f64, f64))> = if opts.line {
            if pixels.len() < 2 { return Err("--line needs two pixels".into()); }
            vec![(pixels[0], pixels[1])]
        } else {
            pixels.iter().map(|p| (*p, *p)).collect()
        };
        for (press, release) in gestures {
            let marking = session.add_marking(&opts.name, Rgba::default(), press, release, display_size, opts.position, &video_name)?;
            points.push(marking.data);
        }
        if let Some(path) = &opts.annotations {
            let path = Path::new(path);
            if path.exists() {
                let added = session.markings.read().len();
                let (loaded, skipped) = session.load_annotations(path)?;
                if !skipped.is_empty() {
                    log::warn!("Skipped unreadable lines {skipped:?} of {}", path.display());
                }
                // Keep existing rows first
                session.markings.write().rotate_left(added);
                log::debug!("Appending {added} markings to {loaded} existing ones");
            }
            session.save_annotations(path)?;
        }
    }

    let horizon = if opts.horizon { Some(session.horizon_at(opts.position)?) } else { None };

    let report = Report {
        source: log.source.clone(),
        samples: log.timeline.len(),
        recordings: log.recordings.clone(),
        matched_recording: log.matched_recording,
        sync: session.sync.read().clone(),
        skipped_rows: log.skipped_rows.clone(),
        readout: session.pose_readout(opts.position),
        pose,
        points,
        horizon,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
