// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright © 2022 Adrian <adrian.eddy at gmail>

use std::io::{ Read, Write };
use std::path::Path;
use chrono::NaiveDateTime;
use serde::{ Serialize, Deserialize };

use crate::camera::Rotation;
use crate::geo::UtmPoint;
use crate::{ Result, TrackerError };

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Press and release closer than this (display pixels) is a point, otherwise a line.
pub const CLICK_RADIUS_PX: f64 = 5.0;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rgba {
    pub red: f64,
    pub green: f64,
    pub blue: f64,
    pub alpha: f64,
}
impl Default for Rgba {
    fn default() -> Self { Self { red: 1.0, green: 0.0, blue: 0.0, alpha: 1.0 } }
}

/// Pixel geometry in display coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Geometry {
    Point { x: f64, y: f64 },
    Line { x1: f64, y1: f64, x2: f64, y2: f64 },
}
impl Geometry {
    pub fn from_drag(press: (f64, f64), release: (f64, f64)) -> Self {
        let dist = (release.0 - press.0).hypot(release.1 - press.1);
        if dist < CLICK_RADIUS_PX {
            Self::Point { x: release.0, y: release.1 }
        } else {
            Self::Line { x1: press.0, y1: press.1, x2: release.0, y2: release.1 }
        }
    }
}

/// What was measured on the ground, and the drone state it was measured with.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MeasurementData {
    pub length: Option<f64>, // meters, lines only
    pub time: NaiveDateTime,
    pub latitude: f64,
    pub longitude: f64,
    pub point: UtmPoint,
    pub drone_height: f64,
    pub drone_rotation: Rotation,
    pub drone_position: (f64, f64),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Marking {
    pub name: String,
    pub color: Rgba,
    pub geometry: Geometry,
    pub display_size: (f64, f64),
    pub video_position_ns: i64,
    pub data: MeasurementData,
    pub video_name: String,
}

#[derive(Serialize, Deserialize, Debug)]
struct AnnotationRow {
    name: String,
    length: Option<f64>,
    time: String,
    lat: f64,
    lon: f64,
    easting: f64,
    northing: f64,
    zone: String,
    #[serde(rename = "drone height")] drone_height: f64,
    #[serde(rename = "drone yaw")]    drone_yaw: f64,
    #[serde(rename = "drone pitch")]  drone_pitch: f64,
    #[serde(rename = "drone roll")]   drone_roll: f64,
    #[serde(rename = "drone lat")]    drone_lat: f64,
    #[serde(rename = "drone lon")]    drone_lon: f64,
    x1: f64,
    y1: f64,
    x2: Option<f64>,
    y2: Option<f64>,
    width: f64,
    height: f64,
    #[serde(rename = "video position")] video_position: i64,
    red: f64,
    green: f64,
    blue: f64,
    alpha: f64,
    #[serde(rename = "video name")] video_name: String,
}

impl From<&Marking> for AnnotationRow {
    fn from(m: &Marking) -> Self {
        let (x1, y1, x2, y2) = match m.geometry {
            Geometry::Point { x, y } => (x, y, None, None),
            Geometry::Line { x1, y1, x2, y2 } => (x1, y1, Some(x2), Some(y2)),
        };
        let d = &m.data;
        Self {
            name: m.name.clone(),
            length: d.length,
            time: d.time.format(TIME_FORMAT).to_string(),
            lat: d.latitude,
            lon: d.longitude,
            easting: d.point.easting,
            northing: d.point.northing,
            zone: d.point.zone.to_string(),
            drone_height: d.drone_height,
            drone_yaw:   d.drone_rotation.0,
            drone_pitch: d.drone_rotation.1,
            drone_roll:  d.drone_rotation.2,
            drone_lat: d.drone_position.0,
            drone_lon: d.drone_position.1,
            x1, y1, x2, y2,
            width: m.display_size.0,
            height: m.display_size.1,
            video_position: m.video_position_ns,
            red: m.color.red,
            green: m.color.green,
            blue: m.color.blue,
            alpha: m.color.alpha,
            video_name: m.video_name.clone(),
        }
    }
}

fn parse_time(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
}

impl AnnotationRow {
    fn into_marking(self, row: usize) -> Result<Marking> {
        let zone = self.zone.parse().map_err(|e: TrackerError| TrackerError::RowParse { row, reason: e.to_string() })?;
        let time = parse_time(&self.time).ok_or_else(|| TrackerError::RowParse { row, reason: format!("invalid time {:?}", self.time) })?;
        let geometry = if self.length.is_some() {
            Geometry::Line { x1: self.x1, y1: self.y1, x2: self.x2.unwrap_or_default(), y2: self.y2.unwrap_or_default() }
        } else {
            Geometry::Point { x: self.x1, y: self.y1 }
        };
        Ok(Marking {
            name: self.name,
            color: Rgba { red: self.red, green: self.green, blue: self.blue, alpha: self.alpha },
            geometry,
            display_size: (self.width, self.height),
            video_position_ns: self.video_position,
            data: MeasurementData {
                length: self.length,
                time,
                latitude: self.lat,
                longitude: self.lon,
                point: UtmPoint { easting: self.easting, northing: self.northing, zone },
                drone_height: self.drone_height,
                drone_rotation: (self.drone_yaw, self.drone_pitch, self.drone_roll),
                drone_position: (self.drone_lat, self.drone_lon),
            },
            video_name: self.video_name,
        })
    }
}

pub fn write_annotations<W: Write>(writer: W, markings: &[Marking]) -> Result<()> {
    let mut w = csv::Writer::from_writer(writer);
    for m in markings {
        w.serialize(AnnotationRow::from(m))?;
    }
    w.flush()?;
    Ok(())
}

/// Markings read from an annotation file.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AnnotationImport {
    pub markings: Vec<Marking>,
    /// Line numbers (header is line 1) of rows that could not be read
    pub skipped_rows: Vec<usize>,
}

/// Reads every valid row. Malformed rows are logged and skipped, only I/O errors abort.
pub fn read_annotations<R: Read>(reader: R) -> Result<AnnotationImport> {
    let mut r = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = r.headers()?.clone();
    let mut record = csv::StringRecord::new();
    let mut import = AnnotationImport::default();
    loop {
        let line = match r.read_record(&mut record) {
            Ok(true) => record.position().map(|p| p.line() as usize).unwrap_or_default(),
            Ok(false) => break,
            Err(e) if matches!(e.kind(), csv::ErrorKind::Io(_)) => return Err(e.into()),
            Err(e) => {
                let line = e.position().map(|p| p.line() as usize).unwrap_or_default();
                log::warn!("Annotation line {line}: {e}, skipping");
                import.skipped_rows.push(line);
                continue;
            }
        };
        let parsed = record.deserialize::<AnnotationRow>(Some(&headers))
            .map_err(|e| TrackerError::RowParse { row: line, reason: e.to_string() })
            .and_then(|row| row.into_marking(line));
        match parsed {
            Ok(m) => import.markings.push(m),
            Err(e) => {
                log::warn!("Annotation line {line}: {e}, skipping");
                import.skipped_rows.push(line);
            }
        }
    }
    Ok(import)
}

pub fn save_annotations(path: &Path, markings: &[Marking]) -> Result<()> {
    write_annotations(std::fs::File::create(path)?, markings)?;
    log::info!("Saved {} annotations to {}", markings.len(), crate::util::path_to_str(path));
    Ok(())
}

pub fn load_annotations(path: &Path) -> Result<AnnotationImport> {
    let import = read_annotations(std::fs::File::open(path)?)?;
    log::info!("Loaded {} annotations from {}, {} rows skipped", import.markings.len(), crate::util::path_to_str(path), import.skipped_rows.len());
    Ok(import)
}
