// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright © 2021-2022 Adrian <adrian.eddy at gmail>

use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{ AtomicBool, AtomicU64, Ordering::SeqCst };
use chrono::NaiveDateTime;
use lru::LruCache;
use parking_lot::{ Mutex, RwLock };
use serde::Serialize;

use crate::annotations::{ self, AnnotationImport, Geometry, Marking, MeasurementData, Rgba };
use crate::camera::{ CameraModel, Rotation, horizon::{ self, HorizonLine } };
use crate::drone_log::{ self, DroneLog, LogConverter, ParseMode, ParseOptions };
use crate::geo::{ self, UtmPoint };
use crate::synchronization::{ self, RecordingMatch, SyncOffset, VideoInfo };
use crate::util::{ seconds_to_us, RAD2DEG };
use crate::{ Result, TrackerError };

const POSE_CACHE_SIZE: usize = 256;

/// Pose at a video position, with the height difference applied.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PoseQuery {
    pub timestamp: f64, // log time of the sample
    pub height: f64,
    pub rotation: Rotation,
    pub position: (f64, f64),
    pub wall_clock: NaiveDateTime,
}

/// Everything needed to answer "where is this pixel": the imported log, the video/log offset and the camera.
///
/// The log is replaced as a whole on import. Callers holding a [`TrackerSession::snapshot`]
/// keep reading the log they got, new queries see the new one.
pub struct TrackerSession {
    pub log: Arc<RwLock<Arc<DroneLog>>>,
    pub sync: Arc<RwLock<SyncOffset>>,
    pub camera: Arc<RwLock<CameraModel>>,
    pub video: Arc<RwLock<Option<VideoInfo>>>,
    pub converter: Arc<RwLock<LogConverter>>,
    pub markings: Arc<RwLock<Vec<Marking>>>,

    // Bumped after every change of the log or the offset. Cache keys carry it, so a pose
    // computed from the previous state is never served after the change.
    generation: AtomicU64,
    pose_cache: Mutex<LruCache<(u64, i64), PoseQuery>>,
}

impl Default for TrackerSession {
    fn default() -> Self {
        Self {
            log:        Arc::new(RwLock::new(Arc::new(DroneLog::default()))),
            sync:       Arc::new(RwLock::new(SyncOffset::default())),
            camera:     Arc::new(RwLock::new(CameraModel::default())),
            video:      Arc::new(RwLock::new(None)),
            converter:  Arc::new(RwLock::new(LogConverter::default())),
            markings:   Arc::new(RwLock::new(Vec::new())),

            generation: AtomicU64::new(0),
            pose_cache: Mutex::new(LruCache::new(NonZeroUsize::new(POSE_CACHE_SIZE).unwrap_or(NonZeroUsize::MIN))),
        }
    }
}

impl TrackerSession {
    pub fn new() -> Self { Self::default() }

    pub fn snapshot(&self) -> Arc<DroneLog> { self.log.read().clone() }

    fn invalidate_cache(&self) {
        self.generation.fetch_add(1, SeqCst);
        self.pose_cache.lock().clear();
    }

    fn store_pose(&self, generation: u64, key: i64, query: PoseQuery) {
        let mut cache = self.pose_cache.lock();
        if self.generation.load(SeqCst) == generation {
            cache.put((generation, key), query);
        }
    }

    /// Parses a CSV log and makes it the active one. On error or cancellation the previous log stays active.
    pub fn import_log<F: Fn(f64)>(&self, path: &Path, options: &ParseOptions, progress_cb: F, cancel_flag: Arc<AtomicBool>) -> Result<Arc<DroneLog>> {
        let parsed = Arc::new(drone_log::parse_log_file(path, options, progress_cb, cancel_flag)?);
        self.activate_log(parsed.clone());
        Ok(parsed)
    }

    /// Runs the external converter on a raw log and imports its CSV output.
    pub fn import_raw_log<F: Fn(f64)>(&self, path: &Path, options: &ParseOptions, progress_cb: F, cancel_flag: Arc<AtomicBool>) -> Result<Arc<DroneLog>> {
        let tmp = tempfile::tempdir()?;
        let csv_path = tmp.path().join("converted_log.csv");
        let converter = self.converter.read().clone();
        converter.convert(path, &csv_path)?;
        self.import_log(&csv_path, options, progress_cb, cancel_flag)
    }

    pub fn import_log_data(&self, data: &[u8], source_name: &str, options: &ParseOptions) -> Result<Arc<DroneLog>> {
        let parsed = Arc::new(drone_log::parse_log_data(data, source_name, options, |_| {}, Arc::new(AtomicBool::new(false)))?);
        self.activate_log(parsed.clone());
        Ok(parsed)
    }

    fn activate_log(&self, parsed: Arc<DroneLog>) {
        log::info!("Activating log {}: {} samples, {} recordings", parsed.source, parsed.timeline.len(), parsed.recordings.len());
        *self.log.write() = parsed.clone();
        self.sync.write().video_start_time = None;
        self.invalidate_cache();

        if !parsed.rebased && self.video.read().is_some() {
            if let Err(e) = self.synchronize() {
                log::warn!("Cannot synchronize video with {}: {e}", parsed.source);
            }
        }
    }

    pub fn set_video_info(&self, info: VideoInfo) {
        *self.video.write() = Some(info);
        if !self.snapshot().is_empty() {
            if let Err(e) = self.synchronize() {
                log::warn!("Cannot synchronize video with log: {e}");
            }
        }
    }

    /// Sets the video start from the recording interval matching the video.
    pub fn synchronize(&self) -> Result<RecordingMatch> {
        let video = self.video.read().clone().ok_or(TrackerError::NotConfigured("video info"))?;
        let log = self.snapshot();
        if log.rebased {
            return log.matched_recording.ok_or(TrackerError::EmptyResult("recording interval matching the video"));
        }
        let found = synchronization::find_recording(&log.recordings, &log.timeline, &video)?;
        self.sync.write().apply_match(&found);
        self.invalidate_cache();
        Ok(found)
    }

    /// Seconds from the start of the log. Returns the clamped value.
    pub fn set_manual_start(&self, seconds: f64) -> Result<f64> {
        let log = self.snapshot();
        let v = self.sync.write().set_manual_start(seconds, &log.timeline)?;
        self.invalidate_cache();
        Ok(v)
    }

    pub fn manual_start(&self) -> Option<f64> { self.sync.read().manual_start(&self.snapshot().timeline) }

    pub fn set_height_difference(&self, v: f64) { self.sync.write().height_difference = v; self.invalidate_cache(); }
    pub fn height_difference    (&self) -> f64 { self.sync.read().height_difference }

    pub fn set_fov(&self, horizontal_deg: f64, vertical_deg: f64) { self.camera.write().set_fov(horizontal_deg, vertical_deg); }
    pub fn set_video_size(&self, width: f64, height: f64) -> Result<()> { self.camera.write().set_image_size(width, height) }
    pub fn load_fov_file(&self, path: &Path) -> Result<()> { self.camera.write().load_fov_file(path) }
    pub fn load_calibration(&self, path: &Path) -> Result<()> { self.camera.write().load_calibration(path) }

    /// Log time for a video position. A windowed log starts at 0, so without a manual start
    /// positions map one to one.
    pub fn log_time(&self, video_position: f64) -> Option<f64> {
        self.sync.read().log_time(video_position, &self.snapshot().timeline)
    }

    /// Pose closest in time to `video_position` (seconds).
    pub fn get_pose_at(&self, video_position: f64) -> Result<PoseQuery> {
        let generation = self.generation.load(SeqCst);
        let key = seconds_to_us(video_position);
        if let Some(q) = self.pose_cache.lock().get(&(generation, key)) {
            return Ok(q.clone());
        }

        let log = self.snapshot();
        let time = self.sync.read().log_time(video_position, &log.timeline).ok_or(TrackerError::EmptyResult("pose sample"))?;
        let sample = log.timeline.nearest(time).ok_or(TrackerError::EmptyResult("pose sample"))?;
        let query = PoseQuery {
            timestamp: sample.timestamp,
            height: sample.height + self.sync.read().height_difference,
            rotation: sample.rotation(),
            position: sample.position(),
            wall_clock: sample.wall_clock,
        };
        self.store_pose(generation, key, query.clone());
        Ok(query)
    }

    pub fn world_point_at(&self, pixel: (f64, f64), video_position: f64) -> Result<UtmPoint> {
        let pose = self.get_pose_at(video_position).map_err(|_| TrackerError::NotConfigured("drone pose"))?;
        self.camera.read().world_point(pixel, pose.height, pose.rotation, pose.position)
    }

    pub fn gps_point_at(&self, pixel: (f64, f64), video_position: f64) -> Result<(f64, f64)> {
        let p = self.world_point_at(pixel, video_position)?;
        geo::to_latlon(p.easting, p.northing, p.zone)
    }

    fn display_scale(&self, display_size: (f64, f64)) -> Result<f64> {
        let (video_w, _) = self.camera.read().video_size().ok_or(TrackerError::NotConfigured("video size"))?;
        if display_size.0 <= 0.0 {
            return Err(TrackerError::OutOfRange(format!("display width {}", display_size.0)));
        }
        Ok(video_w / display_size.0)
    }

    fn measurement(&self, pose: &PoseQuery, point: UtmPoint, length: Option<f64>) -> Result<MeasurementData> {
        let (latitude, longitude) = geo::to_latlon(point.easting, point.northing, point.zone)?;
        Ok(MeasurementData {
            length,
            time: pose.wall_clock,
            latitude,
            longitude,
            point,
            drone_height: pose.height,
            drone_rotation: pose.rotation,
            drone_position: pose.position,
        })
    }

    /// Ground position of a click in display coordinates.
    pub fn measure_point(&self, click: (f64, f64), display_size: (f64, f64), video_position: f64) -> Result<MeasurementData> {
        let scale = self.display_scale(display_size)?;
        let pose = self.get_pose_at(video_position).map_err(|_| TrackerError::NotConfigured("drone pose"))?;
        let pixel = (click.0 * scale, click.1 * scale);
        let point = self.camera.read().world_point(pixel, pose.height, pose.rotation, pose.position)?;
        self.measurement(&pose, point, None)
    }

    /// Ground length between two clicks, positioned at their midpoint.
    pub fn measure_line(&self, start: (f64, f64), end: (f64, f64), display_size: (f64, f64), video_position: f64) -> Result<MeasurementData> {
        let scale = self.display_scale(display_size)?;
        let pose = self.get_pose_at(video_position).map_err(|_| TrackerError::NotConfigured("drone pose"))?;
        let pixels = [(end.0 * scale, end.1 * scale), (start.0 * scale, start.1 * scale)];
        let mid = ((pixels[0].0 + pixels[1].0) / 2.0, (pixels[0].1 + pixels[1].1) / 2.0);

        let camera = self.camera.read();
        let ends = camera.world_points(&pixels, pose.height, pose.rotation, pose.position)?;
        let length = (ends[1].easting - ends[0].easting).hypot(ends[1].northing - ends[0].northing);
        let point = camera.world_point(mid, pose.height, pose.rotation, pose.position)?;
        drop(camera);

        self.measurement(&pose, point, Some(length))
    }

    /// Measures a press/release gesture and stores it as a marking.
    pub fn add_marking(&self, name: &str, color: Rgba, press: (f64, f64), release: (f64, f64), display_size: (f64, f64), video_position: f64, video_name: &str) -> Result<Marking> {
        let geometry = Geometry::from_drag(press, release);
        let data = match geometry {
            Geometry::Point { x, y } => self.measure_point((x, y), display_size, video_position)?,
            Geometry::Line { x1, y1, x2, y2 } => self.measure_line((x1, y1), (x2, y2), display_size, video_position)?,
        };
        let marking = Marking {
            name: name.to_string(),
            color,
            geometry,
            display_size,
            video_position_ns: (video_position * 1e9).round() as i64,
            data,
            video_name: video_name.to_string(),
        };
        self.markings.write().push(marking.clone());
        Ok(marking)
    }

    pub fn remove_marking(&self, index: usize) -> Option<Marking> {
        let mut markings = self.markings.write();
        if index < markings.len() { Some(markings.remove(index)) } else { None }
    }

    pub fn save_annotations(&self, path: &Path) -> Result<()> {
        annotations::save_annotations(path, &self.markings.read())
    }

    /// Appends the markings from `path`. Returns how many were loaded and the lines that were skipped.
    pub fn load_annotations(&self, path: &Path) -> Result<(usize, Vec<usize>)> {
        let AnnotationImport { markings, skipped_rows } = annotations::load_annotations(path)?;
        let count = markings.len();
        self.markings.write().extend(markings);
        Ok((count, skipped_rows))
    }

    /// Reference curves as seen by the camera at `video_position`.
    pub fn horizon_at(&self, video_position: f64) -> Result<Vec<HorizonLine>> {
        let pose = self.get_pose_at(video_position)?;
        horizon::project_all(&self.camera.read(), pose.rotation)
    }

    pub fn pose_readout(&self, video_position: f64) -> Option<String> {
        let pose = self.get_pose_at(video_position).ok()?;
        Some(format!("Height: {:.1}m Yaw: {:.1}° Pitch: {:.1}°", pose.height, pose.rotation.0 * RAD2DEG, pose.rotation.1 * RAD2DEG))
    }

    pub fn windowed_options(&self) -> Result<ParseOptions> {
        let video = self.video.read().clone().ok_or(TrackerError::NotConfigured("video info"))?;
        Ok(ParseOptions { mode: ParseMode::Windowed(video) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drone_log::tests::log_csv;
    use crate::util::DEG2RAD;

    fn session_with(csv: &str) -> TrackerSession {
        let s = TrackerSession::new();
        s.import_log_data(csv.as_bytes(), "test.csv", &ParseOptions::default()).unwrap();
        s
    }

    fn timeline_csv(times: &[(&str, f64)]) -> String {
        let mut out = String::from("CUSTOM.updateTime,GIMBAL.pitch,GIMBAL.yaw,GIMBAL.roll,OSD.height [m],CUSTOM.isVideo,OSD.latitude,OSD.longitude\n");
        for (t, h) in times {
            out.push_str(&format!("{t},-90,0,0,{h},Recording,55.0,10.0\n"));
        }
        out
    }

    fn abc() -> TrackerSession {
        session_with(&timeline_csv(&[
            ("2021/06/01 12:00:10", 1.0),
            ("2021/06/01 12:00:20", 2.0),
            ("2021/06/01 12:00:30", 3.0),
        ]))
    }

    #[test]
    fn empty_session_has_no_pose() {
        assert!(matches!(TrackerSession::new().get_pose_at(1.0), Err(TrackerError::EmptyResult(_))));
        assert_eq!(TrackerSession::new().pose_readout(1.0), None);
    }

    #[test]
    fn nearest_sample_and_tie() {
        let s = abc();
        // Log starts at 12:00:10, absolute 24 s after 12:00:00 is position 14
        assert_eq!(s.get_pose_at(14.0).unwrap().height, 2.0);
        assert_eq!(s.get_pose_at(15.0).unwrap().height, 2.0);
        assert_eq!(s.get_pose_at(15.001).unwrap().height, 3.0);
        assert_eq!(s.get_pose_at(-50.0).unwrap().height, 1.0);
    }

    #[test]
    fn height_difference_shifts_heights() {
        let s = abc();
        let before = s.get_pose_at(14.0).unwrap().height;
        s.set_height_difference(5.0);
        let after = s.get_pose_at(14.0).unwrap().height;
        assert_eq!(after - before, 5.0);
        assert_eq!(s.height_difference(), 5.0);
    }

    #[test]
    fn manual_start_moves_queries() {
        let s = abc();
        assert_eq!(s.get_pose_at(0.0).unwrap().height, 1.0);
        assert_eq!(s.set_manual_start(10.0).unwrap(), 10.0);
        assert_eq!(s.get_pose_at(0.0).unwrap().height, 2.0);
        assert_eq!(s.manual_start(), Some(10.0));
        assert_eq!(s.set_manual_start(1000.0).unwrap(), 20.0);
        assert_eq!(s.get_pose_at(0.0).unwrap().height, 3.0);
    }

    #[test]
    fn video_info_synchronizes() {
        // F,F,T,T,T,F,F,T,F: recordings (2,5) and (7,8) seconds into the log
        let s = session_with(&log_csv(&[false, false, true, true, true, false, false, true, false]));
        let first = s.snapshot().timeline.first_timestamp().unwrap();
        s.set_video_info(VideoInfo { duration_s: 3.0, gps_tag: None });
        assert_eq!(s.sync.read().video_start_time, Some(first + 2.0));
        assert_eq!(s.get_pose_at(0.0).unwrap().height, 22.0);

        let m = s.synchronize().unwrap();
        assert_eq!(m.index, 0);
    }

    #[test]
    fn synchronize_needs_video() {
        assert!(matches!(abc().synchronize(), Err(TrackerError::NotConfigured(_))));
    }

    #[test]
    fn windowed_positions_are_relative() {
        let s = TrackerSession::new();
        s.set_video_info(VideoInfo { duration_s: 1.0, gps_tag: None });
        let options = s.windowed_options().unwrap();
        let csv = log_csv(&[false, false, true, true, true, false, false, true, false]);
        let log = s.import_log_data(csv.as_bytes(), "w.csv", &options).unwrap();
        assert!(log.rebased);
        // (7,8) is closer to 1 s than (2,5)
        assert_eq!(s.get_pose_at(0.0).unwrap().height, 27.0);
        assert_eq!(s.log_time(0.4), Some(0.4));
    }

    #[test]
    fn manual_start_on_windowed_log() {
        let s = TrackerSession::new();
        s.set_video_info(VideoInfo { duration_s: 1.0, gps_tag: None });
        let options = s.windowed_options().unwrap();
        let csv = log_csv(&[false, false, true, true, true, false, false, true, false]);
        s.import_log_data(csv.as_bytes(), "w.csv", &options).unwrap();
        assert_eq!(s.get_pose_at(0.0).unwrap().height, 27.0);

        assert_eq!(s.set_manual_start(1.0).unwrap(), 1.0);
        assert_eq!(s.manual_start(), Some(1.0));
        assert_eq!(s.log_time(0.0), Some(1.0));
        assert_eq!(s.get_pose_at(0.0).unwrap().height, 28.0);
        // Clamped to the one second window
        assert_eq!(s.set_manual_start(2.0).unwrap(), 1.0);
    }

    #[test]
    fn reimport_keeps_old_snapshot() {
        let s = abc();
        let old = s.snapshot();
        let _ = s.get_pose_at(0.0).unwrap();
        s.import_log_data(timeline_csv(&[("2021/06/01 13:00:00", 9.0)]).as_bytes(), "new.csv", &ParseOptions::default()).unwrap();
        assert_eq!(old.timeline.len(), 3);
        assert_eq!(s.snapshot().timeline.len(), 1);
        // Cached pose from the old log is gone
        assert_eq!(s.get_pose_at(0.0).unwrap().height, 9.0);
    }

    #[test]
    fn pose_from_before_a_change_is_not_served() {
        let s = abc();
        let generation = s.generation.load(SeqCst);
        let old = s.get_pose_at(0.0).unwrap();
        assert_eq!(old.height, 1.0);

        // A query that read the old log finishes after the import
        s.import_log_data(timeline_csv(&[("2021/06/01 13:00:00", 9.0)]).as_bytes(), "new.csv", &ParseOptions::default()).unwrap();
        s.store_pose(generation, seconds_to_us(0.0), old.clone());
        assert_eq!(s.get_pose_at(0.0).unwrap().height, 9.0);

        // Same after a manual start
        let generation = s.generation.load(SeqCst);
        s.set_manual_start(0.0).unwrap();
        s.store_pose(generation, seconds_to_us(0.0), old);
        assert_eq!(s.get_pose_at(0.0).unwrap().height, 9.0);
    }

    #[test]
    fn cancel_during_import_keeps_previous_log() {
        let s = abc();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("long.csv");
        std::fs::write(&path, log_csv(&vec![true; 1200])).unwrap();

        let cancel = Arc::new(AtomicBool::new(false));
        let flag = cancel.clone();
        let calls = std::cell::Cell::new(0);
        let result = s.import_log(&path, &ParseOptions::default(), |_| { calls.set(calls.get() + 1); flag.store(true, SeqCst); }, cancel);
        assert!(matches!(result, Err(TrackerError::Cancelled)));
        assert_eq!(calls.get(), 1);
        assert_eq!(s.snapshot().timeline.len(), 3);
        assert_eq!(s.get_pose_at(0.0).unwrap().height, 1.0);
    }

    #[test]
    fn failed_import_keeps_previous_log() {
        let s = abc();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        std::fs::write(&path, "CUSTOM.updateTime,GIMBAL.pitch\n2021/06/01 12:00:00,1\n").unwrap();
        assert!(matches!(s.import_log(&path, &ParseOptions::default(), |_| {}, Arc::new(AtomicBool::new(false))), Err(TrackerError::Schema { .. })));
        assert_eq!(s.snapshot().timeline.len(), 3);

        let path = dir.path().join("good.csv");
        std::fs::write(&path, log_csv(&[true, true])).unwrap();
        let cancel = Arc::new(AtomicBool::new(false));
        cancel.store(true, SeqCst);
        assert!(matches!(s.import_log(&path, &ParseOptions::default(), |_| {}, cancel), Err(TrackerError::Cancelled)));
        assert_eq!(s.snapshot().timeline.len(), 3);
        assert_eq!(s.get_pose_at(0.0).unwrap().height, 1.0);
    }

    #[cfg(unix)]
    #[test]
    fn raw_import_through_converter() {
        let s = TrackerSession::new();
        let dir = tempfile::tempdir().unwrap();
        let csv_path = dir.path().join("source.csv");
        std::fs::write(&csv_path, log_csv(&[true, true, false])).unwrap();
        *s.converter.write() = LogConverter { program: "sh".into(), args: vec!["-c".into(), "cp \"$1\" \"$2\"".into(), "converter".into()] };
        let log = s.import_raw_log(&csv_path, &ParseOptions::default(), |_| {}, Arc::new(AtomicBool::new(false))).unwrap();
        assert_eq!(log.timeline.len(), 3);

        *s.converter.write() = LogConverter { program: "sh".into(), args: vec!["-c".into(), "exit 3".into(), "converter".into()] };
        assert!(matches!(s.import_raw_log(&csv_path, &ParseOptions::default(), |_| {}, Arc::new(AtomicBool::new(false))), Err(TrackerError::ExternalTool(_))));
        assert_eq!(s.snapshot().timeline.len(), 3);
    }

    fn measuring_session() -> TrackerSession {
        let s = abc();
        s.set_fov(90.0, 60.0);
        s.set_video_size(1000.0, 600.0).unwrap();
        s
    }

    #[test]
    fn projection_needs_camera_and_pose() {
        let s = abc();
        assert!(matches!(s.world_point_at((0.0, 0.0), 0.0), Err(TrackerError::NotConfigured(_))));
        let empty = TrackerSession::new();
        empty.set_fov(90.0, 60.0);
        empty.set_video_size(1000.0, 600.0).unwrap();
        assert!(matches!(empty.world_point_at((500.0, 300.0), 0.0), Err(TrackerError::NotConfigured("drone pose"))));
    }

    #[test]
    fn point_below_drone() {
        let s = measuring_session();
        let (lat, lon) = s.gps_point_at((500.0, 300.0), 0.0).unwrap();
        assert!((lat - 55.0).abs() < 1e-7 && (lon - 10.0).abs() < 1e-7);

        // Display at half the video size
        let m = s.measure_point((250.0, 150.0), (500.0, 300.0), 0.0).unwrap();
        assert!((m.latitude - 55.0).abs() < 1e-7);
        assert_eq!(m.length, None);
        assert_eq!(m.drone_height, 1.0);
    }

    #[test]
    fn line_length() {
        let s = measuring_session();
        // Height 2 m at position 10, nadir. 100 px right of center on a 500 px display is 200 video px.
        let per_pixel = 90.0 * DEG2RAD / 1000.0;
        let m = s.measure_line((250.0, 150.0), (350.0, 150.0), (500.0, 300.0), 10.0).unwrap();
        let expected = 2.0 * (200.0 * per_pixel).tan();
        assert!((m.length.unwrap() - expected).abs() < 1e-6, "{:?}", m.length);
        let mid = s.world_point_at((600.0, 300.0), 10.0).unwrap();
        assert!((m.point.easting - mid.easting).abs() < 1e-9);
    }

    #[test]
    fn markings_and_annotations() {
        let s = measuring_session();
        s.add_marking("a", Rgba::default(), (250.0, 150.0), (251.0, 151.0), (500.0, 300.0), 0.0, "v.mov").unwrap();
        let line = s.add_marking("b", Rgba::default(), (100.0, 100.0), (300.0, 200.0), (500.0, 300.0), 10.0, "v.mov").unwrap();
        assert!(line.data.length.is_some());
        assert_eq!(line.video_position_ns, 10_000_000_000);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        s.save_annotations(&path).unwrap();
        assert!(s.remove_marking(0).is_some());
        assert!(s.remove_marking(5).is_none());
        assert_eq!(s.load_annotations(&path).unwrap(), (2, vec![]));
        assert_eq!(s.markings.read().len(), 3);
    }

    #[test]
    fn readout() {
        let s = abc();
        assert_eq!(s.pose_readout(0.0).unwrap(), "Height: 1.0m Yaw: 0.0° Pitch: -90.0°");
    }

    #[test]
    fn horizon_follows_pose() {
        let s = measuring_session();
        let lines = s.horizon_at(0.0).unwrap();
        assert_eq!(lines.len(), 4);
        // Looking straight down the horizon circle is at 90°, outside any forward view
        assert!(lines.iter().find(|l| l.curve == horizon::ReferenceCurve::Pitch0).unwrap().segments.is_empty());
    }
}
