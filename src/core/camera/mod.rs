// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright © 2021-2022 Adrian <adrian.eddy at gmail>

pub mod distortion;
pub mod horizon;
pub mod lens_profile;

use std::path::Path;
use nalgebra::{ Rotation3, Vector3 };
use rayon::prelude::*;

use crate::geo::{ self, UtmPoint };
use crate::util::DEG2RAD;
use crate::{ Result, TrackerError };
use distortion::OpenCVStandard;
use lens_profile::Calibration;

/// Yaw, pitch, roll in radians
pub type Rotation = (f64, f64, f64);

/// Pinhole camera described by its field of view, with optional lens calibration.
///
/// Camera space: X right, Y forward, Z up. World space: X east, Y north, Z up.
#[derive(Default, Clone, Debug)]
pub struct CameraModel {
    pub horizontal_fov: Option<f64>, // radians
    pub vertical_fov: Option<f64>,
    pub calibration: Option<Calibration>,

    video_size: Option<(f64, f64)>,
    image_size: Option<(f64, f64)>,
    image_center: Option<(f64, f64)>,

    distortion_model: OpenCVStandard,
}

impl CameraModel {
    pub fn new() -> Self { Self::default() }

    pub fn set_fov(&mut self, horizontal_deg: f64, vertical_deg: f64) {
        self.horizontal_fov = Some(horizontal_deg * DEG2RAD);
        self.vertical_fov   = Some(vertical_deg * DEG2RAD);
    }

    pub fn load_fov_file(&mut self, path: &Path) -> Result<()> {
        let (h, v) = lens_profile::load_fov_file(path)?;
        self.horizontal_fov = Some(h);
        self.vertical_fov = Some(v);
        Ok(())
    }

    pub fn set_calibration(&mut self, calibration: Option<Calibration>) -> Result<()> {
        self.calibration = calibration;
        if let Some((w, h)) = self.video_size {
            self.set_image_size(w, h)?;
        }
        Ok(())
    }

    pub fn load_calibration(&mut self, path: &Path) -> Result<()> {
        let cal = Calibration::load_from_file(path)?;
        self.set_calibration(Some(cal))
    }

    /// With a calibration the effective size is the extent of the undistorted image corners.
    /// Pixel offsets are always measured from the middle of the effective size.
    pub fn set_image_size(&mut self, width: f64, height: f64) -> Result<()> {
        if width <= 0.0 || height <= 0.0 {
            return Err(TrackerError::OutOfRange(format!("image size {width}x{height}")));
        }
        self.video_size = Some((width, height));

        if self.calibration.is_some() {
            let corners = [(0.0, 0.0), (width, 0.0), (width, height), (0.0, height)];
            let mut undist = [(0.0, 0.0); 4];
            for (i, c) in corners.iter().enumerate() {
                undist[i] = self.undistort_pixel(*c).ok_or_else(|| TrackerError::OutOfRange(format!("cannot undistort image corner {c:?}")))?;
            }
            let w = (undist[1].0 - undist[0].0 + undist[2].0 - undist[3].0) / 2.0;
            let h = (undist[3].1 - undist[0].1 + undist[2].1 - undist[1].1) / 2.0;
            log::debug!("Effective image size: {w:.1}x{h:.1} (video: {width}x{height})");
            self.image_size = Some((w, h));
        } else {
            self.image_size = Some((width, height));
        }
        self.image_center = self.image_size.map(|(w, h)| (w / 2.0, h / 2.0));
        Ok(())
    }

    pub fn image_size(&self) -> Option<(f64, f64)> { self.image_size }
    pub fn video_size(&self) -> Option<(f64, f64)> { self.video_size }
    pub fn image_center(&self) -> Option<(f64, f64)> { self.image_center }

    fn angles_per_pixel(&self) -> Result<((f64, f64), (f64, f64))> {
        let (hfov, vfov) = match (self.horizontal_fov, self.vertical_fov) {
            (Some(h), Some(v)) => (h, v),
            _ => return Err(TrackerError::NotConfigured("field of view"))
        };
        let (w, h) = self.image_size.ok_or(TrackerError::NotConfigured("image size"))?;
        let center = self.image_center.ok_or(TrackerError::NotConfigured("image size"))?;
        Ok(((hfov / w, vfov / h), center))
    }

    pub fn undistort_pixel(&self, pixel: (f64, f64)) -> Option<(f64, f64)> {
        let Some(cal) = &self.calibration else { return Some(pixel); };
        let (fx, fy) = cal.focal();
        let (cx, cy) = cal.principal();
        let pt = ((pixel.0 - cx) / fx, (pixel.1 - cy) / fy);
        let (x, y) = self.distortion_model.undistort_point(pt, &cal.distortion_coeffs)?;
        Some((x * fx + cx, y * fy + cy))
    }

    pub fn distort_pixel(&self, pixel: (f64, f64)) -> (f64, f64) {
        let Some(cal) = &self.calibration else { return pixel; };
        let (fx, fy) = cal.focal();
        let (cx, cy) = cal.principal();
        let pt = ((pixel.0 - cx) / fx, (pixel.1 - cy) / fy);
        let (x, y) = self.distortion_model.distort_point(pt, &cal.distortion_coeffs);
        (x * fx + cx, y * fy + cy)
    }

    /// Un-normalized camera space direction `(tan(h), 1, tan(-v))` of a video pixel.
    pub fn unit_vector(&self, pixel: (f64, f64)) -> Result<Vector3<f64>> {
        let ((hpp, vpp), center) = self.angles_per_pixel()?;
        let p = self.undistort_pixel(pixel).ok_or_else(|| TrackerError::OutOfRange(format!("cannot undistort pixel {pixel:?}")))?;
        let dx = p.0 - center.0;
        let dy = p.1 - center.1;
        Ok(Vector3::new((hpp * dx).tan(), 1.0, (-vpp * dy).tan()))
    }

    /// yaw * pitch * roll
    pub fn rotation_matrix(yaw: f64, pitch: f64, roll: f64) -> Rotation3<f64> {
        Rotation3::from_axis_angle(&Vector3::z_axis(), yaw)
            * Rotation3::from_axis_angle(&Vector3::x_axis(), pitch)
            * Rotation3::from_axis_angle(&Vector3::y_axis(), roll)
    }

    /// Camera to world rotation for a drone pose. Drone yaw is clockwise, world yaw is counter-clockwise.
    pub fn camera_rotation(rotation: Rotation) -> Rotation3<f64> {
        Self::rotation_matrix(-rotation.0, rotation.1, rotation.2)
    }

    /// Intersects a world space ray from a camera `height` meters above the ground. Returns the (east, north) offset.
    pub fn ground_offset(ray: &Vector3<f64>, height: f64) -> Result<(f64, f64)> {
        if ray.z >= -f64::EPSILON {
            return Err(TrackerError::NoGroundIntersection);
        }
        let ground = ray / ray.z * -height;
        Ok((ground.x, ground.y))
    }

    pub fn world_offset(&self, pixel: (f64, f64), height: f64, rotation: Rotation) -> Result<(f64, f64)> {
        let ray = Self::camera_rotation(rotation) * self.unit_vector(pixel)?;
        Self::ground_offset(&ray, height)
    }

    /// Ground point seen at `pixel` by a camera at `position` (lat, lon), `height` meters above the ground.
    pub fn world_point(&self, pixel: (f64, f64), height: f64, rotation: Rotation, position: (f64, f64)) -> Result<UtmPoint> {
        let (de, dn) = self.world_offset(pixel, height, rotation)?;
        let drone = geo::from_latlon(position.0, position.1)?;
        Ok(UtmPoint {
            easting: drone.easting + de,
            northing: drone.northing + dn,
            zone: drone.zone
        })
    }

    /// Projects every pixel independently. Output order matches the input.
    pub fn world_points(&self, pixels: &[(f64, f64)], height: f64, rotation: Rotation, position: (f64, f64)) -> Result<Vec<UtmPoint>> {
        pixels.par_iter()
            .map(|p| self.world_point(*p, height, rotation, position))
            .collect()
    }

    pub fn gps_point(&self, pixel: (f64, f64), height: f64, rotation: Rotation, position: (f64, f64)) -> Result<(f64, f64)> {
        let p = self.world_point(pixel, height, rotation, position)?;
        geo::to_latlon(p.easting, p.northing, p.zone)
    }

    /// Video pixel where a world space direction appears. `None` when the direction is behind the camera.
    pub fn image_point(&self, direction: &Vector3<f64>, rotation: Rotation) -> Result<Option<(f64, f64)>> {
        let ((hpp, vpp), center) = self.angles_per_pixel()?;
        let cam = Self::camera_rotation(rotation).inverse() * direction;
        if cam.y <= f64::EPSILON {
            return Ok(None);
        }
        let p = (
            center.0 + (cam.x / cam.y).atan() / hpp,
            center.1 - (cam.z / cam.y).atan() / vpp,
        );
        Ok(Some(self.distort_pixel(p)))
    }
}
