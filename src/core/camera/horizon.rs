// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright © 2022 Adrian <adrian.eddy at gmail>

use std::f64::consts::{ PI, FRAC_1_SQRT_2 };
use nalgebra::Vector3;
use serde::Serialize;

use super::{ CameraModel, Rotation };
use crate::Result;

pub const CURVE_SAMPLES: usize = 100;

/// World space reference circles drawn over the video to judge the camera orientation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum ReferenceCurve {
    /// Vertical circle through north and south
    NorthSouth,
    /// Vertical circle through east and west
    EastWest,
    /// The horizon
    Pitch0,
    /// Circle 45° below the horizon
    Pitch45,
}

impl ReferenceCurve {
    pub const ALL: [ReferenceCurve; 4] = [Self::NorthSouth, Self::EastWest, Self::Pitch0, Self::Pitch45];

    pub fn name(&self) -> &'static str {
        match self {
            Self::NorthSouth => "NS",
            Self::EastWest   => "EW",
            Self::Pitch0     => "pitch0",
            Self::Pitch45    => "pitch45",
        }
    }

    pub fn world_points(&self) -> Vec<Vector3<f64>> {
        let step = 2.0 * PI / (CURVE_SAMPLES - 1) as f64;
        (0..CURVE_SAMPLES).map(|i| {
            let (s, c) = (-PI + step * i as f64).sin_cos();
            match self {
                Self::NorthSouth => Vector3::new(0.0, c, s),
                Self::EastWest   => Vector3::new(c, 0.0, s),
                Self::Pitch0     => Vector3::new(c, s, 0.0),
                Self::Pitch45    => Vector3::new(c * FRAC_1_SQRT_2, s * FRAC_1_SQRT_2, -FRAC_1_SQRT_2),
            }
        }).collect()
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct HorizonLine {
    pub curve: ReferenceCurve,
    /// Polylines in video pixels, split where the curve passes behind the camera
    pub segments: Vec<Vec<(f64, f64)>>,
}

pub fn project_curve(camera: &CameraModel, curve: ReferenceCurve, rotation: Rotation) -> Result<HorizonLine> {
    let mut segments = Vec::new();
    let mut current = Vec::new();
    for p in curve.world_points() {
        match camera.image_point(&p, rotation)? {
            Some(px) => current.push(px),
            None => if !current.is_empty() {
                segments.push(std::mem::take(&mut current));
            }
        }
    }
    if !current.is_empty() {
        segments.push(current);
    }
    Ok(HorizonLine { curve, segments })
}

pub fn project_all(camera: &CameraModel, rotation: Rotation) -> Result<Vec<HorizonLine>> {
    ReferenceCurve::ALL.iter().map(|c| project_curve(camera, *c, rotation)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera() -> CameraModel {
        let mut cam = CameraModel::new();
        cam.set_fov(90.0, 60.0);
        cam.set_image_size(1000.0, 600.0).unwrap();
        cam
    }

    #[test]
    fn curves_are_unit_circles() {
        for c in ReferenceCurve::ALL {
            let pts = c.world_points();
            assert_eq!(pts.len(), CURVE_SAMPLES);
            assert!(pts.iter().all(|p| (p.norm() - 1.0).abs() < 1e-12), "{}", c.name());
        }
    }

    #[test]
    fn level_camera_sees_horizon_at_center_row() {
        let line = project_curve(&camera(), ReferenceCurve::Pitch0, (0.0, 0.0, 0.0)).unwrap();
        assert_eq!(line.segments.len(), 1);
        assert!(line.segments[0].iter().all(|p| (p.1 - 300.0).abs() < 1e-6));
    }

    #[test]
    fn north_south_line_is_vertical_when_facing_north() {
        let line = project_curve(&camera(), ReferenceCurve::NorthSouth, (0.0, -0.5, 0.0)).unwrap();
        assert!(!line.segments.is_empty());
        assert!(line.segments.iter().flatten().all(|p| (p.0 - 500.0).abs() < 1e-6));
    }

    #[test]
    fn all_curves() {
        let lines = project_all(&camera(), (0.2, -0.7, 0.0)).unwrap();
        assert_eq!(lines.iter().map(|l| l.curve).collect::<Vec<_>>(), ReferenceCurve::ALL.to_vec());
        assert!(project_all(&CameraModel::new(), (0.0, 0.0, 0.0)).is_err());
    }
}
