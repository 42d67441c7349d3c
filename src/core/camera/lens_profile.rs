// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright © 2021-2022 Adrian <adrian.eddy at gmail>

use std::path::Path;
use nalgebra::Matrix3;
use serde::{ Serialize, Deserialize };

use crate::util::{ self, DEG2RAD };
use crate::{ Result, TrackerError };

#[derive(Deserialize, Serialize, Default, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct CameraParams {
    pub camera_matrix: Vec<[f64; 3]>,
    pub distortion_coeffs: Vec<f64>,
    /// Matrix stored column-major, as exported by MATLAB
    pub transposed: bool,
}

/// Intrinsic calibration used to undistort clicked pixels.
#[derive(Clone, Debug, PartialEq)]
pub struct Calibration {
    pub camera_matrix: Matrix3<f64>,
    pub distortion_coeffs: Vec<f64>,
}

impl Calibration {
    pub fn from_params(params: &CameraParams) -> Result<Self> {
        if params.camera_matrix.len() != 3 {
            return Err(TrackerError::NotConfigured("camera_matrix must have 3 rows"));
        }
        let rows = &params.camera_matrix;
        let mut camera_matrix = Matrix3::new(
            rows[0][0], rows[0][1], rows[0][2],
            rows[1][0], rows[1][1], rows[1][2],
            rows[2][0], rows[2][1], rows[2][2],
        );
        if params.transposed {
            camera_matrix.transpose_mut();
        }
        if camera_matrix[(0, 0)] == 0.0 || camera_matrix[(1, 1)] == 0.0 {
            return Err(TrackerError::NotConfigured("camera_matrix has zero focal length"));
        }
        let mut distortion_coeffs = params.distortion_coeffs.clone();
        if distortion_coeffs.len() < 5 {
            distortion_coeffs.resize(5, 0.0);
        }
        Ok(Self { camera_matrix, distortion_coeffs })
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let params: CameraParams = serde_json::from_str(json)?;
        Self::from_params(&params)
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let cal = Self::from_json(&data)?;
        log::info!("Loaded camera calibration from {}: {:?}", util::path_to_str(path), cal.distortion_coeffs);
        Ok(cal)
    }

    pub fn focal(&self) -> (f64, f64) { (self.camera_matrix[(0, 0)], self.camera_matrix[(1, 1)]) }
    pub fn principal(&self) -> (f64, f64) { (self.camera_matrix[(0, 2)], self.camera_matrix[(1, 2)]) }
}

#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq)]
pub struct FovRecord {
    pub horizontal_fov: f64, // degrees
    pub vertical_fov: f64,
}

/// Reads the first row of a `horizontal_fov,vertical_fov` CSV. Returns radians.
pub fn load_fov_file(path: &Path) -> Result<(f64, f64)> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_path(path)?;
    let headers = reader.headers()?.clone();
    let missing: Vec<String> = ["horizontal_fov", "vertical_fov"].iter()
        .filter(|name| !headers.iter().any(|h| h == **name))
        .map(|x| x.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(TrackerError::Schema { missing, source_name: util::path_to_str(path) });
    }
    let record: FovRecord = reader.deserialize().next().ok_or(TrackerError::EmptyResult("field of view"))??;
    log::info!("FOV: {:.2}° x {:.2}°", record.horizontal_fov, record.vertical_fov);
    Ok((record.horizontal_fov * DEG2RAD, record.vertical_fov * DEG2RAD))
}
