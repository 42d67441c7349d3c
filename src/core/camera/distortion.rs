// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright © 2022 Adrian <adrian.eddy at gmail>

// Adapted from OpenCV: https://github.com/opencv/opencv/blob/c3cbd302cbfbaefdef9a011b2615f8d8f58556dd/modules/calib3d/src/undistort.dispatch.cpp#L491-L538

/// OpenCV standard model, coefficients `k1, k2, p1, p2, k3[, k4, k5, k6[, s1, s2, s3, s4]]`.
/// Points are normalized image coordinates.
#[derive(Default, Clone, Debug)]
pub struct OpenCVStandard { }

impl OpenCVStandard {
    pub fn undistort_point<T: num_traits::Float>(&self, point: (T, T), k: &[T]) -> Option<(T, T)> {
        let t_0 = T::zero();
        let t_1 = T::one();
        let t_2 = t_1 + t_1;

        let (mut x, mut y) = point;
        let (x0, y0) = point;

        let mut k = k.to_vec();
        k.resize(12, t_0);

        // compensate distortion iteratively
        for _ in 0..20 {
            let r2 = x * x + y * y;
            let icdist = (t_1 + ((k[7] * r2 + k[6]) * r2 + k[5]) * r2) / (t_1 + ((k[4] * r2 + k[1]) * r2 + k[0]) * r2);
            if icdist < t_0 {
                log::warn!("icdist < 0");
                return None;
            }
            let delta_x = t_2 * k[2] * x * y + k[3] * (r2 + t_2 * x * x) + k[8] * r2 + k[9] * r2 * r2;
            let delta_y = k[2] * (r2 + t_2 * y * y) + t_2 * k[3] * x * y + k[10] * r2 + k[11] * r2 * r2;
            x = (x0 - delta_x) * icdist;
            y = (y0 - delta_y) * icdist;
        }

        Some((x, y))
    }

    pub fn distort_point<T: num_traits::Float>(&self, point: (T, T), k: &[T]) -> (T, T) {
        let t_0 = T::zero();
        let t_1 = T::one();
        let t_2 = t_1 + t_1;

        let mut k = k.to_vec();
        k.resize(12, t_0);

        let (x, y) = point;
        let r2 = x * x + y * y;
        let r4 = r2 * r2;
        let r6 = r4 * r2;
        let a1 = t_2 * x * y;
        let a2 = r2 + t_2 * x * x;
        let a3 = r2 + t_2 * y * y;
        let cdist = t_1 + k[0] * r2 + k[1] * r4 + k[4] * r6;
        let icdist2 = t_1 / (t_1 + k[5] * r2 + k[6] * r4 + k[7] * r6);

        (
            x * cdist * icdist2 + k[2] * a1 + k[3] * a2 + k[8] * r2 + k[9] * r4,
            y * cdist * icdist2 + k[2] * a3 + k[3] * a1 + k[10] * r2 + k[11] * r4
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case((0.1, 0.2))]
    #[test_case((-0.3, 0.05))]
    #[test_case((0.0, 0.0))]
    fn undistort_inverts_distort(p: (f64, f64)) {
        let k = [-0.12, 0.03, 0.001, -0.0005, 0.0];
        let m = OpenCVStandard::default();
        let d = m.distort_point(p, &k);
        let u = m.undistort_point(d, &k).unwrap();
        assert!((u.0 - p.0).abs() < 1e-9 && (u.1 - p.1).abs() < 1e-9, "{u:?} != {p:?}");
    }

    #[test]
    fn zero_coefficients_are_identity() {
        let m = OpenCVStandard::default();
        assert_eq!(m.undistort_point((0.25f32, -0.5), &[0.0; 5]), Some((0.25, -0.5)));
        assert_eq!(m.distort_point((0.25, -0.5), &[0.0f64; 5]), (0.25, -0.5));
    }
}
