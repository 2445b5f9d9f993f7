//! Constant-velocity Kalman filter over the SORT state space, using ndarray and
//! a nalgebra-based inverse.
//!
//! The state is `[cx, cy, s, r, vcx, vcy, vs]`: box center, area and aspect
//! ratio, plus the velocities of the first three. The aspect ratio is
//! assumed constant.

use ndarray::{Array1, Array2};

use crate::error::TrackerError;

const STATE_DIM: usize = 7;
const MEASUREMENT_DIM: usize = 4;

#[derive(Debug, Clone)]
pub struct KalmanFilter {
    motion_mat: Array2<f64>,
    update_mat: Array2<f64>,
    process_noise: Array2<f64>,
    measurement_noise: Array2<f64>,
    initial_covariance: Array2<f64>,
}

impl Default for KalmanFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl KalmanFilter {
    pub fn new() -> Self {
        let mut motion_mat = Array2::<f64>::eye(STATE_DIM);
        for i in 0..3 {
            motion_mat[[i, MEASUREMENT_DIM + i]] = 1.0;
        }

        let mut update_mat = Array2::<f64>::zeros((MEASUREMENT_DIM, STATE_DIM));
        for i in 0..MEASUREMENT_DIM {
            update_mat[[i, i]] = 1.0;
        }

        Self {
            motion_mat,
            update_mat,
            process_noise: diagonal(&[1.0, 1.0, 1.0, 1.0, 1e-2, 1e-2, 1e-4]),
            measurement_noise: diagonal(&[1.0, 1.0, 10.0, 10.0]),
            // Velocities start unobserved.
            initial_covariance: diagonal(&[10.0, 10.0, 10.0, 10.0, 1e4, 1e4, 1e4]),
        }
    }

    /// Create the initial state from an `[cx, cy, s, r]` measurement.
    pub fn initiate(&self, measurement: [f64; 4]) -> (Array1<f64>, Array2<f64>) {
        let mut mean = Array1::zeros(STATE_DIM);
        for i in 0..MEASUREMENT_DIM {
            mean[i] = measurement[i];
        }
        (mean, self.initial_covariance.clone())
    }

    /// Advance the state one time step.
    ///
    /// If the predicted area would become non-positive, the area velocity is
    /// zeroed before projecting.
    pub fn predict(
        &self,
        mean: &Array1<f64>,
        covariance: &Array2<f64>,
    ) -> (Array1<f64>, Array2<f64>) {
        let mut mean = mean.clone();
        if mean[2] + mean[6] <= 0.0 {
            mean[6] = 0.0;
        }

        let new_mean = self.motion_mat.dot(&mean);
        let new_covariance =
            self.motion_mat.dot(covariance).dot(&self.motion_mat.t()) + &self.process_noise;

        (new_mean, new_covariance)
    }

    /// Project the state into measurement space.
    pub fn project(
        &self,
        mean: &Array1<f64>,
        covariance: &Array2<f64>,
    ) -> (Array1<f64>, Array2<f64>) {
        let mean_proj = self.update_mat.dot(mean);
        let covariance_proj =
            self.update_mat.dot(covariance).dot(&self.update_mat.t()) + &self.measurement_noise;

        (mean_proj, covariance_proj)
    }

    pub fn update(
        &self,
        mean: &Array1<f64>,
        covariance: &Array2<f64>,
        measurement: [f64; 4],
    ) -> Result<(Array1<f64>, Array2<f64>), TrackerError> {
        let (projected_mean, projected_cov) = self.project(mean, covariance);

        let measurement_arr = Array1::from_vec(measurement.to_vec());
        let innovation = measurement_arr - projected_mean;

        // K = P * H^T * S^-1
        // Since H is [I 0], P * H^T is the first 4 columns of P (7x4).
        // S is projected_cov (4x4).
        let s_inv = invert_4x4(&projected_cov)?;

        let pht = covariance.dot(&self.update_mat.t()); // 7x4
        let kalman_gain = pht.dot(&s_inv); // 7x4

        let new_mean = mean + &kalman_gain.dot(&innovation);
        let new_covariance = covariance - &kalman_gain.dot(&projected_cov).dot(&kalman_gain.t());

        Ok((new_mean, new_covariance))
    }
}

fn diagonal(values: &[f64]) -> Array2<f64> {
    Array2::from_diag(&Array1::from_vec(values.to_vec()))
}

/// Invert a 4x4 matrix using nalgebra (pure Rust).
fn invert_4x4(m: &Array2<f64>) -> Result<Array2<f64>, TrackerError> {
    let mut nm = nalgebra::Matrix4::zeros();
    for i in 0..4 {
        for j in 0..4 {
            nm[(i, j)] = m[[i, j]];
        }
    }
    let inv = nm.try_inverse().ok_or(TrackerError::SingularCovariance)?;
    let mut res = Array2::zeros((4, 4));
    for i in 0..4 {
        for j in 0..4 {
            res[[i, j]] = inv[(i, j)];
        }
    }
    Ok(res)
}
