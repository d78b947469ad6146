//! Windowed sinc interpolation with a fixed radius of three voxels.

use super::trait_::Interpolator;
use crate::image::{linear_index, Image};
use crate::spatial::Point3;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Kernel radius in voxels.
pub const RADIUS: usize = 3;

const WINDOW_SIZE: usize = 2 * RADIUS;

/// Window applied to the sinc kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowFunction {
    #[default]
    Hamming,
    Cosine,
    Welch,
    Lanczos,
    Blackman,
}

impl WindowFunction {
    /// Window value at distance `x`, for `|x| < RADIUS`.
    pub fn evaluate(self, x: f64) -> f64 {
        let m = RADIUS as f64;
        match self {
            WindowFunction::Hamming => 0.54 + 0.46 * (PI * x / m).cos(),
            WindowFunction::Cosine => (PI * x / (2.0 * m)).cos(),
            WindowFunction::Welch => 1.0 - x * x / (m * m),
            WindowFunction::Lanczos => sinc(x / m),
            WindowFunction::Blackman => {
                0.42 + 0.5 * (PI * x / m).cos() + 0.08 * (2.0 * PI * x / m).cos()
            }
        }
    }
}

/// Normalized sinc, `sin(πx)/(πx)`.
fn sinc(x: f64) -> f64 {
    if x == 0.0 {
        1.0
    } else {
        let px = PI * x;
        px.sin() / px
    }
}

/// Windowed sinc interpolator.
///
/// Samples outside the image contribute zero, and weights are not
/// renormalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WindowedSincInterpolator {
    window: WindowFunction,
}

impl WindowedSincInterpolator {
    pub fn new(window: WindowFunction) -> Self {
        Self { window }
    }

    fn axis_weights(&self, x: f64) -> (i64, [f64; WINDOW_SIZE]) {
        let base = x.floor();
        let distance = x - base;
        let mut weights = [0.0; WINDOW_SIZE];
        for (i, w) in weights.iter_mut().enumerate() {
            let offset = i as f64 + 1.0 - RADIUS as f64;
            *w = if distance == 0.0 {
                if offset == 0.0 { 1.0 } else { 0.0 }
            } else {
                let u = distance - offset;
                self.window.evaluate(u) * sinc(u)
            };
        }
        (base as i64 + 1 - RADIUS as i64, weights)
    }
}

impl Interpolator for WindowedSincInterpolator {
    fn evaluate(&self, coefficients: &Image<f64>, index: &Point3) -> f64 {
        let size = coefficients.size();
        let axes = [
            self.axis_weights(index[0]),
            self.axis_weights(index[1]),
            self.axis_weights(index[2]),
        ];
        let inside = |axis: usize, i: i64| i >= 0 && (i as usize) < size[axis];

        let data = coefficients.data();
        let mut value = 0.0;
        for (k, wz) in axes[2].1.iter().enumerate() {
            let z = axes[2].0 + k as i64;
            if *wz == 0.0 || !inside(2, z) {
                continue;
            }
            for (j, wy) in axes[1].1.iter().enumerate() {
                let y = axes[1].0 + j as i64;
                if *wy == 0.0 || !inside(1, y) {
                    continue;
                }
                for (i, wx) in axes[0].1.iter().enumerate() {
                    let x = axes[0].0 + i as i64;
                    if *wx == 0.0 || !inside(0, x) {
                        continue;
                    }
                    let offset = linear_index([x as usize, y as usize, z as usize], size);
                    value += wx * wy * wz * data[offset];
                }
            }
        }
        value
    }
}
