//! B-spline interpolation of orders 0 through 5.
//!
//! Samples are first converted into B-spline coefficients by a recursive
//! prefilter (causal and anticausal passes per pole, mirror boundary), then
//! evaluated with the order's basis weights over an `(order + 1)³` support.

use super::trait_::Interpolator;
use crate::image::{linear_index, Image};
use crate::spatial::Point3;
use rayon::prelude::*;

pub const MAX_SPLINE_ORDER: usize = 5;

const INITIALIZATION_TOLERANCE: f64 = 1e-10;

/// B-spline interpolator of a fixed order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BSplineInterpolator {
    order: usize,
}

impl BSplineInterpolator {
    /// Returns `None` for orders above [`MAX_SPLINE_ORDER`].
    pub fn new(order: usize) -> Option<Self> {
        (order <= MAX_SPLINE_ORDER).then_some(Self { order })
    }

    pub fn order(&self) -> usize {
        self.order
    }
}

impl Default for BSplineInterpolator {
    fn default() -> Self {
        Self { order: 3 }
    }
}

/// Poles of the recursive prefilter for each order.
fn poles(order: usize) -> Vec<f64> {
    match order {
        2 => vec![8f64.sqrt() - 3.0],
        3 => vec![3f64.sqrt() - 2.0],
        4 => vec![
            (664.0 - 438976f64.sqrt()).sqrt() + 304f64.sqrt() - 19.0,
            (664.0 + 438976f64.sqrt()).sqrt() - 304f64.sqrt() - 19.0,
        ],
        5 => vec![
            (135.0 / 2.0 - (17745.0f64 / 4.0).sqrt()).sqrt() + (105.0f64 / 4.0).sqrt() - 13.0 / 2.0,
            (135.0 / 2.0 + (17745.0f64 / 4.0).sqrt()).sqrt() - (105.0f64 / 4.0).sqrt() - 13.0 / 2.0,
        ],
        _ => Vec::new(),
    }
}

fn initial_causal_coefficient(c: &[f64], z: f64) -> f64 {
    let n = c.len();
    let horizon = ((INITIALIZATION_TOLERANCE.ln() / z.abs().ln()).ceil() as usize).max(1);
    if horizon < n {
        let mut zn = z;
        let mut sum = c[0];
        for value in c.iter().take(horizon).skip(1) {
            sum += zn * value;
            zn *= z;
        }
        sum
    } else {
        let mut zn = z;
        let iz = 1.0 / z;
        let mut z2n = z.powi(n as i32 - 1);
        let mut sum = c[0] + z2n * c[n - 1];
        z2n *= z2n * iz;
        for value in c.iter().take(n - 1).skip(1) {
            sum += (zn + z2n) * value;
            zn *= z;
            z2n *= iz;
        }
        sum / (1.0 - zn * zn)
    }
}

fn initial_anticausal_coefficient(c: &[f64], z: f64) -> f64 {
    let n = c.len();
    (z / (z * z - 1.0)) * (z * c[n - 2] + c[n - 1])
}

/// In-place conversion of one line of samples into spline coefficients.
fn prefilter_line(c: &mut [f64], poles: &[f64]) {
    let n = c.len();
    if n < 2 || poles.is_empty() {
        return;
    }
    let gain: f64 = poles.iter().map(|z| (1.0 - z) * (1.0 - 1.0 / z)).product();
    c.iter_mut().for_each(|v| *v *= gain);

    for &z in poles {
        c[0] = initial_causal_coefficient(c, z);
        for k in 1..n {
            c[k] += z * c[k - 1];
        }
        c[n - 1] = initial_anticausal_coefficient(c, z);
        for k in (0..n - 1).rev() {
            c[k] = z * (c[k + 1] - c[k]);
        }
    }
}

/// Run the prefilter along `axis` over every line of the buffer.
fn prefilter_axis(data: &mut [f64], size: [usize; 3], axis: usize, poles: &[f64]) {
    let len = size[axis];
    if len < 2 {
        return;
    }
    if axis == 0 {
        data.par_chunks_mut(len).for_each(|line| prefilter_line(line, poles));
        return;
    }

    let (a, b) = if axis == 1 { (0, 2) } else { (0, 1) };
    let starts: Vec<[usize; 3]> = (0..size[b])
        .flat_map(|j| (0..size[a]).map(move |i| (i, j)))
        .map(|(i, j)| {
            let mut start = [0usize; 3];
            start[a] = i;
            start[b] = j;
            start
        })
        .collect();

    let source: &[f64] = data;
    let lines: Vec<Vec<f64>> = starts
        .par_iter()
        .map(|start| {
            let mut line: Vec<f64> = (0..len)
                .map(|k| {
                    let mut index = *start;
                    index[axis] = k;
                    source[linear_index(index, size)]
                })
                .collect();
            prefilter_line(&mut line, poles);
            line
        })
        .collect();

    for (start, line) in starts.iter().zip(lines) {
        for (k, value) in line.into_iter().enumerate() {
            let mut index = *start;
            index[axis] = k;
            data[linear_index(index, size)] = value;
        }
    }
}

/// Reflect an index into `[0, len)` about the end samples.
#[inline]
fn mirror(index: i64, len: usize) -> usize {
    if len == 1 {
        return 0;
    }
    let period = 2 * len as i64 - 2;
    let mut i = index.rem_euclid(period);
    if i >= len as i64 {
        i = period - i;
    }
    i as usize
}

/// Basis weights of the given order for a fractional position.
///
/// `x` is the continuous coordinate and `start` the first support index.
fn weights(order: usize, x: f64, start: i64, out: &mut [f64; MAX_SPLINE_ORDER + 1]) {
    match order {
        0 => out[0] = 1.0,
        1 => {
            let w = x - start as f64;
            out[1] = w;
            out[0] = 1.0 - w;
        }
        2 => {
            let w = x - (start + 1) as f64;
            out[1] = 0.75 - w * w;
            out[2] = 0.5 * (w - out[1] + 1.0);
            out[0] = 1.0 - out[1] - out[2];
        }
        3 => {
            let w = x - (start + 1) as f64;
            out[3] = (1.0 / 6.0) * w * w * w;
            out[0] = (1.0 / 6.0) + 0.5 * w * (w - 1.0) - out[3];
            out[2] = w + out[0] - 2.0 * out[3];
            out[1] = 1.0 - out[0] - out[2] - out[3];
        }
        4 => {
            let w = x - (start + 2) as f64;
            let w2 = w * w;
            let t = (1.0 / 6.0) * w2;
            out[0] = 0.5 - w;
            out[0] *= out[0];
            out[0] *= (1.0 / 24.0) * out[0];
            let t0 = w * (t - 11.0 / 24.0);
            let t1 = 19.0 / 96.0 + w2 * (0.25 - t);
            out[1] = t1 + t0;
            out[3] = t1 - t0;
            out[4] = out[0] + t0 + 0.5 * w;
            out[2] = 1.0 - out[0] - out[1] - out[3] - out[4];
        }
        _ => {
            let mut w = x - (start + 2) as f64;
            let mut w2 = w * w;
            out[5] = (1.0 / 120.0) * w * w2 * w2;
            w2 -= w;
            let w4 = w2 * w2;
            w -= 0.5;
            let t = w2 * (w2 - 3.0);
            out[0] = (1.0 / 24.0) * (1.0 / 5.0 + w2 + w4) - out[5];
            let t0 = (1.0 / 24.0) * (w2 * (w2 - 5.0) + 46.0 / 5.0);
            let t1 = (-1.0 / 12.0) * w * (t + 4.0);
            out[2] = t0 + t1;
            out[3] = t0 - t1;
            let t0 = (1.0 / 16.0) * (9.0 / 5.0 - t);
            let t1 = (1.0 / 24.0) * w * (w4 - w2 - 5.0);
            out[1] = t0 + t1;
            out[4] = t0 - t1;
        }
    }
}

impl Interpolator for BSplineInterpolator {
    fn prepare(&self, component: Image<f64>) -> Image<f64> {
        let poles = poles(self.order);
        if poles.is_empty() {
            return component;
        }
        let size = component.size();
        let geometry = component.geometry().clone();
        let mut data = component.into_data();
        for axis in 0..3 {
            prefilter_axis(&mut data, size, axis, &poles);
        }
        Image::from_vec(geometry, data)
    }

    fn evaluate(&self, coefficients: &Image<f64>, index: &Point3) -> f64 {
        let size = coefficients.size();
        let support = self.order + 1;
        let mut w = [[0.0f64; MAX_SPLINE_ORDER + 1]; 3];
        let mut idx = [[0usize; MAX_SPLINE_ORDER + 1]; 3];

        for axis in 0..3 {
            let x = index[axis];
            let start = if self.order % 2 == 1 {
                x.floor() as i64 - (self.order / 2) as i64
            } else {
                (x + 0.5).floor() as i64 - (self.order / 2) as i64
            };
            weights(self.order, x, start, &mut w[axis]);
            for k in 0..support {
                idx[axis][k] = mirror(start + k as i64, size[axis]);
            }
        }

        let data = coefficients.data();
        let mut value = 0.0;
        for k in 0..support {
            for j in 0..support {
                let wjk = w[2][k] * w[1][j];
                for i in 0..support {
                    let offset = linear_index([idx[0][i], idx[1][j], idx[2][k]], size);
                    value += w[0][i] * wjk * data[offset];
                }
            }
        }
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::ImageGeometry;

    fn ramp(size: [usize; 3]) -> Image<f64> {
        Image::from_fn(ImageGeometry::with_size(size), |[x, y, z]| {
            0.5 + x as f64 - 2.0 * y as f64 + 0.25 * (z * z) as f64
        })
    }

    #[test]
    fn test_weights_partition_of_unity() {
        for order in 0..=MAX_SPLINE_ORDER {
            let x: f64 = 2.37;
            let start = if order % 2 == 1 {
                x.floor() as i64 - (order / 2) as i64
            } else {
                (x + 0.5f64).floor() as i64 - (order / 2) as i64
            };
            let mut w = [0.0; MAX_SPLINE_ORDER + 1];
            weights(order, x, start, &mut w);
            let total: f64 = w[..=order].iter().sum();
            assert!((total - 1.0).abs() < 1e-12, "order {} sums to {}", order, total);
        }
    }

    #[test]
    fn test_interpolates_samples_exactly() {
        let image = ramp([6, 5, 7]);
        for order in 0..=MAX_SPLINE_ORDER {
            let k = BSplineInterpolator::new(order).unwrap();
            let coefficients = k.prepare(image.clone());
            for index in [[0, 0, 0], [3, 2, 4], [5, 4, 6], [1, 3, 2]] {
                let p = Point3::new([index[0] as f64, index[1] as f64, index[2] as f64]);
                let got = k.evaluate(&coefficients, &p);
                let expected = image.get(index);
                assert!(
                    (got - expected).abs() < 1e-6,
                    "order {} at {:?}: got {}, expected {}",
                    order, index, got, expected
                );
            }
        }
    }

    #[test]
    fn test_cubic_reproduces_linear_ramp_between_samples() {
        let image = Image::from_fn(ImageGeometry::with_size([32, 32, 32]), |[x, y, z]| {
            x as f64 + 2.0 * y as f64 - z as f64
        });
        let k = BSplineInterpolator::default();
        let coefficients = k.prepare(image);
        let got = k.evaluate(&coefficients, &Point3::new([15.4, 16.1, 15.6]));
        let expected = 15.4 + 32.2 - 15.6;
        assert!((got - expected).abs() < 1e-6, "got {}, expected {}", got, expected);
    }

    #[test]
    fn test_mirror_boundary() {
        assert_eq!(mirror(-1, 5), 1);
        assert_eq!(mirror(-2, 5), 2);
        assert_eq!(mirror(5, 5), 3);
        assert_eq!(mirror(9, 5), 1);
        assert_eq!(mirror(3, 1), 0);
    }

    #[test]
    fn test_rejects_high_order() {
        assert!(BSplineInterpolator::new(6).is_none());
        assert_eq!(BSplineInterpolator::new(5).map(|k| k.order()), Some(5));
    }
}
