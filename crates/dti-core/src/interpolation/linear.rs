//! Trilinear interpolation.

use super::trait_::Interpolator;
use crate::image::{trilinear_neighbourhood, Image};
use crate::spatial::Point3;

/// Trilinear interpolation over the eight surrounding voxels.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearInterpolator;

impl Interpolator for LinearInterpolator {
    fn evaluate(&self, coefficients: &Image<f64>, index: &Point3) -> f64 {
        let data = coefficients.data();
        trilinear_neighbourhood(index, coefficients.size())
            .map(|n| n.iter().map(|(offset, w)| data[*offset] * w).sum())
            .unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::ImageGeometry;

    #[test]
    fn test_linear_reproduces_affine_field() {
        let image = Image::from_fn(ImageGeometry::with_size([4, 4, 4]), |[x, y, z]| {
            1.0 + 2.0 * x as f64 - y as f64 + 0.5 * z as f64
        });
        let k = LinearInterpolator;
        let p = Point3::new([1.3, 2.7, 0.25]);
        let expected = 1.0 + 2.0 * 1.3 - 2.7 + 0.5 * 0.25;
        let got = k.evaluate(&image, &p);
        assert!((got - expected).abs() < 1e-12, "got {}, expected {}", got, expected);
    }

    #[test]
    fn test_linear_at_grid_points() {
        let image = Image::from_fn(ImageGeometry::with_size([2, 2, 2]), |[x, y, z]| {
            (x * 4 + y * 2 + z) as f64
        });
        let k = LinearInterpolator;
        assert_eq!(k.evaluate(&image, &Point3::new([1.0, 1.0, 1.0])), 7.0);
        assert_eq!(k.evaluate(&image, &Point3::new([0.0, 1.0, 0.0])), 2.0);
    }
}
