//! Nearest neighbor interpolation.

use super::trait_::Interpolator;
use crate::image::Image;
use crate::spatial::Point3;

/// Returns the voxel whose index is nearest, rounding halves upward.
#[derive(Debug, Clone, Copy, Default)]
pub struct NearestNeighborInterpolator;

impl Interpolator for NearestNeighborInterpolator {
    fn evaluate(&self, coefficients: &Image<f64>, index: &Point3) -> f64 {
        let size = coefficients.size();
        let mut nearest = [0usize; 3];
        for axis in 0..3 {
            let last = size[axis].saturating_sub(1) as f64;
            nearest[axis] = (index[axis] + 0.5).floor().clamp(0.0, last) as usize;
        }
        coefficients.get(nearest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::ImageGeometry;

    #[test]
    fn test_nearest_rounding() {
        let image = Image::from_fn(ImageGeometry::with_size([3, 3, 3]), |[x, y, z]| {
            (x + 3 * y + 9 * z) as f64
        });
        let k = NearestNeighborInterpolator;
        assert_eq!(k.evaluate(&image, &Point3::new([0.4, 0.0, 0.0])), 0.0);
        assert_eq!(k.evaluate(&image, &Point3::new([0.5, 0.0, 0.0])), 1.0);
        assert_eq!(k.evaluate(&image, &Point3::new([1.6, 1.2, 2.0])), 23.0);
        assert_eq!(k.evaluate(&image, &Point3::new([2.0 + 1e-7, -1e-7, 0.0])), 2.0);
    }
}
