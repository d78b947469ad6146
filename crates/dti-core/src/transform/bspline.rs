//! Cubic B-spline free-form deformation.

use super::trait_::PointTransform;
use crate::image::{linear_index, ImageGeometry};
use crate::spatial::Point3;
use nalgebra::Vector3;

/// Cubic B-spline basis weights for fractional offset `u ∈ [0, 1)`,
/// for the four control points starting one before the cell.
fn cubic_basis(u: f64) -> [f64; 4] {
    let one_minus = 1.0 - u;
    [
        one_minus * one_minus * one_minus / 6.0,
        (3.0 * u * u * u - 6.0 * u * u + 4.0) / 6.0,
        (-3.0 * u * u * u + 3.0 * u * u + 3.0 * u + 1.0) / 6.0,
        u * u * u / 6.0,
    ]
}

/// Free-form deformation defined by displacement coefficients on a regular
/// control-point grid: `T(p) = p + Σ β(i)·c_i`.
///
/// Points whose 4×4×4 support leaves the control grid are not displaced.
#[derive(Debug, Clone)]
pub struct BSplineDeformableTransform {
    grid: ImageGeometry,
    coefficients: Vec<Vector3<f64>>,
}

impl BSplineDeformableTransform {
    /// # Panics
    /// Panics if the coefficient count does not match the control grid.
    pub fn new(grid: ImageGeometry, coefficients: Vec<Vector3<f64>>) -> Self {
        assert_eq!(
            coefficients.len(),
            grid.number_of_voxels(),
            "One coefficient per control point is required"
        );
        Self { grid, coefficients }
    }

    /// Build from a flat parameter vector laid out as all x displacements,
    /// then all y, then all z.
    pub fn from_parameters(grid: ImageGeometry, parameters: &[f64]) -> Option<Self> {
        let n = grid.number_of_voxels();
        if parameters.len() != 3 * n {
            return None;
        }
        let coefficients = (0..n)
            .map(|i| Vector3::new(parameters[i], parameters[n + i], parameters[2 * n + i]))
            .collect();
        Some(Self { grid, coefficients })
    }

    pub fn grid(&self) -> &ImageGeometry {
        &self.grid
    }

    /// Displacement at `point`.
    pub fn displacement(&self, point: &Point3) -> Vector3<f64> {
        let index = self.grid.physical_point_to_continuous_index(point);
        let size = self.grid.size();
        let mut start = [0usize; 3];
        let mut weights = [[0.0; 4]; 3];
        for axis in 0..3 {
            let cell = index[axis].floor();
            let first = cell as i64 - 1;
            if first < 0 || first + 3 >= size[axis] as i64 {
                return Vector3::zeros();
            }
            start[axis] = first as usize;
            weights[axis] = cubic_basis(index[axis] - cell);
        }

        let mut displacement = Vector3::zeros();
        for k in 0..4 {
            for j in 0..4 {
                let wjk = weights[2][k] * weights[1][j];
                for i in 0..4 {
                    let offset = linear_index([start[0] + i, start[1] + j, start[2] + k], size);
                    displacement += self.coefficients[offset] * (weights[0][i] * wjk);
                }
            }
        }
        displacement
    }
}

impl PointTransform for BSplineDeformableTransform {
    fn transform_point(&self, point: &Point3) -> Point3 {
        Point3::from_coords(point.coords() + self.displacement(point))
    }

    fn is_bspline_deformable(&self) -> bool {
        true
    }
}
