//! Dense displacement fields and the warp transform built on them.

use super::trait_::{finite_difference_jacobian, PointTransform};
use crate::image::{trilinear_neighbourhood, Image, ImageGeometry};
use crate::spatial::Point3;
use nalgebra::{Matrix3, Vector3};
use std::sync::Arc;

/// Image of physical displacement vectors.
pub type DisplacementField = Image<Vector3<f64>>;

/// Trilinearly interpolated displacement at a physical point, or zero when
/// the point lies outside the field.
pub fn sample_displacement(field: &DisplacementField, point: &Point3) -> Vector3<f64> {
    let index = field.geometry().physical_point_to_continuous_index(point);
    let data = field.data();
    match trilinear_neighbourhood(&index, field.size()) {
        Some(neighbours) => neighbours
            .iter()
            .fold(Vector3::zeros(), |acc, (offset, w)| acc + data[*offset] * *w),
        None => Vector3::zeros(),
    }
}

/// Zero displacement over `geometry`.
pub fn zero_field(geometry: ImageGeometry) -> DisplacementField {
    Image::filled(geometry, Vector3::zeros())
}

/// `p ↦ p + u(p)` for a displacement field `u`.
#[derive(Debug, Clone)]
pub struct WarpTransform {
    field: Arc<DisplacementField>,
}

impl WarpTransform {
    pub fn new(field: DisplacementField) -> Self {
        Self { field: Arc::new(field) }
    }

    pub fn field(&self) -> &DisplacementField {
        &self.field
    }
}

impl PointTransform for WarpTransform {
    fn transform_point(&self, point: &Point3) -> Point3 {
        Point3::from_coords(point.coords() + sample_displacement(&self.field, point))
    }

    /// Central differences one voxel either side along each field axis.
    fn jacobian(&self, point: &Point3) -> Matrix3<f64> {
        let geometry = self.field.geometry();
        let spacing = geometry.spacing();
        finite_difference_jacobian(
            |p| self.transform_point(p),
            point,
            &[spacing[0], spacing[1], spacing[2]],
            geometry.direction().inner(),
        )
    }
}
