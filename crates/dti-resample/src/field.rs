//! Deformation field helpers used while flattening a transform chain.

use dti_core::image::{grid_index, Image, ImageGeometry};
use dti_core::parallel::with_thread_pool;
use dti_core::spatial::Point3;
use dti_core::transform::{sample_displacement, DisplacementField, PointTransform};
use rayon::prelude::*;

const SAME_GRID_TOLERANCE: f64 = 1e-9;

/// Convert absolute target positions into displacements:
/// `u(i) = h(i) − x(i)`.
pub fn hfield_to_displacement(hfield: DisplacementField) -> DisplacementField {
    let geometry = hfield.geometry().clone();
    let size = geometry.size();
    let mut field = hfield;
    field.data_mut().par_iter_mut().enumerate().for_each(|(offset, v)| {
        let position = geometry.index_to_physical_point(grid_index(offset, size));
        *v -= position.coords();
    });
    field
}

/// Resample `field` onto `geometry` with trilinear vector interpolation,
/// zero outside the source field. Returns the field unchanged when it
/// already lies on that grid.
pub fn resample_field(
    field: DisplacementField,
    geometry: &ImageGeometry,
    threads: usize,
) -> DisplacementField {
    if field.geometry().same_grid_as(geometry, SAME_GRID_TOLERANCE) {
        return field;
    }
    tracing::debug!(
        from = ?field.size(),
        to = ?geometry.size(),
        "resampling deformation field onto output grid"
    );
    let size = geometry.size();
    let data: Vec<_> = with_thread_pool(threads, || {
        (0..geometry.number_of_voxels())
            .into_par_iter()
            .map(|offset| {
                let point = geometry.index_to_physical_point(grid_index(offset, size));
                sample_displacement(&field, &point)
            })
            .collect()
    });
    Image::from_vec(geometry.clone(), data)
}

/// Push a transform into the field: `u'(x) = T(x + u(x)) − x`.
pub fn compose_into_field(
    field: &mut DisplacementField,
    transform: &dyn PointTransform,
    threads: usize,
) {
    let geometry = field.geometry().clone();
    let size = geometry.size();
    with_thread_pool(threads, || {
        field.data_mut().par_iter_mut().enumerate().for_each(|(offset, u)| {
            let x = geometry.index_to_physical_point(grid_index(offset, size));
            let moved = transform.transform_point(&Point3::from_coords(x.coords() + *u));
            *u = moved.coords() - x.coords();
        });
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use dti_core::spatial::{Direction3, Spacing3};
    use dti_core::transform::{zero_field, MatrixOffsetTransform};
    use nalgebra::{Matrix3, Vector3};

    fn geometry() -> ImageGeometry {
        ImageGeometry::new(
            [4, 3, 2],
            Point3::new([1.0, 2.0, 3.0]),
            Spacing3::new([0.5, 1.0, 2.0]),
            Direction3::identity(),
        )
    }

    #[test]
    fn test_hfield_of_identity_is_zero() {
        let g = geometry();
        let positions =
            Image::from_fn(g.clone(), |index| *g.index_to_physical_point(index).coords());
        let field = hfield_to_displacement(positions);
        assert!(field.data().iter().all(|u| u.amax() < 1e-12));
    }

    #[test]
    fn test_compose_translations() {
        let mut field = zero_field(geometry());
        let shift = MatrixOffsetTransform::new(Matrix3::identity(), Vector3::new(1.0, 0.0, 0.0));
        compose_into_field(&mut field, &shift, 2);
        compose_into_field(&mut field, &shift, 0);
        assert!(field.data().iter().all(|u| (u - Vector3::new(2.0, 0.0, 0.0)).amax() < 1e-12));
    }

    #[test]
    fn test_resample_field() {
        let field = Image::filled(geometry(), Vector3::new(0.0, 1.0, 0.0));
        let same = resample_field(field.clone(), &geometry(), 0);
        assert_eq!(same, field);

        let target = ImageGeometry::new(
            [3, 3, 3],
            Point3::new([1.0, 2.0, 3.0]),
            Spacing3::uniform(1.0),
            Direction3::identity(),
        );
        let resampled = resample_field(field, &target, 2);
        assert_eq!(resampled.get([0, 0, 0]), Vector3::new(0.0, 1.0, 0.0));
        assert_eq!(resampled.get([2, 0, 0]), Vector3::zeros());
    }
}
