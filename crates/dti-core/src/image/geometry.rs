//! Sampling grid description.

use crate::spatial::{Direction3, Point3, Spacing3};
use nalgebra::Matrix3;

/// Tolerance, in index units, used when deciding whether a continuous index
/// lies inside the sampled region.
pub const INSIDE_TOLERANCE: f64 = 1e-6;

/// Size, origin, spacing and direction of a 3-D sampling grid.
///
/// Physical position of index `i` is `origin + direction · diag(spacing) · i`.
/// The forward and inverse mapping matrices are cached so that per-voxel
/// conversions do not re-invert the direction matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageGeometry {
    size: [usize; 3],
    origin: Point3,
    spacing: Spacing3,
    direction: Direction3,
    index_to_physical: Matrix3<f64>,
    physical_to_index: Matrix3<f64>,
}

impl ImageGeometry {
    pub fn new(size: [usize; 3], origin: Point3, spacing: Spacing3, direction: Direction3) -> Self {
        let index_to_physical = direction.0 * spacing.as_diagonal();
        let physical_to_index = index_to_physical.try_inverse().unwrap_or_else(|| {
            tracing::warn!(
                ?size,
                spacing = ?spacing.to_array(),
                "singular index-to-physical matrix; no physical point maps inside this grid"
            );
            Matrix3::from_element(f64::NAN)
        });
        Self {
            size,
            origin,
            spacing,
            direction,
            index_to_physical,
            physical_to_index,
        }
    }

    /// Unit-spacing, identity-direction grid at the origin.
    pub fn with_size(size: [usize; 3]) -> Self {
        Self::new(size, Point3::origin(), Spacing3::uniform(1.0), Direction3::identity())
    }

    pub fn size(&self) -> [usize; 3] {
        self.size
    }

    pub fn origin(&self) -> &Point3 {
        &self.origin
    }

    pub fn spacing(&self) -> &Spacing3 {
        &self.spacing
    }

    pub fn direction(&self) -> &Direction3 {
        &self.direction
    }

    pub fn number_of_voxels(&self) -> usize {
        self.size.iter().product()
    }

    /// A usable grid has positive spacing, a non-singular direction and no
    /// empty axis.
    pub fn is_valid(&self) -> bool {
        self.spacing.is_valid()
            && self.direction.determinant().abs() > f64::EPSILON
            && self.size.iter().all(|s| *s > 0)
    }

    pub fn index_to_physical_point(&self, index: [usize; 3]) -> Point3 {
        self.continuous_index_to_physical_point(&Point3::new([
            index[0] as f64,
            index[1] as f64,
            index[2] as f64,
        ]))
    }

    pub fn continuous_index_to_physical_point(&self, index: &Point3) -> Point3 {
        Point3::from_coords(self.origin.coords() + self.index_to_physical * index.coords())
    }

    pub fn physical_point_to_continuous_index(&self, point: &Point3) -> Point3 {
        Point3::from_coords(self.physical_to_index * (point.coords() - self.origin.coords()))
    }

    /// True when the continuous index lies within `[0, size - 1]` on every
    /// axis, up to [`INSIDE_TOLERANCE`].
    pub fn is_inside_continuous_index(&self, index: &Point3) -> bool {
        (0..3).all(|axis| {
            let upper = self.size[axis] as f64 - 1.0;
            index[axis] >= -INSIDE_TOLERANCE && index[axis] <= upper + INSIDE_TOLERANCE
        })
    }

    pub fn is_inside(&self, point: &Point3) -> bool {
        self.is_inside_continuous_index(&self.physical_point_to_continuous_index(point))
    }

    /// Physical position of the middle of the grid.
    pub fn center(&self) -> Point3 {
        let last = Point3::new([
            self.size[0].saturating_sub(1) as f64,
            self.size[1].saturating_sub(1) as f64,
            self.size[2].saturating_sub(1) as f64,
        ]);
        self.origin
            .midpoint(&self.continuous_index_to_physical_point(&last))
    }

    /// The same grid expressed in the other of the RAS/LPS conventions.
    pub fn flip_ras_lps(&self) -> Self {
        Self::new(
            self.size,
            self.origin.flip_ras_lps(),
            self.spacing,
            self.direction.flip_ras_lps(),
        )
    }

    /// True when both grids share size and, within `tolerance`, origin,
    /// spacing and direction.
    pub fn same_grid_as(&self, other: &Self, tolerance: f64) -> bool {
        self.size == other.size
            && self.origin.distance(&other.origin) < tolerance
            && (self.spacing - other.spacing).norm() < tolerance
            && (self.direction.0 - other.direction.0).amax() < tolerance
    }
}

impl Default for ImageGeometry {
    fn default() -> Self {
        Self::with_size([1, 1, 1])
    }
}
