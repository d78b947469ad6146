use super::geometry::ImageGeometry;
use super::grid::{grid_index, linear_index};
use crate::spatial::{Direction3, Point3, Spacing3};
use rayon::prelude::*;

/// A 3-D image: a flat voxel buffer plus the grid that places it in
/// physical space.
///
/// # Coordinate Systems
/// * **Index Space**: voxel indices `[x, y, z]`, x varying fastest in memory
/// * **Physical Space**: continuous coordinates in millimetres
#[derive(Debug, Clone, PartialEq)]
pub struct Image<T> {
    geometry: ImageGeometry,
    data: Vec<T>,
}

impl<T: Copy> Image<T> {
    /// Wrap an existing buffer.
    ///
    /// # Panics
    /// Panics if `data.len()` does not equal the number of voxels in `geometry`.
    pub fn from_vec(geometry: ImageGeometry, data: Vec<T>) -> Self {
        assert_eq!(
            data.len(),
            geometry.number_of_voxels(),
            "Image buffer length must match grid size"
        );
        Self { geometry, data }
    }

    /// Image with every voxel set to `value`.
    pub fn filled(geometry: ImageGeometry, value: T) -> Self {
        let data = vec![value; geometry.number_of_voxels()];
        Self { geometry, data }
    }

    /// Image whose voxels are produced by `f(index)`.
    pub fn from_fn(geometry: ImageGeometry, mut f: impl FnMut([usize; 3]) -> T) -> Self {
        let size = geometry.size();
        let data = (0..geometry.number_of_voxels())
            .map(|offset| f(grid_index(offset, size)))
            .collect();
        Self { geometry, data }
    }

    pub fn geometry(&self) -> &ImageGeometry {
        &self.geometry
    }

    pub fn size(&self) -> [usize; 3] {
        self.geometry.size()
    }

    pub fn origin(&self) -> &Point3 {
        self.geometry.origin()
    }

    pub fn spacing(&self) -> &Spacing3 {
        self.geometry.spacing()
    }

    pub fn direction(&self) -> &Direction3 {
        self.geometry.direction()
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn into_data(self) -> Vec<T> {
        self.data
    }

    #[inline]
    pub fn get(&self, index: [usize; 3]) -> T {
        self.data[linear_index(index, self.geometry.size())]
    }

    #[inline]
    pub fn set(&mut self, index: [usize; 3], value: T) {
        let offset = linear_index(index, self.geometry.size());
        self.data[offset] = value;
    }

    /// Replace the grid while keeping the voxel buffer.
    ///
    /// # Panics
    /// Panics if the new grid has a different voxel count.
    pub fn with_geometry(mut self, geometry: ImageGeometry) -> Self {
        assert_eq!(geometry.number_of_voxels(), self.data.len());
        self.geometry = geometry;
        self
    }

    pub fn map<U: Copy>(&self, f: impl Fn(T) -> U) -> Image<U> {
        Image {
            geometry: self.geometry.clone(),
            data: self.data.iter().map(|v| f(*v)).collect(),
        }
    }
}

impl<T: Copy + Send + Sync> Image<T> {
    /// Parallel voxel-wise map.
    pub fn par_map<U: Copy + Send>(&self, f: impl Fn(T) -> U + Sync + Send) -> Image<U> {
        Image {
            geometry: self.geometry.clone(),
            data: self.data.par_iter().map(|v| f(*v)).collect(),
        }
    }
}
