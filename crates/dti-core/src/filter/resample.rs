//! Resample tensor filter.
//!
//! For every output voxel the filter maps the physical position through the
//! transform into the input, interpolates there and reorients the result.
//! Voxels whose source position falls outside the input receive the default
//! tensor.

use crate::image::{Image, ImageGeometry};
use crate::interpolation::{BlockwiseInterpolator, Interpolator, TensorInterpolator};
use crate::parallel::with_thread_pool;
use crate::tensor::{DiffusionTensor, TensorImage, TensorPixel};
use crate::transform::TensorTransform;
use rayon::prelude::*;

/// Resamples a tensor volume onto a new grid.
///
/// The transform maps output physical space to input physical space.
pub struct TensorResampleFilter<T, K> {
    geometry: ImageGeometry,
    transform: TensorTransform,
    kernel: K,
    default_pixel_value: DiffusionTensor<T>,
    number_of_threads: usize,
}

impl<T: TensorPixel, K: Interpolator + Copy> TensorResampleFilter<T, K> {
    /// # Arguments
    /// * `geometry` - Output grid
    /// * `transform` - Output-to-input tensor transform
    /// * `kernel` - Scalar kernel applied to each tensor component
    pub fn new(geometry: ImageGeometry, transform: TensorTransform, kernel: K) -> Self {
        Self {
            geometry,
            transform,
            kernel,
            default_pixel_value: DiffusionTensor::default(),
            number_of_threads: 0,
        }
    }

    /// Every component of out-of-bounds voxels is set to `value`.
    pub fn with_default_pixel_value(mut self, value: T) -> Self {
        self.default_pixel_value = DiffusionTensor::splat(value);
        self
    }

    /// Worker count; zero selects the platform default.
    pub fn with_number_of_threads(mut self, threads: usize) -> Self {
        self.number_of_threads = threads;
        self
    }

    pub fn apply(&self, input: &TensorImage<T>) -> TensorImage<T> {
        let interpolator = BlockwiseInterpolator::new(input, self.kernel);
        with_thread_pool(self.number_of_threads, || {
            interpolator.prepare();
            self.resample(&interpolator)
        })
    }

    fn resample(&self, interpolator: &dyn TensorInterpolator) -> TensorImage<T> {
        let size = self.geometry.size();
        tracing::debug!(?size, threads = rayon::current_num_threads(), "resampling tensor volume");

        let mut out = Image::filled(self.geometry.clone(), self.default_pixel_value);
        let slab = size[0] * size[1];
        if slab == 0 {
            return out;
        }
        out.data_mut()
            .par_chunks_mut(slab)
            .enumerate()
            .for_each(|(z, voxels)| {
                for y in 0..size[1] {
                    for x in 0..size[0] {
                        let output_point = self.geometry.index_to_physical_point([x, y, z]);
                        let input_point = self.transform.evaluate_position(&output_point);
                        if let Some(tensor) = interpolator.evaluate(&input_point) {
                            let reoriented = self.transform.evaluate_tensor(&tensor, &output_point);
                            voxels[x + size[0] * y] = reoriented.cast();
                        }
                    }
                }
            });
        out
    }
}
