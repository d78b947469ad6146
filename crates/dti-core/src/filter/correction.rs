//! Eigenvalue corrections for resampled tensors.

use crate::parallel::with_thread_pool;
use crate::tensor::algebra::{abs_correction, nearest_correction, zero_correction};
use crate::tensor::{DiffusionTensor, TensorImage, TensorPixel};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Repair policy for tensors that are not positive semi-definite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Correction {
    #[default]
    None,
    /// Negative eigenvalues become a small positive value.
    Zero,
    /// Eigenvalues are replaced by their absolute values.
    Abs,
    /// Nearest positive semi-definite matrix.
    Nearest,
}

impl Correction {
    pub fn apply<T: TensorPixel>(self, tensor: &DiffusionTensor<T>) -> DiffusionTensor<T> {
        let m = tensor.to_matrix();
        let fixed = match self {
            Correction::None => return *tensor,
            Correction::Zero => zero_correction(&m),
            Correction::Abs => abs_correction(&m),
            Correction::Nearest => nearest_correction(&m),
        };
        DiffusionTensor::from_matrix(&fixed)
    }
}

/// Applies a [`Correction`] to every voxel of a tensor volume.
#[derive(Debug, Clone, Copy, Default)]
pub struct TensorCorrectionFilter {
    correction: Correction,
    number_of_threads: usize,
}

impl TensorCorrectionFilter {
    pub fn new(correction: Correction) -> Self {
        Self {
            correction,
            number_of_threads: 0,
        }
    }

    pub fn with_number_of_threads(mut self, threads: usize) -> Self {
        self.number_of_threads = threads;
        self
    }

    pub fn apply<T: TensorPixel>(&self, mut image: TensorImage<T>) -> TensorImage<T> {
        if self.correction == Correction::None {
            return image;
        }
        tracing::debug!(correction = ?self.correction, "correcting tensor eigenvalues");
        let correction = self.correction;
        with_thread_pool(self.number_of_threads, || {
            image
                .data_mut()
                .par_iter_mut()
                .for_each(|t| *t = correction.apply(t));
        });
        image
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::{Image, ImageGeometry};
    use crate::tensor::eigen_decompose;

    #[test]
    fn test_none_is_identity() {
        let t = DiffusionTensor::new([-1.0f64, 0.5, 0.0, 2.0, 0.0, 3.0]);
        assert_eq!(Correction::None.apply(&t), t);
    }

    #[test]
    fn test_filter_applies_to_every_voxel() {
        let bad = DiffusionTensor::new([-0.1f64, 0.0, 0.0, 2.0, 0.0, 3.0]);
        let image = Image::filled(ImageGeometry::with_size([3, 2, 2]), bad);
        let fixed = TensorCorrectionFilter::new(Correction::Abs)
            .with_number_of_threads(2)
            .apply(image);
        for t in fixed.data() {
            let values = eigen_decompose(&t.to_matrix()).values;
            assert!((values[0] - 0.1).abs() < 1e-12);
        }
    }
}
