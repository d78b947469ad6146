//! Diffusion tensor pixels and the symmetric-matrix algebra used on them.

pub mod algebra;
pub mod diffusion_tensor;
pub mod pixel;

pub use algebra::{eigen_decompose, reconstruct, Eigensystem};
pub use diffusion_tensor::DiffusionTensor;
pub use pixel::{ComponentType, TensorPixel};

use crate::image::Image;

/// Image of diffusion tensors with component type `T`.
pub type TensorImage<T> = Image<DiffusionTensor<T>>;
