//! Core of diffusion tensor volume resampling: geometry, tensor pixels,
//! blockwise interpolation, tensor transforms and the resample filter.

pub mod filter;
pub mod image;
pub mod interpolation;
pub mod parallel;
pub mod spatial;
pub mod tensor;
pub mod transform;

pub use image::{Image, ImageGeometry};
pub use spatial::{Direction, Point, Spacing, Vector};
pub use tensor::{ComponentType, DiffusionTensor, TensorImage, TensorPixel};
pub use transform::{PointTransform, Reorientation, TensorTransform};
