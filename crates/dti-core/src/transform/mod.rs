//! Spatial and tensor transforms.
//!
//! Point transforms map output positions to input positions. Tensor
//! transforms wrap them and add the reorientation of the sampled tensor.

pub mod bspline;
pub mod bulk;
pub mod displacement_field;
pub mod matrix_offset;
pub mod reorientation;
pub mod tensor_transform;
pub mod trait_;

pub use bspline::BSplineDeformableTransform;
pub use bulk::BulkTransform;
pub use displacement_field::{sample_displacement, zero_field, DisplacementField, WarpTransform};
pub use matrix_offset::{is_rigid_matrix, MatrixOffsetTransform, RIGID_TOLERANCE};
pub use reorientation::Reorientation;
pub use tensor_transform::{
    FiniteStrainTensorTransform, NonRigidTensorTransform, PpdTensorTransform, RigidTensorTransform,
    TensorTransform,
};
pub use trait_::PointTransform;

use thiserror::Error;

/// Errors raised while constructing transforms.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransformError {
    #[error("Singular matrix: {0}")]
    Singular(String),
}

impl TransformError {
    pub fn singular(msg: impl Into<String>) -> Self {
        Self::Singular(msg.into())
    }
}
