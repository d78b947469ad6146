//! Whole-volume filters.

pub mod correction;
pub mod resample;

pub use correction::{Correction, TensorCorrectionFilter};
pub use resample::TensorResampleFilter;
