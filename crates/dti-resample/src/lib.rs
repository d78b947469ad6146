pub mod chain;
pub mod config;
pub mod error;
pub mod field;
pub mod geometry;
pub mod io;
pub mod pipeline;

pub use chain::{classify, compose_matrices, ChainBuilder, TransformClass};
pub use config::{
    CoordinateSpace, FieldKind, ImageCenter, InterpolationType, ResampleConfig, TransformType,
    TransformsOrder,
};
pub use error::{ResampleError, Result};
pub use io::{Collaborators, LoadedTransform, MemoryStore, TensorVolume};
pub use pipeline::{resample_volume, run, run_with_exit_code};
