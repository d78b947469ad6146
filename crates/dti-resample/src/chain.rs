//! Turning the configured and loaded transforms into one tensor transform.
//!
//! A transform file holds an ordered list. Linear entries are multiplied
//! into a single matrix; as soon as one entry is non-rigid the whole list
//! is flattened into a displacement field on the output grid instead.

use std::collections::VecDeque;
use std::sync::Arc;

use dti_core::image::ImageGeometry;
use dti_core::spatial::Point3;
use dti_core::transform::{
    zero_field, BulkTransform, DisplacementField, MatrixOffsetTransform, PointTransform,
    TensorTransform, WarpTransform,
};
use nalgebra::Matrix4;

use crate::config::{ResampleConfig, TransformType, TransformsOrder};
use crate::error::{ResampleError, Result};
use crate::field::compose_into_field;
use crate::io::LoadedTransform;

/// Class names accepted as rigid transforms.
pub const RIGID_CLASS_NAMES: &[&str] = &[
    "Rigid3DTransform",
    "Euler3DTransform",
    "CenteredEuler3DTransform",
    "QuaternionRigidTransform",
    "VersorTransform",
    "VersorRigid3DTransform",
    "ScaleSkewVersor3DTransform",
    "ScaleVersor3DTransform",
    "Similarity3DTransform",
];

const MATRIX_PARAMETER_COUNT: usize = 12;
const FIXED_PARAMETER_COUNT: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformClass {
    Rigid,
    Affine,
    NonRigid,
}

fn base_class_name(class_name: &str) -> &str {
    // File tags carry a `_double_3_3` style suffix.
    class_name.split('_').next().unwrap_or(class_name)
}

/// Classify a loaded transform by its class name.
pub fn classify(transform: &LoadedTransform) -> Result<TransformClass> {
    let name = transform.class_name.as_str();
    if name.contains("AffineTransform") {
        return Ok(TransformClass::Affine);
    }
    if RIGID_CLASS_NAMES.contains(&base_class_name(name)) {
        return Ok(TransformClass::Rigid);
    }
    if name.contains("Transform") {
        if transform.mapping.is_some() {
            return Ok(TransformClass::NonRigid);
        }
        return Err(ResampleError::unsupported_transform(format!(
            "{name} carries no point mapping"
        )));
    }
    Err(ResampleError::unsupported_transform(format!("{name} is not a known transform type")))
}

fn matrix_parameters(transform: &LoadedTransform) -> Result<[f64; 12]> {
    if transform.fixed_parameters.len() != FIXED_PARAMETER_COUNT {
        return Err(ResampleError::malformed_transform(format!(
            "{} has {} fixed parameters, expected {FIXED_PARAMETER_COUNT}",
            transform.class_name,
            transform.fixed_parameters.len()
        )));
    }
    transform.parameters.as_slice().try_into().map_err(|_| {
        ResampleError::malformed_transform(format!(
            "{} has {} parameters, expected {MATRIX_PARAMETER_COUNT}",
            transform.class_name,
            transform.parameters.len()
        ))
    })
}

/// Classify every entry and check matrix entries for the right parameter
/// counts. Returns the number of non-rigid entries.
pub fn count_non_rigid(transforms: &[LoadedTransform]) -> Result<usize> {
    let mut count = 0;
    for transform in transforms {
        match classify(transform)? {
            TransformClass::NonRigid => count += 1,
            TransformClass::Rigid | TransformClass::Affine => {
                matrix_parameters(transform)?;
            }
        }
    }
    Ok(count)
}

/// Multiply homogeneous matrices so that the first one is applied first:
/// `M = M_n · … · M_2 · M_1`.
pub fn compose_matrices<'a>(matrices: impl IntoIterator<Item = &'a Matrix4<f64>>) -> Matrix4<f64> {
    matrices.into_iter().fold(Matrix4::identity(), |composed, m| m * composed)
}

/// Builds the tensor transform for one run.
#[derive(Debug)]
pub struct ChainBuilder<'a> {
    config: &'a ResampleConfig,
    input: &'a ImageGeometry,
    output: &'a ImageGeometry,
}

impl<'a> ChainBuilder<'a> {
    pub fn new(
        config: &'a ResampleConfig,
        input: &'a ImageGeometry,
        output: &'a ImageGeometry,
    ) -> Self {
        Self { config, input, output }
    }

    /// Matrices are conjugated into RAS only when no deformation field is
    /// involved.
    fn ras_congruence_applies(&self) -> bool {
        self.config.is_ras() && self.config.deformation_field.is_none()
    }

    /// Build the matrix transform for one parameter set, honouring the
    /// inverse and RAS flags.
    pub fn linear_transform(
        &self,
        parameters: &[f64; 12],
        fixed_center: &Point3,
    ) -> Result<MatrixOffsetTransform> {
        let center = if self.config.centered_transform {
            self.config.transform_center(self.input, self.output)
        } else {
            *fixed_center
        };
        let mut linear = MatrixOffsetTransform::from_parameter_array(parameters, &center);
        if self.config.inverse_transform {
            linear = linear.inverse().ok_or_else(|| {
                ResampleError::singular_matrix("transform matrix cannot be inverted")
            })?;
        }
        if self.ras_congruence_applies() {
            linear = linear.ras_congruence();
        }
        Ok(linear)
    }

    /// The transform described by the matrix knobs, used when no file is given.
    pub fn command_line_transform(&self) -> Result<TensorTransform> {
        let center = Point3::new(self.config.rotation_center);
        let linear = self.linear_transform(&self.config.transform_matrix, &center)?;
        let reorientation = self.config.reorientation;
        Ok(match self.config.transform_type {
            TransformType::Rigid => TensorTransform::rigid_or_affine(linear, reorientation, true)?,
            TransformType::Affine | TransformType::NonRigid => {
                TensorTransform::affine(linear, reorientation)?
            }
        })
    }

    fn entry_linear(&self, entry: &LoadedTransform) -> Result<MatrixOffsetTransform> {
        let parameters = matrix_parameters(entry)?;
        let fixed = &entry.fixed_parameters;
        self.linear_transform(&parameters, &Point3::new([fixed[0], fixed[1], fixed[2]]))
    }

    /// Turn one file entry into a tensor transform.
    pub fn entry_transform(&self, entry: &LoadedTransform) -> Result<TensorTransform> {
        let reorientation = self.config.reorientation;
        match classify(entry)? {
            TransformClass::Rigid => {
                let linear = self.entry_linear(entry)?;
                Ok(TensorTransform::rigid_or_affine(linear, reorientation, false)?)
            }
            TransformClass::Affine => {
                Ok(TensorTransform::affine(self.entry_linear(entry)?, reorientation)?)
            }
            TransformClass::NonRigid => {
                let mapping = entry.mapping.clone().ok_or_else(|| {
                    ResampleError::unsupported_transform(format!(
                        "{} carries no point mapping",
                        entry.class_name
                    ))
                })?;
                Ok(TensorTransform::non_rigid(mapping, reorientation))
            }
        }
    }

    /// Build the final transform from the file entries (empty when no file
    /// was given) and an optional deformation field already on the output
    /// grid.
    pub fn build(
        &self,
        transforms: Vec<LoadedTransform>,
        field: Option<DisplacementField>,
    ) -> Result<TensorTransform> {
        let non_rigid = count_non_rigid(&transforms)?;
        let has_file = self.config.transformation_file.is_some();
        let mut queue = TransformQueue::new(transforms, self.config.transforms_order);

        if (has_file && queue.len() > 1 && non_rigid > 0) || field.is_some() {
            return self.build_field(queue, field);
        }
        if has_file && queue.len() > 1 {
            let mut composed = MatrixOffsetTransform::identity();
            while let Some(entry) = queue.pop() {
                composed = self.entry_linear(&entry)?.compose(&composed);
            }
            tracing::debug!(matrix = ?composed.to_homogeneous(), "composed linear transforms");
            return Ok(TensorTransform::affine(composed, self.config.reorientation)?);
        }
        if has_file {
            let entry = queue.pop().ok_or_else(|| {
                ResampleError::missing_input("transformation file holds no transform")
            })?;
            return self.entry_transform(&entry);
        }
        self.command_line_transform()
    }

    fn build_field(
        &self,
        mut queue: TransformQueue,
        field: Option<DisplacementField>,
    ) -> Result<TensorTransform> {
        let threads = self.config.number_of_threads;
        let mut field = field.unwrap_or_else(|| zero_field(self.output.clone()));
        while let Some(entry) = queue.pop() {
            let transform = self.entry_transform(&entry)?;
            let bulk = if !self.config.no_bulk && transform.is_bspline_deformable() {
                queue.pop()
            } else {
                None
            };
            let point_transform: Arc<dyn PointTransform> = match bulk {
                Some(bulk) => {
                    tracing::debug!(
                        class = %entry.class_name,
                        bulk = %bulk.class_name,
                        "attaching bulk transform"
                    );
                    let bulk = Arc::new(self.entry_transform(&bulk)?);
                    Arc::new(BulkTransform::new(Arc::new(transform), bulk))
                }
                None => Arc::new(transform),
            };
            compose_into_field(&mut field, point_transform.as_ref(), threads);
        }
        Ok(TensorTransform::non_rigid(
            Arc::new(WarpTransform::new(field)),
            self.config.reorientation,
        ))
    }
}

/// Transform list consumed in the configured order.
#[derive(Debug)]
struct TransformQueue {
    entries: VecDeque<LoadedTransform>,
    order: TransformsOrder,
}

impl TransformQueue {
    fn new(entries: Vec<LoadedTransform>, order: TransformsOrder) -> Self {
        Self { entries: entries.into(), order }
    }

    fn pop(&mut self) -> Option<LoadedTransform> {
        match self.order {
            TransformsOrder::OutputToInput => self.entries.pop_front(),
            TransformsOrder::InputToOutput => self.entries.pop_back(),
        }
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}
