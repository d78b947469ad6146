//! Run configuration.
//!
//! A [`ResampleConfig`] is built once, validated, and passed by reference to
//! every stage of the run.

use crate::error::{ResampleError, Result};
use dti_core::filter::Correction;
use dti_core::image::ImageGeometry;
use dti_core::interpolation::{InterpolatorKind, WindowFunction};
use dti_core::spatial::{Direction3, Point3, Spacing3};
use dti_core::transform::Reorientation;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Identity 3×3 matrix followed by a zero translation.
pub const IDENTITY_TRANSFORM: [f64; 12] =
    [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterpolationType {
    Nearest,
    #[default]
    Linear,
    WindowedSinc,
    #[serde(rename = "bspline")]
    BSpline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformType {
    Rigid,
    #[default]
    Affine,
    NonRigid,
}

/// Which image supplies the center of a centered transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageCenter {
    #[default]
    Input,
    Output,
}

/// Order in which the entries of a transformation file are applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransformsOrder {
    InputToOutput,
    #[default]
    OutputToInput,
}

/// Coordinate convention of the volumes and transforms on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoordinateSpace {
    #[default]
    Lps,
    Ras,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    #[default]
    Displacement,
    /// Absolute target positions.
    HField,
}

/// Every knob of a resampling run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResampleConfig {
    pub input_volume: PathBuf,
    pub output_volume: PathBuf,
    /// Volume whose grid is used for any output geometry not given
    /// explicitly.
    pub reference_volume: Option<PathBuf>,
    /// All zeros means unset.
    pub output_spacing: [f64; 3],
    /// All zeros means unset.
    pub output_size: [usize; 3],
    pub output_origin: Option<[f64; 3]>,
    /// Row-major; all zeros means unset.
    pub output_direction: [f64; 9],
    /// Zero selects the platform default.
    pub number_of_threads: usize,
    pub interpolation: InterpolationType,
    pub window_function: WindowFunction,
    pub spline_order: usize,
    pub transform_type: TransformType,
    /// Row-major 3×3 matrix followed by the translation.
    pub transform_matrix: [f64; 12],
    pub rotation_center: [f64; 3],
    pub centered_transform: bool,
    pub image_center: ImageCenter,
    pub reorientation: Reorientation,
    pub transformation_file: Option<PathBuf>,
    pub inverse_transform: bool,
    pub transforms_order: TransformsOrder,
    pub space: CoordinateSpace,
    pub deformation_field: Option<PathBuf>,
    pub field_kind: FieldKind,
    pub default_pixel_value: f64,
    pub correction: Correction,
    pub no_bulk: bool,
    pub no_measurement_frame: bool,
}

impl Default for ResampleConfig {
    fn default() -> Self {
        Self {
            input_volume: PathBuf::new(),
            output_volume: PathBuf::new(),
            reference_volume: None,
            output_spacing: [0.0; 3],
            output_size: [0; 3],
            output_origin: None,
            output_direction: [0.0; 9],
            number_of_threads: 0,
            interpolation: InterpolationType::default(),
            window_function: WindowFunction::default(),
            spline_order: 3,
            transform_type: TransformType::default(),
            transform_matrix: IDENTITY_TRANSFORM,
            rotation_center: [0.0; 3],
            centered_transform: false,
            image_center: ImageCenter::default(),
            reorientation: Reorientation::default(),
            transformation_file: None,
            inverse_transform: false,
            transforms_order: TransformsOrder::default(),
            space: CoordinateSpace::default(),
            deformation_field: None,
            field_kind: FieldKind::default(),
            default_pixel_value: 0.0,
            correction: Correction::default(),
            no_bulk: false,
            no_measurement_frame: false,
        }
    }
}

impl ResampleConfig {
    pub fn new(input_volume: impl Into<PathBuf>, output_volume: impl Into<PathBuf>) -> Self {
        Self {
            input_volume: input_volume.into(),
            output_volume: output_volume.into(),
            ..Self::default()
        }
    }

    pub fn with_reference_volume(mut self, path: impl Into<PathBuf>) -> Self {
        self.reference_volume = Some(path.into());
        self
    }

    pub fn with_output_spacing(mut self, spacing: [f64; 3]) -> Self {
        self.output_spacing = spacing;
        self
    }

    pub fn with_output_size(mut self, size: [usize; 3]) -> Self {
        self.output_size = size;
        self
    }

    pub fn with_output_origin(mut self, origin: [f64; 3]) -> Self {
        self.output_origin = Some(origin);
        self
    }

    pub fn with_output_direction(mut self, direction: [f64; 9]) -> Self {
        self.output_direction = direction;
        self
    }

    pub fn with_number_of_threads(mut self, threads: usize) -> Self {
        self.number_of_threads = threads;
        self
    }

    pub fn with_interpolation(mut self, interpolation: InterpolationType) -> Self {
        self.interpolation = interpolation;
        self
    }

    pub fn with_window_function(mut self, window: WindowFunction) -> Self {
        self.window_function = window;
        self
    }

    pub fn with_spline_order(mut self, order: usize) -> Self {
        self.spline_order = order;
        self
    }

    /// Matrix transform given directly rather than through a file.
    pub fn with_transform(mut self, transform_type: TransformType, matrix: [f64; 12]) -> Self {
        self.transform_type = transform_type;
        self.transform_matrix = matrix;
        self
    }

    pub fn with_rotation_center(mut self, center: [f64; 3]) -> Self {
        self.rotation_center = center;
        self
    }

    /// Rotate about the center of the input image or of the output grid.
    pub fn with_centered_transform(mut self, center: ImageCenter) -> Self {
        self.centered_transform = true;
        self.image_center = center;
        self
    }

    pub fn with_reorientation(mut self, reorientation: Reorientation) -> Self {
        self.reorientation = reorientation;
        self
    }

    pub fn with_transformation_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.transformation_file = Some(path.into());
        self
    }

    pub fn with_inverse_transform(mut self, inverse: bool) -> Self {
        self.inverse_transform = inverse;
        self
    }

    pub fn with_transforms_order(mut self, order: TransformsOrder) -> Self {
        self.transforms_order = order;
        self
    }

    pub fn with_space(mut self, space: CoordinateSpace) -> Self {
        self.space = space;
        self
    }

    pub fn with_deformation_field(mut self, path: impl Into<PathBuf>, kind: FieldKind) -> Self {
        self.deformation_field = Some(path.into());
        self.field_kind = kind;
        self
    }

    pub fn with_default_pixel_value(mut self, value: f64) -> Self {
        self.default_pixel_value = value;
        self
    }

    pub fn with_correction(mut self, correction: Correction) -> Self {
        self.correction = correction;
        self
    }

    pub fn without_bulk_transform(mut self) -> Self {
        self.no_bulk = true;
        self
    }

    pub fn without_measurement_frame(mut self) -> Self {
        self.no_measurement_frame = true;
        self
    }

    /// Scalar kernel selected by the interpolation knobs.
    pub fn interpolator_kind(&self) -> InterpolatorKind {
        match self.interpolation {
            InterpolationType::Nearest => InterpolatorKind::NearestNeighbor,
            InterpolationType::Linear => InterpolatorKind::Linear,
            InterpolationType::WindowedSinc => InterpolatorKind::WindowedSinc {
                window: self.window_function,
            },
            InterpolationType::BSpline => InterpolatorKind::BSpline {
                order: self.spline_order,
            },
        }
    }

    pub fn is_ras(&self) -> bool {
        self.space == CoordinateSpace::Ras
    }

    /// Explicit output grid values, each `None` when unset.
    pub fn explicit_spacing(&self) -> Option<Spacing3> {
        (self.output_spacing != [0.0; 3]).then(|| Spacing3::new(self.output_spacing))
    }

    pub fn explicit_size(&self) -> Option<[usize; 3]> {
        (self.output_size != [0; 3]).then_some(self.output_size)
    }

    pub fn explicit_origin(&self) -> Option<Point3> {
        self.output_origin.map(Point3::new)
    }

    pub fn explicit_direction(&self) -> Option<Direction3> {
        let direction = Direction3::from_row_slice(&self.output_direction);
        (!direction.is_zero()).then_some(direction)
    }

    /// Check the knobs that can be checked without touching any volume.
    pub fn validate(&self) -> Result<()> {
        if self.input_volume.as_os_str().is_empty() {
            return Err(ResampleError::missing_input("no input volume given"));
        }
        if self.output_volume.as_os_str().is_empty() {
            return Err(ResampleError::missing_input("no output volume given"));
        }
        if self.interpolation == InterpolationType::BSpline && self.spline_order > 5 {
            return Err(ResampleError::invalid_configuration(format!(
                "spline order must be between 0 and 5, got {}",
                self.spline_order
            )));
        }
        if let Some(spacing) = self.explicit_spacing() {
            if !spacing.is_valid() {
                return Err(ResampleError::invalid_configuration(format!(
                    "output spacing must be positive, got {:?}",
                    self.output_spacing
                )));
            }
        }
        if let Some(size) = self.explicit_size() {
            if size.contains(&0) {
                return Err(ResampleError::invalid_configuration(format!(
                    "output size must be at least 1 along every axis, got {:?}",
                    size
                )));
            }
        }
        if let Some(direction) = self.explicit_direction() {
            if direction.determinant().abs() <= f64::EPSILON {
                return Err(ResampleError::invalid_configuration("output direction is singular"));
            }
        }
        if self.transform_type == TransformType::NonRigid
            && self.transformation_file.is_none()
            && self.deformation_field.is_none()
        {
            return Err(ResampleError::invalid_configuration(
                "a non-rigid transform needs a transformation file or a deformation field",
            ));
        }
        if !self.default_pixel_value.is_finite() {
            return Err(ResampleError::invalid_configuration("default pixel value must be finite"));
        }
        Ok(())
    }

    /// Center used for a centered transform.
    pub(crate) fn transform_center(&self, input: &ImageGeometry, output: &ImageGeometry) -> Point3 {
        if !self.centered_transform {
            return Point3::new(self.rotation_center);
        }
        match self.image_center {
            ImageCenter::Input => input.center(),
            ImageCenter::Output => output.center(),
        }
    }
}
