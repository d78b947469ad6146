//! End-to-end resampling of one tensor volume.

use std::process::ExitCode;

use dti_core::filter::{TensorCorrectionFilter, TensorResampleFilter};
use dti_core::image::ImageGeometry;
use dti_core::interpolation::ScalarKernel;
use dti_core::tensor::{ComponentType, TensorImage, TensorPixel};
use dti_core::transform::{DisplacementField, TensorTransform};
use nalgebra::Matrix3;
use tracing::{debug, error, info};

use crate::chain::{count_non_rigid, ChainBuilder};
use crate::config::{FieldKind, ResampleConfig};
use crate::error::{ResampleError, Result};
use crate::field::{hfield_to_displacement, resample_field};
use crate::geometry::resolve_output_geometry;
use crate::io::{
    Collaborators, DeformationFieldReader, LoadedTransform, TensorVolume, TransformFileReader,
    VolumeReader, VolumeWriter,
};

/// Run the whole pipeline. Nothing is written unless every step succeeds.
pub fn run<R, W, X, F>(config: &ResampleConfig, io: &Collaborators<'_, R, W, X, F>) -> Result<()>
where
    R: VolumeReader,
    W: VolumeWriter,
    X: TransformFileReader,
    F: DeformationFieldReader,
{
    config.validate()?;
    let component_type = io
        .volumes
        .component_type(&config.input_volume)
        .map_err(|e| ResampleError::io("reading input volume", e))?;
    info!(
        input = %config.input_volume.display(),
        output = %config.output_volume.display(),
        %component_type,
        "resampling tensor volume"
    );
    match component_type {
        ComponentType::U8 => resample_volume::<u8, _, _, _, _>(config, io),
        ComponentType::I8 => resample_volume::<i8, _, _, _, _>(config, io),
        ComponentType::U16 => resample_volume::<u16, _, _, _, _>(config, io),
        ComponentType::I16 => resample_volume::<i16, _, _, _, _>(config, io),
        ComponentType::U32 => resample_volume::<u32, _, _, _, _>(config, io),
        ComponentType::I32 => resample_volume::<i32, _, _, _, _>(config, io),
        ComponentType::U64 => resample_volume::<u64, _, _, _, _>(config, io),
        ComponentType::I64 => resample_volume::<i64, _, _, _, _>(config, io),
        ComponentType::F32 => resample_volume::<f32, _, _, _, _>(config, io),
        ComponentType::F64 => resample_volume::<f64, _, _, _, _>(config, io),
    }
}

/// [`run`] for command-line front ends: failures are logged and mapped to
/// a non-zero exit code.
pub fn run_with_exit_code<R, W, X, F>(
    config: &ResampleConfig,
    io: &Collaborators<'_, R, W, X, F>,
) -> ExitCode
where
    R: VolumeReader,
    W: VolumeWriter,
    X: TransformFileReader,
    F: DeformationFieldReader,
{
    match run(config, io) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "resampling failed");
            ExitCode::FAILURE
        }
    }
}

/// The pipeline for one concrete component type.
pub fn resample_volume<T, R, W, X, F>(
    config: &ResampleConfig,
    io: &Collaborators<'_, R, W, X, F>,
) -> Result<()>
where
    T: TensorPixel,
    R: VolumeReader,
    W: VolumeWriter,
    X: TransformFileReader,
    F: DeformationFieldReader,
{
    let volume: TensorVolume<T> = io
        .volumes
        .read_tensor_volume(&config.input_volume)
        .map_err(|e| ResampleError::io("reading input volume", e))?;
    let TensorVolume { image, measurement_frame, metadata } = volume;

    // Taken before any RAS flip.
    let file_frame = measurement_frame.filter(|_| !config.no_measurement_frame);
    let input_direction = image.direction().0;

    let image = if config.is_ras() { flip_image(image) } else { image };
    let input_geometry = image.geometry().clone();
    if !input_geometry.is_valid() {
        return Err(ResampleError::singular_matrix(format!(
            "input grid cannot be mapped to indices: {input_geometry:?}"
        )));
    }

    let kernel = ScalarKernel::from_kind(config.interpolator_kind()).ok_or_else(|| {
        ResampleError::invalid_configuration(format!(
            "spline order {} is not supported",
            config.spline_order
        ))
    })?;

    let transforms = read_transforms(config, io.transforms)?;

    let reference = match &config.reference_volume {
        Some(path) => {
            let geometry = io
                .volumes
                .read_geometry(path)
                .map_err(|e| ResampleError::io("reading reference volume", e))?;
            Some(if config.is_ras() { geometry.flip_ras_lps() } else { geometry })
        }
        None => None,
    };
    let output_geometry = resolve_output_geometry(config, &input_geometry, reference.as_ref());
    if !output_geometry.is_valid() {
        return Err(ResampleError::invalid_configuration(format!(
            "output grid is degenerate: {output_geometry:?}"
        )));
    }
    debug!(
        size = ?output_geometry.size(),
        spacing = ?output_geometry.spacing().to_array(),
        "output grid"
    );

    let field = read_field(config, io.fields, &output_geometry)?;
    let transform =
        ChainBuilder::new(config, &input_geometry, &output_geometry).build(transforms, field)?;

    let frame = match file_frame {
        Some(frame) => frame,
        None => output_geometry.direction().0.transpose() * input_direction,
    };
    let transform = transform.with_measurement_frame(frame);

    let resampled = resample_image(config, &image, output_geometry, transform, kernel);
    let corrected = TensorCorrectionFilter::new(config.correction)
        .with_number_of_threads(config.number_of_threads)
        .apply(resampled);
    let output = if config.is_ras() { flip_image(corrected) } else { corrected };

    let mut volume = TensorVolume::new(output).with_measurement_frame(Matrix3::identity());
    volume.metadata = metadata;
    io.writer
        .write_tensor_volume(&config.output_volume, &volume)
        .map_err(|e| ResampleError::io("writing output volume", e))?;
    info!(output = %config.output_volume.display(), "wrote resampled volume");
    Ok(())
}

fn resample_image<T: TensorPixel>(
    config: &ResampleConfig,
    image: &TensorImage<T>,
    geometry: ImageGeometry,
    transform: TensorTransform,
    kernel: ScalarKernel,
) -> TensorImage<T> {
    TensorResampleFilter::new(geometry, transform, kernel)
        .with_default_pixel_value(T::from_f64(config.default_pixel_value))
        .with_number_of_threads(config.number_of_threads)
        .apply(image)
}

fn read_transforms<X: TransformFileReader>(
    config: &ResampleConfig,
    reader: &X,
) -> Result<Vec<LoadedTransform>> {
    let Some(path) = &config.transformation_file else {
        return Ok(Vec::new());
    };
    let transforms = reader
        .read_transforms(path)
        .map_err(|e| ResampleError::io("reading transformation file", e))?;
    let non_rigid = count_non_rigid(&transforms)?;
    debug!(count = transforms.len(), non_rigid, "read transformation file");
    Ok(transforms)
}

fn read_field<F: DeformationFieldReader>(
    config: &ResampleConfig,
    reader: &F,
    output: &ImageGeometry,
) -> Result<Option<DisplacementField>> {
    let Some(path) = &config.deformation_field else {
        return Ok(None);
    };
    let field = reader
        .read_field(path)
        .map_err(|e| ResampleError::io("reading deformation field", e))?;
    let field = match config.field_kind {
        FieldKind::Displacement => field,
        FieldKind::HField => hfield_to_displacement(field),
    };
    Ok(Some(resample_field(field, output, config.number_of_threads)))
}

fn flip_image<T: TensorPixel>(image: TensorImage<T>) -> TensorImage<T> {
    let geometry = image.geometry().flip_ras_lps();
    image.with_geometry(geometry)
}
