use std::process::ExitCode;

use dti_core::filter::Correction;
use dti_core::image::{Image, ImageGeometry};
use dti_core::spatial::{Direction3, Point3, Spacing3};
use dti_core::tensor::algebra::ZERO_CORRECTION_FLOOR;
use dti_core::tensor::{eigen_decompose, DiffusionTensor};
use dti_core::transform::zero_field;
use dti_resample::config::{FieldKind, InterpolationType, TransformType};
use dti_resample::{
    run, run_with_exit_code, Collaborators, CoordinateSpace, ImageCenter, LoadedTransform,
    MemoryStore, ResampleConfig, ResampleError, TensorVolume,
};
use nalgebra::{Matrix3, Vector3};

const INPUT: &str = "input.nhdr";
const OUTPUT: &str = "output.nhdr";
const TRANSFORMS: &str = "transforms.tfm";

fn geometry(size: usize) -> ImageGeometry {
    ImageGeometry::new([size; 3], Point3::origin(), Spacing3::uniform(1.0), Direction3::identity())
}

fn store_with<T: dti_core::TensorPixel>(volume: TensorVolume<T>) -> MemoryStore {
    let store = MemoryStore::new();
    store.insert_volume(INPUT, volume).unwrap();
    store
}

fn diagonal(a: f64, b: f64, c: f64) -> DiffusionTensor<f64> {
    DiffusionTensor::<f64>::from_matrix(&Matrix3::from_diagonal(&Vector3::new(a, b, c)))
}

fn identity_volume(size: usize) -> TensorVolume<f64> {
    TensorVolume::new(Image::filled(geometry(size), DiffusionTensor::<f64>::identity()))
}

fn is_failure(code: ExitCode) -> bool {
    format!("{code:?}") == format!("{:?}", ExitCode::FAILURE)
}

#[test]
fn test_identity_nearest_reproduces_input() {
    let input = Image::filled(geometry(10), DiffusionTensor::<f64>::identity());
    let store = store_with(TensorVolume::new(input.clone()).with_metadata("modality", "DTMRI"));
    let config = ResampleConfig::new(INPUT, OUTPUT).with_interpolation(InterpolationType::Nearest);

    run(&config, &Collaborators::uniform(&store)).unwrap();

    let output = store.volume::<f64>(OUTPUT).unwrap();
    assert_eq!(output.image, input);
    assert_eq!(output.measurement_frame, Some(Matrix3::identity()));
    assert_eq!(output.metadata.get("modality").map(String::as_str), Some("DTMRI"));
}

#[test]
fn test_zero_correction_lifts_negative_eigenvalue() {
    let store = store_with(TensorVolume::new(Image::filled(geometry(3), diagonal(-0.1, 2.0, 3.0))));
    let config = ResampleConfig::new(INPUT, OUTPUT)
        .with_interpolation(InterpolationType::Nearest)
        .with_correction(Correction::Zero);

    run(&config, &Collaborators::uniform(&store)).unwrap();

    let output = store.volume::<f64>(OUTPUT).unwrap();
    let values = eigen_decompose(&output.image.get([1, 1, 1]).to_matrix()).values;
    assert!(values[0] > 0.0 && values[0] <= 10.0 * ZERO_CORRECTION_FLOOR);
    assert!((values[1] - 2.0).abs() < 1e-9);
    assert!((values[2] - 3.0).abs() < 1e-9);
}

#[test]
fn test_rigid_rotation_turns_principal_direction() {
    let store = store_with(TensorVolume::new(Image::filled(geometry(5), anisotropic())));
    let rotation = [0.0, -1.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0];
    let config = ResampleConfig::new(INPUT, OUTPUT)
        .with_transform(TransformType::Rigid, rotation)
        .with_centered_transform(ImageCenter::Input);

    run(&config, &Collaborators::uniform(&store)).unwrap();

    let output = store.volume::<f64>(OUTPUT).unwrap();
    let eigen = eigen_decompose(&output.image.get([2, 2, 2]).to_matrix());
    assert!(eigen.principal().y.abs() > 1.0 - 1e-9);
    assert!((eigen.values - Vector3::new(0.5, 1.0, 3.0)).amax() < 1e-9);
}

#[test]
fn test_unknown_transform_class_writes_nothing() {
    let input = Image::filled(geometry(4), DiffusionTensor::<f32>::splat(1.0));
    let store = store_with(TensorVolume::new(input));
    let unknown = LoadedTransform::new("Foo", vec![1.0; 12], vec![0.0; 3]);
    store.insert_transforms(TRANSFORMS, vec![unknown]).unwrap();
    let config = ResampleConfig::new(INPUT, OUTPUT).with_transformation_file(TRANSFORMS);

    assert!(is_failure(run_with_exit_code(&config, &Collaborators::uniform(&store))));
    assert!(!store.contains_volume(OUTPUT));
    assert!(matches!(
        run(&config, &Collaborators::uniform(&store)),
        Err(ResampleError::UnsupportedTransform(_))
    ));
}

#[test]
fn test_unmapped_non_rigid_entry_is_unsupported() {
    let store = store_with(identity_volume(4));
    let unmapped = LoadedTransform::new("ThinPlateSplineKernelTransform", vec![], vec![]);
    store.insert_transforms(TRANSFORMS, vec![unmapped]).unwrap();
    let config = ResampleConfig::new(INPUT, OUTPUT).with_transformation_file(TRANSFORMS);

    assert!(matches!(
        run(&config, &Collaborators::uniform(&store)),
        Err(ResampleError::UnsupportedTransform(_))
    ));
    assert!(!store.contains_volume(OUTPUT));
}

#[test]
fn test_missing_input_is_io_error() {
    let store = MemoryStore::new();
    let config = ResampleConfig::new(INPUT, OUTPUT);
    let err = run(&config, &Collaborators::uniform(&store)).unwrap_err();
    assert!(matches!(err, ResampleError::Io(ref msg) if msg.contains("reading input volume")));
}

#[test]
fn test_integer_volume_keeps_component_type() {
    let input = Image::filled(geometry(4), DiffusionTensor::new([7u16, 0, 0, 5, 0, 3]));
    let store = store_with(TensorVolume::new(input.clone()));
    let config = ResampleConfig::new(INPUT, OUTPUT).with_interpolation(InterpolationType::Nearest);

    run(&config, &Collaborators::uniform(&store)).unwrap();

    assert!(store.volume::<f64>(OUTPUT).is_none());
    assert_eq!(store.volume::<u16>(OUTPUT).unwrap().image, input);
}

#[test]
fn test_ras_round_trip_restores_geometry() {
    let input_geometry = ImageGeometry::new(
        [4, 5, 6],
        Point3::new([10.0, -4.0, 2.0]),
        Spacing3::new([1.0, 1.5, 2.0]),
        Direction3::identity(),
    );
    let input = Image::filled(input_geometry.clone(), DiffusionTensor::<f64>::identity());
    let store = store_with(TensorVolume::new(input.clone()));
    let config = ResampleConfig::new(INPUT, OUTPUT)
        .with_interpolation(InterpolationType::Nearest)
        .with_space(CoordinateSpace::Ras);

    run(&config, &Collaborators::uniform(&store)).unwrap();

    let output = store.volume::<f64>(OUTPUT).unwrap();
    assert!(output.image.geometry().same_grid_as(&input_geometry, 1e-12));
    assert_eq!(output.image.data(), input.data());
}

#[test]
fn test_reference_volume_sets_output_grid() {
    let store = store_with(identity_volume(6));
    let reference_geometry = ImageGeometry::new(
        [3, 3, 3],
        Point3::origin(),
        Spacing3::uniform(2.0),
        Direction3::identity(),
    );
    let reference = Image::filled(reference_geometry, DiffusionTensor::<f64>::identity());
    store.insert_volume("reference.nhdr", TensorVolume::new(reference)).unwrap();
    let config = ResampleConfig::new(INPUT, OUTPUT).with_reference_volume("reference.nhdr");

    run(&config, &Collaborators::uniform(&store)).unwrap();

    let output = store.volume::<f64>(OUTPUT).unwrap();
    assert_eq!(output.image.size(), [3, 3, 3]);
    assert_eq!(output.image.spacing().to_array(), [2.0, 2.0, 2.0]);
}

#[test]
fn test_out_of_bounds_uses_default_pixel_value() {
    let store = store_with(identity_volume(4));
    let mut shift = dti_resample::config::IDENTITY_TRANSFORM;
    shift[9] = 100.0;
    let config = ResampleConfig::new(INPUT, OUTPUT)
        .with_transform(TransformType::Affine, shift)
        .with_default_pixel_value(-1.0);

    run(&config, &Collaborators::uniform(&store)).unwrap();

    let output = store.volume::<f64>(OUTPUT).unwrap();
    assert!(output.image.data().iter().all(|t| *t == DiffusionTensor::splat(-1.0)));
}

#[test]
fn test_hfield_of_identity_leaves_volume_unchanged() {
    let g = geometry(5);
    let input = Image::from_fn(g.clone(), |[x, y, z]| {
        diagonal(1.0 + x as f64, 1.0 + y as f64, 1.0 + z as f64)
    });
    let store = store_with(TensorVolume::new(input.clone()));
    let mut hfield = zero_field(g.clone());
    for (offset, h) in hfield.data_mut().iter_mut().enumerate() {
        let index = dti_core::image::grid_index(offset, g.size());
        *h = *g.index_to_physical_point(index).coords();
    }
    store.insert_field("field.nrrd", hfield).unwrap();
    let config = ResampleConfig::new(INPUT, OUTPUT)
        .with_interpolation(InterpolationType::Nearest)
        .with_deformation_field("field.nrrd", FieldKind::HField);

    run(&config, &Collaborators::uniform(&store)).unwrap();

    let output = store.volume::<f64>(OUTPUT).unwrap();
    for (a, b) in output.image.data().iter().zip(input.data()) {
        assert!(a.max_abs_difference(b) < 1e-9);
    }
}

fn anisotropic() -> DiffusionTensor<f64> {
    diagonal(3.0, 1.0, 0.5)
}

fn quarter_turn_z() -> Matrix3<f64> {
    Matrix3::new(0.0, -1.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0)
}

#[test]
fn test_file_measurement_frame_rotates_tensors() {
    let volume = TensorVolume::new(Image::filled(geometry(5), anisotropic()))
        .with_measurement_frame(quarter_turn_z());
    let store = store_with(volume);
    let config = ResampleConfig::new(INPUT, OUTPUT).with_interpolation(InterpolationType::Nearest);

    run(&config, &Collaborators::uniform(&store)).unwrap();

    let output = store.volume::<f64>(OUTPUT).unwrap();
    let eigen = eigen_decompose(&output.image.get([2, 2, 2]).to_matrix());
    assert!(eigen.principal().y.abs() > 1.0 - 1e-9);
    assert!((eigen.values - Vector3::new(0.5, 1.0, 3.0)).amax() < 1e-9);
    assert_eq!(output.measurement_frame, Some(Matrix3::identity()));
}

#[test]
fn test_ignored_measurement_frame_falls_back_to_directions() {
    let volume = TensorVolume::new(Image::filled(geometry(5), anisotropic()))
        .with_measurement_frame(quarter_turn_z());
    let store = store_with(volume);
    let config = ResampleConfig::new(INPUT, OUTPUT)
        .with_interpolation(InterpolationType::Nearest)
        .without_measurement_frame();

    run(&config, &Collaborators::uniform(&store)).unwrap();

    // Both grids share the identity direction, so the fallback frame is identity.
    let output = store.volume::<f64>(OUTPUT).unwrap();
    let eigen = eigen_decompose(&output.image.get([2, 2, 2]).to_matrix());
    assert!(eigen.principal().x.abs() > 1.0 - 1e-9);
}

#[test]
fn test_missing_measurement_frame_uses_grid_directions() {
    let input_geometry = ImageGeometry::new(
        [5, 5, 5],
        Point3::origin(),
        Spacing3::uniform(1.0),
        Direction3::from_row_slice(&[0.0, -1.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0]),
    );
    let store = store_with(TensorVolume::new(Image::filled(input_geometry, anisotropic())));
    let config = ResampleConfig::new(INPUT, OUTPUT)
        .with_interpolation(InterpolationType::Nearest)
        .with_output_direction([1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0])
        .with_output_origin([-4.0, 0.0, 0.0]);

    run(&config, &Collaborators::uniform(&store)).unwrap();

    // Frame is outDirᵀ·inDir, the quarter turn itself.
    let output = store.volume::<f64>(OUTPUT).unwrap();
    assert_eq!(output.image.direction().0, Matrix3::identity());
    let eigen = eigen_decompose(&output.image.get([2, 2, 2]).to_matrix());
    assert!(eigen.principal().y.abs() > 1.0 - 1e-9);
    assert!((eigen.values - Vector3::new(0.5, 1.0, 3.0)).amax() < 1e-9);
}

#[test]
fn test_singular_input_grid_is_rejected() {
    let flat = Direction3::from_row_slice(&[1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0]);
    let input_geometry =
        ImageGeometry::new([4, 4, 4], Point3::origin(), Spacing3::uniform(1.0), flat);
    let input = Image::filled(input_geometry, DiffusionTensor::<f64>::identity());
    let store = store_with(TensorVolume::new(input));
    let config = ResampleConfig::new(INPUT, OUTPUT)
        .with_output_direction([1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0]);

    let err = run(&config, &Collaborators::uniform(&store)).unwrap_err();
    assert!(matches!(err, ResampleError::SingularMatrix(_)));
    assert!(!store.contains_volume(OUTPUT));
}
