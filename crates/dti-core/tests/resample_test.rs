use dti_core::filter::{Correction, TensorCorrectionFilter, TensorResampleFilter};
use dti_core::image::{Image, ImageGeometry};
use dti_core::interpolation::{
    BSplineInterpolator, LinearInterpolator, NearestNeighborInterpolator, ScalarKernel,
    WindowFunction, WindowedSincInterpolator,
};
use dti_core::spatial::{Direction, Direction3, Point3, Spacing3};
use dti_core::tensor::{eigen_decompose, DiffusionTensor, TensorImage};
use dti_core::transform::{
    zero_field, BSplineDeformableTransform, MatrixOffsetTransform, Reorientation, TensorTransform,
    WarpTransform,
};
use nalgebra::{Matrix3, Rotation3, Vector3};
use std::sync::Arc;

fn identity_volume<T: dti_core::TensorPixel>(size: [usize; 3], one: T) -> TensorImage<T> {
    let zero = T::from_f64(0.0);
    Image::filled(
        ImageGeometry::with_size(size),
        DiffusionTensor::new([one, zero, zero, one, zero, one]),
    )
}

#[test]
fn test_identity_tensors_survive_nearest_resampling() {
    let input = identity_volume([10, 10, 10], 1.0f64);
    let filter = TensorResampleFilter::new(
        input.geometry().clone(),
        TensorTransform::identity(),
        NearestNeighborInterpolator,
    );
    assert_eq!(filter.apply(&input), input);
}

#[test]
fn test_integer_round_trip_is_exact() {
    let geometry = ImageGeometry::new(
        [6, 5, 4],
        Point3::new([-3.0, 7.0, 1.0]),
        Spacing3::new([0.9, 1.1, 2.5]),
        Direction(Rotation3::from_euler_angles(0.2, -0.1, 0.4).into_inner()),
    );
    let input: TensorImage<u16> = Image::from_fn(geometry, |[x, y, z]| {
        let v = (x * 7 + y * 13 + z * 29) as u16;
        DiffusionTensor::new([v, v / 2, 3, v + 1, 0, 2 * v])
    });
    let filter = TensorResampleFilter::new(
        input.geometry().clone(),
        TensorTransform::identity(),
        NearestNeighborInterpolator,
    )
    .with_number_of_threads(3);
    assert_eq!(filter.apply(&input), input);
}

#[test]
fn test_every_kernel_reproduces_constant_volume_inside() {
    let input = identity_volume([12, 12, 12], 2.0f32);
    let output = ImageGeometry::new(
        [4, 4, 4],
        Point3::new([4.3, 4.6, 4.1]),
        Spacing3::uniform(0.7),
        Direction3::identity(),
    );
    let kernels = [
        ScalarKernel::NearestNeighbor(NearestNeighborInterpolator),
        ScalarKernel::Linear(LinearInterpolator),
        ScalarKernel::BSpline(BSplineInterpolator::default()),
        ScalarKernel::WindowedSinc(WindowedSincInterpolator::new(WindowFunction::Lanczos)),
    ];
    for kernel in kernels {
        let out = TensorResampleFilter::new(output.clone(), TensorTransform::identity(), kernel)
            .apply(&input);
        for t in out.data() {
            assert!((t[0] - 2.0).abs() < 0.05, "{:?} gave {:?}", kernel, t);
            assert!(t[1].abs() < 1e-6);
        }
    }
}

#[test]
fn test_rotated_volume_reorients_tensors() {
    let size = [9, 9, 9];
    let input = Image::filled(
        ImageGeometry::with_size(size),
        DiffusionTensor::new([4.0f64, 0.0, 0.0, 1.0, 0.0, 0.5]),
    );
    let rotation =
        Rotation3::from_axis_angle(&Vector3::z_axis(), std::f64::consts::FRAC_PI_2).into_inner();
    let center = Point3::new([4.0, 4.0, 4.0]);
    let linear = MatrixOffsetTransform::from_parameters(rotation, Vector3::zeros(), &center);
    let transform =
        TensorTransform::rigid_or_affine(linear, Reorientation::FiniteStrain, true).unwrap();
    let out = TensorResampleFilter::new(input.geometry().clone(), transform, LinearInterpolator)
        .apply(&input);

    let t = out.get([4, 4, 4]);
    let eig = eigen_decompose(&t.to_matrix());
    assert!((eig.principal().y.abs() - 1.0).abs() < 1e-10);
    assert!((eig.values - Vector3::new(0.5, 1.0, 4.0)).amax() < 1e-10);
}

#[test]
fn test_zero_warp_matches_identity() {
    let input: TensorImage<f64> = Image::from_fn(ImageGeometry::with_size([5, 5, 5]), |[x, y, z]| {
        DiffusionTensor::new([1.0 + x as f64, 0.1, 0.0, 1.0 + y as f64, 0.0, 1.0 + z as f64])
    });
    let warp = WarpTransform::new(zero_field(input.geometry().clone()));
    let transform = TensorTransform::non_rigid(Arc::new(warp), Reorientation::Ppd);
    let out = TensorResampleFilter::new(input.geometry().clone(), transform, LinearInterpolator)
        .apply(&input);
    for (a, b) in out.data().iter().zip(input.data()) {
        assert!(a.max_abs_difference(b) < 1e-10);
    }
}

#[test]
fn test_bspline_translation_shifts_samples() {
    let input: TensorImage<f64> = Image::from_fn(ImageGeometry::with_size([8, 8, 8]), |[x, _, _]| {
        DiffusionTensor::new([1.0 + x as f64, 0.0, 0.0, 1.0, 0.0, 1.0])
    });
    let grid = ImageGeometry::new(
        [8, 8, 8],
        Point3::new([-2.0, -2.0, -2.0]),
        Spacing3::uniform(2.0),
        Direction3::identity(),
    );
    let ffd = BSplineDeformableTransform::new(grid, vec![Vector3::new(1.0, 0.0, 0.0); 512]);
    let transform = TensorTransform::non_rigid(Arc::new(ffd), Reorientation::FiniteStrain);
    let out = TensorResampleFilter::new(input.geometry().clone(), transform, LinearInterpolator)
        .apply(&input);
    assert!((out.get([3, 3, 3])[0] - 5.0).abs() < 1e-9);
    assert!((out.get([3, 3, 3])[3] - 1.0).abs() < 1e-9);
}

#[test]
fn test_correction_after_resampling() {
    let input = Image::filled(
        ImageGeometry::with_size([3, 3, 3]),
        DiffusionTensor::new([-0.1f64, 0.0, 0.0, 2.0, 0.0, 3.0]),
    );
    let out = TensorResampleFilter::new(
        input.geometry().clone(),
        TensorTransform::identity(),
        NearestNeighborInterpolator,
    )
    .apply(&input);
    let fixed = TensorCorrectionFilter::new(Correction::Nearest).apply(out);
    let m: Matrix3<f64> = fixed.get([1, 1, 1]).to_matrix();
    assert!((m - Matrix3::from_diagonal(&Vector3::new(0.0, 2.0, 3.0))).amax() < 1e-12);
}
