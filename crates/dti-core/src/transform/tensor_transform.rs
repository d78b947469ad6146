//! Transforms acting on tensor volumes.
//!
//! A [`TensorTransform`] does two things for the resampler: it maps an output
//! position to the input position to sample, and it reorients the sampled
//! tensor (expressed in its measurement frame) into the output space.

use super::matrix_offset::{is_rigid_matrix, MatrixOffsetTransform};
use super::reorientation::{
    finite_strain_rotation, ppd_rotation, reorient, rotate_tensor, Reorientation,
};
use super::trait_::PointTransform;
use super::TransformError;
use crate::spatial::Point3;
use crate::tensor::algebra::polar_rotation;
use crate::tensor::DiffusionTensor;
use nalgebra::{Matrix3, Matrix4};
use std::sync::Arc;

/// Rigid transform: the tensor is rotated by the inverse of the resampling
/// rotation.
#[derive(Debug, Clone, PartialEq)]
pub struct RigidTensorTransform {
    linear: MatrixOffsetTransform,
    rotation: Matrix3<f64>,
    measurement_frame: Matrix3<f64>,
    tensor_matrix: Matrix3<f64>,
}

impl RigidTensorTransform {
    /// Build from an output-to-input linear transform.
    ///
    /// With `precision_checking`, returns `None` when the matrix is not
    /// orthogonal within tolerance. Without it the rotation is taken from the
    /// polar decomposition, and `None` is returned only for a singular
    /// matrix.
    pub fn new(linear: MatrixOffsetTransform, precision_checking: bool) -> Option<Self> {
        let m = linear.matrix();
        let rotation = if precision_checking {
            if !is_rigid_matrix(m) {
                return None;
            }
            m.transpose()
        } else {
            polar_rotation(m)?.transpose()
        };
        Some(Self {
            linear,
            rotation,
            measurement_frame: Matrix3::identity(),
            tensor_matrix: rotation,
        })
    }

    pub fn rotation(&self) -> &Matrix3<f64> {
        &self.rotation
    }

    fn set_measurement_frame(&mut self, frame: Matrix3<f64>) {
        self.measurement_frame = frame;
        self.tensor_matrix = self.rotation * frame;
    }
}

/// Affine transform with finite-strain reorientation.
#[derive(Debug, Clone, PartialEq)]
pub struct FiniteStrainTensorTransform {
    linear: MatrixOffsetTransform,
    rotation: Matrix3<f64>,
    measurement_frame: Matrix3<f64>,
    tensor_matrix: Matrix3<f64>,
}

impl FiniteStrainTensorTransform {
    pub fn new(linear: MatrixOffsetTransform) -> Result<Self, TransformError> {
        let forward = linear
            .matrix()
            .try_inverse()
            .ok_or_else(|| TransformError::singular("affine matrix is not invertible"))?;
        let rotation = finite_strain_rotation(&forward);
        Ok(Self {
            linear,
            rotation,
            measurement_frame: Matrix3::identity(),
            tensor_matrix: rotation,
        })
    }

    fn set_measurement_frame(&mut self, frame: Matrix3<f64>) {
        self.measurement_frame = frame;
        self.tensor_matrix = self.rotation * frame;
    }
}

/// Affine transform with preservation-of-principal-direction
/// reorientation. The rotation depends on each tensor.
#[derive(Debug, Clone, PartialEq)]
pub struct PpdTensorTransform {
    linear: MatrixOffsetTransform,
    forward: Matrix3<f64>,
    measurement_frame: Matrix3<f64>,
}

impl PpdTensorTransform {
    pub fn new(linear: MatrixOffsetTransform) -> Result<Self, TransformError> {
        let forward = linear
            .matrix()
            .try_inverse()
            .ok_or_else(|| TransformError::singular("affine matrix is not invertible"))?;
        Ok(Self {
            linear,
            forward,
            measurement_frame: Matrix3::identity(),
        })
    }
}

/// Arbitrary point mapping; tensors are reoriented with the local affine
/// approximation given by the Jacobian at the output position.
#[derive(Debug, Clone)]
pub struct NonRigidTensorTransform {
    transform: Arc<dyn PointTransform>,
    reorientation: Reorientation,
    measurement_frame: Matrix3<f64>,
}

impl NonRigidTensorTransform {
    pub fn new(transform: Arc<dyn PointTransform>, reorientation: Reorientation) -> Self {
        Self {
            transform,
            reorientation,
            measurement_frame: Matrix3::identity(),
        }
    }

    pub fn point_transform(&self) -> &Arc<dyn PointTransform> {
        &self.transform
    }
}

/// The closed set of tensor transforms.
#[derive(Debug, Clone)]
pub enum TensorTransform {
    Rigid(RigidTensorTransform),
    FiniteStrain(FiniteStrainTensorTransform),
    Ppd(PpdTensorTransform),
    NonRigid(NonRigidTensorTransform),
}

impl TensorTransform {
    pub fn identity() -> Self {
        let linear = MatrixOffsetTransform::identity();
        TensorTransform::Rigid(RigidTensorTransform {
            linear,
            rotation: Matrix3::identity(),
            measurement_frame: Matrix3::identity(),
            tensor_matrix: Matrix3::identity(),
        })
    }

    /// Affine tensor transform with the chosen reorientation.
    pub fn affine(
        linear: MatrixOffsetTransform,
        reorientation: Reorientation,
    ) -> Result<Self, TransformError> {
        Ok(match reorientation {
            Reorientation::FiniteStrain => {
                Self::FiniteStrain(FiniteStrainTensorTransform::new(linear)?)
            }
            Reorientation::Ppd => Self::Ppd(PpdTensorTransform::new(linear)?),
        })
    }

    /// Rigid tensor transform, degrading to an affine one when the matrix
    /// fails the rigidity check.
    pub fn rigid_or_affine(
        linear: MatrixOffsetTransform,
        reorientation: Reorientation,
        precision_checking: bool,
    ) -> Result<Self, TransformError> {
        match RigidTensorTransform::new(linear, precision_checking) {
            Some(rigid) => Ok(Self::Rigid(rigid)),
            None => {
                tracing::warn!(
                    matrix = ?linear.matrix(),
                    "rigid transform matrix is not a rotation, using an affine transform instead"
                );
                Self::affine(linear, reorientation)
            }
        }
    }

    pub fn non_rigid(transform: Arc<dyn PointTransform>, reorientation: Reorientation) -> Self {
        Self::NonRigid(NonRigidTensorTransform::new(transform, reorientation))
    }

    /// Replace the measurement frame folded into every reorientation.
    pub fn with_measurement_frame(mut self, frame: Matrix3<f64>) -> Self {
        match &mut self {
            Self::Rigid(t) => t.set_measurement_frame(frame),
            Self::FiniteStrain(t) => t.set_measurement_frame(frame),
            Self::Ppd(t) => t.measurement_frame = frame,
            Self::NonRigid(t) => t.measurement_frame = frame,
        }
        self
    }

    pub fn measurement_frame(&self) -> &Matrix3<f64> {
        match self {
            Self::Rigid(t) => &t.measurement_frame,
            Self::FiniteStrain(t) => &t.measurement_frame,
            Self::Ppd(t) => &t.measurement_frame,
            Self::NonRigid(t) => &t.measurement_frame,
        }
    }

    /// Output-to-input linear map, for the matrix-based variants.
    pub fn linear(&self) -> Option<&MatrixOffsetTransform> {
        match self {
            Self::Rigid(t) => Some(&t.linear),
            Self::FiniteStrain(t) => Some(&t.linear),
            Self::Ppd(t) => Some(&t.linear),
            Self::NonRigid(_) => None,
        }
    }

    /// Homogeneous output-to-input matrix, for the matrix-based variants.
    pub fn matrix4(&self) -> Option<Matrix4<f64>> {
        self.linear().map(MatrixOffsetTransform::to_homogeneous)
    }

    /// Input position sampled for the output position `point`.
    pub fn evaluate_position(&self, point: &Point3) -> Point3 {
        match self {
            Self::NonRigid(t) => t.transform.transform_point(point),
            other => match other.linear() {
                Some(linear) => linear.apply(point),
                None => *point,
            },
        }
    }

    /// Reorient `tensor`, sampled for the output position `output_point`.
    pub fn evaluate_tensor(
        &self,
        tensor: &DiffusionTensor<f64>,
        output_point: &Point3,
    ) -> DiffusionTensor<f64> {
        let d = tensor.to_matrix();
        let out = match self {
            Self::Rigid(t) => rotate_tensor(&t.tensor_matrix, &d),
            Self::FiniteStrain(t) => rotate_tensor(&t.tensor_matrix, &d),
            Self::Ppd(t) => {
                let world = rotate_tensor(&t.measurement_frame, &d);
                rotate_tensor(&ppd_rotation(&t.forward, &world), &world)
            }
            Self::NonRigid(t) => {
                let world = rotate_tensor(&t.measurement_frame, &d);
                match t.transform.jacobian(output_point).try_inverse() {
                    Some(forward) => reorient(t.reorientation, &forward, &world),
                    None => world,
                }
            }
        };
        DiffusionTensor::from_matrix(&out)
    }
}

impl Default for TensorTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl PointTransform for TensorTransform {
    fn transform_point(&self, point: &Point3) -> Point3 {
        self.evaluate_position(point)
    }

    fn jacobian(&self, point: &Point3) -> Matrix3<f64> {
        match self {
            Self::NonRigid(t) => t.transform.jacobian(point),
            other => other.linear().map(|l| *l.matrix()).unwrap_or_else(Matrix3::identity),
        }
    }

    fn is_bspline_deformable(&self) -> bool {
        matches!(self, Self::NonRigid(t) if t.transform.is_bspline_deformable())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tensor::algebra::eigen_decompose;
    use nalgebra::{Rotation3, Vector3};

    fn rotation_z(angle: f64) -> Matrix3<f64> {
        Rotation3::from_axis_angle(&Vector3::z_axis(), angle).into_inner()
    }

    #[test]
    fn test_identity_is_noop() {
        let t = TensorTransform::identity();
        let p = Point3::new([1.0, 2.0, 3.0]);
        let d = DiffusionTensor::new([1.0, 0.2, 0.3, 2.0, 0.1, 3.0]);
        assert_eq!(t.evaluate_position(&p), p);
        assert_eq!(t.evaluate_tensor(&d, &p), d);
    }

    #[test]
    fn test_rigid_rotates_principal_direction() {
        let rotation = rotation_z(std::f64::consts::FRAC_PI_2);
        let linear = MatrixOffsetTransform::new(rotation, Vector3::zeros());
        let t =
            TensorTransform::rigid_or_affine(linear, Reorientation::FiniteStrain, true).unwrap();
        assert!(matches!(t, TensorTransform::Rigid(_)));
        let d = DiffusionTensor::new([3.0, 0.0, 0.0, 1.0, 0.0, 0.5]);
        let out = t.evaluate_tensor(&d, &Point3::origin());
        let eig = eigen_decompose(&out.to_matrix());
        assert!((eig.principal().y.abs() - 1.0).abs() < 1e-10);
        assert!((eig.values - Vector3::new(0.5, 1.0, 3.0)).amax() < 1e-10);
    }

    #[test]
    fn test_non_rotation_falls_back_to_affine() {
        let stretch = Matrix3::from_diagonal(&Vector3::new(2.0, 1.0, 1.0));
        let linear = MatrixOffsetTransform::new(stretch, Vector3::zeros());
        let fs =
            TensorTransform::rigid_or_affine(linear, Reorientation::FiniteStrain, true).unwrap();
        assert!(matches!(fs, TensorTransform::FiniteStrain(_)));
        let ppd = TensorTransform::rigid_or_affine(linear, Reorientation::Ppd, true).unwrap();
        assert!(matches!(ppd, TensorTransform::Ppd(_)));
    }

    #[test]
    fn test_unchecked_rigid_uses_polar_rotation() {
        let scaled = rotation_z(0.3) * 1.05;
        let linear = MatrixOffsetTransform::new(scaled, Vector3::zeros());
        let t =
            TensorTransform::rigid_or_affine(linear, Reorientation::FiniteStrain, false).unwrap();
        match &t {
            TensorTransform::Rigid(r) => assert!((r.rotation() - rotation_z(-0.3)).amax() < 1e-10),
            other => panic!("expected rigid, got {:?}", other),
        }
    }

    #[test]
    fn test_singular_affine_is_error() {
        let linear = MatrixOffsetTransform::new(Matrix3::zeros(), Vector3::zeros());
        assert!(TensorTransform::affine(linear, Reorientation::Ppd).is_err());
    }

    #[test]
    fn test_measurement_frame_is_applied() {
        let frame = rotation_z(std::f64::consts::FRAC_PI_2);
        let t = TensorTransform::identity().with_measurement_frame(frame);
        let d = DiffusionTensor::new([3.0, 0.0, 0.0, 1.0, 0.0, 1.0]);
        let out = t.evaluate_tensor(&d, &Point3::origin());
        assert!((out[0] - 1.0).abs() < 1e-12);
        assert!((out[3] - 3.0).abs() < 1e-12);
        assert_eq!(t.measurement_frame(), &frame);
    }

    #[test]
    fn test_non_rigid_with_linear_map_matches_affine() {
        let linear = MatrixOffsetTransform::new(
            Matrix3::new(1.2, 0.1, 0.0, 0.0, 0.9, 0.2, 0.1, 0.0, 1.1),
            Vector3::new(1.0, 0.0, -1.0),
        );
        let d = DiffusionTensor::new([2.0, 0.3, 0.1, 1.0, 0.2, 0.5]);
        let p = Point3::new([3.0, -2.0, 1.0]);
        for method in [Reorientation::FiniteStrain, Reorientation::Ppd] {
            let affine = TensorTransform::affine(linear, method).unwrap();
            let warp = TensorTransform::non_rigid(Arc::new(linear), method);
            assert!(warp.evaluate_position(&p).distance(&affine.evaluate_position(&p)) < 1e-12);
            let a = affine.evaluate_tensor(&d, &p);
            let b = warp.evaluate_tensor(&d, &p);
            assert!(a.max_abs_difference(&b) < 1e-10, "{:?}: {:?} vs {:?}", method, a, b);
        }
    }
}
