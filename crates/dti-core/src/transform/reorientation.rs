//! Tensor reorientation under a local linear deformation.
//!
//! Given the forward deformation `F` (input space to output space) both
//! strategies produce a rotation `R`, and the tensor becomes `R·D·Rᵀ`.

use crate::tensor::algebra::{eigen_decompose, polar_rotation};
use nalgebra::{Matrix3, Rotation3, Vector3};
use serde::{Deserialize, Serialize};

/// How the rotation is extracted from a local deformation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reorientation {
    /// Rotation part of the polar decomposition, `(F·Fᵀ)^(-1/2)·F`.
    #[default]
    FiniteStrain,
    /// Preservation of principal direction.
    #[serde(alias = "preservation_of_principal_direction")]
    Ppd,
}

/// Finite-strain rotation of `forward`, or the identity when it is singular.
pub fn finite_strain_rotation(forward: &Matrix3<f64>) -> Matrix3<f64> {
    polar_rotation(forward).unwrap_or_else(Matrix3::identity)
}

/// Rotation carrying `from` onto `to`; identity when they are parallel or
/// antiparallel, which leaves a tensor unchanged either way.
fn rotation_between(from: &Vector3<f64>, to: &Vector3<f64>) -> Matrix3<f64> {
    Rotation3::rotation_between(from, to)
        .map(|r| r.into_inner())
        .unwrap_or_else(Matrix3::identity)
}

fn normalized(v: Vector3<f64>) -> Option<Vector3<f64>> {
    let n = v.norm();
    (n > f64::EPSILON).then(|| v / n)
}

/// Preservation-of-principal-direction rotation for `tensor` under
/// `forward`.
///
/// The principal eigenvector `e1` is rotated onto `n1 = F·e1/|F·e1|`; then,
/// about `n1`, the image of the second eigenvector is rotated onto the part
/// of `F·e2` perpendicular to `n1`.
pub fn ppd_rotation(forward: &Matrix3<f64>, tensor: &Matrix3<f64>) -> Matrix3<f64> {
    let eig = eigen_decompose(tensor);
    let e1 = eig.principal();
    let e2 = eig.secondary();

    let Some(n1) = normalized(forward * e1) else {
        return Matrix3::identity();
    };
    let r1 = rotation_between(&e1, &n1);

    let Some(n2) = normalized(forward * e2) else {
        return r1;
    };
    let Some(projected) = normalized(n2 - n1 * n2.dot(&n1)) else {
        return r1;
    };
    let Some(rotated_e2) = normalized(r1 * e2) else {
        return r1;
    };
    rotation_between(&rotated_e2, &projected) * r1
}

/// Rotate a world-frame tensor: `R·D·Rᵀ`.
pub fn rotate_tensor(rotation: &Matrix3<f64>, tensor: &Matrix3<f64>) -> Matrix3<f64> {
    rotation * tensor * rotation.transpose()
}

/// Reorient `tensor` under `forward` with the selected strategy.
pub fn reorient(
    method: Reorientation,
    forward: &Matrix3<f64>,
    tensor: &Matrix3<f64>,
) -> Matrix3<f64> {
    let rotation = match method {
        Reorientation::FiniteStrain => finite_strain_rotation(forward),
        Reorientation::Ppd => ppd_rotation(forward, tensor),
    };
    rotate_tensor(&rotation, tensor)
}
