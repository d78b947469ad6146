//! Symmetric 3×3 matrix helpers: eigen decomposition, matrix functions and
//! the eigenvalue corrections applied to resampled tensors.

use nalgebra::{Matrix3, SymmetricEigen, Vector3};

/// Value substituted for negative eigenvalues by the zero correction.
pub const ZERO_CORRECTION_FLOOR: f64 = 1e-10;

/// Eigenvalues sorted ascending, with matching eigenvectors in the columns
/// of `vectors`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Eigensystem {
    pub values: Vector3<f64>,
    pub vectors: Matrix3<f64>,
}

impl Eigensystem {
    /// Eigenvector paired with the largest eigenvalue.
    pub fn principal(&self) -> Vector3<f64> {
        self.vectors.column(2).into_owned()
    }

    /// Eigenvector paired with the middle eigenvalue.
    pub fn secondary(&self) -> Vector3<f64> {
        self.vectors.column(1).into_owned()
    }
}

pub fn eigen_decompose(m: &Matrix3<f64>) -> Eigensystem {
    let eig = SymmetricEigen::new(symmetrize(m));
    let mut order = [0usize, 1, 2];
    order.sort_by(|&a, &b| eig.eigenvalues[a].total_cmp(&eig.eigenvalues[b]));

    let mut values = Vector3::zeros();
    let mut vectors = Matrix3::zeros();
    for (dst, &src) in order.iter().enumerate() {
        values[dst] = eig.eigenvalues[src];
        vectors.set_column(dst, &eig.eigenvectors.column(src));
    }
    Eigensystem { values, vectors }
}

/// `V · diag(values) · Vᵀ`.
pub fn reconstruct(values: &Vector3<f64>, vectors: &Matrix3<f64>) -> Matrix3<f64> {
    vectors * Matrix3::from_diagonal(values) * vectors.transpose()
}

pub fn symmetrize(m: &Matrix3<f64>) -> Matrix3<f64> {
    (m + m.transpose()) * 0.5
}

/// Apply `f` to the eigenvalues of a symmetric matrix.
pub fn map_eigenvalues(m: &Matrix3<f64>, f: impl Fn(f64) -> f64) -> Matrix3<f64> {
    let eig = eigen_decompose(m);
    reconstruct(&eig.values.map(f), &eig.vectors)
}

/// Inverse square root of a symmetric positive definite matrix, or `None`
/// when it is singular.
pub fn inverse_sqrt_spd(m: &Matrix3<f64>) -> Option<Matrix3<f64>> {
    let eig = eigen_decompose(m);
    if eig.values.iter().any(|v| *v <= f64::EPSILON * eig.values.amax().max(1.0)) {
        return None;
    }
    Some(reconstruct(&eig.values.map(|v| 1.0 / v.sqrt()), &eig.vectors))
}

/// Rotation factor `R = (F Fᵀ)^(-1/2) · F` of the polar decomposition
/// `F = V · R`.
pub fn polar_rotation(f: &Matrix3<f64>) -> Option<Matrix3<f64>> {
    inverse_sqrt_spd(&(f * f.transpose())).map(|s| s * f)
}

/// Replace negative eigenvalues with a small positive floor.
pub fn zero_correction(m: &Matrix3<f64>) -> Matrix3<f64> {
    map_eigenvalues(m, |v| if v < 0.0 { ZERO_CORRECTION_FLOOR } else { v })
}

/// Replace every eigenvalue by its absolute value.
pub fn abs_correction(m: &Matrix3<f64>) -> Matrix3<f64> {
    map_eigenvalues(m, f64::abs)
}

/// Nearest symmetric positive semi-definite matrix in the Frobenius norm.
///
/// With `B = (A + Aᵀ)/2` and `H` the symmetric polar factor of `B`, the
/// result is `(B + H)/2`, followed by a clamp of residual negative
/// eigenvalues to zero. `B` is symmetric, so `H = sqrt(BᵀB)` is taken
/// directly as `V·|Λ|·Vᵀ` from the eigensystem of `B`.
pub fn nearest_correction(m: &Matrix3<f64>) -> Matrix3<f64> {
    let b = symmetrize(m);
    let h = map_eigenvalues(&b, f64::abs);
    let x = symmetrize(&((b + h) * 0.5));
    map_eigenvalues(&x, |v| v.max(0.0))
}
