use super::pixel::TensorPixel;
use nalgebra::Matrix3;

/// Symmetric 3×3 diffusion tensor stored as its six upper-triangular
/// components in the order `xx, xy, xz, yy, yz, zz`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DiffusionTensor<T>(pub [T; 6]);

impl<T: TensorPixel> DiffusionTensor<T> {
    pub fn new(components: [T; 6]) -> Self {
        Self(components)
    }

    /// Tensor with every component set to `value`.
    pub fn splat(value: T) -> Self {
        Self([value; 6])
    }

    pub fn components(&self) -> &[T; 6] {
        &self.0
    }

    /// Convert every component to another scalar type through `f64`.
    pub fn cast<U: TensorPixel>(&self) -> DiffusionTensor<U> {
        DiffusionTensor(self.0.map(|c| U::from_f64(c.to_f64())))
    }

    /// Full symmetric matrix in `f64`.
    pub fn to_matrix(&self) -> Matrix3<f64> {
        let [xx, xy, xz, yy, yz, zz] = self.0.map(TensorPixel::to_f64);
        Matrix3::new(xx, xy, xz, xy, yy, yz, xz, yz, zz)
    }

    /// Build from a matrix, averaging the off-diagonal pairs.
    pub fn from_matrix(m: &Matrix3<f64>) -> Self {
        let sym = |i: usize, j: usize| 0.5 * (m[(i, j)] + m[(j, i)]);
        Self([
            m[(0, 0)],
            sym(0, 1),
            sym(0, 2),
            m[(1, 1)],
            sym(1, 2),
            m[(2, 2)],
        ]
        .map(T::from_f64))
    }
}

impl DiffusionTensor<f64> {
    pub fn identity() -> Self {
        Self([1.0, 0.0, 0.0, 1.0, 0.0, 1.0])
    }

    pub fn trace(&self) -> f64 {
        self.0[0] + self.0[3] + self.0[5]
    }

    /// Largest absolute component difference.
    pub fn max_abs_difference(&self, other: &Self) -> f64 {
        self.0
            .iter()
            .zip(other.0.iter())
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max)
    }
}

impl<T> std::ops::Index<usize> for DiffusionTensor<T> {
    type Output = T;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

impl<T> std::ops::IndexMut<usize> for DiffusionTensor<T> {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.0[index]
    }
}
