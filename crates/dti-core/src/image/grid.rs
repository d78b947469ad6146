//! Index arithmetic over flat voxel buffers.

use super::geometry::INSIDE_TOLERANCE;
use crate::spatial::Point3;

/// Flat buffer offset of `index` for a grid of `size` (x fastest).
#[inline]
pub fn linear_index(index: [usize; 3], size: [usize; 3]) -> usize {
    index[0] + size[0] * (index[1] + size[1] * index[2])
}

/// Inverse of [`linear_index`].
#[inline]
pub fn grid_index(offset: usize, size: [usize; 3]) -> [usize; 3] {
    let x = offset % size[0];
    let rest = offset / size[0];
    [x, rest % size[1], rest / size[1]]
}

/// Buffer offsets and weights of the eight voxels surrounding a continuous
/// index, for trilinear interpolation.
///
/// Neighbours past the last voxel are clamped onto it, so an index lying on
/// the upper face still yields valid offsets. Returns `None` when the index
/// is outside `[0, size - 1]` by more than the tolerance.
pub fn trilinear_neighbourhood(index: &Point3, size: [usize; 3]) -> Option<[(usize, f64); 8]> {
    let mut lower = [0usize; 3];
    let mut upper = [0usize; 3];
    let mut frac = [0.0f64; 3];

    for axis in 0..3 {
        let last = size[axis].checked_sub(1)? as f64;
        let x = index[axis];
        if !(x >= -INSIDE_TOLERANCE && x <= last + INSIDE_TOLERANCE) {
            return None;
        }
        let x = x.clamp(0.0, last);
        let base = x.floor();
        lower[axis] = base as usize;
        upper[axis] = (lower[axis] + 1).min(size[axis] - 1);
        frac[axis] = x - base;
    }

    let mut out = [(0usize, 0.0f64); 8];
    for (corner, slot) in out.iter_mut().enumerate() {
        let mut idx = [0usize; 3];
        let mut weight = 1.0;
        for axis in 0..3 {
            if corner & (1 << axis) != 0 {
                idx[axis] = upper[axis];
                weight *= frac[axis];
            } else {
                idx[axis] = lower[axis];
                weight *= 1.0 - frac[axis];
            }
        }
        *slot = (linear_index(idx, size), weight);
    }
    Some(out)
}
