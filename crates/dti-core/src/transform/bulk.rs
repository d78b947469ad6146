//! Deformable transform with a bulk (linear) component.

use super::trait_::PointTransform;
use crate::spatial::Point3;
use std::sync::Arc;

/// `T(p) = Bulk(p) + (Deformable(p) − p)`.
///
/// The deformable part contributes only its displacement on top of the bulk
/// mapping.
#[derive(Debug, Clone)]
pub struct BulkTransform {
    deformable: Arc<dyn PointTransform>,
    bulk: Arc<dyn PointTransform>,
}

impl BulkTransform {
    pub fn new(deformable: Arc<dyn PointTransform>, bulk: Arc<dyn PointTransform>) -> Self {
        Self { deformable, bulk }
    }
}

impl PointTransform for BulkTransform {
    fn transform_point(&self, point: &Point3) -> Point3 {
        let bulk = self.bulk.transform_point(point);
        let deformed = self.deformable.transform_point(point);
        bulk + (deformed - *point)
    }
}
