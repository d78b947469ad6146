//! Output grid selection.

use dti_core::image::ImageGeometry;

use crate::config::ResampleConfig;

/// Resolve the output grid field by field: an explicit value wins, then the
/// reference volume, then the input volume.
pub fn resolve_output_geometry(
    config: &ResampleConfig,
    input: &ImageGeometry,
    reference: Option<&ImageGeometry>,
) -> ImageGeometry {
    let fallback = reference.unwrap_or(input);
    ImageGeometry::new(
        config.explicit_size().unwrap_or_else(|| fallback.size()),
        config.explicit_origin().unwrap_or_else(|| *fallback.origin()),
        config.explicit_spacing().unwrap_or_else(|| *fallback.spacing()),
        config.explicit_direction().unwrap_or_else(|| *fallback.direction()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use dti_core::spatial::{Direction3, Point3, Spacing3};

    fn input() -> ImageGeometry {
        ImageGeometry::new(
            [10, 10, 10],
            Point3::new([1.0, 2.0, 3.0]),
            Spacing3::uniform(1.0),
            Direction3::identity(),
        )
    }

    #[test]
    fn test_defaults_to_input() {
        let config = ResampleConfig::new("in", "out");
        assert_eq!(resolve_output_geometry(&config, &input(), None), input());
    }

    #[test]
    fn test_reference_then_explicit() {
        let reference = ImageGeometry::new(
            [5, 6, 7],
            Point3::new([0.0, 0.0, 0.0]),
            Spacing3::uniform(2.0),
            Direction3::identity(),
        );
        let config = ResampleConfig::new("in", "out").with_output_spacing([0.5, 0.5, 0.5]);
        let out = resolve_output_geometry(&config, &input(), Some(&reference));
        assert_eq!(out.size(), [5, 6, 7]);
        assert_eq!(out.spacing().to_array(), [0.5, 0.5, 0.5]);
        assert_eq!(out.origin().to_array(), [0.0, 0.0, 0.0]);
    }
}
