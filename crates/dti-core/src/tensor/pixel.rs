//! Scalar component types a tensor volume may be stored with.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Runtime tag for the scalar component type of a tensor volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentType {
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    U64,
    I64,
    F32,
    F64,
}

impl ComponentType {
    pub fn is_floating_point(self) -> bool {
        matches!(self, ComponentType::F32 | ComponentType::F64)
    }
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ComponentType::U8 => "unsigned char",
            ComponentType::I8 => "char",
            ComponentType::U16 => "unsigned short",
            ComponentType::I16 => "short",
            ComponentType::U32 => "unsigned int",
            ComponentType::I32 => "int",
            ComponentType::U64 => "unsigned long",
            ComponentType::I64 => "long",
            ComponentType::F32 => "float",
            ComponentType::F64 => "double",
        };
        f.write_str(name)
    }
}

/// A scalar type usable as a tensor component.
///
/// All arithmetic runs in `f64`; `from_f64` converts back with saturation
/// for integer types and truncation toward zero.
pub trait TensorPixel: Copy + Default + PartialEq + Send + Sync + fmt::Debug + 'static {
    const COMPONENT_TYPE: ComponentType;

    fn to_f64(self) -> f64;

    fn from_f64(value: f64) -> Self;
}

macro_rules! impl_tensor_pixel {
    ($($ty:ty => $tag:ident),* $(,)?) => {
        $(
            impl TensorPixel for $ty {
                const COMPONENT_TYPE: ComponentType = ComponentType::$tag;

                #[inline]
                fn to_f64(self) -> f64 {
                    self as f64
                }

                #[inline]
                fn from_f64(value: f64) -> Self {
                    value as $ty
                }
            }
        )*
    };
}

impl_tensor_pixel!(
    u8 => U8,
    i8 => I8,
    u16 => U16,
    i16 => I16,
    u32 => U32,
    i32 => I32,
    u64 => U64,
    i64 => I64,
    f32 => F32,
    f64 => F64,
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_casts_saturate() {
        assert_eq!(u8::from_f64(300.0), 255);
        assert_eq!(u8::from_f64(-3.0), 0);
        assert_eq!(i16::from_f64(-2.9), -2);
        assert_eq!(i8::from_f64(f64::NAN), 0);
    }

    #[test]
    fn test_component_tags() {
        assert_eq!(<f32 as TensorPixel>::COMPONENT_TYPE, ComponentType::F32);
        assert_eq!(<i64 as TensorPixel>::COMPONENT_TYPE, ComponentType::I64);
        assert!(ComponentType::F64.is_floating_point());
        assert!(!ComponentType::U16.is_floating_point());
        assert_eq!(ComponentType::U8.to_string(), "unsigned char");
    }
}
