use std::fmt;

use serde::Serialize;

use crate::error::{InspectError, Result};

/// Accessor component type, keyed by the WebGL enum values glTF uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentType {
    Int8 = 5120,
    Uint8 = 5121,
    Int16 = 5122,
    Uint16 = 5123,
    Uint32 = 5125,
    Float32 = 5126,
}

impl ComponentType {
    pub fn from_gl(value: u32) -> Result<Self> {
        match value {
            5120 => Ok(ComponentType::Int8),
            5121 => Ok(ComponentType::Uint8),
            5122 => Ok(ComponentType::Int16),
            5123 => Ok(ComponentType::Uint16),
            5125 => Ok(ComponentType::Uint32),
            5126 => Ok(ComponentType::Float32),
            other => Err(InspectError::UnknownComponentType(other)),
        }
    }

    pub fn byte_length(&self) -> usize {
        match self {
            ComponentType::Int8 | ComponentType::Uint8 => 1,
            ComponentType::Int16 | ComponentType::Uint16 => 2,
            ComponentType::Uint32 | ComponentType::Float32 => 4,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ComponentType::Int8 => "BYTE",
            ComponentType::Uint8 => "UNSIGNED_BYTE",
            ComponentType::Int16 => "SHORT",
            ComponentType::Uint16 => "UNSIGNED_SHORT",
            ComponentType::Uint32 => "UNSIGNED_INT",
            ComponentType::Float32 => "FLOAT",
        }
    }
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Shape of a single accessor item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AccessorType {
    Scalar,
    Vec2,
    Vec3,
    Vec4,
    Mat2,
    Mat3,
    Mat4,
}

impl AccessorType {
    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "SCALAR" => Ok(AccessorType::Scalar),
            "VEC2" => Ok(AccessorType::Vec2),
            "VEC3" => Ok(AccessorType::Vec3),
            "VEC4" => Ok(AccessorType::Vec4),
            "MAT2" => Ok(AccessorType::Mat2),
            "MAT3" => Ok(AccessorType::Mat3),
            "MAT4" => Ok(AccessorType::Mat4),
            other => Err(InspectError::UnknownAccessorType(other.to_string())),
        }
    }

    /// Number of components per item.
    pub fn num_components(&self) -> usize {
        match self {
            AccessorType::Scalar => 1,
            AccessorType::Vec2 => 2,
            AccessorType::Vec3 => 3,
            AccessorType::Vec4 | AccessorType::Mat2 => 4,
            AccessorType::Mat3 => 9,
            AccessorType::Mat4 => 16,
        }
    }

    /// Display shape of one item as `(rows, columns)`.
    pub fn shape(&self) -> (usize, usize) {
        match self {
            AccessorType::Scalar => (1, 1),
            AccessorType::Vec2 => (1, 2),
            AccessorType::Vec3 => (1, 3),
            AccessorType::Vec4 => (1, 4),
            AccessorType::Mat2 => (2, 2),
            AccessorType::Mat3 => (3, 3),
            AccessorType::Mat4 => (4, 4),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AccessorType::Scalar => "SCALAR",
            AccessorType::Vec2 => "VEC2",
            AccessorType::Vec3 => "VEC3",
            AccessorType::Vec4 => "VEC4",
            AccessorType::Mat2 => "MAT2",
            AccessorType::Mat3 => "MAT3",
            AccessorType::Mat4 => "MAT4",
        }
    }
}

impl fmt::Display for AccessorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_component_sizes() {
        assert_eq!(ComponentType::from_gl(5126).unwrap().byte_length(), 4);
        assert_eq!(ComponentType::from_gl(5123).unwrap().byte_length(), 2);
        assert_eq!(ComponentType::from_gl(5121).unwrap().byte_length(), 1);
        assert!(matches!(
            ComponentType::from_gl(5124),
            Err(InspectError::UnknownComponentType(5124))
        ));
    }

    #[test]
    fn test_item_sizes_match_shapes() {
        for name in ["SCALAR", "VEC2", "VEC3", "VEC4", "MAT2", "MAT3", "MAT4"] {
            let ty = AccessorType::parse(name).unwrap();
            let (rows, cols) = ty.shape();
            assert_eq!(rows * cols, ty.num_components(), "{}", name);
            assert_eq!(ty.as_str(), name);
        }
        assert!(AccessorType::parse("VEC5").is_err());
    }
}
