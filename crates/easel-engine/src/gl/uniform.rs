use std::fmt;

use crate::error::BindingError;

/// Closed set of uniform shapes the render core can bind.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum UniformShape {
    Float,
    Vec2,
    Vec3,
    Vec4,
    Mat2,
    Mat3,
    Mat4,
}

/// Alias used where a shape is named by its call suffix (`"2fv"`, `"Matrix3fv"`).
pub type UniformTag = UniformShape;

impl UniformShape {
    /// Parses the classic uniform call suffix vocabulary.
    ///
    /// Scalar forms (`"2f"`) and vector forms (`"2fv"`) name the same shape; the
    /// difference only affected how the values were passed.
    pub fn from_suffix(suffix: &str) -> Result<Self, BindingError> {
        let shape = match suffix {
            "1f" | "1fv" => UniformShape::Float,
            "2f" | "2fv" => UniformShape::Vec2,
            "3f" | "3fv" => UniformShape::Vec3,
            "4f" | "4fv" => UniformShape::Vec4,
            "Matrix2fv" => UniformShape::Mat2,
            "Matrix3fv" => UniformShape::Mat3,
            "Matrix4fv" => UniformShape::Mat4,
            other => return Err(BindingError::UnsupportedTag(other.to_string())),
        };
        Ok(shape)
    }

    /// Number of `f32` values a caller supplies for this shape.
    pub const fn value_count(self) -> usize {
        match self {
            UniformShape::Float => 1,
            UniformShape::Vec2 => 2,
            UniformShape::Vec3 => 3,
            UniformShape::Vec4 | UniformShape::Mat2 => 4,
            UniformShape::Mat3 => 9,
            UniformShape::Mat4 => 16,
        }
    }

    pub const fn is_matrix(self) -> bool {
        matches!(self, UniformShape::Mat2 | UniformShape::Mat3 | UniformShape::Mat4)
    }

    /// Byte size in the uniform address space.
    ///
    /// Matrix columns are `vec2` (8-byte aligned) for `mat2x2` and padded to
    /// 16 bytes for `mat3x3`/`mat4x4`.
    pub const fn uniform_size(self) -> u64 {
        match self {
            UniformShape::Float => 4,
            UniformShape::Vec2 => 8,
            UniformShape::Vec3 => 12,
            UniformShape::Vec4 | UniformShape::Mat2 => 16,
            UniformShape::Mat3 => 48,
            UniformShape::Mat4 => 64,
        }
    }
}

impl fmt::Display for UniformShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UniformShape::Float => "f32",
            UniformShape::Vec2 => "vec2<f32>",
            UniformShape::Vec3 => "vec3<f32>",
            UniformShape::Vec4 => "vec4<f32>",
            UniformShape::Mat2 => "mat2x2<f32>",
            UniformShape::Mat3 => "mat3x3<f32>",
            UniformShape::Mat4 => "mat4x4<f32>",
        };
        f.write_str(name)
    }
}

/// A typed uniform value.
///
/// Matrices are given column-major; `transpose` marks row-major input.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
    Mat2 { transpose: bool, values: [f32; 4] },
    Mat3 { transpose: bool, values: [f32; 9] },
    Mat4 { transpose: bool, values: [f32; 16] },
}

impl UniformValue {
    /// Builds a value of `shape` from a flat slice.
    ///
    /// The slice length must match the shape exactly. `transpose` is ignored for
    /// non-matrix shapes.
    pub fn from_slice(
        shape: UniformShape,
        values: &[f32],
        transpose: bool,
    ) -> Result<Self, BindingError> {
        let expected = shape.value_count();
        if values.len() != expected {
            return Err(BindingError::Arity {
                shape,
                expected,
                actual: values.len(),
            });
        }

        // Lengths were checked above; the conversions cannot fail.
        let value = match shape {
            UniformShape::Float => UniformValue::Float(values[0]),
            UniformShape::Vec2 => UniformValue::Vec2([values[0], values[1]]),
            UniformShape::Vec3 => UniformValue::Vec3([values[0], values[1], values[2]]),
            UniformShape::Vec4 => {
                UniformValue::Vec4([values[0], values[1], values[2], values[3]])
            }
            UniformShape::Mat2 => {
                let mut m = [0.0; 4];
                m.copy_from_slice(values);
                UniformValue::Mat2 { transpose, values: m }
            }
            UniformShape::Mat3 => {
                let mut m = [0.0; 9];
                m.copy_from_slice(values);
                UniformValue::Mat3 { transpose, values: m }
            }
            UniformShape::Mat4 => {
                let mut m = [0.0; 16];
                m.copy_from_slice(values);
                UniformValue::Mat4 { transpose, values: m }
            }
        };
        Ok(value)
    }

    /// Parses a suffix-tagged value, e.g. `("2fv", &[800.0, 600.0])`.
    pub fn parse(suffix: &str, values: &[f32], transpose: bool) -> Result<Self, BindingError> {
        Self::from_slice(UniformShape::from_suffix(suffix)?, values, transpose)
    }

    pub fn shape(&self) -> UniformShape {
        match self {
            UniformValue::Float(_) => UniformShape::Float,
            UniformValue::Vec2(_) => UniformShape::Vec2,
            UniformValue::Vec3(_) => UniformShape::Vec3,
            UniformValue::Vec4(_) => UniformShape::Vec4,
            UniformValue::Mat2 { .. } => UniformShape::Mat2,
            UniformValue::Mat3 { .. } => UniformShape::Mat3,
            UniformValue::Mat4 { .. } => UniformShape::Mat4,
        }
    }

    /// Packs the value with uniform address-space layout.
    ///
    /// The result is exactly `shape().uniform_size()` bytes. Matrices come out
    /// column-major regardless of `transpose`.
    pub fn to_uniform_bytes(&self) -> Vec<u8> {
        let floats: Vec<f32> = match *self {
            UniformValue::Float(v) => vec![v],
            UniformValue::Vec2(v) => v.to_vec(),
            UniformValue::Vec3(v) => v.to_vec(),
            UniformValue::Vec4(v) => v.to_vec(),
            UniformValue::Mat2 { transpose, values } => column_major::<2>(&values, transpose),
            UniformValue::Mat3 { transpose, values } => {
                pad_columns::<3>(&column_major::<3>(&values, transpose))
            }
            UniformValue::Mat4 { transpose, values } => column_major::<4>(&values, transpose),
        };
        bytemuck::cast_slice(&floats).to_vec()
    }
}

fn column_major<const N: usize>(values: &[f32], transpose: bool) -> Vec<f32> {
    if !transpose {
        return values.to_vec();
    }
    let mut out = vec![0.0; N * N];
    for row in 0..N {
        for col in 0..N {
            out[col * N + row] = values[row * N + col];
        }
    }
    out
}

/// Pads each `N`-float column to four floats.
fn pad_columns<const N: usize>(values: &[f32]) -> Vec<f32> {
    let mut out = Vec::with_capacity(N * 4);
    for column in values.chunks_exact(N) {
        out.extend_from_slice(column);
        out.resize(out.len() + (4 - N), 0.0);
    }
    out
}
