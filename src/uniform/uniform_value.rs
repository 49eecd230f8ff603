use cgmath::{Matrix2, Matrix3, Matrix4, Vector2, Vector3, Vector4};

use crate::pipeline::reflection::ValueType;

/// A value that may be written to a program's uniform storage.
///
/// Matrix variants hold their elements in column-major order: the first `R` elements of a
/// `FloatMatrixCxR` value are its first column. Column-major is the only layout the binding layer
/// transmits; row-major data must be converted on the CPU first, e.g. with
/// [UniformValue::matrix4_from_rows].
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum UniformValue {
    Float(f32),
    FloatVector2([f32; 2]),
    FloatVector3([f32; 3]),
    FloatVector4([f32; 4]),
    FloatMatrix2x2([f32; 4]),
    FloatMatrix2x3([f32; 6]),
    FloatMatrix2x4([f32; 8]),
    FloatMatrix3x2([f32; 6]),
    FloatMatrix3x3([f32; 9]),
    FloatMatrix3x4([f32; 12]),
    FloatMatrix4x2([f32; 8]),
    FloatMatrix4x3([f32; 12]),
    FloatMatrix4x4([f32; 16]),
    Integer(i32),
    IntegerVector2([i32; 2]),
    IntegerVector3([i32; 3]),
    IntegerVector4([i32; 4]),
    UnsignedInteger(u32),
    UnsignedIntegerVector2([u32; 2]),
    UnsignedIntegerVector3([u32; 3]),
    UnsignedIntegerVector4([u32; 4]),
    Bool(bool),
    BoolVector2([bool; 2]),
    BoolVector3([bool; 3]),
    BoolVector4([bool; 4]),
}

impl UniformValue {
    /// The value a uniform of the given type holds before it was ever set.
    ///
    /// Sampler uniforms hold texture unit `0`.
    pub fn zero(value_type: ValueType) -> Self {
        match value_type {
            ValueType::Float => UniformValue::Float(0.0),
            ValueType::FloatVector2 => UniformValue::FloatVector2([0.0; 2]),
            ValueType::FloatVector3 => UniformValue::FloatVector3([0.0; 3]),
            ValueType::FloatVector4 => UniformValue::FloatVector4([0.0; 4]),
            ValueType::FloatMatrix2x2 => UniformValue::FloatMatrix2x2([0.0; 4]),
            ValueType::FloatMatrix2x3 => UniformValue::FloatMatrix2x3([0.0; 6]),
            ValueType::FloatMatrix2x4 => UniformValue::FloatMatrix2x4([0.0; 8]),
            ValueType::FloatMatrix3x2 => UniformValue::FloatMatrix3x2([0.0; 6]),
            ValueType::FloatMatrix3x3 => UniformValue::FloatMatrix3x3([0.0; 9]),
            ValueType::FloatMatrix3x4 => UniformValue::FloatMatrix3x4([0.0; 12]),
            ValueType::FloatMatrix4x2 => UniformValue::FloatMatrix4x2([0.0; 8]),
            ValueType::FloatMatrix4x3 => UniformValue::FloatMatrix4x3([0.0; 12]),
            ValueType::FloatMatrix4x4 => UniformValue::FloatMatrix4x4([0.0; 16]),
            ValueType::Integer => UniformValue::Integer(0),
            ValueType::IntegerVector2 => UniformValue::IntegerVector2([0; 2]),
            ValueType::IntegerVector3 => UniformValue::IntegerVector3([0; 3]),
            ValueType::IntegerVector4 => UniformValue::IntegerVector4([0; 4]),
            ValueType::UnsignedInteger => UniformValue::UnsignedInteger(0),
            ValueType::UnsignedIntegerVector2 => UniformValue::UnsignedIntegerVector2([0; 2]),
            ValueType::UnsignedIntegerVector3 => UniformValue::UnsignedIntegerVector3([0; 3]),
            ValueType::UnsignedIntegerVector4 => UniformValue::UnsignedIntegerVector4([0; 4]),
            ValueType::Bool => UniformValue::Bool(false),
            ValueType::BoolVector2 => UniformValue::BoolVector2([false; 2]),
            ValueType::BoolVector3 => UniformValue::BoolVector3([false; 3]),
            ValueType::BoolVector4 => UniformValue::BoolVector4([false; 4]),
            ValueType::FloatSampler2D
            | ValueType::FloatSampler3D
            | ValueType::FloatSamplerCube
            | ValueType::FloatSampler2DArray
            | ValueType::ShadowSampler2D
            | ValueType::IntegerSampler2D
            | ValueType::UnsignedIntegerSampler2D => UniformValue::Integer(0),
        }
    }

    /// The GLSL type of this value.
    pub fn value_type(&self) -> ValueType {
        match self {
            UniformValue::Float(_) => ValueType::Float,
            UniformValue::FloatVector2(_) => ValueType::FloatVector2,
            UniformValue::FloatVector3(_) => ValueType::FloatVector3,
            UniformValue::FloatVector4(_) => ValueType::FloatVector4,
            UniformValue::FloatMatrix2x2(_) => ValueType::FloatMatrix2x2,
            UniformValue::FloatMatrix2x3(_) => ValueType::FloatMatrix2x3,
            UniformValue::FloatMatrix2x4(_) => ValueType::FloatMatrix2x4,
            UniformValue::FloatMatrix3x2(_) => ValueType::FloatMatrix3x2,
            UniformValue::FloatMatrix3x3(_) => ValueType::FloatMatrix3x3,
            UniformValue::FloatMatrix3x4(_) => ValueType::FloatMatrix3x4,
            UniformValue::FloatMatrix4x2(_) => ValueType::FloatMatrix4x2,
            UniformValue::FloatMatrix4x3(_) => ValueType::FloatMatrix4x3,
            UniformValue::FloatMatrix4x4(_) => ValueType::FloatMatrix4x4,
            UniformValue::Integer(_) => ValueType::Integer,
            UniformValue::IntegerVector2(_) => ValueType::IntegerVector2,
            UniformValue::IntegerVector3(_) => ValueType::IntegerVector3,
            UniformValue::IntegerVector4(_) => ValueType::IntegerVector4,
            UniformValue::UnsignedInteger(_) => ValueType::UnsignedInteger,
            UniformValue::UnsignedIntegerVector2(_) => ValueType::UnsignedIntegerVector2,
            UniformValue::UnsignedIntegerVector3(_) => ValueType::UnsignedIntegerVector3,
            UniformValue::UnsignedIntegerVector4(_) => ValueType::UnsignedIntegerVector4,
            UniformValue::Bool(_) => ValueType::Bool,
            UniformValue::BoolVector2(_) => ValueType::BoolVector2,
            UniformValue::BoolVector3(_) => ValueType::BoolVector3,
            UniformValue::BoolVector4(_) => ValueType::BoolVector4,
        }
    }

    /// Whether this value may be written to a uniform declared with `declared` type.
    ///
    /// Besides exact matches, sampler uniforms accept an `int` texture unit.
    pub fn is_compatible_with(&self, declared: ValueType) -> bool {
        let value_type = self.value_type();

        if value_type == declared {
            return true;
        }

        match declared {
            ValueType::FloatSampler2D
            | ValueType::FloatSampler3D
            | ValueType::FloatSamplerCube
            | ValueType::FloatSampler2DArray
            | ValueType::ShadowSampler2D
            | ValueType::IntegerSampler2D
            | ValueType::UnsignedIntegerSampler2D => value_type == ValueType::Integer,
            _ => false,
        }
    }

    /// Builds a 4x4 matrix value from columns.
    pub fn matrix4_from_columns(columns: [[f32; 4]; 4]) -> Self {
        let mut data = [0.0; 16];

        for (c, column) in columns.iter().enumerate() {
            data[c * 4..c * 4 + 4].copy_from_slice(column);
        }

        UniformValue::FloatMatrix4x4(data)
    }

    /// Builds a 4x4 matrix value from rows, transposing them into column-major order.
    pub fn matrix4_from_rows(rows: [[f32; 4]; 4]) -> Self {
        let mut data = [0.0; 16];

        for (r, row) in rows.iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
                data[c * 4 + r] = *value;
            }
        }

        UniformValue::FloatMatrix4x4(data)
    }

    /// Builds a 3x3 matrix value from columns.
    pub fn matrix3_from_columns(columns: [[f32; 3]; 3]) -> Self {
        let mut data = [0.0; 9];

        for (c, column) in columns.iter().enumerate() {
            data[c * 3..c * 3 + 3].copy_from_slice(column);
        }

        UniformValue::FloatMatrix3x3(data)
    }
}

macro_rules! impl_from {
    ($source:ty, $variant:ident) => {
        impl From<$source> for UniformValue {
            fn from(value: $source) -> Self {
                UniformValue::$variant(value)
            }
        }
    };
}

impl_from!(f32, Float);
impl_from!([f32; 2], FloatVector2);
impl_from!([f32; 3], FloatVector3);
impl_from!([f32; 4], FloatVector4);
impl_from!(i32, Integer);
impl_from!([i32; 2], IntegerVector2);
impl_from!([i32; 3], IntegerVector3);
impl_from!([i32; 4], IntegerVector4);
impl_from!(u32, UnsignedInteger);
impl_from!([u32; 2], UnsignedIntegerVector2);
impl_from!([u32; 3], UnsignedIntegerVector3);
impl_from!([u32; 4], UnsignedIntegerVector4);
impl_from!(bool, Bool);
impl_from!([bool; 2], BoolVector2);
impl_from!([bool; 3], BoolVector3);
impl_from!([bool; 4], BoolVector4);

impl From<Vector2<f32>> for UniformValue {
    fn from(value: Vector2<f32>) -> Self {
        UniformValue::FloatVector2(value.into())
    }
}

impl From<Vector3<f32>> for UniformValue {
    fn from(value: Vector3<f32>) -> Self {
        UniformValue::FloatVector3(value.into())
    }
}

impl From<Vector4<f32>> for UniformValue {
    fn from(value: Vector4<f32>) -> Self {
        UniformValue::FloatVector4(value.into())
    }
}

// cgmath stores matrices as an array of column vectors, so a plain reinterpretation as a flat
// array already yields column-major order.

impl From<Matrix2<f32>> for UniformValue {
    fn from(value: Matrix2<f32>) -> Self {
        let data: &[f32; 4] = value.as_ref();

        UniformValue::FloatMatrix2x2(*data)
    }
}

impl From<Matrix3<f32>> for UniformValue {
    fn from(value: Matrix3<f32>) -> Self {
        let data: &[f32; 9] = value.as_ref();

        UniformValue::FloatMatrix3x3(*data)
    }
}

impl From<Matrix4<f32>> for UniformValue {
    fn from(value: Matrix4<f32>) -> Self {
        let data: &[f32; 16] = value.as_ref();

        UniformValue::FloatMatrix4x4(*data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use cgmath::{Rad, Vector3};

    #[test]
    fn test_matrix4_from_rows_transposes() {
        let value = UniformValue::matrix4_from_rows([
            [1.0, 2.0, 3.0, 4.0],
            [5.0, 6.0, 7.0, 8.0],
            [9.0, 10.0, 11.0, 12.0],
            [13.0, 14.0, 15.0, 16.0],
        ]);

        assert_eq!(
            value,
            UniformValue::FloatMatrix4x4([
                1.0, 5.0, 9.0, 13.0, 2.0, 6.0, 10.0, 14.0, 3.0, 7.0, 11.0, 15.0, 4.0, 8.0, 12.0,
                16.0
            ])
        );
    }

    #[test]
    fn test_cgmath_translation_is_column_major() {
        let matrix = Matrix4::from_translation(Vector3::new(1.0f32, 2.0, 3.0));

        match UniformValue::from(matrix) {
            UniformValue::FloatMatrix4x4(data) => {
                // The translation lives in the last column.
                assert_eq!(&data[12..15], &[1.0, 2.0, 3.0]);
                assert_eq!(data[15], 1.0);
            }
            other => panic!("unexpected value {:?}", other),
        }
    }

    #[test]
    fn test_cgmath_rotation_matches_columns() {
        let matrix = Matrix4::from_angle_z(Rad(0.5f32));
        let columns: [[f32; 4]; 4] = matrix.into();

        assert_eq!(
            UniformValue::from(matrix),
            UniformValue::matrix4_from_columns(columns)
        );
    }

    #[test]
    fn test_sampler_uniforms_accept_texture_units() {
        assert!(UniformValue::Integer(3).is_compatible_with(ValueType::FloatSampler2D));
        assert!(!UniformValue::Float(3.0).is_compatible_with(ValueType::FloatSampler2D));
        assert!(!UniformValue::Integer(1).is_compatible_with(ValueType::Float));
    }

    #[test]
    fn test_zero_matches_declared_type() {
        for value_type in &[
            ValueType::Float,
            ValueType::FloatMatrix3x4,
            ValueType::UnsignedIntegerVector3,
            ValueType::BoolVector2,
        ] {
            assert_eq!(UniformValue::zero(*value_type).value_type(), *value_type);
        }

        assert_eq!(
            UniformValue::zero(ValueType::FloatSamplerCube),
            UniformValue::Integer(0)
        );
    }
}
