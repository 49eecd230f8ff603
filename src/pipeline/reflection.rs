use std::fmt;

/// Enumerates the GLSL ES 3.00 value types a program may expose through its active attributes
/// and active uniforms.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum ValueType {
    Float,
    FloatVector2,
    FloatVector3,
    FloatVector4,
    FloatMatrix2x2,
    FloatMatrix2x3,
    FloatMatrix2x4,
    FloatMatrix3x2,
    FloatMatrix3x3,
    FloatMatrix3x4,
    FloatMatrix4x2,
    FloatMatrix4x3,
    FloatMatrix4x4,
    Integer,
    IntegerVector2,
    IntegerVector3,
    IntegerVector4,
    UnsignedInteger,
    UnsignedIntegerVector2,
    UnsignedIntegerVector3,
    UnsignedIntegerVector4,
    Bool,
    BoolVector2,
    BoolVector3,
    BoolVector4,
    FloatSampler2D,
    FloatSampler3D,
    FloatSamplerCube,
    FloatSampler2DArray,
    ShadowSampler2D,
    IntegerSampler2D,
    UnsignedIntegerSampler2D,
}

impl ValueType {
    /// Resolves the GLSL spelling of a type (e.g. `"vec3"`, `"mat4"`).
    ///
    /// Returns `None` for names that are not a type, or for types this crate does not model.
    pub fn from_glsl_name(name: &str) -> Option<Self> {
        let value_type = match name {
            "float" => ValueType::Float,
            "vec2" => ValueType::FloatVector2,
            "vec3" => ValueType::FloatVector3,
            "vec4" => ValueType::FloatVector4,
            "mat2" | "mat2x2" => ValueType::FloatMatrix2x2,
            "mat2x3" => ValueType::FloatMatrix2x3,
            "mat2x4" => ValueType::FloatMatrix2x4,
            "mat3x2" => ValueType::FloatMatrix3x2,
            "mat3" | "mat3x3" => ValueType::FloatMatrix3x3,
            "mat3x4" => ValueType::FloatMatrix3x4,
            "mat4x2" => ValueType::FloatMatrix4x2,
            "mat4x3" => ValueType::FloatMatrix4x3,
            "mat4" | "mat4x4" => ValueType::FloatMatrix4x4,
            "int" => ValueType::Integer,
            "ivec2" => ValueType::IntegerVector2,
            "ivec3" => ValueType::IntegerVector3,
            "ivec4" => ValueType::IntegerVector4,
            "uint" => ValueType::UnsignedInteger,
            "uvec2" => ValueType::UnsignedIntegerVector2,
            "uvec3" => ValueType::UnsignedIntegerVector3,
            "uvec4" => ValueType::UnsignedIntegerVector4,
            "bool" => ValueType::Bool,
            "bvec2" => ValueType::BoolVector2,
            "bvec3" => ValueType::BoolVector3,
            "bvec4" => ValueType::BoolVector4,
            "sampler2D" => ValueType::FloatSampler2D,
            "sampler3D" => ValueType::FloatSampler3D,
            "samplerCube" => ValueType::FloatSamplerCube,
            "sampler2DArray" => ValueType::FloatSampler2DArray,
            "sampler2DShadow" => ValueType::ShadowSampler2D,
            "isampler2D" => ValueType::IntegerSampler2D,
            "usampler2D" => ValueType::UnsignedIntegerSampler2D,
            _ => return None,
        };

        Some(value_type)
    }

    pub fn glsl_name(&self) -> &'static str {
        match self {
            ValueType::Float => "float",
            ValueType::FloatVector2 => "vec2",
            ValueType::FloatVector3 => "vec3",
            ValueType::FloatVector4 => "vec4",
            ValueType::FloatMatrix2x2 => "mat2",
            ValueType::FloatMatrix2x3 => "mat2x3",
            ValueType::FloatMatrix2x4 => "mat2x4",
            ValueType::FloatMatrix3x2 => "mat3x2",
            ValueType::FloatMatrix3x3 => "mat3",
            ValueType::FloatMatrix3x4 => "mat3x4",
            ValueType::FloatMatrix4x2 => "mat4x2",
            ValueType::FloatMatrix4x3 => "mat4x3",
            ValueType::FloatMatrix4x4 => "mat4",
            ValueType::Integer => "int",
            ValueType::IntegerVector2 => "ivec2",
            ValueType::IntegerVector3 => "ivec3",
            ValueType::IntegerVector4 => "ivec4",
            ValueType::UnsignedInteger => "uint",
            ValueType::UnsignedIntegerVector2 => "uvec2",
            ValueType::UnsignedIntegerVector3 => "uvec3",
            ValueType::UnsignedIntegerVector4 => "uvec4",
            ValueType::Bool => "bool",
            ValueType::BoolVector2 => "bvec2",
            ValueType::BoolVector3 => "bvec3",
            ValueType::BoolVector4 => "bvec4",
            ValueType::FloatSampler2D => "sampler2D",
            ValueType::FloatSampler3D => "sampler3D",
            ValueType::FloatSamplerCube => "samplerCube",
            ValueType::FloatSampler2DArray => "sampler2DArray",
            ValueType::ShadowSampler2D => "sampler2DShadow",
            ValueType::IntegerSampler2D => "isampler2D",
            ValueType::UnsignedIntegerSampler2D => "usampler2D",
        }
    }

    /// Whether values of this type may be used as a vertex shader input.
    ///
    /// GLSL ES 3.00 does not allow boolean or sampler attributes.
    pub fn is_attribute_type(&self) -> bool {
        match self {
            ValueType::Bool
            | ValueType::BoolVector2
            | ValueType::BoolVector3
            | ValueType::BoolVector4
            | ValueType::FloatSampler2D
            | ValueType::FloatSampler3D
            | ValueType::FloatSamplerCube
            | ValueType::FloatSampler2DArray
            | ValueType::ShadowSampler2D
            | ValueType::IntegerSampler2D
            | ValueType::UnsignedIntegerSampler2D => false,
            _ => true,
        }
    }

    /// The number of consecutive attribute locations a vertex input of this type occupies.
    pub fn location_count(&self) -> u32 {
        match self {
            ValueType::FloatMatrix2x2 | ValueType::FloatMatrix2x3 | ValueType::FloatMatrix2x4 => 2,
            ValueType::FloatMatrix3x2 | ValueType::FloatMatrix3x3 | ValueType::FloatMatrix3x4 => 3,
            ValueType::FloatMatrix4x2 | ValueType::FloatMatrix4x3 | ValueType::FloatMatrix4x4 => 4,
            _ => 1,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.glsl_name())
    }
}

/// Describes an active attribute or an active uniform of a linked program.
#[derive(Clone, PartialEq, Debug)]
pub struct ActiveInfo {
    pub name: String,
    pub value_type: ValueType,
    pub size: u32,
}
