use crate::runtime::ConfigurationError;
use crate::vertex::AttributeType;

/// The distance between the starts of consecutive elements of one attribute in a buffer.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Stride {
    /// Elements follow each other without gaps; the stride equals the size of one element.
    TightlyPacked,
    Bytes(u8),
}

impl Stride {
    /// The raw stride as the host expects it, `0` meaning tightly packed.
    pub fn as_raw(&self) -> u8 {
        match self {
            Stride::TightlyPacked => 0,
            Stride::Bytes(bytes) => *bytes,
        }
    }
}

impl Default for Stride {
    fn default() -> Self {
        Stride::TightlyPacked
    }
}

/// Describes how the vertex shader input at one attribute location reads from a buffer.
///
/// A descriptor is validated when it is built, so an existing descriptor is always internally
/// consistent: 1 to 4 components, a stride that is either tightly packed or spans at least one
/// element and at most 255 bytes, and a stride and offset aligned to the component size.
///
/// ```
/// use web_shade::vertex::{AttributeType, Stride, VertexAttributeDescriptor};
///
/// // Interleaved position (vec3) and color (4 normalized bytes).
/// let position = VertexAttributeDescriptor::begin(0, 3, AttributeType::Float)
///     .stride_in_bytes(16)
///     .finish()
///     .unwrap();
///
/// let color = VertexAttributeDescriptor::begin(1, 4, AttributeType::UnsignedByte)
///     .normalize(true)
///     .stride_in_bytes(16)
///     .offset_in_bytes(12)
///     .finish()
///     .unwrap();
///
/// assert_eq!(position.stride(), Stride::Bytes(16));
/// assert_eq!(color.effective_stride(), 16);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct VertexAttributeDescriptor {
    location: u32,
    component_count: u8,
    attribute_type: AttributeType,
    normalize: bool,
    stride: Stride,
    offset_in_bytes: u32,
}

impl VertexAttributeDescriptor {
    pub fn begin(
        location: u32,
        component_count: u8,
        attribute_type: AttributeType,
    ) -> VertexAttributeDescriptorBuilder {
        VertexAttributeDescriptorBuilder {
            location,
            component_count,
            attribute_type,
            normalize: false,
            stride_in_bytes: 0,
            offset_in_bytes: 0,
        }
    }

    pub fn location(&self) -> u32 {
        self.location
    }

    pub fn component_count(&self) -> u8 {
        self.component_count
    }

    pub fn attribute_type(&self) -> AttributeType {
        self.attribute_type
    }

    pub fn normalize(&self) -> bool {
        self.normalize
    }

    pub fn stride(&self) -> Stride {
        self.stride
    }

    pub fn offset_in_bytes(&self) -> u32 {
        self.offset_in_bytes
    }

    /// The size of one element of the attribute in bytes.
    pub fn element_size(&self) -> u32 {
        self.component_count as u32 * self.attribute_type.size_in_bytes()
    }

    /// The stride in bytes, with a tightly packed stride resolved to the element size.
    pub fn effective_stride(&self) -> u32 {
        match self.stride {
            Stride::TightlyPacked => self.element_size(),
            Stride::Bytes(bytes) => bytes as u32,
        }
    }

    /// The number of bytes a buffer must hold for `count` vertices starting at vertex `first`.
    pub fn required_buffer_size(&self, first: u32, count: u32) -> u64 {
        if count == 0 {
            return 0;
        }

        let last = first as u64 + count as u64 - 1;

        self.offset_in_bytes as u64 + last * self.effective_stride() as u64
            + self.element_size() as u64
    }
}

pub struct VertexAttributeDescriptorBuilder {
    location: u32,
    component_count: u8,
    attribute_type: AttributeType,
    normalize: bool,
    stride_in_bytes: u32,
    offset_in_bytes: u32,
}

impl VertexAttributeDescriptorBuilder {
    /// Whether integer data is mapped to `[0, 1]` (unsigned) or `[-1, 1]` (signed) when fetched.
    ///
    /// Has no effect for float types.
    pub fn normalize(mut self, normalize: bool) -> Self {
        self.normalize = normalize;

        self
    }

    /// `0` means tightly packed.
    pub fn stride_in_bytes(mut self, stride_in_bytes: u32) -> Self {
        self.stride_in_bytes = stride_in_bytes;

        self
    }

    pub fn offset_in_bytes(mut self, offset_in_bytes: u32) -> Self {
        self.offset_in_bytes = offset_in_bytes;

        self
    }

    pub fn finish(self) -> Result<VertexAttributeDescriptor, ConfigurationError> {
        let VertexAttributeDescriptorBuilder {
            location,
            component_count,
            attribute_type,
            normalize,
            stride_in_bytes,
            offset_in_bytes,
        } = self;

        if component_count < 1 || component_count > 4 {
            return Err(ConfigurationError::InvalidComponentCount(component_count));
        }

        let component_size = attribute_type.size_in_bytes();
        let element_size = component_count as u32 * component_size;

        let stride = if stride_in_bytes == 0 {
            Stride::TightlyPacked
        } else if stride_in_bytes > 255 {
            return Err(ConfigurationError::StrideTooLarge(stride_in_bytes));
        } else if stride_in_bytes < element_size {
            return Err(ConfigurationError::StrideTooSmall {
                stride: stride_in_bytes,
                element_size,
            });
        } else if stride_in_bytes % component_size != 0 {
            return Err(ConfigurationError::Misaligned {
                what: "stride",
                value: stride_in_bytes,
                alignment: component_size,
            });
        } else {
            Stride::Bytes(stride_in_bytes as u8)
        };

        if offset_in_bytes % component_size != 0 {
            return Err(ConfigurationError::Misaligned {
                what: "offset",
                value: offset_in_bytes,
                alignment: component_size,
            });
        }

        Ok(VertexAttributeDescriptor {
            location,
            component_count,
            attribute_type,
            normalize,
            stride,
            offset_in_bytes,
        })
    }
}
