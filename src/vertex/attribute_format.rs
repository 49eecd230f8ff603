/// The component type of vertex attribute data as it is stored in a buffer.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum AttributeType {
    Byte,
    UnsignedByte,
    Short,
    UnsignedShort,
    Int,
    UnsignedInt,
    HalfFloat,
    Float,
}

impl AttributeType {
    pub fn size_in_bytes(&self) -> u32 {
        match self {
            AttributeType::Byte | AttributeType::UnsignedByte => 1,
            AttributeType::Short | AttributeType::UnsignedShort | AttributeType::HalfFloat => 2,
            AttributeType::Int | AttributeType::UnsignedInt | AttributeType::Float => 4,
        }
    }

    /// Whether the type holds integers, which may be normalized to the `[0, 1]` or `[-1, 1]`
    /// range when they are fetched.
    pub fn is_integer(&self) -> bool {
        match self {
            AttributeType::HalfFloat | AttributeType::Float => false,
            _ => true,
        }
    }
}
