//! Describing how vertex shader inputs read their data from buffers.
//!
//! Attribute bindings are recorded in a [VertexArray]. Configuring an attribute requires a bound
//! vertex array and a buffer bound to the array buffer target; the binding captures that buffer,
//! so that several attributes in one vertex array may each read from a different buffer. A
//! configured attribute has no effect on draw calls until it is enabled.

mod attribute_format;
pub use self::attribute_format::AttributeType;

mod attribute_layout;
pub use self::attribute_layout::{
    Stride, VertexAttributeDescriptor, VertexAttributeDescriptorBuilder,
};

mod vertex_array;
pub(crate) use self::vertex_array::{
    bind_vertex_array, configure_attribute, disable_attribute, enable_attribute, VertexArrayRecord,
};
pub use self::vertex_array::{AttributeBinding, VertexArray};
