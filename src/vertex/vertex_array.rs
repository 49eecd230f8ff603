use std::fmt;
use std::rc::Rc;

use fnv::{FnvHashMap, FnvHashSet};

use crate::buffer::AllocationError;
use crate::runtime::backend::{BufferObject, VertexArrayObject};
use crate::runtime::dropper::DropObject;
use crate::runtime::state::ContextUpdate;
use crate::runtime::{ConfigurationError, Connection};
use crate::vertex::VertexAttributeDescriptor;

/// An attribute configuration recorded in a vertex array, together with the buffer that was
/// bound to the array buffer target when it was recorded.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct AttributeBinding {
    descriptor: VertexAttributeDescriptor,
    buffer: BufferObject,
}

impl AttributeBinding {
    pub fn descriptor(&self) -> &VertexAttributeDescriptor {
        &self.descriptor
    }

    /// The buffer the attribute reads from.
    pub fn buffer(&self) -> BufferObject {
        self.buffer
    }
}

/// The attribute bindings recorded in one vertex array.
#[derive(Clone, Default, Debug)]
pub(crate) struct VertexArrayRecord {
    bindings: FnvHashMap<u32, AttributeBinding>,
    enabled: FnvHashSet<u32>,
}

impl VertexArrayRecord {
    pub(crate) fn binding(&self, location: u32) -> Option<&AttributeBinding> {
        self.bindings.get(&location)
    }

    pub(crate) fn is_enabled(&self, location: u32) -> bool {
        self.enabled.contains(&location)
    }

    /// The enabled locations in ascending order.
    pub(crate) fn enabled_locations(&self) -> Vec<u32> {
        let mut locations: Vec<u32> = self.enabled.iter().copied().collect();

        locations.sort_unstable();

        locations
    }
}

/// A structural context that records attribute bindings.
///
/// Attribute configuration calls always apply to the vertex array that is bound at the time of
/// the call. Dropping the vertex array releases its object and discards its recorded bindings; if
/// it was bound, the context is left without a bound vertex array.
pub struct VertexArray {
    connection: Rc<Connection>,
    object: VertexArrayObject,
}

impl VertexArray {
    pub(crate) fn new(connection: &Rc<Connection>) -> Result<Self, AllocationError> {
        let object = connection
            .gl()
            .create_vertex_array()
            .ok_or(AllocationError("vertex array"))?;

        connection.state_mut().register_vertex_array(object);

        Ok(VertexArray {
            connection: connection.clone(),
            object,
        })
    }

    pub fn gl_object(&self) -> VertexArrayObject {
        self.object
    }

    pub(crate) fn context_id(&self) -> usize {
        self.connection.context_id()
    }

    /// The binding recorded for `location`, if any.
    pub fn attribute_binding(&self, location: u32) -> Option<AttributeBinding> {
        self.connection
            .state()
            .vertex_array_record(self.object)
            .and_then(|record| record.binding(location).copied())
    }

    pub fn is_attribute_enabled(&self, location: u32) -> bool {
        self.connection
            .state()
            .vertex_array_record(self.object)
            .map(|record| record.is_enabled(location))
            .unwrap_or(false)
    }
}

impl fmt::Debug for VertexArray {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("VertexArray")
            .field("object", &self.object)
            .finish()
    }
}

impl Drop for VertexArray {
    fn drop(&mut self) {
        self.connection
            .state_mut()
            .remove_vertex_array(self.object);

        DropObject::VertexArray(self.object).release(self.connection.gl());
    }
}

pub(crate) fn bind_vertex_array(
    connection: &Rc<Connection>,
    vertex_array: Option<&VertexArray>,
) -> Result<(), ConfigurationError> {
    if let Some(vertex_array) = vertex_array {
        if vertex_array.context_id() != connection.context_id() {
            return Err(ConfigurationError::ForeignObject);
        }
    }

    connection
        .state_mut()
        .bind_vertex_array(vertex_array.map(|v| v.object))
        .apply(connection.gl());

    Ok(())
}

pub(crate) fn configure_attribute(
    connection: &Rc<Connection>,
    descriptor: &VertexAttributeDescriptor,
) -> Result<(), ConfigurationError> {
    let mut state = connection.state_mut();

    let vertex_array = state
        .bound_vertex_array()
        .ok_or(ConfigurationError::NoVertexArrayBound)?;
    let buffer = state
        .bound_array_buffer()
        .ok_or(ConfigurationError::NoArrayBufferBound)?;

    check_location(descriptor.location(), state.max_vertex_attributes())?;

    connection.gl().vertex_attribute_pointer(
        descriptor.location(),
        descriptor.component_count(),
        descriptor.attribute_type(),
        descriptor.normalize(),
        descriptor.stride().as_raw(),
        descriptor.offset_in_bytes(),
    );

    log::trace!(
        "configured attribute {} of {:?} to read from {:?}",
        descriptor.location(),
        vertex_array,
        buffer
    );

    if let Some(record) = state.vertex_array_record_mut(vertex_array) {
        record.bindings.insert(
            descriptor.location(),
            AttributeBinding {
                descriptor: *descriptor,
                buffer,
            },
        );
    }

    Ok(())
}

pub(crate) fn enable_attribute(
    connection: &Rc<Connection>,
    location: u32,
) -> Result<(), ConfigurationError> {
    set_attribute_enabled(connection, location, true)
}

pub(crate) fn disable_attribute(
    connection: &Rc<Connection>,
    location: u32,
) -> Result<(), ConfigurationError> {
    set_attribute_enabled(connection, location, false)
}

fn set_attribute_enabled(
    connection: &Rc<Connection>,
    location: u32,
    enabled: bool,
) -> Result<(), ConfigurationError> {
    let mut state = connection.state_mut();

    let vertex_array = state
        .bound_vertex_array()
        .ok_or(ConfigurationError::NoVertexArrayBound)?;

    check_location(location, state.max_vertex_attributes())?;

    if let Some(record) = state.vertex_array_record_mut(vertex_array) {
        let changed = if enabled {
            record.enabled.insert(location)
        } else {
            record.enabled.remove(&location)
        };

        if changed {
            let gl = connection.gl();

            if enabled {
                gl.enable_vertex_attribute_array(location);
            } else {
                gl.disable_vertex_attribute_array(location);
            }
        }
    }

    Ok(())
}

fn check_location(location: u32, max: u32) -> Result<(), ConfigurationError> {
    if location >= max {
        Err(ConfigurationError::LocationOutOfRange { location, max })
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::buffer::UsageHint;
    use crate::runtime::headless::HeadlessBackend;
    use crate::runtime::single_threaded::SingleThreadedContext;
    use crate::runtime::{ContextOptions, RenderingContext};
    use crate::vertex::AttributeType;

    fn descriptor(location: u32) -> VertexAttributeDescriptor {
        VertexAttributeDescriptor::begin(location, 2, AttributeType::Float)
            .finish()
            .unwrap()
    }

    #[test]
    fn test_configure_requires_bound_vertex_array_and_buffer() {
        let context = SingleThreadedContext::new(HeadlessBackend::new(), ContextOptions::default());

        assert_eq!(
            context.configure_attribute(&descriptor(0)),
            Err(ConfigurationError::NoVertexArrayBound)
        );

        let vertex_array = context.create_vertex_array().unwrap();

        context.bind_vertex_array(Some(&vertex_array)).unwrap();

        assert_eq!(
            context.configure_attribute(&descriptor(0)),
            Err(ConfigurationError::NoArrayBufferBound)
        );
        assert_eq!(
            context.enable_attribute(16),
            Err(ConfigurationError::LocationOutOfRange {
                location: 16,
                max: 16
            })
        );
    }

    #[test]
    fn test_binding_captures_buffer_bound_at_configuration_time() {
        let context = SingleThreadedContext::new(HeadlessBackend::new(), ContextOptions::default());
        let vertex_array = context.create_vertex_array().unwrap();
        let a = context
            .create_buffer_with_data(&[0.0f32; 6], UsageHint::StaticDraw)
            .unwrap();
        let b = context
            .create_buffer_with_data(&[1.0f32; 6], UsageHint::StaticDraw)
            .unwrap();

        context.bind_vertex_array(Some(&vertex_array)).unwrap();
        context.bind_array_buffer(Some(&a)).unwrap();
        context.configure_attribute(&descriptor(0)).unwrap();
        context.bind_array_buffer(Some(&b)).unwrap();

        let binding = vertex_array.attribute_binding(0).unwrap();

        assert_eq!(binding.buffer(), a.gl_object());
        assert_eq!(binding.descriptor(), &descriptor(0));
    }

    #[test]
    fn test_enable_state_is_scoped_to_the_vertex_array() {
        let backend = HeadlessBackend::new();
        let context = SingleThreadedContext::new(backend.clone(), ContextOptions::default());
        let first = context.create_vertex_array().unwrap();
        let second = context.create_vertex_array().unwrap();

        context.bind_vertex_array(Some(&first)).unwrap();
        context.enable_attribute(3).unwrap();
        context.enable_attribute(3).unwrap();
        context.bind_vertex_array(Some(&second)).unwrap();

        assert!(first.is_attribute_enabled(3));
        assert!(!second.is_attribute_enabled(3));
        assert_eq!(backend.call_count("enable_vertex_attribute_array"), 1);

        context.disable_attribute(3).unwrap();

        assert_eq!(backend.call_count("disable_vertex_attribute_array"), 0);
    }

    #[test]
    fn test_dropping_bound_vertex_array_clears_selection() {
        let backend = HeadlessBackend::new();
        let context = SingleThreadedContext::new(backend.clone(), ContextOptions::default());

        {
            let vertex_array = context.create_vertex_array().unwrap();

            context.bind_vertex_array(Some(&vertex_array)).unwrap();
        }

        assert_eq!(context.state().bound_vertex_array(), None);
        assert_eq!(backend.live_vertex_array_count(), 0);
    }
}
