//! Data buffers that supply vertex attributes.
use std::fmt;
use std::rc::Rc;

use bytemuck::Pod;
use thiserror::Error;

use crate::runtime::backend::BufferObject;
use crate::runtime::dropper::DropObject;
use crate::runtime::state::ContextUpdate;
use crate::runtime::{ConfigurationError, Connection};

/// Hints at how a buffer's data store will be accessed, mirroring the WebGL usage constants.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum UsageHint {
    StaticDraw,
    DynamicDraw,
    StreamDraw,
    StaticRead,
    DynamicRead,
    StreamRead,
    StaticCopy,
    DynamicCopy,
    StreamCopy,
}

impl Default for UsageHint {
    fn default() -> Self {
        UsageHint::StaticDraw
    }
}

/// Returned when the host refuses to allocate a GPU object, typically because the context was
/// lost.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Error)]
#[error("the host context failed to allocate a {0} object")]
pub struct AllocationError(pub(crate) &'static str);

/// What the binding layer knows about a live buffer's data store.
#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
pub(crate) struct BufferRecord {
    pub(crate) size_in_bytes: usize,
    pub(crate) uploaded: bool,
}

/// A GPU data buffer.
///
/// The underlying buffer object is released when the [Buffer] is dropped. Attribute bindings that
/// captured the buffer while it was bound are not kept alive by it: a draw call that would read
/// from a released buffer fails with [DrawError::BufferReleased](crate::draw::DrawError).
pub struct Buffer {
    connection: Rc<Connection>,
    object: BufferObject,
    usage_hint: UsageHint,
}

impl Buffer {
    pub(crate) fn new(
        connection: &Rc<Connection>,
        usage_hint: UsageHint,
    ) -> Result<Self, AllocationError> {
        let object = connection
            .gl()
            .create_buffer()
            .ok_or(AllocationError("buffer"))?;

        connection
            .state_mut()
            .register_buffer(object, BufferRecord::default());

        Ok(Buffer {
            connection: connection.clone(),
            object,
            usage_hint,
        })
    }

    pub fn gl_object(&self) -> BufferObject {
        self.object
    }

    pub(crate) fn context_id(&self) -> usize {
        self.connection.context_id()
    }

    pub fn usage_hint(&self) -> UsageHint {
        self.usage_hint
    }

    /// The size of the data store in bytes, `0` if nothing was uploaded yet.
    pub fn size_in_bytes(&self) -> usize {
        self.connection
            .state()
            .buffer_record(self.object)
            .map(|record| record.size_in_bytes)
            .unwrap_or(0)
    }

    pub fn is_uploaded(&self) -> bool {
        self.connection
            .state()
            .buffer_record(self.object)
            .map(|record| record.uploaded)
            .unwrap_or(false)
    }

    /// Replaces the buffer's data store with `data`.
    ///
    /// Uploading goes through the array buffer target, so afterwards this buffer is the bound
    /// array buffer. Attribute bindings configured earlier against another buffer are not
    /// affected.
    pub fn upload<T>(&self, data: &[T])
    where
        T: Pod,
    {
        let bytes: &[u8] = bytemuck::cast_slice(data);
        let gl = self.connection.gl();
        let mut state = self.connection.state_mut();

        state.bind_array_buffer(Some(self.object)).apply(gl);
        gl.array_buffer_data(bytes, self.usage_hint);

        if let Some(record) = state.buffer_record_mut(self.object) {
            record.size_in_bytes = bytes.len();
            record.uploaded = true;
        }

        log::debug!("uploaded {} bytes to {:?}", bytes.len(), self.object);
    }
}

pub(crate) fn bind_array_buffer(
    connection: &Rc<Connection>,
    buffer: Option<&Buffer>,
) -> Result<(), ConfigurationError> {
    if let Some(buffer) = buffer {
        if buffer.context_id() != connection.context_id() {
            return Err(ConfigurationError::ForeignObject);
        }
    }

    connection
        .state_mut()
        .bind_array_buffer(buffer.map(|b| b.object))
        .apply(connection.gl());

    Ok(())
}

impl fmt::Debug for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Buffer")
            .field("object", &self.object)
            .field("usage_hint", &self.usage_hint)
            .finish()
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        self.connection.state_mut().remove_buffer(self.object);

        DropObject::Buffer(self.object).release(self.connection.gl());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::runtime::headless::HeadlessBackend;
    use crate::runtime::single_threaded::SingleThreadedContext;
    use crate::runtime::{ContextOptions, RenderingContext};

    #[test]
    fn test_upload_records_size_and_binds_buffer() {
        let backend = HeadlessBackend::new();
        let context = SingleThreadedContext::new(backend.clone(), ContextOptions::default());
        let buffer = context.create_buffer(UsageHint::StaticDraw).unwrap();

        assert!(!buffer.is_uploaded());

        buffer.upload(&[1.0f32, 2.0, 3.0]);

        assert!(buffer.is_uploaded());
        assert_eq!(buffer.size_in_bytes(), 12);
        assert_eq!(context.state().bound_array_buffer(), Some(buffer.gl_object()));
        assert_eq!(backend.buffer_data(buffer.gl_object()).unwrap().len(), 12);
    }

    #[test]
    fn test_drop_releases_buffer_object() {
        let backend = HeadlessBackend::new();
        let context = SingleThreadedContext::new(backend.clone(), ContextOptions::default());

        {
            let buffer = context
                .create_buffer_with_data(&[0u16, 1, 2], UsageHint::StreamDraw)
                .unwrap();

            assert_eq!(buffer.size_in_bytes(), 6);
            assert_eq!(backend.live_buffer_count(), 1);
        }

        assert_eq!(backend.live_buffer_count(), 0);
        assert_eq!(context.state().bound_array_buffer(), None);
    }
}
