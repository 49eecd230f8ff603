use fnv::FnvHashMap;

use crate::buffer::BufferRecord;
use crate::pipeline::ProgramRecord;
use crate::runtime::backend::{Backend, BufferObject, ProgramObject, VertexArrayObject};
use crate::vertex::VertexArrayRecord;

/// Shadows the "currently active" selections of a host graphics context.
///
/// Every selection change is returned as a [ContextUpdate]: the shadow is updated immediately,
/// the host is only called when the update is applied, and no host call is made at all when the
/// requested selection is already current.
///
/// Besides the selections, the state holds the records the binding layer keeps per linked
/// program (its attribute and uniform registries), per structural context (vertex array) and per
/// data buffer, so that draw calls can be validated against the bindings that were captured at
/// configuration time.
pub struct DynamicState {
    max_vertex_attributes: u32,
    active_program: Option<ProgramObject>,
    bound_array_buffer: Option<BufferObject>,
    bound_vertex_array: Option<VertexArrayObject>,
    programs: FnvHashMap<ProgramObject, ProgramRecord>,
    vertex_arrays: FnvHashMap<VertexArrayObject, VertexArrayRecord>,
    buffers: FnvHashMap<BufferObject, BufferRecord>,
}

impl DynamicState {
    pub(crate) fn initial(max_vertex_attributes: u32) -> Self {
        DynamicState {
            max_vertex_attributes,
            active_program: None,
            bound_array_buffer: None,
            bound_vertex_array: None,
            programs: FnvHashMap::default(),
            vertex_arrays: FnvHashMap::default(),
            buffers: FnvHashMap::default(),
        }
    }

    pub fn max_vertex_attributes(&self) -> u32 {
        self.max_vertex_attributes
    }

    pub fn active_program(&self) -> Option<ProgramObject> {
        self.active_program
    }

    pub fn bound_array_buffer(&self) -> Option<BufferObject> {
        self.bound_array_buffer
    }

    pub fn bound_vertex_array(&self) -> Option<VertexArrayObject> {
        self.bound_vertex_array
    }

    pub(crate) fn use_program(&mut self, program: Option<ProgramObject>) -> impl ContextUpdate {
        if self.active_program != program {
            self.active_program = program;

            if let Some(record) = program.and_then(|p| self.programs.get_mut(&p)) {
                record.uniforms.activated();
            }

            Some(move |gl: &dyn Backend| {
                log::trace!("use program {:?}", program);

                gl.use_program(program);
            })
        } else {
            None
        }
    }

    pub(crate) fn bind_array_buffer(&mut self, buffer: Option<BufferObject>) -> impl ContextUpdate {
        if self.bound_array_buffer != buffer {
            self.bound_array_buffer = buffer;

            Some(move |gl: &dyn Backend| {
                log::trace!("bind array buffer {:?}", buffer);

                gl.bind_array_buffer(buffer);
            })
        } else {
            None
        }
    }

    pub(crate) fn bind_vertex_array(
        &mut self,
        vertex_array: Option<VertexArrayObject>,
    ) -> impl ContextUpdate {
        if self.bound_vertex_array != vertex_array {
            self.bound_vertex_array = vertex_array;

            Some(move |gl: &dyn Backend| {
                log::trace!("bind vertex array {:?}", vertex_array);

                gl.bind_vertex_array(vertex_array);
            })
        } else {
            None
        }
    }

    pub(crate) fn program_record(&self, program: ProgramObject) -> Option<&ProgramRecord> {
        self.programs.get(&program)
    }

    pub(crate) fn program_record_mut(
        &mut self,
        program: ProgramObject,
    ) -> Option<&mut ProgramRecord> {
        self.programs.get_mut(&program)
    }

    pub(crate) fn register_program(&mut self, program: ProgramObject, record: ProgramRecord) {
        self.programs.insert(program, record);
    }

    pub(crate) fn vertex_array_record(
        &self,
        vertex_array: VertexArrayObject,
    ) -> Option<&VertexArrayRecord> {
        self.vertex_arrays.get(&vertex_array)
    }

    pub(crate) fn vertex_array_record_mut(
        &mut self,
        vertex_array: VertexArrayObject,
    ) -> Option<&mut VertexArrayRecord> {
        self.vertex_arrays.get_mut(&vertex_array)
    }

    pub(crate) fn register_vertex_array(&mut self, vertex_array: VertexArrayObject) {
        self.vertex_arrays
            .insert(vertex_array, VertexArrayRecord::default());
    }

    /// Discards the binding records of a released vertex array.
    ///
    /// Deleting the bound vertex array reverts the host to "no vertex array bound", which the
    /// shadow mirrors.
    pub(crate) fn remove_vertex_array(&mut self, vertex_array: VertexArrayObject) {
        self.vertex_arrays.remove(&vertex_array);

        if self.bound_vertex_array == Some(vertex_array) {
            self.bound_vertex_array = None;
        }
    }

    pub(crate) fn buffer_record(&self, buffer: BufferObject) -> Option<&BufferRecord> {
        self.buffers.get(&buffer)
    }

    pub(crate) fn buffer_record_mut(&mut self, buffer: BufferObject) -> Option<&mut BufferRecord> {
        self.buffers.get_mut(&buffer)
    }

    pub(crate) fn register_buffer(&mut self, buffer: BufferObject, record: BufferRecord) {
        self.buffers.insert(buffer, record);
    }

    /// Forgets a released buffer.
    ///
    /// Attribute bindings that captured the buffer keep naming it; draw calls that would read
    /// from it are rejected because its record is gone.
    pub(crate) fn remove_buffer(&mut self, buffer: BufferObject) {
        self.buffers.remove(&buffer);

        if self.bound_array_buffer == Some(buffer) {
            self.bound_array_buffer = None;
        }
    }

    /// Discards the records of a released program and clears the active program selection if
    /// `program` is the active program.
    pub(crate) fn remove_program(&mut self, program: ProgramObject) -> impl ContextUpdate {
        self.programs.remove(&program);

        let next = if self.active_program == Some(program) {
            None
        } else {
            self.active_program
        };

        self.use_program(next)
    }
}

/// A pending change to the host context, produced by a [DynamicState] selection method.
pub(crate) trait ContextUpdate {
    fn apply(self, gl: &dyn Backend);
}

impl<F> ContextUpdate for Option<F>
where
    F: FnOnce(&dyn Backend),
{
    fn apply(self, gl: &dyn Backend) {
        if let Some(f) = self {
            f(gl);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::runtime::headless::HeadlessBackend;

    #[test]
    fn test_repeated_selection_reaches_the_host_once() {
        let backend = HeadlessBackend::new();
        let mut state = DynamicState::initial(16);
        let buffer = backend.create_buffer().unwrap();

        state.bind_array_buffer(Some(buffer)).apply(&backend);
        state.bind_array_buffer(Some(buffer)).apply(&backend);

        assert_eq!(state.bound_array_buffer(), Some(buffer));
        assert_eq!(backend.call_count("bind_array_buffer"), 1);
    }

    #[test]
    fn test_removing_bound_vertex_array_clears_selection() {
        let backend = HeadlessBackend::new();
        let mut state = DynamicState::initial(16);
        let vertex_array = backend.create_vertex_array().unwrap();

        state.register_vertex_array(vertex_array);
        state.bind_vertex_array(Some(vertex_array)).apply(&backend);
        state.remove_vertex_array(vertex_array);

        assert_eq!(state.bound_vertex_array(), None);
        assert!(state.vertex_array_record(vertex_array).is_none());
    }
}
