use crate::runtime::backend::{
    Backend, BufferObject, ProgramObject, ShaderObject, VertexArrayObject,
};

#[derive(Clone, Copy, PartialEq, Debug)]
pub(crate) enum DropObject {
    Buffer(BufferObject),
    Program(ProgramObject),
    Shader(ShaderObject),
    VertexArray(VertexArrayObject),
}

impl DropObject {
    pub(crate) fn release(self, gl: &dyn Backend) {
        log::trace!("releasing {:?}", self);

        match self {
            DropObject::Buffer(buffer) => gl.delete_buffer(buffer),
            DropObject::Program(program) => gl.delete_program(program),
            DropObject::Shader(shader) => gl.delete_shader(shader),
            DropObject::VertexArray(vertex_array) => gl.delete_vertex_array(vertex_array),
        }
    }
}

impl From<BufferObject> for DropObject {
    fn from(buffer: BufferObject) -> Self {
        DropObject::Buffer(buffer)
    }
}

impl From<ProgramObject> for DropObject {
    fn from(program: ProgramObject) -> Self {
        DropObject::Program(program)
    }
}

impl From<ShaderObject> for DropObject {
    fn from(shader: ShaderObject) -> Self {
        DropObject::Shader(shader)
    }
}

impl From<VertexArrayObject> for DropObject {
    fn from(vertex_array: VertexArrayObject) -> Self {
        DropObject::VertexArray(vertex_array)
    }
}

/// Owns a freshly allocated GPU object while it is being set up.
///
/// The object is released when the guard goes out of scope, unless ownership was claimed with
/// [ScopedObject::keep]. Any early return (e.g. through `?`) in between therefore releases the
/// object before the error reaches the caller.
pub(crate) struct ScopedObject<'a, T>
where
    T: Into<DropObject> + Copy,
{
    gl: &'a dyn Backend,
    object: T,
    armed: bool,
}

impl<'a, T> ScopedObject<'a, T>
where
    T: Into<DropObject> + Copy,
{
    pub(crate) fn new(gl: &'a dyn Backend, object: T) -> Self {
        ScopedObject {
            gl,
            object,
            armed: true,
        }
    }

    pub(crate) fn get(&self) -> T {
        self.object
    }

    pub(crate) fn keep(mut self) -> T {
        self.armed = false;

        self.object
    }
}

impl<'a, T> Drop for ScopedObject<'a, T>
where
    T: Into<DropObject> + Copy,
{
    fn drop(&mut self) {
        if self.armed {
            self.object.into().release(self.gl);
        }
    }
}
