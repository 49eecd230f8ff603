use crate::buffer::UsageHint;
use crate::pipeline::reflection::ActiveInfo;
use crate::pipeline::{ShaderStage, Topology};
use crate::uniform::UniformValue;
use crate::vertex::AttributeType;

macro_rules! object_name {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
        pub struct $name(u32);

        impl $name {
            pub fn from_raw(id: u32) -> Self {
                $name(id)
            }

            pub fn into_raw(self) -> u32 {
                self.0
            }
        }
    };
}

object_name!(
    /// Names a shader object allocated by a [Backend].
    ShaderObject
);

object_name!(
    /// Names a program object allocated by a [Backend].
    ProgramObject
);

object_name!(
    /// Names a data buffer object allocated by a [Backend].
    BufferObject
);

object_name!(
    /// Names a vertex array object allocated by a [Backend].
    VertexArrayObject
);

object_name!(
    /// Names a resolved uniform location inside one specific program object.
    UniformLocation
);

/// The primitives a host graphics context provides.
///
/// Methods mirror the WebGL 2.0 calls one-to-one and are deliberately dumb: they do not track
/// which objects are currently bound or active. That bookkeeping belongs to
/// [DynamicState](crate::runtime::state::DynamicState), which only calls into the backend when
/// a selection actually changes.
///
/// Allocation methods return `None` when the host refuses to allocate (e.g. a lost context).
pub trait Backend {
    /// The value of `MAX_VERTEX_ATTRIBS`.
    fn max_vertex_attributes(&self) -> u32;

    fn create_shader(&self, stage: ShaderStage) -> Option<ShaderObject>;

    fn shader_source(&self, shader: ShaderObject, source: &str);

    fn compile_shader(&self, shader: ShaderObject);

    fn shader_compile_status(&self, shader: ShaderObject) -> bool;

    fn shader_info_log(&self, shader: ShaderObject) -> Option<String>;

    fn delete_shader(&self, shader: ShaderObject);

    fn create_program(&self) -> Option<ProgramObject>;

    fn attach_shader(&self, program: ProgramObject, shader: ShaderObject);

    fn detach_shader(&self, program: ProgramObject, shader: ShaderObject);

    fn link_program(&self, program: ProgramObject);

    fn program_link_status(&self, program: ProgramObject) -> bool;

    fn program_info_log(&self, program: ProgramObject) -> Option<String>;

    fn delete_program(&self, program: ProgramObject);

    fn active_attributes(&self, program: ProgramObject) -> Vec<ActiveInfo>;

    fn active_uniforms(&self, program: ProgramObject) -> Vec<ActiveInfo>;

    fn attribute_location(&self, program: ProgramObject, name: &str) -> Option<u32>;

    fn uniform_location(&self, program: ProgramObject, name: &str) -> Option<UniformLocation>;

    fn use_program(&self, program: Option<ProgramObject>);

    /// Writes `value` into the storage of the currently active program.
    ///
    /// Matrix values are always transmitted column-major: implementations must pass `false` for
    /// the host's transpose flag.
    fn uniform(&self, location: UniformLocation, value: &UniformValue);

    fn create_buffer(&self) -> Option<BufferObject>;

    fn bind_array_buffer(&self, buffer: Option<BufferObject>);

    /// Replaces the data store of the buffer currently bound to the array buffer target.
    fn array_buffer_data(&self, data: &[u8], usage: UsageHint);

    fn delete_buffer(&self, buffer: BufferObject);

    fn create_vertex_array(&self) -> Option<VertexArrayObject>;

    fn bind_vertex_array(&self, vertex_array: Option<VertexArrayObject>);

    fn delete_vertex_array(&self, vertex_array: VertexArrayObject);

    /// Records an attribute pointer for `location` in the bound vertex array, sourcing from the
    /// buffer currently bound to the array buffer target.
    fn vertex_attribute_pointer(
        &self,
        location: u32,
        component_count: u8,
        attribute_type: AttributeType,
        normalize: bool,
        stride_in_bytes: u8,
        offset_in_bytes: u32,
    );

    fn enable_vertex_attribute_array(&self, location: u32);

    fn disable_vertex_attribute_array(&self, location: u32);

    fn draw_arrays(&self, topology: Topology, first: u32, count: u32);
}
