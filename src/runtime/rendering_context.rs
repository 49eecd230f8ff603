use std::cell::{Ref, RefCell, RefMut};

use bytemuck::Pod;
use thiserror::Error;

use crate::buffer::{AllocationError, Buffer, UsageHint};
use crate::draw::DrawError;
use crate::pipeline::reflection::ValueType;
use crate::pipeline::{
    BuildProgramError, CompileError, CompiledShader, LinkError, LinkedProgram, ShaderSource,
    ShaderStage, Topology,
};
use crate::runtime::backend::Backend;
use crate::runtime::state::DynamicState;
use crate::runtime::ContextOptions;
use crate::uniform::{UniformError, UniformValue};
use crate::vertex::{VertexArray, VertexAttributeDescriptor};

/// Returned when an operation is issued against a context whose current selections do not permit
/// it, or with a configuration that can never be valid.
#[derive(Clone, PartialEq, Debug, Error)]
pub enum ConfigurationError {
    #[error("no vertex array is bound")]
    NoVertexArrayBound,
    #[error("no buffer is bound to the array buffer target")]
    NoArrayBufferBound,
    #[error("attribute location {location} exceeds the maximum of {max} vertex attributes")]
    LocationOutOfRange { location: u32, max: u32 },
    #[error("a vertex attribute must have 1 to 4 components, found {0}")]
    InvalidComponentCount(u8),
    #[error("a stride of {stride} bytes is smaller than one {element_size} byte element")]
    StrideTooSmall { stride: u32, element_size: u32 },
    #[error("a stride of {0} bytes exceeds the maximum of 255 bytes")]
    StrideTooLarge(u32),
    #[error("the {what} of {value} bytes is not a multiple of the {alignment} byte component size")]
    Misaligned {
        what: &'static str,
        value: u32,
        alignment: u32,
    },
    #[error("the program is not the active program")]
    ProgramNotActive,
    #[error("uniform `{name}` is declared as `{declared}`, but a `{provided}` value was provided")]
    UniformTypeMismatch {
        name: String,
        declared: ValueType,
        provided: ValueType,
    },
    #[error("the object belongs to a different rendering context")]
    ForeignObject,
}

/// The connection between a rendering context's handles and its host.
///
/// Every GPU object handle (programs, shaders, buffers, vertex arrays) keeps the connection alive
/// so that it can release its object when dropped.
pub struct Connection {
    context_id: usize,
    gl: Box<dyn Backend>,
    state: RefCell<DynamicState>,
    options: ContextOptions,
}

impl Connection {
    pub(crate) fn new(context_id: usize, gl: Box<dyn Backend>, options: ContextOptions) -> Self {
        let state = DynamicState::initial(gl.max_vertex_attributes());

        Connection {
            context_id,
            gl,
            state: RefCell::new(state),
            options,
        }
    }

    pub fn context_id(&self) -> usize {
        self.context_id
    }

    pub fn gl(&self) -> &dyn Backend {
        self.gl.as_ref()
    }

    pub fn state(&self) -> Ref<DynamicState> {
        self.state.borrow()
    }

    pub(crate) fn state_mut(&self) -> RefMut<DynamicState> {
        self.state.borrow_mut()
    }

    pub fn options(&self) -> &ContextOptions {
        &self.options
    }
}

/// The interface for a WebGL 2.0 rendering context.
///
/// A rendering context owns the "currently active" selections of its host: the active program,
/// the bound array buffer and the bound vertex array. All selection changes go through the
/// context, which only calls into the host when a selection actually changes.
pub trait RenderingContext {
    /// Identifier that uniquely identifies this rendering context.
    fn id(&self) -> usize;

    fn options(&self) -> &ContextOptions;

    /// The context's current selections.
    fn state(&self) -> Ref<DynamicState>;

    /// Compiles `source` as a shader of the given `stage`.
    ///
    /// On failure nothing remains allocated and the error carries the compiler's diagnostic.
    fn compile(&self, stage: ShaderStage, source: &str) -> Result<CompiledShader, CompileError>;

    /// Compiles a source that was already validated.
    fn compile_source(&self, source: &ShaderSource) -> Result<CompiledShader, CompileError>;

    fn create_vertex_shader(&self, source: &str) -> Result<CompiledShader, CompileError> {
        self.compile(ShaderStage::Vertex, source)
    }

    fn create_fragment_shader(&self, source: &str) -> Result<CompiledShader, CompileError> {
        self.compile(ShaderStage::Fragment, source)
    }

    /// Links a vertex shader and a fragment shader into a program.
    ///
    /// The program takes ownership of both shaders. On failure, the partially built program is
    /// released and both shaders are handed back through [LinkError::into_shaders].
    fn link(
        &self,
        vertex_shader: CompiledShader,
        fragment_shader: CompiledShader,
    ) -> Result<LinkedProgram, LinkError>;

    /// Compiles both stages and links them.
    ///
    /// Every object allocated along the way is released when any step fails.
    fn build_program(
        &self,
        vertex_source: &str,
        fragment_source: &str,
    ) -> Result<LinkedProgram, BuildProgramError>;

    /// Makes `program` the active program, or clears the active program for `None`.
    fn use_program(&self, program: Option<&LinkedProgram>) -> Result<(), ConfigurationError>;

    /// Writes `value` to the uniform called `name`; `program` must be the active program.
    fn set_uniform<V>(
        &self,
        program: &LinkedProgram,
        name: &str,
        value: V,
    ) -> Result<(), UniformError>
    where
        V: Into<UniformValue>;

    fn create_buffer(&self, usage_hint: UsageHint) -> Result<Buffer, AllocationError>;

    /// Creates a buffer and uploads `data` to it.
    fn create_buffer_with_data<T>(
        &self,
        data: &[T],
        usage_hint: UsageHint,
    ) -> Result<Buffer, AllocationError>
    where
        T: Pod;

    /// Binds `buffer` to the array buffer target, or unbinds the target for `None`.
    fn bind_array_buffer(&self, buffer: Option<&Buffer>) -> Result<(), ConfigurationError>;

    fn create_vertex_array(&self) -> Result<VertexArray, AllocationError>;

    /// Binds `vertex_array`, or unbinds the current vertex array for `None`.
    fn bind_vertex_array(&self, vertex_array: Option<&VertexArray>)
        -> Result<(), ConfigurationError>;

    /// Records an attribute binding in the bound vertex array, sourcing from the bound array
    /// buffer.
    ///
    /// The binding captures the buffer that is bound right now; binding another buffer later
    /// does not affect it.
    fn configure_attribute(
        &self,
        descriptor: &VertexAttributeDescriptor,
    ) -> Result<(), ConfigurationError>;

    fn enable_attribute(&self, location: u32) -> Result<(), ConfigurationError>;

    fn disable_attribute(&self, location: u32) -> Result<(), ConfigurationError>;

    /// Draws `count` vertices starting at vertex `first`, assembled as `topology`.
    fn draw(&self, topology: Topology, first: u32, count: u32) -> Result<(), DrawError>;
}
