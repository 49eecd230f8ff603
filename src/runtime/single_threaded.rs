use std::cell::{Cell, Ref};
use std::rc::Rc;

use bytemuck::Pod;

use crate::buffer::{self, AllocationError, Buffer, UsageHint};
use crate::draw::{self, DrawError};
use crate::pipeline::{
    self, BuildProgramError, CompileError, CompiledShader, LinkError, LinkedProgram, ShaderSource,
    ShaderStage, Topology,
};
use crate::runtime::backend::Backend;
use crate::runtime::state::DynamicState;
use crate::runtime::{ConfigurationError, Connection, ContextOptions, RenderingContext};
use crate::uniform::{self, UniformError, UniformValue};
use crate::vertex::{self, VertexArray, VertexAttributeDescriptor};

thread_local!(static ID_GEN: IdGen = IdGen::new());

struct IdGen {
    next: Cell<usize>,
}

impl IdGen {
    const fn new() -> Self {
        IdGen { next: Cell::new(0) }
    }

    fn next(&self) -> usize {
        let next = self.next.get();

        self.next.set(next + 1);

        next
    }
}

/// A [RenderingContext] for a host that lives on the current thread.
///
/// Cloning the context yields another handle to the same host; both handles share the same
/// selections.
#[derive(Clone)]
pub struct SingleThreadedContext {
    connection: Rc<Connection>,
}

impl SingleThreadedContext {
    pub fn new<B>(backend: B, options: ContextOptions) -> Self
    where
        B: Backend + 'static,
    {
        let id = ID_GEN.with(|id_gen| id_gen.next());

        log::debug!("initializing rendering context {}", id);

        SingleThreadedContext {
            connection: Rc::new(Connection::new(id, Box::new(backend), options)),
        }
    }
}

impl RenderingContext for SingleThreadedContext {
    fn id(&self) -> usize {
        self.connection.context_id()
    }

    fn options(&self) -> &ContextOptions {
        self.connection.options()
    }

    fn state(&self) -> Ref<DynamicState> {
        self.connection.state()
    }

    fn compile(&self, stage: ShaderStage, source: &str) -> Result<CompiledShader, CompileError> {
        let source =
            ShaderSource::new(stage, source).map_err(|err| CompileError::invalid(stage, err))?;

        pipeline::compile(&self.connection, &source)
    }

    fn compile_source(&self, source: &ShaderSource) -> Result<CompiledShader, CompileError> {
        pipeline::compile(&self.connection, source)
    }

    fn link(
        &self,
        vertex_shader: CompiledShader,
        fragment_shader: CompiledShader,
    ) -> Result<LinkedProgram, LinkError> {
        pipeline::link(&self.connection, vertex_shader, fragment_shader)
    }

    fn build_program(
        &self,
        vertex_source: &str,
        fragment_source: &str,
    ) -> Result<LinkedProgram, BuildProgramError> {
        let vertex_shader = self.compile(ShaderStage::Vertex, vertex_source)?;
        let fragment_shader = self.compile(ShaderStage::Fragment, fragment_source)?;

        self.link(vertex_shader, fragment_shader).map_err(|err| {
            let kind = err.kind().clone();

            // Nobody outside this call saw the shaders, so they go as well.
            drop(err.into_shaders());

            BuildProgramError::Link(kind)
        })
    }

    fn use_program(&self, program: Option<&LinkedProgram>) -> Result<(), ConfigurationError> {
        pipeline::use_program(&self.connection, program)
    }

    fn set_uniform<V>(
        &self,
        program: &LinkedProgram,
        name: &str,
        value: V,
    ) -> Result<(), UniformError>
    where
        V: Into<UniformValue>,
    {
        uniform::set_uniform(&self.connection, program, name, value.into())
    }

    fn create_buffer(&self, usage_hint: UsageHint) -> Result<Buffer, AllocationError> {
        Buffer::new(&self.connection, usage_hint)
    }

    fn create_buffer_with_data<T>(
        &self,
        data: &[T],
        usage_hint: UsageHint,
    ) -> Result<Buffer, AllocationError>
    where
        T: Pod,
    {
        let buffer = Buffer::new(&self.connection, usage_hint)?;

        buffer.upload(data);

        Ok(buffer)
    }

    fn bind_array_buffer(&self, buffer: Option<&Buffer>) -> Result<(), ConfigurationError> {
        buffer::bind_array_buffer(&self.connection, buffer)
    }

    fn create_vertex_array(&self) -> Result<VertexArray, AllocationError> {
        VertexArray::new(&self.connection)
    }

    fn bind_vertex_array(
        &self,
        vertex_array: Option<&VertexArray>,
    ) -> Result<(), ConfigurationError> {
        vertex::bind_vertex_array(&self.connection, vertex_array)
    }

    fn configure_attribute(
        &self,
        descriptor: &VertexAttributeDescriptor,
    ) -> Result<(), ConfigurationError> {
        vertex::configure_attribute(&self.connection, descriptor)
    }

    fn enable_attribute(&self, location: u32) -> Result<(), ConfigurationError> {
        vertex::enable_attribute(&self.connection, location)
    }

    fn disable_attribute(&self, location: u32) -> Result<(), ConfigurationError> {
        vertex::disable_attribute(&self.connection, location)
    }

    fn draw(&self, topology: Topology, first: u32, count: u32) -> Result<(), DrawError> {
        draw::draw(&self.connection, topology, first, count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::runtime::headless::HeadlessBackend;

    #[test]
    fn test_contexts_get_distinct_ids() {
        let a = SingleThreadedContext::new(HeadlessBackend::new(), ContextOptions::default());
        let b = SingleThreadedContext::new(HeadlessBackend::new(), ContextOptions::default());

        assert_ne!(a.id(), b.id());
        assert_eq!(a.clone().id(), a.id());
    }

    #[test]
    fn test_state_reports_host_attribute_limit() {
        let backend = HeadlessBackend::with_max_vertex_attributes(8);
        let context = SingleThreadedContext::new(backend, ContextOptions::default());

        assert_eq!(context.state().max_vertex_attributes(), 8);
    }

    #[test]
    fn test_binding_foreign_buffer_is_rejected() {
        let a = SingleThreadedContext::new(HeadlessBackend::new(), ContextOptions::default());
        let b = SingleThreadedContext::new(HeadlessBackend::new(), ContextOptions::default());
        let buffer = b.create_buffer(UsageHint::StaticDraw).unwrap();

        assert_eq!(
            a.bind_array_buffer(Some(&buffer)),
            Err(ConfigurationError::ForeignObject)
        );
    }
}
