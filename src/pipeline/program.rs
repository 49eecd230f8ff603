use std::fmt;
use std::rc::Rc;

use fnv::FnvHashMap;
use thiserror::Error;

use crate::pipeline::reflection::{ActiveInfo, ValueType};
use crate::pipeline::shader::{CompileError, CompiledShader, ShaderStage};
use crate::runtime::backend::ProgramObject;
use crate::runtime::dropper::{DropObject, ScopedObject};
use crate::runtime::state::ContextUpdate;
use crate::runtime::{ConfigurationError, Connection};
use crate::uniform::UniformRegistry;

#[derive(Clone, PartialEq, Eq, Debug, Error)]
pub enum LinkErrorKind {
    #[error("expected a {expected} shader, found a {found} shader")]
    StageMismatch {
        expected: ShaderStage,
        found: ShaderStage,
    },
    #[error("shader belongs to a different rendering context")]
    ForeignShader,
    #[error("the host context failed to allocate a program object")]
    AllocationFailed,
    #[error("program failed to link: {0}")]
    Diagnostic(String),
}

/// Returned when two shaders fail to link into a program.
///
/// The partially built program has already been released when this error is returned. Both
/// shaders remain valid and are handed back to the caller through [LinkError::into_shaders]; they
/// are released when the error is dropped without claiming them.
#[derive(Error)]
#[error("{kind}")]
pub struct LinkError {
    kind: LinkErrorKind,
    vertex_shader: CompiledShader,
    fragment_shader: CompiledShader,
}

impl LinkError {
    pub fn kind(&self) -> &LinkErrorKind {
        &self.kind
    }

    /// The host linker's diagnostic, if linking reached the host.
    pub fn diagnostic(&self) -> Option<&str> {
        match &self.kind {
            LinkErrorKind::Diagnostic(diagnostic) => Some(diagnostic),
            _ => None,
        }
    }

    /// Returns the shaders in the order they were passed to `link`.
    pub fn into_shaders(self) -> (CompiledShader, CompiledShader) {
        (self.vertex_shader, self.fragment_shader)
    }
}

impl fmt::Debug for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("LinkError")
            .field("kind", &self.kind)
            .field("vertex_shader", &self.vertex_shader)
            .field("fragment_shader", &self.fragment_shader)
            .finish()
    }
}

/// Returned when building a program from source text fails.
///
/// Every object allocated while building has been released when this error is returned.
#[derive(Clone, PartialEq, Debug, Error)]
pub enum BuildProgramError {
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error("{0}")]
    Link(LinkErrorKind),
}

#[derive(Clone, Copy, PartialEq, Debug)]
pub(crate) struct AttributeSlot {
    pub(crate) location: u32,
    pub(crate) value_type: ValueType,
}

/// The registries the binding layer keeps for one linked program.
#[derive(Debug)]
pub(crate) struct ProgramRecord {
    pub(crate) attributes: FnvHashMap<String, AttributeSlot>,
    pub(crate) uniforms: UniformRegistry,
}

/// A program that linked successfully.
///
/// The program's active attributes and active uniforms were enumerated when it was linked; name
/// lookups never query the host afterwards. Dropping the program releases its program object and,
/// unless they were detached right after linking, its two shaders. If the program was the active
/// program, the context is left without an active program.
pub struct LinkedProgram {
    connection: Rc<Connection>,
    object: ProgramObject,
    shaders: Option<(CompiledShader, CompiledShader)>,
}

impl LinkedProgram {
    pub fn gl_object(&self) -> ProgramObject {
        self.object
    }

    pub(crate) fn context_id(&self) -> usize {
        self.connection.context_id()
    }

    /// The location assigned to the active attribute called `name`.
    ///
    /// Returns `None` for attributes that are not active, including attributes the compiler
    /// optimized away.
    pub fn attribute_location(&self, name: &str) -> Option<u32> {
        self.connection
            .state()
            .program_record(self.object)
            .and_then(|record| record.attributes.get(name))
            .map(|slot| slot.location)
    }

    pub fn attribute_type(&self, name: &str) -> Option<ValueType> {
        self.connection
            .state()
            .program_record(self.object)
            .and_then(|record| record.attributes.get(name))
            .map(|slot| slot.value_type)
    }

    /// The declared type of the active uniform called `name`.
    pub fn uniform_type(&self, name: &str) -> Option<ValueType> {
        self.connection
            .state()
            .program_record(self.object)
            .and_then(|record| record.uniforms.slot(name))
            .map(|slot| slot.value_type)
    }

    /// The number of array elements of the active uniform called `name`, `1` for non-arrays.
    pub fn uniform_size(&self, name: &str) -> Option<u32> {
        self.connection
            .state()
            .program_record(self.object)
            .and_then(|record| record.uniforms.slot(name))
            .map(|slot| slot.size)
    }

    /// Whether the program still owns the shaders it was linked from.
    pub fn owns_shaders(&self) -> bool {
        self.shaders.is_some()
    }
}

impl fmt::Debug for LinkedProgram {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("LinkedProgram")
            .field("object", &self.object)
            .field("shaders", &self.shaders)
            .finish()
    }
}

impl Drop for LinkedProgram {
    fn drop(&mut self) {
        let gl = self.connection.gl();

        self.connection
            .state_mut()
            .remove_program(self.object)
            .apply(gl);

        DropObject::Program(self.object).release(gl);
    }
}

pub(crate) fn link(
    connection: &Rc<Connection>,
    vertex_shader: CompiledShader,
    fragment_shader: CompiledShader,
) -> Result<LinkedProgram, LinkError> {
    let fail = |kind: LinkErrorKind,
                vertex_shader: CompiledShader,
                fragment_shader: CompiledShader| {
        log::warn!("failed to link program: {}", kind);

        Err(LinkError {
            kind,
            vertex_shader,
            fragment_shader,
        })
    };

    if vertex_shader.stage() != ShaderStage::Vertex {
        let found = vertex_shader.stage();

        return fail(
            LinkErrorKind::StageMismatch {
                expected: ShaderStage::Vertex,
                found,
            },
            vertex_shader,
            fragment_shader,
        );
    }

    if fragment_shader.stage() != ShaderStage::Fragment {
        let found = fragment_shader.stage();

        return fail(
            LinkErrorKind::StageMismatch {
                expected: ShaderStage::Fragment,
                found,
            },
            vertex_shader,
            fragment_shader,
        );
    }

    if vertex_shader.context_id() != connection.context_id()
        || fragment_shader.context_id() != connection.context_id()
    {
        return fail(LinkErrorKind::ForeignShader, vertex_shader, fragment_shader);
    }

    let gl = connection.gl();

    let object = match gl.create_program() {
        Some(object) => object,
        None => return fail(LinkErrorKind::AllocationFailed, vertex_shader, fragment_shader),
    };

    let program = ScopedObject::new(gl, object);

    gl.attach_shader(object, vertex_shader.gl_object());
    gl.attach_shader(object, fragment_shader.gl_object());
    gl.link_program(object);

    if !gl.program_link_status(object) {
        let diagnostic = gl.program_info_log(object).unwrap_or_default();

        // Release the program before the shaders go back to the caller.
        drop(program);

        return fail(
            LinkErrorKind::Diagnostic(diagnostic),
            vertex_shader,
            fragment_shader,
        );
    }

    let record = reflect(connection, object);

    log::debug!(
        "linked program {:?} with {} active attribute(s)",
        object,
        record.attributes.len()
    );

    connection.state_mut().register_program(object, record);

    let object = program.keep();

    let shaders = if connection.options().detach_shaders_after_link() {
        gl.detach_shader(object, vertex_shader.gl_object());
        gl.detach_shader(object, fragment_shader.gl_object());

        None
    } else {
        Some((vertex_shader, fragment_shader))
    };

    Ok(LinkedProgram {
        connection: connection.clone(),
        object,
        shaders,
    })
}

fn reflect(connection: &Connection, object: ProgramObject) -> ProgramRecord {
    let gl = connection.gl();
    let mut attributes = FnvHashMap::default();

    for ActiveInfo {
        name, value_type, ..
    } in gl.active_attributes(object)
    {
        if let Some(location) = gl.attribute_location(object, &name) {
            attributes.insert(
                name,
                AttributeSlot {
                    location,
                    value_type,
                },
            );
        }
    }

    let uniforms = gl
        .active_uniforms(object)
        .into_iter()
        .filter_map(|info| {
            let first = gl.uniform_location(object, &info.name)?;
            let mut locations = vec![first];

            if let Some(base) = info.name.strip_suffix("[0]") {
                // Element locations are positional; stop at the first one the host does not know.
                for index in 1..info.size {
                    match gl.uniform_location(object, &format!("{}[{}]", base, index)) {
                        Some(location) => locations.push(location),
                        None => break,
                    }
                }
            }

            Some((info, locations))
        })
        .collect::<Vec<_>>();

    ProgramRecord {
        attributes,
        uniforms: UniformRegistry::new(uniforms),
    }
}

pub(crate) fn use_program(
    connection: &Rc<Connection>,
    program: Option<&LinkedProgram>,
) -> Result<(), ConfigurationError> {
    if let Some(program) = program {
        if program.context_id() != connection.context_id() {
            return Err(ConfigurationError::ForeignObject);
        }
    }

    connection
        .state_mut()
        .use_program(program.map(|p| p.object))
        .apply(connection.gl());

    Ok(())
}
