//! A software [Backend] that behaves like a WebGL 2.0 context without rendering anything.
//!
//! The headless backend keeps track of every object it allocates, enforces the rules a WebGL 2.0
//! context enforces (recording violations as [GlError]s instead of silently ignoring them), checks
//! shaders against a subset of GLSL ES 3.00, and records every successful draw call together with
//! the vertex data each enabled attribute fetched. It is cheap to clone: clones share the same
//! state, so a test can hand one clone to a rendering context and inspect the other.
use std::cell::{RefCell, RefMut};
use std::rc::Rc;

use fnv::{FnvHashMap, FnvHashSet};
use half::f16;

use crate::buffer::UsageHint;
use crate::pipeline::reflection::ActiveInfo;
use crate::pipeline::{ShaderStage, Topology};
use crate::runtime::backend::{
    Backend, BufferObject, ProgramObject, ShaderObject, UniformLocation, VertexArrayObject,
};
use crate::uniform::UniformValue;
use crate::vertex::AttributeType;

mod glsl;

use self::glsl::{ProgramInterface, ShaderInterface};

const DEFAULT_MAX_VERTEX_ATTRIBUTES: u32 = 16;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum GlErrorKind {
    InvalidValue,
    InvalidOperation,
}

/// A call the headless backend rejected, as a WebGL 2.0 context would have.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct GlError {
    pub kind: GlErrorKind,
    pub call: &'static str,
    pub message: String,
}

/// The vertices one enabled attribute fetched during a draw call.
#[derive(Clone, PartialEq, Debug)]
pub struct AttributeFetch {
    pub location: u32,
    pub buffer: BufferObject,
    /// The byte offset of every fetched element, in vertex order.
    pub offsets: Vec<usize>,
    /// The fetched components of every vertex, converted to `f32` (normalized if requested).
    pub values: Vec<Vec<f32>>,
}

/// A draw call the headless backend executed.
#[derive(Clone, PartialEq, Debug)]
pub struct DrawCall {
    pub topology: Topology,
    pub first: u32,
    pub count: u32,
    pub program: ProgramObject,
    /// One entry per enabled attribute, in ascending location order.
    pub fetches: Vec<AttributeFetch>,
}

impl DrawCall {
    pub fn fetch(&self, location: u32) -> Option<&AttributeFetch> {
        self.fetches.iter().find(|fetch| fetch.location == location)
    }
}

/// See the module documentation.
#[derive(Clone)]
pub struct HeadlessBackend {
    machine: Rc<RefCell<Machine>>,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        HeadlessBackend::with_max_vertex_attributes(DEFAULT_MAX_VERTEX_ATTRIBUTES)
    }

    pub fn with_max_vertex_attributes(max_vertex_attributes: u32) -> Self {
        HeadlessBackend {
            machine: Rc::new(RefCell::new(Machine::new(max_vertex_attributes))),
        }
    }

    /// The number of shader objects that were created and not yet deleted.
    pub fn live_shader_count(&self) -> usize {
        self.machine
            .borrow()
            .shaders
            .values()
            .filter(|shader| !shader.deleted)
            .count()
    }

    pub fn live_program_count(&self) -> usize {
        self.machine
            .borrow()
            .programs
            .values()
            .filter(|program| !program.deleted)
            .count()
    }

    pub fn live_buffer_count(&self) -> usize {
        self.machine.borrow().buffers.len()
    }

    pub fn live_vertex_array_count(&self) -> usize {
        self.machine.borrow().vertex_arrays.len()
    }

    pub fn attached_shader_count(&self, program: ProgramObject) -> usize {
        self.machine
            .borrow()
            .programs
            .get(&program)
            .map(|program| program.attached.len())
            .unwrap_or(0)
    }

    pub fn buffer_data(&self, buffer: BufferObject) -> Option<Vec<u8>> {
        self.machine.borrow().buffers.get(&buffer).cloned()
    }

    /// The number of times the [Backend] method called `name` was invoked.
    pub fn call_count(&self, name: &str) -> usize {
        self.machine.borrow().calls.get(name).copied().unwrap_or(0)
    }

    pub fn draw_calls(&self) -> Vec<DrawCall> {
        self.machine.borrow().draw_calls.clone()
    }

    pub fn errors(&self) -> Vec<GlError> {
        self.machine.borrow().errors.clone()
    }

    /// The value the uniform called `name` holds in `program`'s storage.
    ///
    /// Uniforms that were never written hold their type's zero value. Returns `None` if `program`
    /// did not link, or if `name` is not an active uniform.
    pub fn uniform_value(&self, program: ProgramObject, name: &str) -> Option<UniformValue> {
        let machine = self.machine.borrow();
        let record = machine.programs.get(&program)?;
        let linked = record.linked.as_ref()?.as_ref().ok()?;
        let location = linked.locations.get(name)?;
        let target = machine.uniform_targets.get(location)?;

        Some(
            record
                .uniform_values
                .get(&target.name)
                .copied()
                .unwrap_or_else(|| UniformValue::zero(target.info.value_type)),
        )
    }

    fn begin(&self, call: &'static str) -> RefMut<Machine> {
        let mut machine = self.machine.borrow_mut();

        *machine.calls.entry(call).or_insert(0) += 1;

        machine
    }
}

impl Default for HeadlessBackend {
    fn default() -> Self {
        HeadlessBackend::new()
    }
}

struct ShaderRecord {
    stage: ShaderStage,
    source: String,
    compiled: Option<Result<ShaderInterface, String>>,
    deleted: bool,
    attachments: usize,
}

struct LinkedRecord {
    interface: ProgramInterface,
    locations: FnvHashMap<String, UniformLocation>,
}

#[derive(Default)]
struct ProgramRecord {
    attached: Vec<ShaderObject>,
    linked: Option<Result<LinkedRecord, String>>,
    uniform_values: FnvHashMap<String, UniformValue>,
    deleted: bool,
}

struct UniformTarget {
    program: ProgramObject,
    name: String,
    info: ActiveInfo,
}

#[derive(Clone, Copy)]
struct AttributePointer {
    buffer: BufferObject,
    component_count: u8,
    attribute_type: AttributeType,
    normalize: bool,
    stride: u8,
    offset: u32,
}

#[derive(Default)]
struct VertexArrayState {
    pointers: FnvHashMap<u32, AttributePointer>,
    enabled: FnvHashSet<u32>,
}

struct Machine {
    next_name: u32,
    max_vertex_attributes: u32,
    shaders: FnvHashMap<ShaderObject, ShaderRecord>,
    programs: FnvHashMap<ProgramObject, ProgramRecord>,
    buffers: FnvHashMap<BufferObject, Vec<u8>>,
    vertex_arrays: FnvHashMap<VertexArrayObject, VertexArrayState>,
    default_vertex_array: VertexArrayState,
    uniform_targets: FnvHashMap<UniformLocation, UniformTarget>,
    array_buffer: Option<BufferObject>,
    vertex_array: Option<VertexArrayObject>,
    current_program: Option<ProgramObject>,
    errors: Vec<GlError>,
    draw_calls: Vec<DrawCall>,
    calls: FnvHashMap<&'static str, usize>,
}

impl Machine {
    fn new(max_vertex_attributes: u32) -> Self {
        Machine {
            next_name: 1,
            max_vertex_attributes,
            shaders: FnvHashMap::default(),
            programs: FnvHashMap::default(),
            buffers: FnvHashMap::default(),
            vertex_arrays: FnvHashMap::default(),
            default_vertex_array: VertexArrayState::default(),
            uniform_targets: FnvHashMap::default(),
            array_buffer: None,
            vertex_array: None,
            current_program: None,
            errors: Vec::new(),
            draw_calls: Vec::new(),
            calls: FnvHashMap::default(),
        }
    }

    fn next_name(&mut self) -> u32 {
        let name = self.next_name;

        self.next_name += 1;

        name
    }

    fn error(&mut self, kind: GlErrorKind, call: &'static str, message: impl Into<String>) {
        let message = message.into();

        log::debug!("headless {} failed with {:?}: {}", call, kind, message);

        self.errors.push(GlError {
            kind,
            call,
            message,
        });
    }

    fn current_vertex_array_mut(&mut self) -> &mut VertexArrayState {
        match self.vertex_array {
            Some(vertex_array) => self
                .vertex_arrays
                .get_mut(&vertex_array)
                .unwrap_or(&mut self.default_vertex_array),
            None => &mut self.default_vertex_array,
        }
    }

    fn shader_mut(
        &mut self,
        shader: ShaderObject,
        call: &'static str,
    ) -> Option<&mut ShaderRecord> {
        let exists = self
            .shaders
            .get(&shader)
            .map(|record| !record.deleted)
            .unwrap_or(false);

        if !exists {
            self.error(GlErrorKind::InvalidValue, call, "not a live shader object");

            return None;
        }

        self.shaders.get_mut(&shader)
    }

    fn program_mut(
        &mut self,
        program: ProgramObject,
        call: &'static str,
    ) -> Option<&mut ProgramRecord> {
        let exists = self
            .programs
            .get(&program)
            .map(|record| !record.deleted)
            .unwrap_or(false);

        if !exists {
            self.error(GlErrorKind::InvalidValue, call, "not a live program object");

            return None;
        }

        self.programs.get_mut(&program)
    }

    fn release_shader_attachment(&mut self, shader: ShaderObject) {
        let remove = match self.shaders.get_mut(&shader) {
            Some(record) => {
                record.attachments = record.attachments.saturating_sub(1);

                record.deleted && record.attachments == 0
            }
            None => false,
        };

        if remove {
            self.shaders.remove(&shader);
        }
    }

    /// Removes a program that was flagged for deletion once it is no longer current.
    fn finalize_program(&mut self, program: ProgramObject) {
        let flagged = self
            .programs
            .get(&program)
            .map(|record| record.deleted)
            .unwrap_or(false);

        if !flagged || self.current_program == Some(program) {
            return;
        }

        if let Some(record) = self.programs.remove(&program) {
            for shader in record.attached {
                self.release_shader_attachment(shader);
            }
        }

        self.uniform_targets
            .retain(|_, target| target.program != program);
    }

    fn link(&mut self, program: ProgramObject) -> Result<LinkedRecord, String> {
        let attached = self
            .programs
            .get(&program)
            .map(|record| record.attached.clone())
            .unwrap_or_default();

        let mut vertex = None;
        let mut fragment = None;

        for shader in attached {
            let record = match self.shaders.get(&shader) {
                Some(record) => record,
                None => continue,
            };

            let interface = match &record.compiled {
                Some(Ok(interface)) => interface,
                _ => {
                    return Err(format!(
                        "ERROR: attached {} shader is not compiled\n",
                        record.stage
                    ))
                }
            };

            match interface.stage {
                ShaderStage::Vertex => vertex = Some(interface),
                ShaderStage::Fragment => fragment = Some(interface),
            }
        }

        let (vertex, fragment) = match (vertex, fragment) {
            (Some(vertex), Some(fragment)) => (vertex, fragment),
            _ => {
                return Err(
                    "ERROR: a program needs a compiled vertex shader and a compiled fragment \
                     shader\n"
                        .to_string(),
                )
            }
        };

        let interface = glsl::link(vertex, fragment, self.max_vertex_attributes)?;

        self.uniform_targets
            .retain(|_, target| target.program != program);

        let mut locations = FnvHashMap::default();

        for info in &interface.uniforms {
            let base = match info.name.strip_suffix("[0]") {
                Some(base) => base.to_string(),
                None => {
                    let location = UniformLocation::from_raw(self.next_name());

                    locations.insert(info.name.clone(), location);
                    self.uniform_targets.insert(
                        location,
                        UniformTarget {
                            program,
                            name: info.name.clone(),
                            info: info.clone(),
                        },
                    );

                    continue;
                }
            };

            // Every array element gets its own location; the bare name aliases element 0.
            for index in 0..info.size {
                let location = UniformLocation::from_raw(self.next_name());
                let name = format!("{}[{}]", base, index);

                if index == 0 {
                    locations.insert(base.clone(), location);
                }

                locations.insert(name.clone(), location);
                self.uniform_targets.insert(
                    location,
                    UniformTarget {
                        program,
                        name,
                        info: info.clone(),
                    },
                );
            }
        }

        Ok(LinkedRecord {
            interface,
            locations,
        })
    }

    fn draw(&mut self, topology: Topology, first: u32, count: u32) -> Result<DrawCall, String> {
        let program = self
            .current_program
            .ok_or_else(|| "no current program".to_string())?;

        let linked = self
            .programs
            .get(&program)
            .and_then(|record| record.linked.as_ref())
            .map(|linked| linked.is_ok())
            .unwrap_or(false);

        if !linked {
            return Err("the current program is not linked".to_string());
        }

        let vertex_array = match self.vertex_array {
            Some(vertex_array) => self
                .vertex_arrays
                .get(&vertex_array)
                .ok_or_else(|| "the bound vertex array was deleted".to_string())?,
            None => &self.default_vertex_array,
        };

        let mut locations: Vec<u32> = vertex_array.enabled.iter().copied().collect();

        locations.sort_unstable();

        let mut fetches = Vec::with_capacity(locations.len());

        for location in locations {
            let pointer = vertex_array.pointers.get(&location).ok_or_else(|| {
                format!("enabled attribute {} has no buffer bound", location)
            })?;
            let data = self.buffers.get(&pointer.buffer).ok_or_else(|| {
                format!("enabled attribute {} reads from a deleted buffer", location)
            })?;

            let component_size = pointer.attribute_type.size_in_bytes() as usize;
            let element_size = pointer.component_count as usize * component_size;
            let stride = match pointer.stride {
                0 => element_size,
                stride => stride as usize,
            };

            let mut offsets = Vec::with_capacity(count as usize);
            let mut values = Vec::with_capacity(count as usize);

            for vertex in first as usize..first as usize + count as usize {
                let offset = pointer.offset as usize + vertex * stride;

                if offset + element_size > data.len() {
                    return Err(format!(
                        "attribute {} fetches vertex {} outside of its buffer",
                        location, vertex
                    ));
                }

                let components = (0..pointer.component_count as usize)
                    .map(|c| {
                        let start = offset + c * component_size;

                        decode_component(
                            &data[start..start + component_size],
                            pointer.attribute_type,
                            pointer.normalize,
                        )
                    })
                    .collect();

                offsets.push(offset);
                values.push(components);
            }

            fetches.push(AttributeFetch {
                location,
                buffer: pointer.buffer,
                offsets,
                values,
            });
        }

        Ok(DrawCall {
            topology,
            first,
            count,
            program,
            fetches,
        })
    }
}

fn decode_component(bytes: &[u8], attribute_type: AttributeType, normalize: bool) -> f32 {
    let (value, max) = match attribute_type {
        AttributeType::Byte => (bytes[0] as i8 as f32, i8::MAX as f32),
        AttributeType::UnsignedByte => (bytes[0] as f32, u8::MAX as f32),
        AttributeType::Short => (
            i16::from_le_bytes([bytes[0], bytes[1]]) as f32,
            i16::MAX as f32,
        ),
        AttributeType::UnsignedShort => (
            u16::from_le_bytes([bytes[0], bytes[1]]) as f32,
            u16::MAX as f32,
        ),
        AttributeType::Int => (
            i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f32,
            i32::MAX as f32,
        ),
        AttributeType::UnsignedInt => (
            u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f32,
            u32::MAX as f32,
        ),
        AttributeType::HalfFloat => {
            return f16::from_le_bytes([bytes[0], bytes[1]]).to_f32();
        }
        AttributeType::Float => {
            return f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        }
    };

    if normalize {
        (value / max).max(-1.0)
    } else {
        value
    }
}

impl Backend for HeadlessBackend {
    fn max_vertex_attributes(&self) -> u32 {
        self.begin("max_vertex_attributes").max_vertex_attributes
    }

    fn create_shader(&self, stage: ShaderStage) -> Option<ShaderObject> {
        let mut machine = self.begin("create_shader");
        let shader = ShaderObject::from_raw(machine.next_name());

        machine.shaders.insert(
            shader,
            ShaderRecord {
                stage,
                source: String::new(),
                compiled: None,
                deleted: false,
                attachments: 0,
            },
        );

        Some(shader)
    }

    fn shader_source(&self, shader: ShaderObject, source: &str) {
        let mut machine = self.begin("shader_source");

        if let Some(record) = machine.shader_mut(shader, "shader_source") {
            record.source = source.to_string();
        }
    }

    fn compile_shader(&self, shader: ShaderObject) {
        let mut machine = self.begin("compile_shader");

        if let Some(record) = machine.shader_mut(shader, "compile_shader") {
            record.compiled = Some(glsl::compile(record.stage, &record.source));
        }
    }

    fn shader_compile_status(&self, shader: ShaderObject) -> bool {
        let machine = self.begin("shader_compile_status");

        match machine.shaders.get(&shader) {
            Some(record) => match &record.compiled {
                Some(Ok(_)) => true,
                _ => false,
            },
            None => false,
        }
    }

    fn shader_info_log(&self, shader: ShaderObject) -> Option<String> {
        let machine = self.begin("shader_info_log");
        let record = machine.shaders.get(&shader)?;

        match &record.compiled {
            Some(Err(log)) => Some(log.clone()),
            _ => Some(String::new()),
        }
    }

    fn delete_shader(&self, shader: ShaderObject) {
        let mut machine = self.begin("delete_shader");

        let remove = match machine.shaders.get_mut(&shader) {
            Some(record) => {
                record.deleted = true;

                record.attachments == 0
            }
            None => false,
        };

        if remove {
            machine.shaders.remove(&shader);
        }
    }

    fn create_program(&self) -> Option<ProgramObject> {
        let mut machine = self.begin("create_program");
        let program = ProgramObject::from_raw(machine.next_name());

        machine.programs.insert(program, ProgramRecord::default());

        Some(program)
    }

    fn attach_shader(&self, program: ProgramObject, shader: ShaderObject) {
        let mut machine = self.begin("attach_shader");

        let stage = match machine.shader_mut(shader, "attach_shader") {
            Some(record) => record.stage,
            None => return,
        };

        let attached = match machine.program_mut(program, "attach_shader") {
            Some(record) => record.attached.clone(),
            None => return,
        };

        let conflict = attached.iter().any(|other| {
            *other == shader
                || machine
                    .shaders
                    .get(other)
                    .map(|record| record.stage == stage)
                    .unwrap_or(false)
        });

        if conflict {
            machine.error(
                GlErrorKind::InvalidOperation,
                "attach_shader",
                "a shader of the same stage is already attached",
            );

            return;
        }

        if let Some(record) = machine.programs.get_mut(&program) {
            record.attached.push(shader);
        }

        if let Some(record) = machine.shaders.get_mut(&shader) {
            record.attachments += 1;
        }
    }

    fn detach_shader(&self, program: ProgramObject, shader: ShaderObject) {
        let mut machine = self.begin("detach_shader");

        let was_attached = match machine.programs.get_mut(&program) {
            Some(record) => {
                let before = record.attached.len();

                record.attached.retain(|attached| *attached != shader);

                record.attached.len() != before
            }
            None => false,
        };

        if was_attached {
            machine.release_shader_attachment(shader);
        } else {
            machine.error(
                GlErrorKind::InvalidOperation,
                "detach_shader",
                "shader is not attached to the program",
            );
        }
    }

    fn link_program(&self, program: ProgramObject) {
        let mut machine = self.begin("link_program");

        if machine.program_mut(program, "link_program").is_none() {
            return;
        }

        let linked = machine.link(program);

        if let Some(record) = machine.programs.get_mut(&program) {
            record.uniform_values.clear();
            record.linked = Some(linked);
        }
    }

    fn program_link_status(&self, program: ProgramObject) -> bool {
        let machine = self.begin("program_link_status");

        match machine.programs.get(&program).map(|record| &record.linked) {
            Some(Some(Ok(_))) => true,
            _ => false,
        }
    }

    fn program_info_log(&self, program: ProgramObject) -> Option<String> {
        let machine = self.begin("program_info_log");
        let record = machine.programs.get(&program)?;

        match &record.linked {
            Some(Err(log)) => Some(log.clone()),
            _ => Some(String::new()),
        }
    }

    fn delete_program(&self, program: ProgramObject) {
        let mut machine = self.begin("delete_program");

        if let Some(record) = machine.programs.get_mut(&program) {
            record.deleted = true;
        }

        machine.finalize_program(program);
    }

    fn active_attributes(&self, program: ProgramObject) -> Vec<ActiveInfo> {
        let machine = self.begin("active_attributes");

        match machine.programs.get(&program).map(|record| &record.linked) {
            Some(Some(Ok(linked))) => linked
                .interface
                .attributes
                .iter()
                .map(|(info, _)| info.clone())
                .collect(),
            _ => Vec::new(),
        }
    }

    fn active_uniforms(&self, program: ProgramObject) -> Vec<ActiveInfo> {
        let machine = self.begin("active_uniforms");

        match machine.programs.get(&program).map(|record| &record.linked) {
            Some(Some(Ok(linked))) => linked.interface.uniforms.clone(),
            _ => Vec::new(),
        }
    }

    fn attribute_location(&self, program: ProgramObject, name: &str) -> Option<u32> {
        let machine = self.begin("attribute_location");

        match machine.programs.get(&program).map(|record| &record.linked) {
            Some(Some(Ok(linked))) => linked
                .interface
                .attributes
                .iter()
                .find(|(info, _)| info.name == name)
                .map(|(_, location)| *location),
            _ => None,
        }
    }

    fn uniform_location(&self, program: ProgramObject, name: &str) -> Option<UniformLocation> {
        let machine = self.begin("uniform_location");

        match machine.programs.get(&program).map(|record| &record.linked) {
            Some(Some(Ok(linked))) => linked.locations.get(name).copied(),
            _ => None,
        }
    }

    fn use_program(&self, program: Option<ProgramObject>) {
        let mut machine = self.begin("use_program");

        if let Some(program) = program {
            let linked = match machine.program_mut(program, "use_program") {
                Some(record) => match &record.linked {
                    Some(Ok(_)) => true,
                    _ => false,
                },
                None => return,
            };

            if !linked {
                machine.error(
                    GlErrorKind::InvalidOperation,
                    "use_program",
                    "program is not linked",
                );

                return;
            }
        }

        let previous = machine.current_program;

        machine.current_program = program;

        if let Some(previous) = previous {
            machine.finalize_program(previous);
        }
    }

    fn uniform(&self, location: UniformLocation, value: &UniformValue) {
        let mut machine = self.begin("uniform");

        let (program, name, declared) = match machine.uniform_targets.get(&location) {
            Some(target) => (target.program, target.name.clone(), target.info.value_type),
            None => {
                machine.error(
                    GlErrorKind::InvalidOperation,
                    "uniform",
                    "unknown uniform location",
                );

                return;
            }
        };

        if machine.current_program != Some(program) {
            machine.error(
                GlErrorKind::InvalidOperation,
                "uniform",
                "location does not belong to the current program",
            );

            return;
        }

        if !value.is_compatible_with(declared) {
            machine.error(
                GlErrorKind::InvalidOperation,
                "uniform",
                format!(
                    "`{}` value written to `{}` uniform `{}`",
                    value.value_type(),
                    declared,
                    name
                ),
            );

            return;
        }

        if let Some(record) = machine.programs.get_mut(&program) {
            record.uniform_values.insert(name, *value);
        }
    }

    fn create_buffer(&self) -> Option<BufferObject> {
        let mut machine = self.begin("create_buffer");
        let buffer = BufferObject::from_raw(machine.next_name());

        machine.buffers.insert(buffer, Vec::new());

        Some(buffer)
    }

    fn bind_array_buffer(&self, buffer: Option<BufferObject>) {
        let mut machine = self.begin("bind_array_buffer");

        if let Some(buffer) = buffer {
            if !machine.buffers.contains_key(&buffer) {
                machine.error(
                    GlErrorKind::InvalidOperation,
                    "bind_array_buffer",
                    "not a live buffer object",
                );

                return;
            }
        }

        machine.array_buffer = buffer;
    }

    fn array_buffer_data(&self, data: &[u8], _usage: UsageHint) {
        let mut machine = self.begin("array_buffer_data");

        let buffer = match machine.array_buffer {
            Some(buffer) => buffer,
            None => {
                machine.error(
                    GlErrorKind::InvalidOperation,
                    "array_buffer_data",
                    "no buffer bound to the array buffer target",
                );

                return;
            }
        };

        if let Some(store) = machine.buffers.get_mut(&buffer) {
            *store = data.to_vec();
        }
    }

    fn delete_buffer(&self, buffer: BufferObject) {
        let mut machine = self.begin("delete_buffer");

        machine.buffers.remove(&buffer);

        if machine.array_buffer == Some(buffer) {
            machine.array_buffer = None;
        }
    }

    fn create_vertex_array(&self) -> Option<VertexArrayObject> {
        let mut machine = self.begin("create_vertex_array");
        let vertex_array = VertexArrayObject::from_raw(machine.next_name());

        machine
            .vertex_arrays
            .insert(vertex_array, VertexArrayState::default());

        Some(vertex_array)
    }

    fn bind_vertex_array(&self, vertex_array: Option<VertexArrayObject>) {
        let mut machine = self.begin("bind_vertex_array");

        if let Some(vertex_array) = vertex_array {
            if !machine.vertex_arrays.contains_key(&vertex_array) {
                machine.error(
                    GlErrorKind::InvalidOperation,
                    "bind_vertex_array",
                    "not a live vertex array object",
                );

                return;
            }
        }

        machine.vertex_array = vertex_array;
    }

    fn delete_vertex_array(&self, vertex_array: VertexArrayObject) {
        let mut machine = self.begin("delete_vertex_array");

        machine.vertex_arrays.remove(&vertex_array);

        if machine.vertex_array == Some(vertex_array) {
            machine.vertex_array = None;
        }
    }

    fn vertex_attribute_pointer(
        &self,
        location: u32,
        component_count: u8,
        attribute_type: AttributeType,
        normalize: bool,
        stride_in_bytes: u8,
        offset_in_bytes: u32,
    ) {
        let mut machine = self.begin("vertex_attribute_pointer");

        if location >= machine.max_vertex_attributes {
            machine.error(
                GlErrorKind::InvalidValue,
                "vertex_attribute_pointer",
                "location exceeds MAX_VERTEX_ATTRIBS",
            );

            return;
        }

        if component_count < 1 || component_count > 4 {
            machine.error(
                GlErrorKind::InvalidValue,
                "vertex_attribute_pointer",
                "component count must be 1, 2, 3 or 4",
            );

            return;
        }

        let component_size = attribute_type.size_in_bytes();

        if stride_in_bytes as u32 % component_size != 0 || offset_in_bytes % component_size != 0 {
            machine.error(
                GlErrorKind::InvalidOperation,
                "vertex_attribute_pointer",
                "stride and offset must be multiples of the component size",
            );

            return;
        }

        let buffer = match machine.array_buffer {
            Some(buffer) => buffer,
            None => {
                machine.error(
                    GlErrorKind::InvalidOperation,
                    "vertex_attribute_pointer",
                    "no buffer bound to the array buffer target",
                );

                return;
            }
        };

        machine.current_vertex_array_mut().pointers.insert(
            location,
            AttributePointer {
                buffer,
                component_count,
                attribute_type,
                normalize,
                stride: stride_in_bytes,
                offset: offset_in_bytes,
            },
        );
    }

    fn enable_vertex_attribute_array(&self, location: u32) {
        let mut machine = self.begin("enable_vertex_attribute_array");

        if location >= machine.max_vertex_attributes {
            machine.error(
                GlErrorKind::InvalidValue,
                "enable_vertex_attribute_array",
                "location exceeds MAX_VERTEX_ATTRIBS",
            );

            return;
        }

        machine.current_vertex_array_mut().enabled.insert(location);
    }

    fn disable_vertex_attribute_array(&self, location: u32) {
        let mut machine = self.begin("disable_vertex_attribute_array");

        if location >= machine.max_vertex_attributes {
            machine.error(
                GlErrorKind::InvalidValue,
                "disable_vertex_attribute_array",
                "location exceeds MAX_VERTEX_ATTRIBS",
            );

            return;
        }

        machine.current_vertex_array_mut().enabled.remove(&location);
    }

    fn draw_arrays(&self, topology: Topology, first: u32, count: u32) {
        let mut machine = self.begin("draw_arrays");

        match machine.draw(topology, first, count) {
            Ok(draw_call) => machine.draw_calls.push(draw_call),
            Err(message) => machine.error(GlErrorKind::InvalidOperation, "draw_arrays", message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VERTEX: &str = "#version 300 es
in vec2 position;
uniform vec4 tint;
void main() {
    gl_Position = vec4(position, 0.0, 1.0) * tint;
}";

    const FRAGMENT: &str = "#version 300 es
precision mediump float;
out vec4 color;
void main() {
    color = vec4(1.0);
}";

    fn linked_program(backend: &HeadlessBackend) -> ProgramObject {
        let vertex = backend.create_shader(ShaderStage::Vertex).unwrap();
        let fragment = backend.create_shader(ShaderStage::Fragment).unwrap();

        backend.shader_source(vertex, VERTEX);
        backend.shader_source(fragment, FRAGMENT);
        backend.compile_shader(vertex);
        backend.compile_shader(fragment);

        let program = backend.create_program().unwrap();

        backend.attach_shader(program, vertex);
        backend.attach_shader(program, fragment);
        backend.link_program(program);

        assert!(backend.program_link_status(program));

        program
    }

    #[test]
    fn test_deleted_attached_shader_lives_until_detached() {
        let backend = HeadlessBackend::new();
        let program = linked_program(&backend);
        let shaders = backend.machine.borrow().programs[&program].attached.clone();

        assert_eq!(backend.attached_shader_count(program), 2);

        for shader in &shaders {
            backend.delete_shader(*shader);
        }

        assert_eq!(backend.live_shader_count(), 0);
        assert_eq!(backend.machine.borrow().shaders.len(), 2);

        backend.detach_shader(program, shaders[0]);

        assert_eq!(backend.machine.borrow().shaders.len(), 1);

        backend.delete_program(program);

        assert_eq!(backend.live_program_count(), 0);
        assert!(backend.machine.borrow().shaders.is_empty());
    }

    #[test]
    fn test_uniform_requires_current_program_and_matching_type() {
        let backend = HeadlessBackend::new();
        let program = linked_program(&backend);
        let location = backend.uniform_location(program, "tint").unwrap();

        backend.uniform(location, &UniformValue::FloatVector4([1.0; 4]));

        assert_eq!(backend.errors()[0].kind, GlErrorKind::InvalidOperation);

        backend.use_program(Some(program));
        backend.uniform(location, &UniformValue::Float(1.0));

        assert_eq!(backend.errors().len(), 2);
        assert_eq!(
            backend.uniform_value(program, "tint"),
            Some(UniformValue::FloatVector4([0.0; 4]))
        );

        backend.uniform(location, &UniformValue::FloatVector4([0.5; 4]));

        assert_eq!(
            backend.uniform_value(program, "tint"),
            Some(UniformValue::FloatVector4([0.5; 4]))
        );
    }

    #[test]
    fn test_deleting_current_program_defers_until_replaced() {
        let backend = HeadlessBackend::new();
        let program = linked_program(&backend);

        backend.use_program(Some(program));
        backend.delete_program(program);

        assert_eq!(backend.live_program_count(), 0);
        assert!(backend.machine.borrow().programs.contains_key(&program));

        backend.use_program(None);

        assert!(!backend.machine.borrow().programs.contains_key(&program));
        assert_eq!(backend.live_shader_count(), 2);
    }

    #[test]
    fn test_draw_records_fetched_vertices() {
        let backend = HeadlessBackend::new();
        let program = linked_program(&backend);
        let buffer = backend.create_buffer().unwrap();
        let data: Vec<u8> = bytemuck::cast_slice(&[1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0]).to_vec();

        backend.bind_array_buffer(Some(buffer));
        backend.array_buffer_data(&data, UsageHint::StaticDraw);
        backend.vertex_attribute_pointer(0, 2, AttributeType::Float, false, 0, 0);
        backend.enable_vertex_attribute_array(0);
        backend.use_program(Some(program));
        backend.draw_arrays(Topology::Point, 1, 2);

        let draw_calls = backend.draw_calls();
        let fetch = draw_calls[0].fetch(0).unwrap();

        assert_eq!(fetch.offsets, vec![8, 16]);
        assert_eq!(fetch.values, vec![vec![3.0, 4.0], vec![5.0, 6.0]]);
    }

    #[test]
    fn test_draw_past_buffer_end_is_rejected() {
        let backend = HeadlessBackend::new();
        let program = linked_program(&backend);
        let buffer = backend.create_buffer().unwrap();

        backend.bind_array_buffer(Some(buffer));
        backend.array_buffer_data(&[0; 16], UsageHint::StaticDraw);
        backend.vertex_attribute_pointer(0, 2, AttributeType::Float, false, 0, 0);
        backend.enable_vertex_attribute_array(0);
        backend.use_program(Some(program));
        backend.draw_arrays(Topology::Triangle, 0, 3);

        assert!(backend.draw_calls().is_empty());
        assert_eq!(backend.errors()[0].call, "draw_arrays");
    }

    #[test]
    fn test_normalized_components() {
        assert_eq!(decode_component(&[255], AttributeType::UnsignedByte, true), 1.0);
        assert_eq!(decode_component(&[0x80], AttributeType::Byte, true), -1.0);
        assert_eq!(decode_component(&[7], AttributeType::UnsignedByte, false), 7.0);
    }

    #[test]
    fn test_half_float_components() {
        assert_eq!(decode_component(&[0x00, 0x3c], AttributeType::HalfFloat, false), 1.0);
        assert_eq!(decode_component(&[0x00, 0xc0], AttributeType::HalfFloat, true), -2.0);
        assert!(decode_component(&[0x00, 0x7c], AttributeType::HalfFloat, false).is_infinite());
    }
}
