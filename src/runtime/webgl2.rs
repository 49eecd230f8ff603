//! The [Backend] that drives a browser's WebGL 2.0 context through `web-sys`.
use std::cell::{Cell, RefCell};

use fnv::FnvHashMap;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{
    HtmlCanvasElement, WebGl2RenderingContext as Gl, WebGlActiveInfo, WebGlBuffer, WebGlProgram,
    WebGlShader, WebGlUniformLocation, WebGlVertexArrayObject,
};

use crate::buffer::UsageHint;
use crate::pipeline::reflection::{ActiveInfo, ValueType};
use crate::pipeline::{ShaderStage, Topology};
use crate::runtime::backend::{
    Backend, BufferObject, ProgramObject, ShaderObject, UniformLocation, VertexArrayObject,
};
use crate::runtime::single_threaded::SingleThreadedContext;
use crate::runtime::ContextOptions;
use crate::uniform::UniformValue;
use crate::vertex::AttributeType;

/// Obtains a WebGL 2.0 context for the `canvas` and wraps it in a [SingleThreadedContext].
///
/// The context creation attributes in the `options` are handed to the browser.
pub fn init(
    canvas: &HtmlCanvasElement,
    options: &ContextOptions,
) -> Result<SingleThreadedContext, String> {
    let backend = WebGl2Backend::from_canvas(canvas, options)?;

    Ok(SingleThreadedContext::new(backend, options.clone()))
}

struct ObjectTable<T> {
    next: Cell<u32>,
    objects: RefCell<FnvHashMap<u32, T>>,
}

impl<T> ObjectTable<T> {
    fn new() -> Self {
        ObjectTable {
            next: Cell::new(1),
            objects: RefCell::new(FnvHashMap::default()),
        }
    }

    fn insert(&self, object: T) -> u32 {
        let id = self.next.get();

        self.next.set(id + 1);
        self.objects.borrow_mut().insert(id, object);

        id
    }

    fn remove(&self, id: u32) -> Option<T> {
        self.objects.borrow_mut().remove(&id)
    }
}

impl<T: Clone> ObjectTable<T> {
    fn get(&self, id: u32) -> Option<T> {
        self.objects.borrow().get(&id).cloned()
    }
}

pub struct WebGl2Backend {
    gl: Gl,
    shaders: ObjectTable<WebGlShader>,
    programs: ObjectTable<WebGlProgram>,
    buffers: ObjectTable<WebGlBuffer>,
    vertex_arrays: ObjectTable<WebGlVertexArrayObject>,
    uniform_locations: ObjectTable<(ProgramObject, WebGlUniformLocation)>,
    uniform_names: RefCell<FnvHashMap<(ProgramObject, String), UniformLocation>>,
}

impl WebGl2Backend {
    pub fn from_canvas(
        canvas: &HtmlCanvasElement,
        options: &ContextOptions,
    ) -> Result<Self, String> {
        #[allow(deprecated)]
        let attributes = JsValue::from_serde(options.attributes()).map_err(|e| e.to_string())?;

        let context = canvas
            .get_context_with_context_options("webgl2", &attributes)
            .map_err(|e| {
                e.as_string()
                    .unwrap_or_else(|| "failed to obtain a WebGL 2.0 context".to_string())
            })?
            .ok_or_else(|| "WebGL 2.0 is not supported by this browser".to_string())?;

        Ok(WebGl2Backend::from_webgl2_context(context.unchecked_into()))
    }

    pub fn from_webgl2_context(gl: Gl) -> Self {
        WebGl2Backend {
            gl,
            shaders: ObjectTable::new(),
            programs: ObjectTable::new(),
            buffers: ObjectTable::new(),
            vertex_arrays: ObjectTable::new(),
            uniform_locations: ObjectTable::new(),
            uniform_names: RefCell::new(FnvHashMap::default()),
        }
    }

    fn active_info(&self, info: Option<WebGlActiveInfo>) -> Option<ActiveInfo> {
        let info = info?;
        let name = info.name();

        match value_type_from_gl(info.type_()) {
            Some(value_type) => Some(ActiveInfo {
                name,
                value_type,
                size: info.size().max(0) as u32,
            }),
            None => {
                log::warn!("ignoring `{}` of unsupported type {:#x}", name, info.type_());

                None
            }
        }
    }
}

fn value_type_from_gl(kind: u32) -> Option<ValueType> {
    let value_type = match kind {
        Gl::FLOAT => ValueType::Float,
        Gl::FLOAT_VEC2 => ValueType::FloatVector2,
        Gl::FLOAT_VEC3 => ValueType::FloatVector3,
        Gl::FLOAT_VEC4 => ValueType::FloatVector4,
        Gl::FLOAT_MAT2 => ValueType::FloatMatrix2x2,
        Gl::FLOAT_MAT2X3 => ValueType::FloatMatrix2x3,
        Gl::FLOAT_MAT2X4 => ValueType::FloatMatrix2x4,
        Gl::FLOAT_MAT3X2 => ValueType::FloatMatrix3x2,
        Gl::FLOAT_MAT3 => ValueType::FloatMatrix3x3,
        Gl::FLOAT_MAT3X4 => ValueType::FloatMatrix3x4,
        Gl::FLOAT_MAT4X2 => ValueType::FloatMatrix4x2,
        Gl::FLOAT_MAT4X3 => ValueType::FloatMatrix4x3,
        Gl::FLOAT_MAT4 => ValueType::FloatMatrix4x4,
        Gl::INT => ValueType::Integer,
        Gl::INT_VEC2 => ValueType::IntegerVector2,
        Gl::INT_VEC3 => ValueType::IntegerVector3,
        Gl::INT_VEC4 => ValueType::IntegerVector4,
        Gl::UNSIGNED_INT => ValueType::UnsignedInteger,
        Gl::UNSIGNED_INT_VEC2 => ValueType::UnsignedIntegerVector2,
        Gl::UNSIGNED_INT_VEC3 => ValueType::UnsignedIntegerVector3,
        Gl::UNSIGNED_INT_VEC4 => ValueType::UnsignedIntegerVector4,
        Gl::BOOL => ValueType::Bool,
        Gl::BOOL_VEC2 => ValueType::BoolVector2,
        Gl::BOOL_VEC3 => ValueType::BoolVector3,
        Gl::BOOL_VEC4 => ValueType::BoolVector4,
        Gl::SAMPLER_2D => ValueType::FloatSampler2D,
        Gl::SAMPLER_3D => ValueType::FloatSampler3D,
        Gl::SAMPLER_CUBE => ValueType::FloatSamplerCube,
        Gl::SAMPLER_2D_ARRAY => ValueType::FloatSampler2DArray,
        Gl::SAMPLER_2D_SHADOW => ValueType::ShadowSampler2D,
        Gl::INT_SAMPLER_2D => ValueType::IntegerSampler2D,
        Gl::UNSIGNED_INT_SAMPLER_2D => ValueType::UnsignedIntegerSampler2D,
        _ => return None,
    };

    Some(value_type)
}

fn stage_id(stage: ShaderStage) -> u32 {
    match stage {
        ShaderStage::Vertex => Gl::VERTEX_SHADER,
        ShaderStage::Fragment => Gl::FRAGMENT_SHADER,
    }
}

fn topology_id(topology: Topology) -> u32 {
    match topology {
        Topology::Point => Gl::POINTS,
        Topology::Line => Gl::LINES,
        Topology::LineStrip => Gl::LINE_STRIP,
        Topology::LineLoop => Gl::LINE_LOOP,
        Topology::Triangle => Gl::TRIANGLES,
        Topology::TriangleStrip => Gl::TRIANGLE_STRIP,
        Topology::TriangleFan => Gl::TRIANGLE_FAN,
    }
}

fn attribute_type_id(attribute_type: AttributeType) -> u32 {
    match attribute_type {
        AttributeType::Byte => Gl::BYTE,
        AttributeType::UnsignedByte => Gl::UNSIGNED_BYTE,
        AttributeType::Short => Gl::SHORT,
        AttributeType::UnsignedShort => Gl::UNSIGNED_SHORT,
        AttributeType::Int => Gl::INT,
        AttributeType::UnsignedInt => Gl::UNSIGNED_INT,
        AttributeType::HalfFloat => Gl::HALF_FLOAT,
        AttributeType::Float => Gl::FLOAT,
    }
}

fn usage_id(usage: UsageHint) -> u32 {
    match usage {
        UsageHint::StaticDraw => Gl::STATIC_DRAW,
        UsageHint::DynamicDraw => Gl::DYNAMIC_DRAW,
        UsageHint::StreamDraw => Gl::STREAM_DRAW,
        UsageHint::StaticRead => Gl::STATIC_READ,
        UsageHint::DynamicRead => Gl::DYNAMIC_READ,
        UsageHint::StreamRead => Gl::STREAM_READ,
        UsageHint::StaticCopy => Gl::STATIC_COPY,
        UsageHint::DynamicCopy => Gl::DYNAMIC_COPY,
        UsageHint::StreamCopy => Gl::STREAM_COPY,
    }
}

fn bools(values: &[bool]) -> Vec<i32> {
    values.iter().map(|value| *value as i32).collect()
}

impl Backend for WebGl2Backend {
    fn max_vertex_attributes(&self) -> u32 {
        self.gl
            .get_parameter(Gl::MAX_VERTEX_ATTRIBS)
            .ok()
            .and_then(|value| value.as_f64())
            .map(|value| value as u32)
            .unwrap_or(16)
    }

    fn create_shader(&self, stage: ShaderStage) -> Option<ShaderObject> {
        let shader = self.gl.create_shader(stage_id(stage))?;

        Some(ShaderObject::from_raw(self.shaders.insert(shader)))
    }

    fn shader_source(&self, shader: ShaderObject, source: &str) {
        if let Some(shader) = self.shaders.get(shader.into_raw()) {
            self.gl.shader_source(&shader, source);
        }
    }

    fn compile_shader(&self, shader: ShaderObject) {
        if let Some(shader) = self.shaders.get(shader.into_raw()) {
            self.gl.compile_shader(&shader);
        }
    }

    fn shader_compile_status(&self, shader: ShaderObject) -> bool {
        self.shaders
            .get(shader.into_raw())
            .and_then(|shader| {
                self.gl
                    .get_shader_parameter(&shader, Gl::COMPILE_STATUS)
                    .as_bool()
            })
            .unwrap_or(false)
    }

    fn shader_info_log(&self, shader: ShaderObject) -> Option<String> {
        let shader = self.shaders.get(shader.into_raw())?;

        self.gl.get_shader_info_log(&shader)
    }

    fn delete_shader(&self, shader: ShaderObject) {
        if let Some(shader) = self.shaders.remove(shader.into_raw()) {
            self.gl.delete_shader(Some(&shader));
        }
    }

    fn create_program(&self) -> Option<ProgramObject> {
        let program = self.gl.create_program()?;

        Some(ProgramObject::from_raw(self.programs.insert(program)))
    }

    fn attach_shader(&self, program: ProgramObject, shader: ShaderObject) {
        if let (Some(program), Some(shader)) = (
            self.programs.get(program.into_raw()),
            self.shaders.get(shader.into_raw()),
        ) {
            self.gl.attach_shader(&program, &shader);
        }
    }

    fn detach_shader(&self, program: ProgramObject, shader: ShaderObject) {
        if let (Some(program), Some(shader)) = (
            self.programs.get(program.into_raw()),
            self.shaders.get(shader.into_raw()),
        ) {
            self.gl.detach_shader(&program, &shader);
        }
    }

    fn link_program(&self, program: ProgramObject) {
        if let Some(program) = self.programs.get(program.into_raw()) {
            self.gl.link_program(&program);
        }
    }

    fn program_link_status(&self, program: ProgramObject) -> bool {
        self.programs
            .get(program.into_raw())
            .and_then(|program| {
                self.gl
                    .get_program_parameter(&program, Gl::LINK_STATUS)
                    .as_bool()
            })
            .unwrap_or(false)
    }

    fn program_info_log(&self, program: ProgramObject) -> Option<String> {
        let program = self.programs.get(program.into_raw())?;

        self.gl.get_program_info_log(&program)
    }

    fn delete_program(&self, program: ProgramObject) {
        if let Some(object) = self.programs.remove(program.into_raw()) {
            self.gl.delete_program(Some(&object));
        }

        let mut names = self.uniform_names.borrow_mut();

        names.retain(|(owner, _), location| {
            if *owner == program {
                self.uniform_locations.remove(location.into_raw());

                false
            } else {
                true
            }
        });
    }

    fn active_attributes(&self, program: ProgramObject) -> Vec<ActiveInfo> {
        let program = match self.programs.get(program.into_raw()) {
            Some(program) => program,
            None => return Vec::new(),
        };

        let count = self
            .gl
            .get_program_parameter(&program, Gl::ACTIVE_ATTRIBUTES)
            .as_f64()
            .unwrap_or(0.0) as u32;

        (0..count)
            .filter_map(|index| self.active_info(self.gl.get_active_attrib(&program, index)))
            .collect()
    }

    fn active_uniforms(&self, program: ProgramObject) -> Vec<ActiveInfo> {
        let program = match self.programs.get(program.into_raw()) {
            Some(program) => program,
            None => return Vec::new(),
        };

        let count = self
            .gl
            .get_program_parameter(&program, Gl::ACTIVE_UNIFORMS)
            .as_f64()
            .unwrap_or(0.0) as u32;

        (0..count)
            .filter_map(|index| self.active_info(self.gl.get_active_uniform(&program, index)))
            .collect()
    }

    fn attribute_location(&self, program: ProgramObject, name: &str) -> Option<u32> {
        let program = self.programs.get(program.into_raw())?;
        let location = self.gl.get_attrib_location(&program, name);

        if location < 0 {
            None
        } else {
            Some(location as u32)
        }
    }

    fn uniform_location(&self, program: ProgramObject, name: &str) -> Option<UniformLocation> {
        let key = (program, name.to_string());

        if let Some(location) = self.uniform_names.borrow().get(&key) {
            return Some(*location);
        }

        let object = self.programs.get(program.into_raw())?;
        let location = self.gl.get_uniform_location(&object, name)?;
        let location =
            UniformLocation::from_raw(self.uniform_locations.insert((program, location)));

        self.uniform_names.borrow_mut().insert(key, location);

        Some(location)
    }

    fn use_program(&self, program: Option<ProgramObject>) {
        let program = program.and_then(|program| self.programs.get(program.into_raw()));

        self.gl.use_program(program.as_ref());
    }

    fn uniform(&self, location: UniformLocation, value: &UniformValue) {
        let location = match self.uniform_locations.get(location.into_raw()) {
            Some((_, location)) => location,
            None => return,
        };
        let location = Some(&location);
        let gl = &self.gl;

        match value {
            UniformValue::Float(v) => gl.uniform1f(location, *v),
            UniformValue::FloatVector2(v) => gl.uniform2fv_with_f32_array(location, v),
            UniformValue::FloatVector3(v) => gl.uniform3fv_with_f32_array(location, v),
            UniformValue::FloatVector4(v) => gl.uniform4fv_with_f32_array(location, v),
            UniformValue::FloatMatrix2x2(v) => {
                gl.uniform_matrix2fv_with_f32_array(location, false, v)
            }
            UniformValue::FloatMatrix2x3(v) => {
                gl.uniform_matrix2x3fv_with_f32_array(location, false, v)
            }
            UniformValue::FloatMatrix2x4(v) => {
                gl.uniform_matrix2x4fv_with_f32_array(location, false, v)
            }
            UniformValue::FloatMatrix3x2(v) => {
                gl.uniform_matrix3x2fv_with_f32_array(location, false, v)
            }
            UniformValue::FloatMatrix3x3(v) => {
                gl.uniform_matrix3fv_with_f32_array(location, false, v)
            }
            UniformValue::FloatMatrix3x4(v) => {
                gl.uniform_matrix3x4fv_with_f32_array(location, false, v)
            }
            UniformValue::FloatMatrix4x2(v) => {
                gl.uniform_matrix4x2fv_with_f32_array(location, false, v)
            }
            UniformValue::FloatMatrix4x3(v) => {
                gl.uniform_matrix4x3fv_with_f32_array(location, false, v)
            }
            UniformValue::FloatMatrix4x4(v) => {
                gl.uniform_matrix4fv_with_f32_array(location, false, v)
            }
            UniformValue::Integer(v) => gl.uniform1i(location, *v),
            UniformValue::IntegerVector2(v) => gl.uniform2iv_with_i32_array(location, v),
            UniformValue::IntegerVector3(v) => gl.uniform3iv_with_i32_array(location, v),
            UniformValue::IntegerVector4(v) => gl.uniform4iv_with_i32_array(location, v),
            UniformValue::UnsignedInteger(v) => gl.uniform1ui(location, *v),
            UniformValue::UnsignedIntegerVector2(v) => gl.uniform2uiv_with_u32_array(location, v),
            UniformValue::UnsignedIntegerVector3(v) => gl.uniform3uiv_with_u32_array(location, v),
            UniformValue::UnsignedIntegerVector4(v) => gl.uniform4uiv_with_u32_array(location, v),
            UniformValue::Bool(v) => gl.uniform1i(location, *v as i32),
            UniformValue::BoolVector2(v) => gl.uniform2iv_with_i32_array(location, &bools(v)),
            UniformValue::BoolVector3(v) => gl.uniform3iv_with_i32_array(location, &bools(v)),
            UniformValue::BoolVector4(v) => gl.uniform4iv_with_i32_array(location, &bools(v)),
        }
    }

    fn create_buffer(&self) -> Option<BufferObject> {
        let buffer = self.gl.create_buffer()?;

        Some(BufferObject::from_raw(self.buffers.insert(buffer)))
    }

    fn bind_array_buffer(&self, buffer: Option<BufferObject>) {
        let buffer = buffer.and_then(|buffer| self.buffers.get(buffer.into_raw()));

        self.gl.bind_buffer(Gl::ARRAY_BUFFER, buffer.as_ref());
    }

    fn array_buffer_data(&self, data: &[u8], usage: UsageHint) {
        self.gl
            .buffer_data_with_u8_array(Gl::ARRAY_BUFFER, data, usage_id(usage));
    }

    fn delete_buffer(&self, buffer: BufferObject) {
        if let Some(buffer) = self.buffers.remove(buffer.into_raw()) {
            self.gl.delete_buffer(Some(&buffer));
        }
    }

    fn create_vertex_array(&self) -> Option<VertexArrayObject> {
        let vertex_array = self.gl.create_vertex_array()?;

        Some(VertexArrayObject::from_raw(
            self.vertex_arrays.insert(vertex_array),
        ))
    }

    fn bind_vertex_array(&self, vertex_array: Option<VertexArrayObject>) {
        let vertex_array =
            vertex_array.and_then(|vertex_array| self.vertex_arrays.get(vertex_array.into_raw()));

        self.gl.bind_vertex_array(vertex_array.as_ref());
    }

    fn delete_vertex_array(&self, vertex_array: VertexArrayObject) {
        if let Some(vertex_array) = self.vertex_arrays.remove(vertex_array.into_raw()) {
            self.gl.delete_vertex_array(Some(&vertex_array));
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
        self.gl.vertex_attrib_pointer_with_i32(
            location,
            component_count as i32,
            attribute_type_id(attribute_type),
            normalize && attribute_type.is_integer(),
            stride_in_bytes as i32,
            offset_in_bytes as i32,
        );
    }

    fn enable_vertex_attribute_array(&self, location: u32) {
        self.gl.enable_vertex_attrib_array(location);
    }

    fn disable_vertex_attribute_array(&self, location: u32) {
        self.gl.disable_vertex_attrib_array(location);
    }

    fn draw_arrays(&self, topology: Topology, first: u32, count: u32) {
        self.gl
            .draw_arrays(topology_id(topology), first as i32, count as i32);
    }
}
