use std::fmt;
use std::rc::Rc;

use thiserror::Error;

use crate::runtime::backend::ShaderObject;
use crate::runtime::dropper::{DropObject, ScopedObject};
use crate::runtime::Connection;

/// The programmable pipeline stage a shader runs in.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ShaderStage::Vertex => f.write_str("vertex"),
            ShaderStage::Fragment => f.write_str("fragment"),
        }
    }
}

/// Returned when shader source text is rejected before it reaches the host compiler.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Error)]
pub enum InvalidShaderSource {
    #[error("shader source is empty")]
    Empty,
    #[error("shader source must begin with a `#version` declaration")]
    MissingVersion,
    #[error("fragment shader source must declare a float precision before any other statement")]
    MissingFloatPrecision,
}

/// GLSL ES 3.00 source text for one shader stage.
///
/// The text is checked for the structural requirements every WebGL 2.0 shader has when the
/// source is constructed:
///
/// - it must begin with a `#version` declaration, on the very first line;
/// - a fragment shader must declare a default `float` precision before any statement other than
///   precision declarations.
///
/// ```
/// use web_shade::pipeline::{InvalidShaderSource, ShaderSource, ShaderStage};
///
/// let source = ShaderSource::new(
///     ShaderStage::Fragment,
///     "#version 300 es
///     precision highp float;
///     out vec4 color;
///     void main() { color = vec4(1.0); }",
/// );
///
/// assert!(source.is_ok());
///
/// let missing_precision = ShaderSource::new(
///     ShaderStage::Fragment,
///     "#version 300 es\nout vec4 color;\nvoid main() { color = vec4(1.0); }",
/// );
///
/// assert_eq!(missing_precision.unwrap_err(), InvalidShaderSource::MissingFloatPrecision);
/// ```
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ShaderSource {
    stage: ShaderStage,
    text: String,
}

impl ShaderSource {
    pub fn new<S>(stage: ShaderStage, text: S) -> Result<Self, InvalidShaderSource>
    where
        S: Into<String>,
    {
        let text = text.into();
        let stripped = strip_comments(&text);

        if stripped.trim().is_empty() {
            return Err(InvalidShaderSource::Empty);
        }

        let mut lines = stripped.lines();
        let first_line = lines.next().unwrap_or("");

        if !first_line.trim_start().starts_with("#version") {
            return Err(InvalidShaderSource::MissingVersion);
        }

        if stage == ShaderStage::Fragment && !declares_float_precision_first(lines) {
            return Err(InvalidShaderSource::MissingFloatPrecision);
        }

        Ok(ShaderSource { stage, text })
    }

    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

fn declares_float_precision_first<'a, I>(lines: I) -> bool
where
    I: Iterator<Item = &'a str>,
{
    let body: String = lines
        .filter(|line| !line.trim_start().starts_with('#'))
        .collect::<Vec<_>>()
        .join("\n");

    for statement in body.split(|c| c == ';' || c == '{') {
        let words: Vec<&str> = statement.split_whitespace().collect();

        match words.as_slice() {
            [] => continue,
            ["precision", _, "float"] => return true,
            ["precision", ..] => continue,
            _ => return false,
        }
    }

    false
}

/// Replaces comments with whitespace, preserving line breaks so that line numbers stay intact.
pub(crate) fn strip_comments(source: &str) -> String {
    let mut output = String::with_capacity(source.len());
    let mut chars = source.chars().peekable();

    while let Some(c) = chars.next() {
        match (c, chars.peek().copied()) {
            ('/', Some('/')) => {
                while let Some(&next) = chars.peek() {
                    if next == '\n' {
                        break;
                    }

                    chars.next();
                }

                output.push(' ');
            }
            ('/', Some('*')) => {
                chars.next();

                let mut previous = ' ';

                while let Some(next) = chars.next() {
                    if previous == '*' && next == '/' {
                        break;
                    }

                    if next == '\n' {
                        output.push('\n');
                    }

                    previous = next;
                }

                output.push(' ');
            }
            _ => output.push(c),
        }
    }

    output
}

/// Returned when a shader fails to compile.
///
/// Nothing remains allocated on the host when this error is returned.
#[derive(Clone, PartialEq, Eq, Debug, Error)]
#[error("failed to compile {stage} shader: {diagnostic}")]
pub struct CompileError {
    stage: ShaderStage,
    diagnostic: String,
    invalid_source: Option<InvalidShaderSource>,
}

impl CompileError {
    pub(crate) fn invalid(stage: ShaderStage, error: InvalidShaderSource) -> Self {
        CompileError {
            stage,
            diagnostic: error.to_string(),
            invalid_source: Some(error),
        }
    }

    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    /// The host compiler's diagnostic, or a description of why the source was rejected before
    /// it reached the compiler.
    pub fn diagnostic(&self) -> &str {
        &self.diagnostic
    }

    /// Set when the source was rejected before compilation.
    pub fn invalid_source(&self) -> Option<InvalidShaderSource> {
        self.invalid_source
    }
}

/// A shader that compiled successfully.
///
/// Dropping the shader releases its shader object; a shader that was linked into a
/// [LinkedProgram](crate::pipeline::LinkedProgram) is owned by that program.
pub struct CompiledShader {
    connection: Rc<Connection>,
    object: ShaderObject,
    stage: ShaderStage,
}

impl CompiledShader {
    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    pub fn gl_object(&self) -> ShaderObject {
        self.object
    }

    pub(crate) fn context_id(&self) -> usize {
        self.connection.context_id()
    }
}

impl fmt::Debug for CompiledShader {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("CompiledShader")
            .field("object", &self.object)
            .field("stage", &self.stage)
            .finish()
    }
}

impl Drop for CompiledShader {
    fn drop(&mut self) {
        DropObject::Shader(self.object).release(self.connection.gl());
    }
}

pub(crate) fn compile(
    connection: &Rc<Connection>,
    source: &ShaderSource,
) -> Result<CompiledShader, CompileError> {
    let gl = connection.gl();
    let stage = source.stage();

    let object = gl.create_shader(stage).ok_or_else(|| CompileError {
        stage,
        diagnostic: "the host context failed to allocate a shader object".to_string(),
        invalid_source: None,
    })?;

    let shader = ScopedObject::new(gl, object);

    gl.shader_source(shader.get(), source.text());
    gl.compile_shader(shader.get());

    if !gl.shader_compile_status(shader.get()) {
        let diagnostic = gl.shader_info_log(shader.get()).unwrap_or_default();

        log::warn!("failed to compile {} shader:\n{}", stage, diagnostic);

        return Err(CompileError {
            stage,
            diagnostic,
            invalid_source: None,
        });
    }

    log::debug!("compiled {} shader {:?}", stage, object);

    Ok(CompiledShader {
        connection: connection.clone(),
        object: shader.keep(),
        stage,
    })
}
