//! Compiling shader stages and linking them into programs.
//!
//! A program is built in two steps. First each stage's source text is compiled into a
//! [CompiledShader]; then one vertex shader and one fragment shader are linked into a
//! [LinkedProgram]. Both steps release everything they allocated when they fail, and report the
//! host compiler's or linker's diagnostic.

pub mod reflection;

mod primitive_assembly;
pub use self::primitive_assembly::Topology;

mod shader;
pub(crate) use self::shader::{compile, strip_comments};
pub use self::shader::{
    CompileError, CompiledShader, InvalidShaderSource, ShaderSource, ShaderStage,
};

mod program;
pub(crate) use self::program::{link, use_program, ProgramRecord};
pub use self::program::{BuildProgramError, LinkError, LinkErrorKind, LinkedProgram};
