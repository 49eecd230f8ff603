//! Writing values to a linked program's uniforms.
//!
//! Uniforms are addressed by name. Names are resolved against the active uniforms a program
//! reported when it was linked (see [LinkedProgram](crate::pipeline::LinkedProgram)); a value can
//! only be written while its program is the active program:
//!
//! ```
//! # use web_shade::runtime::headless::HeadlessBackend;
//! # use web_shade::runtime::single_threaded::SingleThreadedContext;
//! # use web_shade::runtime::{ContextOptions, RenderingContext};
//! # use web_shade::uniform::UniformError;
//! # let context = SingleThreadedContext::new(HeadlessBackend::new(), ContextOptions::default());
//! let program = context.build_program(
//!     "#version 300 es
//!     in vec2 position;
//!     uniform float scale;
//!     void main() { gl_Position = vec4(position * scale, 0.0, 1.0); }",
//!     "#version 300 es
//!     precision mediump float;
//!     out vec4 color;
//!     void main() { color = vec4(1.0); }",
//! ).unwrap();
//!
//! // Not active yet.
//! assert!(matches!(
//!     context.set_uniform(&program, "scale", 2.0f32),
//!     Err(UniformError::Configuration(_))
//! ));
//!
//! context.use_program(Some(&program)).unwrap();
//! context.set_uniform(&program, "scale", 2.0f32).unwrap();
//!
//! assert!(matches!(
//!     context.set_uniform(&program, "sclae", 2.0f32),
//!     Err(UniformError::Unknown(_))
//! ));
//! ```
//!
//! The elements of an array uniform are addressed as `name[i]`; the bare `name` addresses element
//! `0`.

mod registry;
pub use self::registry::UnknownUniform;
pub(crate) use self::registry::UniformRegistry;

mod uniform_value;
pub use self::uniform_value::UniformValue;

use std::rc::Rc;

use thiserror::Error;

use crate::pipeline::LinkedProgram;
use crate::runtime::{ConfigurationError, Connection};

#[derive(Clone, PartialEq, Debug, Error)]
pub enum UniformError {
    #[error(transparent)]
    Unknown(#[from] UnknownUniform),
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}

pub(crate) fn set_uniform(
    connection: &Rc<Connection>,
    program: &LinkedProgram,
    name: &str,
    value: UniformValue,
) -> Result<(), UniformError> {
    if program.context_id() != connection.context_id() {
        return Err(ConfigurationError::ForeignObject.into());
    }

    let object = program.gl_object();
    let mut state = connection.state_mut();

    if state.active_program() != Some(object) {
        return Err(ConfigurationError::ProgramNotActive.into());
    }

    let registry = match state.program_record_mut(object) {
        Some(record) => &mut record.uniforms,
        None => return Err(ConfigurationError::ProgramNotActive.into()),
    };

    let slot = registry.resolve(name)?;

    if !value.is_compatible_with(slot.value_type) {
        return Err(ConfigurationError::UniformTypeMismatch {
            name: name.to_string(),
            declared: slot.value_type,
            provided: value.value_type(),
        }
        .into());
    }

    log::trace!("set uniform `{}` of {:?} to {:?}", name, object, value);

    connection.gl().uniform(slot.location, &value);
    registry.mark_set(name);

    Ok(())
}
