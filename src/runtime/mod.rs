//! Provides the rendering context that acts as the single point of interaction with the GPU.
//!
//! A context is backed by a [Backend]: the `web-sys` WebGL 2.0 context on `wasm32` targets (see
//! the `webgl2` module), or the software [headless::HeadlessBackend] everywhere else.

pub mod backend;
pub use self::backend::{
    Backend, BufferObject, ProgramObject, ShaderObject, UniformLocation, VertexArrayObject,
};

mod context_options;
pub use self::context_options::{ContextOptions, ContextOptionsBuilder, PowerPreference};

mod rendering_context;
pub use self::rendering_context::{ConfigurationError, Connection, RenderingContext};

pub mod headless;

pub mod single_threaded;

pub mod state;

#[cfg(target_arch = "wasm32")]
pub mod webgl2;

pub(crate) mod dropper;
