//! Builds WebGL 2.0 shader programs and manages the attribute/uniform bindings that feed them.
//!
//! All interaction with the GPU goes through a [runtime::RenderingContext]. A context owns the
//! shadow of the "currently active" selections (active program, bound array buffer, bound vertex
//! array) and every configuration call is resolved against that context, never against hidden
//! global state.
//!
//! A typical setup:
//!
//! ```
//! use web_shade::buffer::UsageHint;
//! use web_shade::pipeline::Topology;
//! use web_shade::runtime::headless::HeadlessBackend;
//! use web_shade::runtime::single_threaded::SingleThreadedContext;
//! use web_shade::runtime::{ContextOptions, RenderingContext};
//! use web_shade::vertex::{AttributeType, VertexAttributeDescriptor};
//!
//! let context = SingleThreadedContext::new(HeadlessBackend::new(), ContextOptions::default());
//!
//! let program = context
//!     .build_program(
//!         "#version 300 es
//!         in vec2 position;
//!         void main() { gl_Position = vec4(position, 0.0, 1.0); }",
//!         "#version 300 es
//!         precision mediump float;
//!         out vec4 color;
//!         void main() { color = vec4(1.0); }",
//!     )
//!     .unwrap();
//!
//! let vertex_array = context.create_vertex_array().unwrap();
//! let buffer = context
//!     .create_buffer_with_data(&[0.0f32, 0.5, -0.5, -0.5, 0.5, -0.5], UsageHint::StaticDraw)
//!     .unwrap();
//!
//! context.bind_vertex_array(Some(&vertex_array)).unwrap();
//! context.bind_array_buffer(Some(&buffer)).unwrap();
//!
//! let location = program.attribute_location("position").unwrap();
//! let descriptor = VertexAttributeDescriptor::begin(location, 2, AttributeType::Float)
//!     .finish()
//!     .unwrap();
//!
//! context.configure_attribute(&descriptor).unwrap();
//! context.enable_attribute(location).unwrap();
//! context.use_program(Some(&program)).unwrap();
//! context.draw(Topology::Triangle, 0, 3).unwrap();
//! ```

pub mod animation;
pub mod buffer;
pub mod draw;
pub mod pipeline;
pub mod runtime;
pub mod uniform;
pub mod vertex;
