//! Issuing draw calls.
//!
//! A draw call is validated against the context's current selections before it reaches the host.
//! Checks run in a fixed order:
//!
//! 1. a vertex array is bound, and at least one of its attributes is enabled;
//! 2. every enabled attribute is configured, reads from a live buffer with uploaded data, and
//!    that buffer holds every vertex the call fetches;
//! 3. a program is active;
//! 4. the active program's uniforms were all set since it became active. Unset uniforms are only
//!    logged, unless the context was created with
//!    [strict_uniforms](crate::runtime::ContextOptionsBuilder::strict_uniforms).
use std::rc::Rc;

use thiserror::Error;

use crate::pipeline::Topology;
use crate::runtime::Connection;

#[derive(Clone, PartialEq, Eq, Debug, Error)]
pub enum DrawError {
    #[error("no vertex array is bound")]
    NoVertexArrayBound,
    #[error("the bound vertex array has no enabled attributes")]
    NoEnabledAttributes,
    #[error("attribute {location} is enabled, but was never configured")]
    AttributeNotConfigured { location: u32 },
    #[error("attribute {location} reads from a buffer that was released")]
    BufferReleased { location: u32 },
    #[error("attribute {location} reads from a buffer that holds no data")]
    BufferNotUploaded { location: u32 },
    #[error(
        "attribute {location} needs {required} bytes to fetch the requested vertices, but its \
         buffer holds {available} bytes"
    )]
    VertexRangeOutOfBounds {
        location: u32,
        required: u64,
        available: u64,
    },
    #[error("no program is active")]
    NoActiveProgram,
    #[error("the active program has uniforms that were not set: {}", .0.join(", "))]
    UnsetUniforms(Vec<String>),
}

pub(crate) fn draw(
    connection: &Rc<Connection>,
    topology: Topology,
    first: u32,
    count: u32,
) -> Result<(), DrawError> {
    let state = connection.state();

    let vertex_array = state
        .bound_vertex_array()
        .ok_or(DrawError::NoVertexArrayBound)?;
    let record = state
        .vertex_array_record(vertex_array)
        .ok_or(DrawError::NoVertexArrayBound)?;

    let enabled = record.enabled_locations();

    if enabled.is_empty() {
        return Err(DrawError::NoEnabledAttributes);
    }

    for location in enabled {
        let binding = record
            .binding(location)
            .ok_or(DrawError::AttributeNotConfigured { location })?;
        let buffer = state
            .buffer_record(binding.buffer())
            .ok_or(DrawError::BufferReleased { location })?;

        if !buffer.uploaded {
            return Err(DrawError::BufferNotUploaded { location });
        }

        let required = binding.descriptor().required_buffer_size(first, count);
        let available = buffer.size_in_bytes as u64;

        if required > available {
            return Err(DrawError::VertexRangeOutOfBounds {
                location,
                required,
                available,
            });
        }
    }

    let program = state.active_program().ok_or(DrawError::NoActiveProgram)?;

    if let Some(program_record) = state.program_record(program) {
        let unset = program_record.uniforms.unset_uniforms();

        if !unset.is_empty() {
            if connection.options().strict_uniforms() {
                return Err(DrawError::UnsetUniforms(unset));
            }

            log::warn!(
                "drawing with {:?} while uniform(s) {} were not set since it became active",
                program,
                unset.join(", ")
            );
        }
    }

    log::trace!(
        "draw {} vertices from {} as {:?} with {:?}",
        count,
        first,
        topology,
        program
    );

    connection.gl().draw_arrays(topology, first, count);

    Ok(())
}
