use web_shade::buffer::{Buffer, UsageHint};
use web_shade::draw::DrawError;
use web_shade::pipeline::{LinkedProgram, Topology};
use web_shade::runtime::headless::HeadlessBackend;
use web_shade::runtime::single_threaded::SingleThreadedContext;
use web_shade::runtime::{ConfigurationError, ContextOptions, RenderingContext};
use web_shade::vertex::{AttributeType, Stride, VertexAttributeDescriptor};

const VERTEX: &str = "#version 300 es
layout(location = 0) in vec2 position;
layout(location = 1) in vec3 color;
out vec3 v_color;
void main() {
    v_color = color;
    gl_Position = vec4(position, 0.0, 1.0);
}";

const FRAGMENT: &str = "#version 300 es
precision mediump float;
in vec3 v_color;
out vec4 out_color;
void main() {
    out_color = vec4(v_color, 1.0);
}";

struct Fixture {
    backend: HeadlessBackend,
    context: SingleThreadedContext,
    program: LinkedProgram,
}

fn fixture() -> Fixture {
    let backend = HeadlessBackend::new();
    let context = SingleThreadedContext::new(backend.clone(), ContextOptions::default());
    let program = context.build_program(VERTEX, FRAGMENT).unwrap();

    Fixture {
        backend,
        context,
        program,
    }
}

fn floats(context: &SingleThreadedContext, data: &[f32]) -> Buffer {
    context
        .create_buffer_with_data(data, UsageHint::StaticDraw)
        .unwrap()
}

#[test]
fn zero_stride_is_tightly_packed() {
    let descriptor = VertexAttributeDescriptor::begin(0, 3, AttributeType::Float)
        .stride_in_bytes(0)
        .finish()
        .unwrap();

    assert_eq!(descriptor.stride(), Stride::TightlyPacked);
    assert_eq!(descriptor.effective_stride(), 12);
}

#[test]
fn stride_smaller_than_one_element_is_rejected() {
    let result = VertexAttributeDescriptor::begin(0, 3, AttributeType::Float)
        .stride_in_bytes(8)
        .finish();

    assert_eq!(
        result,
        Err(ConfigurationError::StrideTooSmall {
            stride: 8,
            element_size: 12
        })
    );
}

#[test]
fn interleaved_pairs_are_fetched_eight_bytes_apart() {
    let Fixture {
        backend,
        context,
        program,
    } = fixture();

    let vertex_array = context.create_vertex_array().unwrap();
    let positions = floats(&context, &[0.0, 0.5, -0.5, -0.5, 0.5, -0.5]);
    let colors = floats(&context, &[1.0; 9]);

    context.bind_vertex_array(Some(&vertex_array)).unwrap();
    context.bind_array_buffer(Some(&positions)).unwrap();
    context
        .configure_attribute(
            &VertexAttributeDescriptor::begin(0, 2, AttributeType::Float)
                .stride_in_bytes(0)
                .offset_in_bytes(0)
                .finish()
                .unwrap(),
        )
        .unwrap();
    context.bind_array_buffer(Some(&colors)).unwrap();
    context
        .configure_attribute(
            &VertexAttributeDescriptor::begin(1, 3, AttributeType::Float)
                .finish()
                .unwrap(),
        )
        .unwrap();
    context.enable_attribute(0).unwrap();
    context.enable_attribute(1).unwrap();
    context.use_program(Some(&program)).unwrap();
    context.draw(Topology::Triangle, 0, 3).unwrap();

    let draw_calls = backend.draw_calls();
    let fetch = draw_calls[0].fetch(0).unwrap();

    assert_eq!(draw_calls[0].topology, Topology::Triangle);
    assert_eq!(fetch.buffer, positions.gl_object());
    assert_eq!(fetch.offsets, vec![0, 8, 16]);
    assert_eq!(
        fetch.values,
        vec![vec![0.0, 0.5], vec![-0.5, -0.5], vec![0.5, -0.5]]
    );
    assert!(backend.errors().is_empty());
}

#[test]
fn binding_keeps_the_buffer_that_was_bound_when_configured() {
    let Fixture {
        backend,
        context,
        program,
    } = fixture();

    let vertex_array = context.create_vertex_array().unwrap();
    let x = floats(&context, &[1.0, 1.0, 2.0, 2.0, 3.0, 3.0]);
    let y = floats(&context, &[9.0; 9]);

    context.bind_vertex_array(Some(&vertex_array)).unwrap();
    context.bind_array_buffer(Some(&x)).unwrap();
    context
        .configure_attribute(
            &VertexAttributeDescriptor::begin(0, 2, AttributeType::Float)
                .finish()
                .unwrap(),
        )
        .unwrap();
    context.enable_attribute(0).unwrap();

    // Bind another buffer for an unrelated attribute.
    context.bind_array_buffer(Some(&y)).unwrap();
    context
        .configure_attribute(
            &VertexAttributeDescriptor::begin(1, 3, AttributeType::Float)
                .finish()
                .unwrap(),
        )
        .unwrap();
    context.enable_attribute(1).unwrap();

    assert_eq!(
        vertex_array.attribute_binding(0).unwrap().buffer(),
        x.gl_object()
    );

    context.use_program(Some(&program)).unwrap();
    context.draw(Topology::Triangle, 0, 3).unwrap();

    let draw_calls = backend.draw_calls();

    assert_eq!(draw_calls[0].fetch(0).unwrap().buffer, x.gl_object());
    assert_eq!(
        draw_calls[0].fetch(0).unwrap().values,
        vec![vec![1.0, 1.0], vec![2.0, 2.0], vec![3.0, 3.0]]
    );
    assert_eq!(draw_calls[0].fetch(1).unwrap().buffer, y.gl_object());
}

#[test]
fn configuration_order_decides_which_buffer_is_read() {
    let Fixture {
        backend,
        context,
        program,
    } = fixture();

    let vertex_array = context.create_vertex_array().unwrap();
    let x = floats(&context, &[1.0; 6]);
    let y = floats(&context, &[2.0; 6]);
    let position = VertexAttributeDescriptor::begin(0, 2, AttributeType::Float)
        .finish()
        .unwrap();

    context.bind_vertex_array(Some(&vertex_array)).unwrap();
    context.use_program(Some(&program)).unwrap();
    context.enable_attribute(0).unwrap();

    context.bind_array_buffer(Some(&x)).unwrap();
    context.configure_attribute(&position).unwrap();
    context.bind_array_buffer(Some(&y)).unwrap();
    context.draw(Topology::Point, 0, 3).unwrap();

    context.configure_attribute(&position).unwrap();
    context.bind_array_buffer(Some(&x)).unwrap();
    context.draw(Topology::Point, 0, 3).unwrap();

    let draw_calls = backend.draw_calls();

    assert_eq!(draw_calls[0].fetch(0).unwrap().values[0], vec![1.0, 1.0]);
    assert_eq!(draw_calls[1].fetch(0).unwrap().values[0], vec![2.0, 2.0]);
}

#[test]
fn disabled_attribute_keeps_its_configuration() {
    let Fixture {
        backend,
        context,
        program,
    } = fixture();

    let vertex_array = context.create_vertex_array().unwrap();
    let positions = floats(&context, &[0.0; 6]);
    let colors = floats(&context, &[0.5; 9]);

    context.bind_vertex_array(Some(&vertex_array)).unwrap();
    context.bind_array_buffer(Some(&positions)).unwrap();
    context
        .configure_attribute(
            &VertexAttributeDescriptor::begin(0, 2, AttributeType::Float)
                .finish()
                .unwrap(),
        )
        .unwrap();
    context.bind_array_buffer(Some(&colors)).unwrap();
    context
        .configure_attribute(
            &VertexAttributeDescriptor::begin(1, 3, AttributeType::Float)
                .finish()
                .unwrap(),
        )
        .unwrap();
    context.enable_attribute(0).unwrap();
    context.use_program(Some(&program)).unwrap();

    assert!(!vertex_array.is_attribute_enabled(1));

    context.draw(Topology::Triangle, 0, 3).unwrap();
    context.enable_attribute(1).unwrap();
    context.draw(Topology::Triangle, 0, 3).unwrap();
    context.disable_attribute(1).unwrap();
    context.draw(Topology::Triangle, 0, 3).unwrap();

    let draw_calls = backend.draw_calls();

    assert_eq!(draw_calls[0].fetches.len(), 1);
    assert_eq!(draw_calls[1].fetches.len(), 2);
    assert_eq!(draw_calls[2].fetches.len(), 1);
    assert!(vertex_array.attribute_binding(1).is_some());
}

#[test]
fn configuring_without_a_vertex_array_fails() {
    let Fixture { context, .. } = fixture();

    let buffer = floats(&context, &[0.0; 6]);
    let descriptor = VertexAttributeDescriptor::begin(0, 2, AttributeType::Float)
        .finish()
        .unwrap();

    context.bind_array_buffer(Some(&buffer)).unwrap();

    assert_eq!(
        context.configure_attribute(&descriptor),
        Err(ConfigurationError::NoVertexArrayBound)
    );

    let vertex_array = context.create_vertex_array().unwrap();

    context.bind_vertex_array(Some(&vertex_array)).unwrap();
    context.bind_array_buffer(None).unwrap();

    assert_eq!(
        context.configure_attribute(&descriptor),
        Err(ConfigurationError::NoArrayBufferBound)
    );
}

#[test]
fn a_failed_configuration_leaves_other_bindings_intact() {
    let Fixture {
        backend,
        context,
        program,
    } = fixture();

    let vertex_array = context.create_vertex_array().unwrap();
    let positions = floats(&context, &[0.0; 6]);

    context.bind_vertex_array(Some(&vertex_array)).unwrap();
    context.bind_array_buffer(Some(&positions)).unwrap();
    context
        .configure_attribute(
            &VertexAttributeDescriptor::begin(0, 2, AttributeType::Float)
                .finish()
                .unwrap(),
        )
        .unwrap();
    context.enable_attribute(0).unwrap();

    let out_of_range = VertexAttributeDescriptor::begin(16, 2, AttributeType::Float)
        .finish()
        .unwrap();

    assert_eq!(
        context.configure_attribute(&out_of_range),
        Err(ConfigurationError::LocationOutOfRange {
            location: 16,
            max: 16
        })
    );

    context.use_program(Some(&program)).unwrap();
    context.draw(Topology::Triangle, 0, 3).unwrap();

    assert_eq!(backend.draw_calls().len(), 1);
    assert!(backend.errors().is_empty());
}

#[test]
fn draw_without_uploaded_data_fails() {
    let Fixture {
        backend,
        context,
        program,
    } = fixture();

    let vertex_array = context.create_vertex_array().unwrap();
    let empty = context.create_buffer(UsageHint::StaticDraw).unwrap();

    context.bind_vertex_array(Some(&vertex_array)).unwrap();
    context.bind_array_buffer(Some(&empty)).unwrap();
    context
        .configure_attribute(
            &VertexAttributeDescriptor::begin(0, 2, AttributeType::Float)
                .finish()
                .unwrap(),
        )
        .unwrap();
    context.enable_attribute(0).unwrap();
    context.use_program(Some(&program)).unwrap();

    assert_eq!(
        context.draw(Topology::Triangle, 0, 3),
        Err(DrawError::BufferNotUploaded { location: 0 })
    );

    empty.upload(&[0.0f32; 6]);

    context.draw(Topology::Triangle, 0, 3).unwrap();

    assert_eq!(backend.draw_calls().len(), 1);
}
