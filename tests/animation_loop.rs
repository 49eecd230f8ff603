use cgmath::{Matrix4, Rad};

use web_shade::animation::{AnimationLoop, ManualFrameScheduler};
use web_shade::buffer::UsageHint;
use web_shade::pipeline::Topology;
use web_shade::runtime::headless::HeadlessBackend;
use web_shade::runtime::single_threaded::SingleThreadedContext;
use web_shade::runtime::{ContextOptions, RenderingContext};
use web_shade::uniform::UniformValue;
use web_shade::vertex::{AttributeType, VertexAttributeDescriptor};

const VERTEX: &str = "#version 300 es
in vec3 position;
uniform mat4 rotation;
void main() {
    gl_Position = rotation * vec4(position, 1.0);
}";

const FRAGMENT: &str = "#version 300 es
precision mediump float;
out vec4 color;
void main() {
    color = vec4(0.0, 0.5, 1.0, 1.0);
}";

fn rotation(timestamp: f64) -> Matrix4<f32> {
    Matrix4::from_angle_y(Rad((timestamp / 1000.0) as f32))
}

#[test]
fn every_frame_redraws_with_a_fresh_rotation() {
    let backend = HeadlessBackend::new();
    let options = ContextOptions::begin().strict_uniforms(true).finish();
    let context = SingleThreadedContext::new(backend.clone(), options);
    let scheduler = ManualFrameScheduler::new();

    let program = context.build_program(VERTEX, FRAGMENT).unwrap();
    let vertex_array = context.create_vertex_array().unwrap();
    let positions = context
        .create_buffer_with_data(
            &[0.0f32, 0.5, 0.0, -0.5, -0.5, 0.0, 0.5, -0.5, 0.0],
            UsageHint::StaticDraw,
        )
        .unwrap();
    let location = program.attribute_location("position").unwrap();

    context.bind_vertex_array(Some(&vertex_array)).unwrap();
    context.bind_array_buffer(Some(&positions)).unwrap();
    context
        .configure_attribute(
            &VertexAttributeDescriptor::begin(location, 3, AttributeType::Float)
                .finish()
                .unwrap(),
        )
        .unwrap();
    context.enable_attribute(location).unwrap();

    let frame_context = context.clone();

    let handle = AnimationLoop::start(scheduler.clone(), move |timestamp| {
        frame_context.use_program(Some(&program)).unwrap();
        frame_context
            .set_uniform(&program, "rotation", rotation(timestamp))
            .unwrap();
        frame_context.draw(Topology::Triangle, 0, 3).unwrap();
    });

    for timestamp in &[0.0, 16.0, 33.0, 50.0] {
        scheduler.fire(*timestamp).unwrap();
    }

    assert_eq!(handle.frame_count(), 4);
    assert_eq!(backend.draw_calls().len(), 4);
    assert_eq!(backend.call_count("use_program"), 1);
    assert_eq!(backend.call_count("uniform"), 4);

    let program = backend.draw_calls()[0].program;

    assert_eq!(
        backend.uniform_value(program, "rotation"),
        Some(UniformValue::from(rotation(50.0)))
    );

    handle.cancel();
    scheduler.fire(66.0).unwrap();

    assert_eq!(backend.draw_calls().len(), 4);
    assert!(backend.errors().is_empty());
}

#[test]
fn unset_rotation_fails_the_frame_in_strict_mode() {
    let backend = HeadlessBackend::new();
    let options = ContextOptions::begin().strict_uniforms(true).finish();
    let context = SingleThreadedContext::new(backend.clone(), options);

    let program = context.build_program(VERTEX, FRAGMENT).unwrap();
    let vertex_array = context.create_vertex_array().unwrap();
    let positions = context
        .create_buffer_with_data(&[0.0f32; 9], UsageHint::StaticDraw)
        .unwrap();

    context.bind_vertex_array(Some(&vertex_array)).unwrap();
    context.bind_array_buffer(Some(&positions)).unwrap();
    context
        .configure_attribute(
            &VertexAttributeDescriptor::begin(0, 3, AttributeType::Float)
                .finish()
                .unwrap(),
        )
        .unwrap();
    context.enable_attribute(0).unwrap();
    context.use_program(Some(&program)).unwrap();
    context
        .set_uniform(&program, "rotation", rotation(0.0))
        .unwrap();
    context.draw(Topology::Triangle, 0, 3).unwrap();

    // Re-activating the program requires the rotation to be set again.
    context.use_program(None).unwrap();
    context.use_program(Some(&program)).unwrap();

    assert!(context.draw(Topology::Triangle, 0, 3).is_err());
    assert_eq!(backend.draw_calls().len(), 1);
}
