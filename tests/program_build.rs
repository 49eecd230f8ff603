use web_shade::buffer::UsageHint;
use web_shade::pipeline::{BuildProgramError, LinkErrorKind, ShaderStage, Topology};
use web_shade::runtime::headless::HeadlessBackend;
use web_shade::runtime::single_threaded::SingleThreadedContext;
use web_shade::runtime::{Backend, ContextOptions, RenderingContext};
use web_shade::vertex::{AttributeType, VertexAttributeDescriptor};

const CONSTANT_VERTEX: &str = "#version 300 es
void main() {
    gl_Position = vec4(0.0, 0.0, 0.0, 1.0);
}";

const RED_FRAGMENT: &str = "#version 300 es
precision mediump float;
out vec4 color;
void main() {
    color = vec4(1.0, 0.0, 0.0, 1.0);
}";

fn context() -> (HeadlessBackend, SingleThreadedContext) {
    let backend = HeadlessBackend::new();
    let context = SingleThreadedContext::new(backend.clone(), ContextOptions::default());

    (backend, context)
}

#[test]
fn valid_shaders_link_without_diagnostics() {
    let (backend, context) = context();

    let vertex_shader = context.create_vertex_shader(CONSTANT_VERTEX).unwrap();
    let fragment_shader = context.create_fragment_shader(RED_FRAGMENT).unwrap();

    assert_eq!(vertex_shader.stage(), ShaderStage::Vertex);
    assert_eq!(fragment_shader.stage(), ShaderStage::Fragment);

    let program = context.link(vertex_shader, fragment_shader).unwrap();

    assert!(backend.program_link_status(program.gl_object()));
    assert_eq!(
        backend.program_info_log(program.gl_object()),
        Some(String::new())
    );
    assert!(backend.errors().is_empty());
}

#[test]
fn failed_compile_releases_the_shader() {
    let (backend, context) = context();

    let sources = [
        "#version 300 es\nvoid main() {\n    gl_Position = vec4(0.0) +;\n}",
        "#version 300 es\nvoid main() {\n    gl_Position = vec4(0.0)\n",
        "#version 300 es\nin vec2 p;\nvoid main() {\n    position = p;\n}",
        "#version 300 es\nvoid mian() {\n    gl_Position = vec4(0.0);\n}",
    ];

    for source in sources.iter() {
        let err = context.create_vertex_shader(source).unwrap_err();

        assert_eq!(err.stage(), ShaderStage::Vertex);
        assert!(err.diagnostic().starts_with("ERROR: 0:"), "{}", err.diagnostic());
        assert_eq!(backend.live_shader_count(), 0);
    }

    assert_eq!(backend.call_count("create_shader"), sources.len());
    assert_eq!(backend.call_count("delete_shader"), sources.len());
}

#[test]
fn minimal_program_draws_one_point() {
    let (backend, context) = context();

    let program = context
        .build_program(CONSTANT_VERTEX, RED_FRAGMENT)
        .unwrap();

    // Drawing requires an enabled attribute, even one the program does not read.
    let vertex_array = context.create_vertex_array().unwrap();
    let buffer = context
        .create_buffer_with_data(&[0.0f32; 4], UsageHint::StaticDraw)
        .unwrap();
    let descriptor = VertexAttributeDescriptor::begin(0, 4, AttributeType::Float)
        .finish()
        .unwrap();

    context.bind_vertex_array(Some(&vertex_array)).unwrap();
    context.bind_array_buffer(Some(&buffer)).unwrap();
    context.configure_attribute(&descriptor).unwrap();
    context.enable_attribute(0).unwrap();
    context.use_program(Some(&program)).unwrap();
    context.draw(Topology::Point, 0, 1).unwrap();

    let draw_calls = backend.draw_calls();

    assert_eq!(draw_calls.len(), 1);
    assert_eq!(draw_calls[0].topology, Topology::Point);
    assert_eq!(draw_calls[0].first, 0);
    assert_eq!(draw_calls[0].count, 1);
    assert_eq!(draw_calls[0].program, program.gl_object());
    assert!(backend.errors().is_empty());
}

#[test]
fn fragment_shader_without_output_leaks_nothing() {
    let (backend, context) = context();

    let without_declaration = "#version 300 es
precision mediump float;
void main() {
    color = vec4(1.0, 0.0, 0.0, 1.0);
}";

    match context.build_program(CONSTANT_VERTEX, without_declaration) {
        Err(BuildProgramError::Compile(err)) => {
            assert_eq!(err.stage(), ShaderStage::Fragment);
            assert!(err.diagnostic().contains("undeclared identifier"));
        }
        other => panic!("expected a compile error, got {:?}", other.map(|_| ())),
    }

    assert_eq!(backend.live_shader_count(), 0);
    assert_eq!(backend.live_program_count(), 0);

    let without_output = "#version 300 es
precision mediump float;
void main() {
}";

    match context.build_program(CONSTANT_VERTEX, without_output) {
        Err(BuildProgramError::Link(LinkErrorKind::Diagnostic(diagnostic))) => {
            assert!(diagnostic.contains("output"));
        }
        other => panic!("expected a link error, got {:?}", other.map(|_| ())),
    }

    assert_eq!(backend.live_shader_count(), 0);
    assert_eq!(backend.live_program_count(), 0);
}

#[test]
fn link_failure_returns_both_shaders() {
    let (backend, context) = context();

    let vertex_shader = context.create_vertex_shader(CONSTANT_VERTEX).unwrap();
    let fragment_shader = context
        .create_fragment_shader(
            "#version 300 es
precision mediump float;
in vec2 v_uv;
out vec4 color;
void main() {
    color = vec4(v_uv, 0.0, 1.0);
}",
        )
        .unwrap();

    let err = context.link(vertex_shader, fragment_shader).unwrap_err();

    assert!(err.diagnostic().unwrap().contains("v_uv"));
    assert_eq!(backend.live_program_count(), 0);
    assert_eq!(backend.live_shader_count(), 2);

    let (vertex_shader, _) = err.into_shaders();

    assert_eq!(backend.live_shader_count(), 1);

    let program = context
        .link(
            vertex_shader,
            context.create_fragment_shader(RED_FRAGMENT).unwrap(),
        )
        .unwrap();

    assert!(program.owns_shaders());

    drop(program);

    assert_eq!(backend.live_shader_count(), 0);
    assert_eq!(backend.live_program_count(), 0);
}

#[test]
fn detached_shaders_are_released_after_link() {
    let backend = HeadlessBackend::new();
    let options = ContextOptions::begin()
        .detach_shaders_after_link(true)
        .finish();
    let context = SingleThreadedContext::new(backend.clone(), options);

    let program = context
        .build_program(CONSTANT_VERTEX, RED_FRAGMENT)
        .unwrap();

    assert!(!program.owns_shaders());
    assert_eq!(backend.live_shader_count(), 0);
    assert_eq!(backend.attached_shader_count(program.gl_object()), 0);
    assert_eq!(backend.live_program_count(), 1);
}

#[test]
fn source_without_version_is_rejected_before_reaching_the_host() {
    let (backend, context) = context();

    let err = context
        .create_fragment_shader(
            "precision mediump float;
out vec4 c;
void main() { c = vec4(1.0); }",
        )
        .unwrap_err();

    assert!(err.invalid_source().is_some());
    assert_eq!(backend.call_count("create_shader"), 0);
}

#[test]
fn out_of_range_layout_location_fails_to_link() {
    let (backend, context) = context();

    let vertex = "#version 300 es
layout(location = 4294967295) in vec4 position;
void main() {
    gl_Position = position;
}";

    match context.build_program(vertex, RED_FRAGMENT) {
        Err(BuildProgramError::Link(LinkErrorKind::Diagnostic(diagnostic))) => {
            assert!(diagnostic.contains("exceeds the maximum"), "{}", diagnostic);
        }
        other => panic!("expected a link error, got {:?}", other.map(|_| ())),
    }

    assert_eq!(backend.live_shader_count(), 0);
    assert_eq!(backend.live_program_count(), 0);
}
