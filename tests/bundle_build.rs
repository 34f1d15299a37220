use std::fs;

use forge_shaderc::bundle::{ShaderBundle, ShaderBundleBuilder, ShaderBundleConfig};
use forge_shaderc::options::{SourceOptions, TargetPlatform};

const QUAD_VERT: &str = r#"#version 450
layout(location = 0) in vec3 position;
layout(location = 1) in vec2 uv;
layout(binding = 0) uniform Transforms { mat4 mvp; } transforms;
layout(location = 0) out vec2 v_uv;
void main() {
    v_uv = uv;
    gl_Position = transforms.mvp * vec4(position, 1.0);
}
"#;

const TINT_FRAG: &str = r#"#version 450
layout(binding = 0) uniform Tint { vec4 tint_color; } tint;
layout(location = 0) in vec2 v_uv;
layout(location = 0) out vec4 frag_color;
void main() {
    frag_color = tint.tint_color * vec4(v_uv, 1.0, 1.0);
}
"#;

const BROKEN_FRAG: &str = r#"#version 450
void main() {
    this is not glsl;
}
"#;

const CONFIG: &str = r#"{
    "quad": {"file": "quad.vert", "type": "vertex"},
    "tint": {"file": "tint.frag", "type": "fragment", "language": "glsl"}
}"#;

fn builder(dir: &std::path::Path, platforms: Vec<TargetPlatform>) -> ShaderBundleBuilder {
    let base_options = SourceOptions {
        working_dir: dir.to_path_buf(),
        ..SourceOptions::default()
    };
    ShaderBundleBuilder::new(base_options, platforms)
}

#[test]
fn builds_one_entry_per_shader_backend_pair() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("quad.vert"), QUAD_VERT).unwrap();
    fs::write(dir.path().join("tint.frag"), TINT_FRAG).unwrap();

    let config = ShaderBundleConfig::parse(CONFIG).unwrap();
    let platforms = vec![TargetPlatform::MobileEs, TargetPlatform::PortableFallback];
    let bundle = builder(dir.path(), platforms).build(&config).unwrap();

    assert_eq!(bundle.shaders.len(), 2);
    for name in ["quad", "tint"] {
        let backends = &bundle.shaders[name];
        assert!(backends.contains_key("mobile_es"), "{name}");
        assert!(backends.contains_key("portable"), "{name}");
    }

    // Vertex entries carry the input layout the runtime binds against.
    let quad = &bundle.shaders["quad"]["portable"];
    assert_eq!(quad.inputs.len(), 2);
    assert_eq!(quad.inputs[0].name, "position");
    let transforms = quad.structs.iter().find(|s| s.name == "Transforms");
    assert!(transforms.is_some_and(|s| s.byte_length == 64));

    let tint = &bundle.shaders["tint"]["mobile_es"];
    assert!(tint.inputs.is_empty());
    assert_eq!(tint.stage_data.uniforms.len(), 1);
    assert_eq!(tint.stage_data.uniforms[0].name, "tint");
}

#[test]
fn bundle_binary_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("quad.vert"), QUAD_VERT).unwrap();
    fs::write(dir.path().join("tint.frag"), TINT_FRAG).unwrap();

    let config = ShaderBundleConfig::parse(CONFIG).unwrap();
    let bundle = builder(dir.path(), vec![TargetPlatform::PortableFallback])
        .build(&config)
        .unwrap();

    let bytes = bundle.encode().unwrap();
    let decoded = ShaderBundle::decode(&bytes).unwrap();
    assert_eq!(decoded, bundle);

    assert!(ShaderBundle::decode(b"nope").is_err());
}

#[test]
fn one_failing_pair_aborts_the_whole_build_naming_shader_and_backend() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("quad.vert"), QUAD_VERT).unwrap();
    fs::write(dir.path().join("tint.frag"), BROKEN_FRAG).unwrap();

    let config = ShaderBundleConfig::parse(CONFIG).unwrap();
    let platforms = vec![TargetPlatform::MobileEs, TargetPlatform::PortableFallback];
    let err = builder(dir.path(), platforms).build(&config).unwrap_err();

    let message = err.to_string();
    assert!(message.contains("shader 'tint'"), "{message}");
    assert!(message.contains("backend mobile_es"), "{message}");
}

#[test]
fn missing_source_file_names_the_shader() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("quad.vert"), QUAD_VERT).unwrap();

    let config = ShaderBundleConfig::parse(CONFIG).unwrap();
    let err = builder(dir.path(), vec![TargetPlatform::PortableFallback])
        .build(&config)
        .unwrap_err();
    assert!(err.to_string().contains("shader 'tint'"), "{err}");
}
