use std::fs;
use std::path::PathBuf;

use forge_shaderc::options::{ShaderStage, SourceOptions, TargetPlatform};
use forge_shaderc::pipeline::{self, ArtifactPaths};
use forge_shaderc::runtime_stage::RuntimeStageData;
use forge_shaderc::CompileError;

const GRADIENT_MAIN: &str = r#"#version 450
#include "scale.glsl"
#include "mix.glsl"
layout(location = 0) in vec2 v_uv;
layout(location = 0) out vec4 frag_color;
void main() {
    frag_color = vec4(mix_axes(scaled(v_uv)), 0.0, 1.0);
}
"#;

const SCALE_SRC: &str = "vec2 scaled(vec2 p) { return p * 2.0; }\n";
// mix.glsl pulls scale.glsl in a second time; the depfile must still list
// it exactly once.
const MIX_SRC: &str = "#include \"scale.glsl\"\nvec2 mix_axes(vec2 p) { return p.yx; }\n";

fn write_sources(dir: &std::path::Path) {
    fs::write(dir.join("gradient.frag"), GRADIENT_MAIN).unwrap();
    fs::write(dir.join("scale.glsl"), SCALE_SRC).unwrap();
    fs::write(dir.join("mix.glsl"), MIX_SRC).unwrap();
}

fn gradient_options(dir: &std::path::Path) -> SourceOptions {
    SourceOptions {
        stage: ShaderStage::Fragment,
        target_platform: TargetPlatform::MobileEs,
        working_dir: dir.to_path_buf(),
        file_name: "gradient.frag".to_string(),
        ..SourceOptions::default()
    }
}

#[test]
fn dependency_listing_names_each_file_exactly_once() {
    let dir = tempfile::tempdir().unwrap();
    write_sources(dir.path());

    let options = gradient_options(dir.path());
    let compiled = pipeline::compile(&options, GRADIENT_MAIN).unwrap();

    let names: Vec<String> = compiled
        .dependencies
        .iter()
        .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
        .collect();
    assert_eq!(names, ["gradient.frag", "scale.glsl", "mix.glsl"]);

    let depfile = pipeline::depfile_text(&PathBuf::from("gradient.stage"), &compiled.dependencies);
    assert_eq!(depfile.matches("scale.glsl").count(), 1);
    assert_eq!(depfile.matches("mix.glsl").count(), 1);
    assert!(depfile.starts_with("gradient.stage:"), "{depfile}");
    assert!(depfile.ends_with('\n'));
}

#[test]
fn unknown_target_platform_fails_before_any_work() {
    let dir = tempfile::tempdir().unwrap();
    write_sources(dir.path());

    let mut options = gradient_options(dir.path());
    options.target_platform = TargetPlatform::Unknown;
    let err = pipeline::compile(&options, GRADIENT_MAIN).unwrap_err();
    match err {
        CompileError::Configuration(message) => {
            assert!(message.contains("target platform"), "{message}");
        }
        other => panic!("expected Configuration error, got {other}"),
    }
}

#[test]
fn artifacts_are_written_atomically_with_no_temp_leftovers() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let out = tempfile::tempdir()?;
    write_sources(dir.path());

    let options = gradient_options(dir.path());
    let compiled = pipeline::compile(&options, GRADIENT_MAIN)?;
    let paths = ArtifactPaths {
        ir: Some(out.path().join("gradient.ir")),
        target_source: Some(out.path().join("gradient.glsl")),
        reflection_json: Some(out.path().join("gradient.reflection.json")),
        declarations: Some(out.path().join("gradient.h")),
        definitions: Some(out.path().join("gradient.cc")),
        runtime_stage: Some(out.path().join("gradient.stage")),
        runtime_stage_json: Some(out.path().join("gradient.stage.json")),
        depfile: Some(out.path().join("gradient.d")),
    };
    pipeline::write_artifacts(&compiled, &paths)?;

    let mut written: Vec<String> = fs::read_dir(out.path())?
        .map(|e| e.unwrap().file_name().to_str().unwrap().to_string())
        .collect();
    written.sort();
    assert_eq!(
        written,
        [
            "gradient.cc",
            "gradient.d",
            "gradient.glsl",
            "gradient.h",
            "gradient.ir",
            "gradient.reflection.json",
            "gradient.stage",
            "gradient.stage.json",
        ]
    );

    // The runtime stage on disk decodes back to the in-memory record.
    let bytes = fs::read(out.path().join("gradient.stage"))?;
    let decoded = RuntimeStageData::decode(&bytes)?;
    assert_eq!(decoded, compiled.stage_data);
    Ok(())
}

#[test]
fn non_portable_targets_carry_a_portable_fallback_payload() {
    let dir = tempfile::tempdir().unwrap();
    write_sources(dir.path());

    let options = gradient_options(dir.path());
    let compiled = pipeline::compile(&options, GRADIENT_MAIN).unwrap();
    let fallback = compiled
        .stage_data
        .fallback_payload
        .as_ref()
        .expect("fallback payload present");

    // The fallback is valid portable-language source, checked with the
    // same front-end the runtime would use.
    let fallback_text = std::str::from_utf8(fallback).unwrap();
    naga::front::wgsl::parse_str(fallback_text).unwrap();

    let mut portable = gradient_options(dir.path());
    portable.target_platform = TargetPlatform::PortableFallback;
    let compiled = pipeline::compile(&portable, GRADIENT_MAIN).unwrap();
    assert_eq!(compiled.stage_data.fallback_payload, None);
}

#[test]
fn target_source_is_emitted_for_every_known_platform() {
    let dir = tempfile::tempdir().unwrap();
    write_sources(dir.path());

    for platform in TargetPlatform::all_known() {
        let mut options = gradient_options(dir.path());
        options.target_platform = platform;
        let compiled = pipeline::compile(&options, GRADIENT_MAIN).unwrap();
        assert!(
            !compiled.target.text.is_empty(),
            "empty emission for {platform:?}"
        );
        assert_eq!(compiled.stage_data.target_platform, platform);
    }
}
