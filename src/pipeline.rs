//! Single-shader orchestration: options + source in, every output artifact
//! out.
//!
//! The pipeline is synchronous and single-threaded by construction; each
//! stage consumes the complete output of the previous one, and a failed
//! stage means later stages are simply never called.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::backend::{CompilerBackend, TargetOutput, WgslBackend};
use crate::error::{CompileError, Result};
use crate::frontend::{ParsedIr, generate_ir, ir_binary};
use crate::includer::Includer;
use crate::options::{SourceOptions, TargetPlatform};
use crate::reflect::codegen::{generate_declarations, generate_definitions, reflection_json};
use crate::reflect::{ReflectionDocument, Reflector, runtime_stage_data};
use crate::runtime_stage::RuntimeStageData;

/// Every artifact one (shader, backend) compilation produces.
#[derive(Debug)]
pub struct CompiledShader {
    pub ir: Arc<ParsedIr>,
    pub ir_binary: Vec<u8>,
    pub target: TargetOutput,
    pub reflection: ReflectionDocument,
    pub reflection_json: String,
    pub declarations: String,
    pub definitions: String,
    pub stage_data: RuntimeStageData,
    /// Main source file plus every resolved include, each exactly once, in
    /// first-resolution order.
    pub dependencies: Vec<PathBuf>,
}

/// Run the full pipeline for one shader.
pub fn compile(options: &SourceOptions, source: &str) -> Result<CompiledShader> {
    compile_named(options, source, &derive_shader_name(options))
}

/// Like [`compile`], with an explicit shader name for the reflection
/// document (bundle builds use the config key).
pub fn compile_named(
    options: &SourceOptions,
    source: &str,
    shader_name: &str,
) -> Result<CompiledShader> {
    // An unknown target is fatal before any work happens: no IR, no target
    // source, no reflection artifacts for this invocation.
    if options.target_platform == TargetPlatform::Unknown {
        return Err(CompileError::Configuration(
            "target platform must be specified".to_string(),
        ));
    }
    let mut includer = Includer::from_options(options);
    let ir = generate_ir(options, source, &mut includer)?;
    let backend = CompilerBackend::create(&ir, options)?;
    let target = backend.emit(&ir)?;

    let reflection = Reflector::new(&ir, &backend, options)?.reflect(shader_name)?;
    let reflection_json = reflection_json(&reflection)?;
    let declarations = generate_declarations(&reflection);
    let definitions = generate_definitions(&reflection);

    let fallback_payload = portable_fallback_payload(&ir, &backend, options);
    let stage_data = runtime_stage_data(
        &reflection,
        target.text.clone().into_bytes(),
        fallback_payload,
    );

    let mut dependencies = vec![options.working_dir.join(&options.file_name)];
    for resolved in includer.resolved_files() {
        if !dependencies.contains(resolved) {
            dependencies.push(resolved.clone());
        }
    }

    log::debug!(
        "compiled {} for {} ({} bytes, {} uniforms)",
        options.file_name,
        backend.name(),
        target.text.len(),
        stage_data.uniforms.len()
    );
    Ok(CompiledShader {
        ir_binary: ir_binary(&ir)?,
        ir,
        target,
        reflection,
        reflection_json,
        declarations,
        definitions,
        stage_data,
        dependencies,
    })
}

/// The portable-fallback payload is a best-effort extra: compilations that
/// already target the portable language skip it, and an emission failure
/// only costs the fallback, not the build.
fn portable_fallback_payload(
    ir: &ParsedIr,
    backend: &CompilerBackend,
    options: &SourceOptions,
) -> Option<Vec<u8>> {
    if backend.target_platform() == TargetPlatform::PortableFallback {
        return None;
    }
    let fallback = WgslBackend::new(options).ok()?;
    match fallback.emit(ir) {
        Ok(output) => Some(output.text.into_bytes()),
        Err(e) => {
            log::warn!(
                "portable fallback emission failed for {}: {e}",
                options.file_name
            );
            None
        }
    }
}

fn derive_shader_name(options: &SourceOptions) -> String {
    Path::new(&options.file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("shader")
        .to_string()
}

/// Make-style dependency listing for incremental build systems.
pub fn depfile_text(target: &Path, dependencies: &[PathBuf]) -> String {
    let mut out = format!("{}:", target.display());
    let mut seen: Vec<&PathBuf> = Vec::new();
    for dep in dependencies {
        if seen.contains(&dep) {
            continue;
        }
        seen.push(dep);
        out.push(' ');
        out.push_str(&dep.display().to_string());
    }
    out.push('\n');
    out
}

/// Write via a temp file in the same directory plus rename, so a failure
/// mid-write never leaves a partial file visible to build steps that poll
/// for existence.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| {
            CompileError::io(
                path,
                std::io::Error::new(std::io::ErrorKind::InvalidInput, "path has no file name"),
            )
        })?;
    let tmp = path.with_file_name(format!(".{file_name}.tmp"));
    if let Err(e) = std::fs::write(&tmp, bytes) {
        return Err(CompileError::io(&tmp, e));
    }
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(CompileError::io(path, e));
    }
    Ok(())
}

/// Output locations for [`write_artifacts`]. Optional paths are skipped.
#[derive(Debug, Default, Clone)]
pub struct ArtifactPaths {
    pub ir: Option<PathBuf>,
    pub target_source: Option<PathBuf>,
    pub reflection_json: Option<PathBuf>,
    pub declarations: Option<PathBuf>,
    pub definitions: Option<PathBuf>,
    pub runtime_stage: Option<PathBuf>,
    pub runtime_stage_json: Option<PathBuf>,
    pub depfile: Option<PathBuf>,
}

/// Write every requested artifact, each atomically.
pub fn write_artifacts(shader: &CompiledShader, paths: &ArtifactPaths) -> Result<()> {
    if let Some(path) = &paths.ir {
        write_atomic(path, &shader.ir_binary)?;
    }
    if let Some(path) = &paths.target_source {
        write_atomic(path, shader.target.text.as_bytes())?;
    }
    if let Some(path) = &paths.reflection_json {
        write_atomic(path, shader.reflection_json.as_bytes())?;
    }
    if let Some(path) = &paths.declarations {
        write_atomic(path, shader.declarations.as_bytes())?;
    }
    if let Some(path) = &paths.definitions {
        write_atomic(path, shader.definitions.as_bytes())?;
    }
    if let Some(path) = &paths.runtime_stage {
        write_atomic(path, &shader.stage_data.encode()?)?;
    }
    if let Some(path) = &paths.runtime_stage_json {
        write_atomic(path, shader.stage_data.to_json()?.as_bytes())?;
    }
    if let Some(path) = &paths.depfile {
        let target = paths
            .runtime_stage
            .as_deref()
            .or(paths.target_source.as_deref())
            .unwrap_or(path);
        write_atomic(path, depfile_text(target, &shader.dependencies).as_bytes())?;
    }
    Ok(())
}
