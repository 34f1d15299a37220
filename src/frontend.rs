//! IR generation: source text in, validated intermediate representation out.
//!
//! The parsed IR is produced exactly once per compilation, wrapped in an
//! `Arc`, and treated as read-only by every downstream consumer.

use std::sync::Arc;

use crate::error::{CompileError, Result};
use crate::includer::{Includer, expand_includes};
use crate::options::{ShaderStage, SourceLanguage, SourceOptions};

/// The backend-neutral compiled form of one shader: a validated module plus
/// the validator's analysis, needed by every emission backend.
#[derive(Debug)]
pub struct ParsedIr {
    pub module: naga::Module,
    pub info: naga::valid::ModuleInfo,
}

impl ParsedIr {
    /// The module entry point matching `stage`, if the front-end produced
    /// one.
    pub fn entry_point(&self, stage: ShaderStage) -> Option<&naga::EntryPoint> {
        let wanted = naga_stage(stage).ok()?;
        self.module
            .entry_points
            .iter()
            .find(|ep| ep.stage == wanted)
    }
}

pub(crate) fn naga_stage(stage: ShaderStage) -> Result<naga::ShaderStage> {
    match stage {
        ShaderStage::Vertex => Ok(naga::ShaderStage::Vertex),
        ShaderStage::Fragment => Ok(naga::ShaderStage::Fragment),
        ShaderStage::Compute => Ok(naga::ShaderStage::Compute),
        ShaderStage::TessellationControl | ShaderStage::TessellationEvaluation => {
            Err(CompileError::Configuration(format!(
                "shader stage '{}' is not supported by the IR front-end",
                stage.keyword()
            )))
        }
        ShaderStage::Unknown => Err(CompileError::Configuration(
            "shader stage must be specified".to_string(),
        )),
    }
}

/// Expand includes, then parse and validate the source into a [`ParsedIr`].
///
/// Front-end diagnostics are carried verbatim in the returned
/// `CompilationError` together with the configured diagnostic file name.
pub fn generate_ir(
    options: &SourceOptions,
    source: &str,
    includer: &mut Includer,
) -> Result<Arc<ParsedIr>> {
    let stage = naga_stage(options.stage)?;
    let expanded = expand_includes(source, &options.file_name, includer)?;

    let module = match options.source_language {
        SourceLanguage::Glsl => parse_glsl(options, stage, &expanded)?,
        SourceLanguage::Hlsl => {
            return Err(CompileError::Compilation {
                file: options.file_name.clone(),
                message: "the bound IR front-end has no HLSL parser; provide GLSL source"
                    .to_string(),
            });
        }
        SourceLanguage::Unknown => {
            return Err(CompileError::Configuration(
                "source language must be specified".to_string(),
            ));
        }
    };

    let info = naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    )
    .validate(&module)
    .map_err(|e| CompileError::Compilation {
        file: options.file_name.clone(),
        message: format!("IR validation failed: {e:?}"),
    })?;

    log::debug!(
        "generated IR for {} ({} entry points, {} globals)",
        options.file_name,
        module.entry_points.len(),
        module.global_variables.len()
    );
    Ok(Arc::new(ParsedIr { module, info }))
}

fn parse_glsl(
    options: &SourceOptions,
    stage: naga::ShaderStage,
    source: &str,
) -> Result<naga::Module> {
    let mut defines = naga::FastHashMap::default();
    for (name, value) in &options.defines {
        defines.insert(name.clone(), value.clone());
    }
    let front_options = naga::front::glsl::Options { stage, defines };

    naga::front::glsl::Frontend::default()
        .parse(&front_options, source)
        .map_err(|e| CompileError::Compilation {
            file: options.file_name.clone(),
            message: format!("GLSL parse failed: {e:?}"),
        })
}

/// Serialized form of the IR, written as the intermediate-representation
/// artifact next to the other outputs.
pub fn ir_binary(ir: &ParsedIr) -> Result<Vec<u8>> {
    bincode::serialize(&ir.module)
        .map_err(|e| CompileError::Serialization(format!("IR encoding failed: {e}")))
}
