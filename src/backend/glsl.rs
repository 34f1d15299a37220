//! GLSL backend, covering the desktop core profile and the embedded (ES)
//! profile.
//!
//! GLSL requires the entry symbol to be `main`, so the logical entry point
//! is renamed for emission; the logical name survives in the reflection
//! document and the runtime stage record.

use naga::back::glsl;

use crate::error::{CompileError, Result};
use crate::frontend::{ParsedIr, naga_stage};
use crate::options::{SourceOptions, TargetPlatform};

use super::TargetOutput;

/// Fixed entry symbol GLSL emission must use.
pub const GLSL_ENTRY_SYMBOL: &str = "main";

#[derive(Debug)]
pub struct GlslBackend {
    platform: TargetPlatform,
    stage: naga::ShaderStage,
    version: glsl::Version,
    zero_initialize: bool,
    /// Name of the IR entry point selected for emission.
    ir_entry_point: String,
}

impl GlslBackend {
    pub fn new(ir: &ParsedIr, options: &SourceOptions) -> Result<Self> {
        let stage = naga_stage(options.stage)?;
        let version = match options.target_platform {
            TargetPlatform::DesktopEs => glsl::Version::Desktop(330),
            _ => glsl::Version::Embedded {
                version: 310,
                is_webgl: false,
            },
        };
        let ir_entry_point = ir
            .module
            .entry_points
            .iter()
            .find(|ep| ep.stage == stage)
            .map(|ep| ep.name.clone())
            .ok_or_else(|| {
                CompileError::CrossCompilation(format!(
                    "no {:?} entry point in IR for {}",
                    stage, options.file_name
                ))
            })?;
        Ok(Self {
            platform: options.target_platform,
            stage,
            version,
            zero_initialize: true,
            ir_entry_point,
        })
    }

    pub fn target_platform(&self) -> TargetPlatform {
        self.platform
    }

    pub fn emit(&self, ir: &ParsedIr) -> Result<TargetOutput> {
        let options = glsl::Options {
            version: self.version,
            writer_flags: glsl::WriterFlags::empty(),
            zero_initialize_workgroup_memory: self.zero_initialize,
            ..Default::default()
        };
        let pipeline_options = glsl::PipelineOptions {
            shader_stage: self.stage,
            entry_point: self.ir_entry_point.clone(),
            multiview: None,
        };

        let mut text = String::new();
        let mut writer = glsl::Writer::new(
            &mut text,
            &ir.module,
            &ir.info,
            &options,
            &pipeline_options,
            naga::proc::BoundsCheckPolicies::default(),
        )
        .map_err(|e| CompileError::CrossCompilation(format!("GLSL writer setup failed: {e}")))?;
        writer
            .write()
            .map_err(|e| CompileError::CrossCompilation(format!("GLSL emission failed: {e}")))?;

        Ok(TargetOutput {
            text,
            emitted_entry_point: GLSL_ENTRY_SYMBOL.to_string(),
        })
    }
}
