//! Portable fallback backend (WGSL).
//!
//! WGSL modules keep every entry point and every declared name, so there is
//! no binding remap and no entry-symbol policy here.

use crate::error::{CompileError, Result};
use crate::frontend::{ParsedIr, naga_stage};
use crate::options::{SourceOptions, TargetPlatform};

use super::TargetOutput;

#[derive(Debug)]
pub struct WgslBackend {
    stage: naga::ShaderStage,
}

impl WgslBackend {
    pub fn new(options: &SourceOptions) -> Result<Self> {
        Ok(Self {
            stage: naga_stage(options.stage)?,
        })
    }

    pub fn target_platform(&self) -> TargetPlatform {
        TargetPlatform::PortableFallback
    }

    pub fn emit(&self, ir: &ParsedIr) -> Result<TargetOutput> {
        let text = naga::back::wgsl::write_string(
            &ir.module,
            &ir.info,
            naga::back::wgsl::WriterFlags::EXPLICIT_TYPES,
        )
        .map_err(|e| CompileError::CrossCompilation(format!("WGSL emission failed: {e}")))?;

        let emitted_entry_point = ir
            .module
            .entry_points
            .iter()
            .find(|ep| ep.stage == self.stage)
            .map(|ep| ep.name.clone())
            .unwrap_or_else(|| "main".to_string());

        Ok(TargetOutput {
            text,
            emitted_entry_point,
        })
    }
}
