//! Cross-compilation backend selection and emission.
//!
//! Exactly one backend variant is live per compilation. Target-specific
//! behavior (binding remap, language version, entry-symbol policy) is
//! matched exhaustively on the variant rather than dispatched through a
//! trait object, so adding a backend forces every policy site to decide.

pub mod glsl;
pub mod msl;
pub mod wgsl;

use naga::{GlobalVariable, Handle};

use crate::error::{CompileError, Result};
use crate::frontend::ParsedIr;
use crate::options::{SourceOptions, TargetPlatform};

pub use glsl::GlslBackend;
pub use msl::MslBackend;
pub use wgsl::WgslBackend;

/// Result of one emission: target-language text plus the symbol the entry
/// point was actually emitted under (backends with a fixed entry symbol
/// rename it; the logical name stays in the reflection document).
#[derive(Debug, Clone)]
pub struct TargetOutput {
    pub text: String,
    pub emitted_entry_point: String,
}

/// The configured cross-compilation backend for one (shader, platform)
/// pair.
#[derive(Debug)]
pub enum CompilerBackend {
    Msl(MslBackend),
    Glsl(GlslBackend),
    Wgsl(WgslBackend),
}

impl CompilerBackend {
    /// Select and configure a backend from the parsed IR and options.
    ///
    /// An unknown target platform is a fatal construction failure: no
    /// backend instance is produced and no later stage runs.
    pub fn create(ir: &ParsedIr, options: &SourceOptions) -> Result<Self> {
        let backend = match options.target_platform {
            TargetPlatform::DesktopNative | TargetPlatform::MobileNative => {
                Self::Msl(MslBackend::new(ir, options)?)
            }
            TargetPlatform::DesktopEs | TargetPlatform::MobileEs => {
                Self::Glsl(GlslBackend::new(ir, options)?)
            }
            TargetPlatform::PortableFallback => Self::Wgsl(WgslBackend::new(options)?),
            TargetPlatform::Unknown => {
                return Err(CompileError::Configuration(
                    "target platform must be specified".to_string(),
                ));
            }
        };
        log::debug!(
            "selected {} backend for {}",
            backend.name(),
            options.file_name
        );
        Ok(backend)
    }

    /// Cross-compile the IR into the backend's target language.
    pub fn emit(&self, ir: &ParsedIr) -> Result<TargetOutput> {
        match self {
            Self::Msl(b) => b.emit(ir),
            Self::Glsl(b) => b.emit(ir),
            Self::Wgsl(b) => b.emit(ir),
        }
    }

    /// Short backend key used in bundle documents and diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Msl(_) => "msl",
            Self::Glsl(_) => "glsl",
            Self::Wgsl(_) => "wgsl",
        }
    }

    pub fn target_platform(&self) -> TargetPlatform {
        match self {
            Self::Msl(b) => b.target_platform(),
            Self::Glsl(b) => b.target_platform(),
            Self::Wgsl(b) => b.target_platform(),
        }
    }

    /// Backend-native slot a uniform was remapped to, for backends with a
    /// single flat binding namespace. `None` means the variable keeps its
    /// declared binding.
    pub fn assigned_slot(&self, var: Handle<GlobalVariable>) -> Option<u32> {
        match self {
            Self::Msl(b) => b.assigned_slot(var),
            Self::Glsl(_) | Self::Wgsl(_) => None,
        }
    }
}
