//! Immutable configuration value types for one pipeline invocation.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Pipeline stage of the shader being compiled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShaderStage {
    Vertex,
    Fragment,
    Compute,
    TessellationControl,
    TessellationEvaluation,
    Unknown,
}

impl ShaderStage {
    /// Parse a bundle-config / CLI keyword. Unrecognized keywords are `None`
    /// so the caller can name the offending field in its own error.
    pub fn parse_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "vertex" => Some(Self::Vertex),
            "fragment" => Some(Self::Fragment),
            "compute" => Some(Self::Compute),
            "tessellation_control" => Some(Self::TessellationControl),
            "tessellation_evaluation" => Some(Self::TessellationEvaluation),
            _ => None,
        }
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Vertex => "vertex",
            Self::Fragment => "fragment",
            Self::Compute => "compute",
            Self::TessellationControl => "tessellation_control",
            Self::TessellationEvaluation => "tessellation_evaluation",
            Self::Unknown => "unknown",
        }
    }
}

/// Graphics backend a compilation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetPlatform {
    /// Desktop-class native shading language (MSL, desktop dialect).
    DesktopNative,
    /// Mobile-class native shading language (MSL, mobile dialect).
    MobileNative,
    /// Desktop OpenGL flavor of GLSL.
    DesktopEs,
    /// OpenGL ES flavor of GLSL.
    MobileEs,
    /// Portable fallback language (WGSL), consumable everywhere.
    PortableFallback,
    Unknown,
}

impl TargetPlatform {
    pub fn parse_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "desktop_native" => Some(Self::DesktopNative),
            "mobile_native" => Some(Self::MobileNative),
            "desktop_es" => Some(Self::DesktopEs),
            "mobile_es" => Some(Self::MobileEs),
            "portable" => Some(Self::PortableFallback),
            _ => None,
        }
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            Self::DesktopNative => "desktop_native",
            Self::MobileNative => "mobile_native",
            Self::DesktopEs => "desktop_es",
            Self::MobileEs => "mobile_es",
            Self::PortableFallback => "portable",
            Self::Unknown => "unknown",
        }
    }

    /// Every platform a bundle build targets by default.
    pub fn all_known() -> [Self; 5] {
        [
            Self::DesktopNative,
            Self::MobileNative,
            Self::DesktopEs,
            Self::MobileEs,
            Self::PortableFallback,
        ]
    }
}

/// Language of the input shader source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceLanguage {
    Glsl,
    Hlsl,
    Unknown,
}

impl SourceLanguage {
    pub fn parse_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "glsl" => Some(Self::Glsl),
            "hlsl" => Some(Self::Hlsl),
            _ => None,
        }
    }
}

/// Everything one compilation needs to know besides the source text itself.
///
/// Constructed once per pipeline invocation and never mutated; the bundle
/// builder clones and specializes it per (shader, backend) pair.
#[derive(Debug, Clone)]
pub struct SourceOptions {
    pub stage: ShaderStage,
    pub target_platform: TargetPlatform,
    pub source_language: SourceLanguage,
    /// Logical entry point name, retained for diagnostics and reflection
    /// even when a backend emits a fixed symbol instead.
    pub entry_point: String,
    /// Macro defines in declaration order.
    pub defines: Vec<(String, String)>,
    /// Directory `#include` requests resolve against first.
    pub working_dir: PathBuf,
    /// Extra include search roots, tried in declaration order.
    pub include_dirs: Vec<PathBuf>,
    /// Source file name used in diagnostics and the dependency listing.
    pub file_name: String,
}

impl Default for SourceOptions {
    fn default() -> Self {
        Self {
            stage: ShaderStage::Unknown,
            target_platform: TargetPlatform::Unknown,
            source_language: SourceLanguage::Glsl,
            entry_point: "main".to_string(),
            defines: Vec::new(),
            working_dir: PathBuf::from("."),
            include_dirs: Vec::new(),
            file_name: "<memory>".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_keywords_round_trip() {
        for stage in [
            ShaderStage::Vertex,
            ShaderStage::Fragment,
            ShaderStage::Compute,
            ShaderStage::TessellationControl,
            ShaderStage::TessellationEvaluation,
        ] {
            assert_eq!(ShaderStage::parse_keyword(stage.keyword()), Some(stage));
        }
        assert_eq!(ShaderStage::parse_keyword("geometry"), None);
    }

    #[test]
    fn platform_keywords_round_trip() {
        for platform in TargetPlatform::all_known() {
            assert_eq!(
                TargetPlatform::parse_keyword(platform.keyword()),
                Some(platform)
            );
        }
        assert_eq!(TargetPlatform::parse_keyword("unknown"), None);
    }
}
