//! Canonical binary and JSON encodings of one compiled shader stage.
//!
//! The binary form is a magic tag, a format version, and a bincode body
//! whose enums are flattened to explicit wire tags. Encoding validates up
//! front and produces no partial bytes on failure; decoding checks the
//! header before touching the body.

use serde::{Deserialize, Serialize};

use crate::error::{CompileError, Result};
use crate::options::{ShaderStage, TargetPlatform};
use crate::reflect::types::{BaseType, UniformDescription};

const STAGE_MAGIC: [u8; 4] = *b"FSRS";
const STAGE_FORMAT_VERSION: u32 = 1;

/// The serialized, versioned description of one compiled shader stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeStageData {
    pub entry_point: String,
    pub stage: ShaderStage,
    pub target_platform: TargetPlatform,
    /// Compiled payload in the target platform's shading language.
    pub payload: Vec<u8>,
    /// Optional portable-fallback payload; absence is not an error.
    pub fallback_payload: Option<Vec<u8>>,
    /// Uniforms in deterministic sorted order.
    pub uniforms: Vec<UniformDescription>,
}

#[derive(Serialize, Deserialize)]
struct WireStage {
    entry_point: String,
    stage: u8,
    target_platform: u8,
    payload: Vec<u8>,
    fallback_payload: Option<Vec<u8>>,
    uniforms: Vec<WireUniform>,
}

#[derive(Serialize, Deserialize)]
struct WireUniform {
    name: String,
    location: u32,
    base_type: u8,
    rows: u32,
    columns: u32,
    bit_width: u32,
    array_elements: Option<u32>,
}

fn platform_wire_tag(platform: TargetPlatform) -> Option<u8> {
    match platform {
        TargetPlatform::DesktopNative => Some(0),
        TargetPlatform::MobileNative => Some(1),
        TargetPlatform::DesktopEs => Some(2),
        TargetPlatform::MobileEs => Some(3),
        TargetPlatform::PortableFallback => Some(4),
        TargetPlatform::Unknown => None,
    }
}

fn platform_from_wire_tag(tag: u8) -> Option<TargetPlatform> {
    match tag {
        0 => Some(TargetPlatform::DesktopNative),
        1 => Some(TargetPlatform::MobileNative),
        2 => Some(TargetPlatform::DesktopEs),
        3 => Some(TargetPlatform::MobileEs),
        4 => Some(TargetPlatform::PortableFallback),
        _ => None,
    }
}

fn stage_wire_tag(stage: ShaderStage) -> Option<u8> {
    match stage {
        ShaderStage::Vertex => Some(0),
        ShaderStage::Fragment => Some(1),
        ShaderStage::Compute => Some(2),
        ShaderStage::TessellationControl => Some(3),
        ShaderStage::TessellationEvaluation => Some(4),
        ShaderStage::Unknown => None,
    }
}

fn stage_from_wire_tag(tag: u8) -> Option<ShaderStage> {
    match tag {
        0 => Some(ShaderStage::Vertex),
        1 => Some(ShaderStage::Fragment),
        2 => Some(ShaderStage::Compute),
        3 => Some(ShaderStage::TessellationControl),
        4 => Some(ShaderStage::TessellationEvaluation),
        _ => None,
    }
}

fn base_type_wire_tag(base_type: BaseType) -> u8 {
    match base_type {
        BaseType::Bool => 0,
        BaseType::SignedInt => 1,
        BaseType::UnsignedInt => 2,
        BaseType::Float => 3,
        BaseType::SampledImage => 4,
        BaseType::Struct => 5,
    }
}

fn base_type_from_wire_tag(tag: u8) -> Option<BaseType> {
    match tag {
        0 => Some(BaseType::Bool),
        1 => Some(BaseType::SignedInt),
        2 => Some(BaseType::UnsignedInt),
        3 => Some(BaseType::Float),
        4 => Some(BaseType::SampledImage),
        5 => Some(BaseType::Struct),
        _ => None,
    }
}

impl RuntimeStageData {
    /// Encode to the versioned binary form. Fails, producing no bytes, when
    /// the platform or stage has no wire tag or any uniform name is empty.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let platform = platform_wire_tag(self.target_platform).ok_or_else(|| {
            CompileError::Serialization(format!(
                "target platform '{}' has no wire tag",
                self.target_platform.keyword()
            ))
        })?;
        let stage = stage_wire_tag(self.stage).ok_or_else(|| {
            CompileError::Serialization(format!(
                "shader stage '{}' has no wire tag",
                self.stage.keyword()
            ))
        })?;
        for (index, uniform) in self.uniforms.iter().enumerate() {
            if uniform.name.is_empty() {
                return Err(CompileError::Serialization(format!(
                    "uniform #{index} has an empty name"
                )));
            }
        }

        let wire = WireStage {
            entry_point: self.entry_point.clone(),
            stage,
            target_platform: platform,
            payload: self.payload.clone(),
            fallback_payload: self.fallback_payload.clone(),
            uniforms: self
                .uniforms
                .iter()
                .map(|u| WireUniform {
                    name: u.name.clone(),
                    location: u.location,
                    base_type: base_type_wire_tag(u.base_type),
                    rows: u.rows,
                    columns: u.columns,
                    bit_width: u.bit_width,
                    array_elements: u.array_elements,
                })
                .collect(),
        };
        let body = bincode::serialize(&wire)
            .map_err(|e| CompileError::Serialization(format!("stage encoding failed: {e}")))?;

        let mut bytes = Vec::with_capacity(8 + body.len());
        bytes.extend_from_slice(&STAGE_MAGIC);
        bytes.extend_from_slice(&STAGE_FORMAT_VERSION.to_le_bytes());
        bytes.extend_from_slice(&body);
        Ok(bytes)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < 8 || bytes[..4] != STAGE_MAGIC {
            return Err(CompileError::Serialization(
                "not a runtime stage record (bad magic)".to_string(),
            ));
        }
        let version = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        if version != STAGE_FORMAT_VERSION {
            return Err(CompileError::Serialization(format!(
                "unsupported runtime stage format version {version}"
            )));
        }
        let wire: WireStage = bincode::deserialize(&bytes[8..])
            .map_err(|e| CompileError::Serialization(format!("stage decoding failed: {e}")))?;

        let stage = stage_from_wire_tag(wire.stage).ok_or_else(|| {
            CompileError::Serialization(format!("unknown stage wire tag {}", wire.stage))
        })?;
        let target_platform = platform_from_wire_tag(wire.target_platform).ok_or_else(|| {
            CompileError::Serialization(format!(
                "unknown platform wire tag {}",
                wire.target_platform
            ))
        })?;
        let mut uniforms = Vec::with_capacity(wire.uniforms.len());
        for u in wire.uniforms {
            let base_type = base_type_from_wire_tag(u.base_type).ok_or_else(|| {
                CompileError::Serialization(format!(
                    "unknown base type wire tag {} for uniform '{}'",
                    u.base_type, u.name
                ))
            })?;
            uniforms.push(UniformDescription {
                name: u.name,
                location: u.location,
                base_type,
                rows: u.rows,
                columns: u.columns,
                bit_width: u.bit_width,
                array_elements: u.array_elements,
            });
        }

        Ok(Self {
            entry_point: wire.entry_point,
            stage,
            target_platform,
            payload: wire.payload,
            fallback_payload: wire.fallback_payload,
            uniforms,
        })
    }

    /// Human-readable JSON form for debugging and text-preferring
    /// consumers.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| CompileError::Serialization(format!("stage JSON encoding failed: {e}")))
    }

    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .map_err(|e| CompileError::Serialization(format!("stage JSON decoding failed: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(platform: TargetPlatform) -> RuntimeStageData {
        RuntimeStageData {
            entry_point: "blur_fragment_main".to_string(),
            stage: ShaderStage::Fragment,
            target_platform: platform,
            payload: b"compiled".to_vec(),
            fallback_payload: Some(b"fallback".to_vec()),
            uniforms: vec![UniformDescription {
                name: "frame_info".to_string(),
                location: 0,
                base_type: BaseType::Struct,
                rows: 1,
                columns: 1,
                bit_width: 0,
                array_elements: None,
            }],
        }
    }

    #[test]
    fn unknown_platform_aborts_encode() {
        let err = sample(TargetPlatform::Unknown).encode().unwrap_err();
        assert!(err.to_string().contains("no wire tag"), "{err}");
    }

    #[test]
    fn empty_uniform_name_aborts_encode() {
        let mut stage = sample(TargetPlatform::MobileEs);
        stage.uniforms[0].name.clear();
        let err = stage.encode().unwrap_err();
        assert!(err.to_string().contains("empty name"), "{err}");
    }

    #[test]
    fn json_round_trip() {
        let stage = sample(TargetPlatform::PortableFallback);
        let decoded = RuntimeStageData::from_json(&stage.to_json().unwrap()).unwrap();
        assert_eq!(decoded, stage);
    }
}
