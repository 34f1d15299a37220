//! Reflection metadata types.
//!
//! These are the value types the runtime's binding code consumes; they are
//! serde-derived because the reflection document is emitted as JSON and the
//! uniform descriptions travel inside the runtime stage record.

use serde::{Deserialize, Serialize};

use crate::options::{ShaderStage, TargetPlatform};

/// Scalar-level classification of a reflected value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaseType {
    Bool,
    SignedInt,
    UnsignedInt,
    Float,
    SampledImage,
    Struct,
}

/// One member of a reflected struct, with the backend's layout applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructMember {
    pub name: String,
    /// Semantic type name as it would read in source (`mat4`, `vec2`, …).
    pub type_name: String,
    pub base_type: BaseType,
    /// Byte offset within the parent struct.
    pub offset: u32,
    /// Byte size of one element.
    pub size: u32,
    /// Total byte length including every array element and inter-element
    /// padding.
    pub byte_length: u32,
    pub array_elements: Option<u32>,
    /// Padding appended to each array element to satisfy the backend's
    /// buffer-layout stride.
    pub element_padding: u32,
}

/// A reflected struct with its total layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructDefinition {
    pub name: String,
    pub byte_length: u32,
    pub members: Vec<StructMember>,
}

/// One uniform as the runtime's uniform-set API sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniformDescription {
    pub name: String,
    /// Backend binding slot the uniform was assigned.
    pub location: u32,
    pub base_type: BaseType,
    pub rows: u32,
    pub columns: u32,
    /// Bit width of one scalar element; 0 for opaque and struct-typed
    /// uniforms.
    pub bit_width: u32,
    pub array_elements: Option<u32>,
}

/// One vertex-stage input attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputDescription {
    pub name: String,
    pub location: u32,
    pub set: u32,
    pub binding: u32,
    pub base_type: BaseType,
    pub bit_width: u32,
    pub vec_size: u32,
    pub columns: u32,
    /// Byte offset assuming attributes are tightly packed in location
    /// order.
    pub offset: u32,
}

/// One bound resource. `byte_offset` is the resource's position within the
/// combined per-stage uniform data and is computed only for buffer-backed
/// resources; samplers and images never carry one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceEntry {
    pub name: String,
    pub set: u32,
    pub binding: u32,
    pub base_type: BaseType,
    pub byte_offset: Option<u32>,
}

/// The complete reflection output for one (shader, backend) compilation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReflectionDocument {
    pub shader_name: String,
    pub entry_point: String,
    pub stage: ShaderStage,
    pub target_platform: TargetPlatform,
    pub uniforms: Vec<UniformDescription>,
    pub inputs: Vec<InputDescription>,
    pub resources: Vec<ResourceEntry>,
    pub structs: Vec<StructDefinition>,
}
