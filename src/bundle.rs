//! Shader bundles: many named shaders, each compiled for every required
//! backend, packed into one artifact.
//!
//! Config parsing is all-up-front and cheap; compilation only starts once
//! the whole document has validated. A single failing (shader, backend)
//! pair aborts the entire build with no partial bundle output.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CompileError, Result};
use crate::options::{ShaderStage, SourceLanguage, SourceOptions, TargetPlatform};
use crate::pipeline::{CompiledShader, compile_named};
use crate::reflect::types::{InputDescription, StructDefinition};
use crate::runtime_stage::RuntimeStageData;

const BUNDLE_MAGIC: [u8; 4] = *b"FSBL";
const BUNDLE_FORMAT_VERSION: u32 = 1;

/// One shader entry from the bundle config document.
#[derive(Debug, Clone)]
pub struct ShaderConfig {
    pub file: PathBuf,
    pub stage: ShaderStage,
    pub language: SourceLanguage,
    pub entry_point: Option<String>,
}

/// Validated mapping from unique shader name to its config. Read-only once
/// built.
#[derive(Debug, Default)]
pub struct ShaderBundleConfig {
    shaders: BTreeMap<String, ShaderConfig>,
}

/// The top-level document as an entry list. A plain map deserialize would
/// let the JSON parser collapse duplicate shader keys silently; collecting
/// entries as they stream keeps duplicates visible for the insert guard.
struct DocumentEntries(Vec<(String, Value)>);

impl<'de> serde::Deserialize<'de> for DocumentEntries {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct EntriesVisitor;

        impl<'de> serde::de::Visitor<'de> for EntriesVisitor {
            type Value = DocumentEntries;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str("an object mapping shader names to configs")
            }

            fn visit_map<A>(self, mut map: A) -> std::result::Result<Self::Value, A::Error>
            where
                A: serde::de::MapAccess<'de>,
            {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some(entry) = map.next_entry::<String, Value>()? {
                    entries.push(entry);
                }
                Ok(DocumentEntries(entries))
            }
        }

        deserializer.deserialize_map(EntriesVisitor)
    }
}

impl ShaderBundleConfig {
    /// Parse and validate the declarative config document. Every error
    /// names the offending shader key and field; nothing is compiled here.
    pub fn parse(document: &str) -> Result<Self> {
        let mut deserializer = serde_json::Deserializer::from_str(document);
        let parsed: std::result::Result<DocumentEntries, serde_json::Error> =
            serde::Deserialize::deserialize(&mut deserializer);
        let DocumentEntries(entries) = parsed
            .and_then(|entries| {
                deserializer.end()?;
                Ok(entries)
            })
            .map_err(|e| CompileError::BundleConfig(format!("malformed document: {e}")))?;

        let mut config = Self::default();
        for (name, entry) in entries {
            let Value::Object(fields) = entry else {
                return Err(CompileError::BundleConfig(format!(
                    "shader '{name}': entry must be an object"
                )));
            };
            let file = match fields.get("file") {
                Some(Value::String(file)) => PathBuf::from(file),
                Some(_) => {
                    return Err(CompileError::BundleConfig(format!(
                        "shader '{name}': 'file' must be a string"
                    )));
                }
                None => {
                    return Err(CompileError::BundleConfig(format!(
                        "shader '{name}': missing 'file' field"
                    )));
                }
            };
            let stage = match fields.get("type") {
                Some(Value::String(keyword)) => {
                    ShaderStage::parse_keyword(keyword).ok_or_else(|| {
                        CompileError::BundleConfig(format!(
                            "shader '{name}': unknown stage keyword '{keyword}'"
                        ))
                    })?
                }
                Some(_) => {
                    return Err(CompileError::BundleConfig(format!(
                        "shader '{name}': 'type' must be a string"
                    )));
                }
                None => {
                    return Err(CompileError::BundleConfig(format!(
                        "shader '{name}': missing 'type' field"
                    )));
                }
            };
            let language = match fields.get("language") {
                Some(Value::String(keyword)) => {
                    SourceLanguage::parse_keyword(keyword).ok_or_else(|| {
                        CompileError::BundleConfig(format!(
                            "shader '{name}': unknown language keyword '{keyword}'"
                        ))
                    })?
                }
                Some(_) => {
                    return Err(CompileError::BundleConfig(format!(
                        "shader '{name}': 'language' must be a string"
                    )));
                }
                None => SourceLanguage::Glsl,
            };
            let entry_point = match fields.get("entry_point") {
                Some(Value::String(entry_point)) => Some(entry_point.clone()),
                Some(_) => {
                    return Err(CompileError::BundleConfig(format!(
                        "shader '{name}': 'entry_point' must be a string"
                    )));
                }
                None => None,
            };

            config.insert(
                name,
                ShaderConfig {
                    file,
                    stage,
                    language,
                    entry_point,
                },
            )?;
        }
        Ok(config)
    }

    /// Insert one shader; duplicate names are rejected.
    pub fn insert(&mut self, name: impl Into<String>, shader: ShaderConfig) -> Result<()> {
        let name = name.into();
        if self.shaders.contains_key(&name) {
            return Err(CompileError::BundleConfig(format!(
                "duplicate shader name '{name}'"
            )));
        }
        self.shaders.insert(name, shader);
        Ok(())
    }

    pub fn shaders(&self) -> impl Iterator<Item = (&String, &ShaderConfig)> {
        self.shaders.iter()
    }

    pub fn len(&self) -> usize {
        self.shaders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shaders.is_empty()
    }
}

/// One (shader, backend) leaf of the packed bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundleEntry {
    pub stage_data: RuntimeStageData,
    /// Vertex-input layout, present for vertex stages.
    pub inputs: Vec<InputDescription>,
    /// Uniform-struct layouts the consuming runtime binds against.
    pub structs: Vec<StructDefinition>,
}

/// The packed bundle: shader name, then backend key, then one entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShaderBundle {
    pub shaders: BTreeMap<String, BTreeMap<String, BundleEntry>>,
}

impl ShaderBundle {
    pub fn encode(&self) -> Result<Vec<u8>> {
        let body = bincode::serialize(self)
            .map_err(|e| CompileError::Serialization(format!("bundle encoding failed: {e}")))?;
        let mut bytes = Vec::with_capacity(8 + body.len());
        bytes.extend_from_slice(&BUNDLE_MAGIC);
        bytes.extend_from_slice(&BUNDLE_FORMAT_VERSION.to_le_bytes());
        bytes.extend_from_slice(&body);
        Ok(bytes)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < 8 || bytes[..4] != BUNDLE_MAGIC {
            return Err(CompileError::Serialization(
                "not a shader bundle (bad magic)".to_string(),
            ));
        }
        let version = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        if version != BUNDLE_FORMAT_VERSION {
            return Err(CompileError::Serialization(format!(
                "unsupported bundle format version {version}"
            )));
        }
        bincode::deserialize(&bytes[8..])
            .map_err(|e| CompileError::Serialization(format!("bundle decoding failed: {e}")))
    }
}

/// Runs the full single-shader pipeline across every (shader, platform)
/// pair and aggregates the results.
#[derive(Debug)]
pub struct ShaderBundleBuilder {
    base_options: SourceOptions,
    platforms: Vec<TargetPlatform>,
}

impl ShaderBundleBuilder {
    /// `base_options` supplies the working directory, include directories,
    /// and defines shared by every shader in the bundle.
    pub fn new(base_options: SourceOptions, platforms: Vec<TargetPlatform>) -> Self {
        Self {
            base_options,
            platforms,
        }
    }

    pub fn build(&self, config: &ShaderBundleConfig) -> Result<ShaderBundle> {
        let mut bundle = ShaderBundle::default();
        for (name, shader) in config.shaders() {
            let source_path = self.base_options.working_dir.join(&shader.file);
            let source =
                std::fs::read_to_string(&source_path).map_err(|e| CompileError::Bundle {
                    shader: name.clone(),
                    backend: None,
                    source: Box::new(CompileError::io(&source_path, e)),
                })?;

            let mut backends = BTreeMap::new();
            for &platform in &self.platforms {
                let entry = self
                    .compile_one(name, shader, platform, &source)
                    .map_err(|e| CompileError::Bundle {
                        shader: name.clone(),
                        backend: Some(platform.keyword().to_string()),
                        source: Box::new(e),
                    })?;
                backends.insert(platform.keyword().to_string(), entry);
            }
            bundle.shaders.insert(name.clone(), backends);
        }
        log::debug!(
            "built bundle: {} shaders x {} platforms",
            bundle.shaders.len(),
            self.platforms.len()
        );
        Ok(bundle)
    }

    fn compile_one(
        &self,
        name: &str,
        shader: &ShaderConfig,
        platform: TargetPlatform,
        source: &str,
    ) -> Result<BundleEntry> {
        let options = SourceOptions {
            stage: shader.stage,
            target_platform: platform,
            source_language: shader.language,
            entry_point: shader
                .entry_point
                .clone()
                .unwrap_or_else(|| format!("{name}_{}_main", shader.stage.keyword())),
            defines: self.base_options.defines.clone(),
            working_dir: self.base_options.working_dir.clone(),
            include_dirs: self.base_options.include_dirs.clone(),
            file_name: shader.file.display().to_string(),
        };
        let compiled: CompiledShader = compile_named(&options, source, name)?;
        Ok(BundleEntry {
            stage_data: compiled.stage_data,
            inputs: compiled.reflection.inputs.clone(),
            structs: compiled.reflection.structs.clone(),
        })
    }
}
