//! Reflection: structured metadata describing a shader's inputs, uniforms,
//! and memory layout, derived from the parsed IR and the configured backend.
//!
//! Failures never abort the walk mid-way; every diagnostic accumulates and
//! the whole reflection succeeds or fails as one unit per shader.

pub mod codegen;
pub mod types;

use std::collections::HashSet;

use naga::proc::Layouter;
use naga::{GlobalVariable, Handle, ScalarKind, TypeInner};

use crate::backend::CompilerBackend;
use crate::error::{CompileError, Result};
use crate::frontend::ParsedIr;
use crate::options::{ShaderStage, SourceOptions};
use crate::runtime_stage::RuntimeStageData;
use crate::uniform_sort::{UniformClass, classify, sorted_uniforms};

pub use types::{
    BaseType, InputDescription, ReflectionDocument, ResourceEntry, StructDefinition,
    StructMember, UniformDescription,
};

/// Alignment the combined uniform data area packs resources to.
const UNIFORM_PACK_ALIGNMENT: u32 = 16;

pub struct Reflector<'a> {
    ir: &'a ParsedIr,
    backend: &'a CompilerBackend,
    options: &'a SourceOptions,
    layouter: Layouter,
    diagnostics: Vec<String>,
    /// Struct definitions discovered while walking, nested ones included.
    structs: Vec<StructDefinition>,
}

impl<'a> Reflector<'a> {
    pub fn new(
        ir: &'a ParsedIr,
        backend: &'a CompilerBackend,
        options: &'a SourceOptions,
    ) -> Result<Self> {
        let mut layouter = Layouter::default();
        layouter
            .update(ir.module.to_ctx())
            .map_err(|e| CompileError::Reflection(format!("type layout failed: {e:?}")))?;
        Ok(Self {
            ir,
            backend,
            options,
            layouter,
            diagnostics: Vec::new(),
            structs: Vec::new(),
        })
    }

    /// Walk the IR and produce the full reflection document, or every
    /// accumulated diagnostic as one error.
    pub fn reflect(mut self, shader_name: &str) -> Result<ReflectionDocument> {
        if self.ir.entry_point(self.options.stage).is_none() {
            self.diagnostics.push(format!(
                "entry point for stage '{}' not found in IR",
                self.options.stage.keyword()
            ));
        }

        let sorted = sorted_uniforms(&self.ir.module, None);
        let mut uniforms = Vec::new();
        let mut seen_names: HashSet<String> = HashSet::new();
        for (index, &handle) in sorted.iter().enumerate() {
            if let Some(description) = self.uniform_description(handle, index) {
                if !seen_names.insert(description.name.clone()) {
                    self.diagnostics
                        .push(format!("duplicate uniform name '{}'", description.name));
                }
                uniforms.push(description);
            }
        }

        let resources = self.reflect_resources(&sorted);
        let inputs = if self.options.stage == ShaderStage::Vertex {
            self.reflect_inputs()
        } else {
            Vec::new()
        };

        if !self.diagnostics.is_empty() {
            return Err(CompileError::Reflection(self.diagnostics.join("\n")));
        }
        Ok(ReflectionDocument {
            shader_name: shader_name.to_string(),
            entry_point: self.options.entry_point.clone(),
            stage: self.options.stage,
            target_platform: self.backend.target_platform(),
            uniforms,
            inputs,
            resources,
            structs: self.structs,
        })
    }

    fn uniform_description(
        &mut self,
        handle: Handle<GlobalVariable>,
        sorted_index: usize,
    ) -> Option<UniformDescription> {
        let var = &self.ir.module.global_variables[handle];
        let Some(name) = var.name.clone().filter(|n| !n.is_empty()) else {
            self.diagnostics
                .push(format!("uniform #{sorted_index} has no name"));
            return None;
        };
        let location = self
            .backend
            .assigned_slot(handle)
            .or_else(|| var.binding.as_ref().map(|b| b.binding))
            .unwrap_or(sorted_index as u32);

        let (element_ty, array_elements) = match self.ir.module.types[var.ty].inner {
            TypeInner::Array { base, size, .. } => match self.array_element_count(&name, size) {
                Some(count) => (base, Some(count)),
                None => return None,
            },
            _ => (var.ty, None),
        };

        let description = match &self.ir.module.types[element_ty].inner {
            TypeInner::Scalar(scalar) => {
                let base_type = self.scalar_base_type(&name, *scalar)?;
                UniformDescription {
                    name,
                    location,
                    base_type,
                    rows: 1,
                    columns: 1,
                    bit_width: u32::from(scalar.width) * 8,
                    array_elements,
                }
            }
            TypeInner::Vector { size, scalar } => {
                let base_type = self.scalar_base_type(&name, *scalar)?;
                UniformDescription {
                    name,
                    location,
                    base_type,
                    rows: *size as u32,
                    columns: 1,
                    bit_width: u32::from(scalar.width) * 8,
                    array_elements,
                }
            }
            TypeInner::Matrix {
                columns,
                rows,
                scalar,
            } => {
                let base_type = self.scalar_base_type(&name, *scalar)?;
                UniformDescription {
                    name,
                    location,
                    base_type,
                    rows: *rows as u32,
                    columns: *columns as u32,
                    bit_width: u32::from(scalar.width) * 8,
                    array_elements,
                }
            }
            TypeInner::Struct { .. } => {
                // Buffer-backed block: layout details live in the struct
                // definition carried alongside the uniform list.
                self.reflect_struct_definition(element_ty);
                UniformDescription {
                    name,
                    location,
                    base_type: BaseType::Struct,
                    rows: 1,
                    columns: 1,
                    bit_width: 0,
                    array_elements,
                }
            }
            TypeInner::Image { .. } | TypeInner::Sampler { .. } => UniformDescription {
                name,
                location,
                base_type: BaseType::SampledImage,
                rows: 1,
                columns: 1,
                bit_width: 0,
                array_elements,
            },
            other => {
                self.diagnostics.push(format!(
                    "uniform '{name}' has no defined reflection mapping: {other:?}"
                ));
                return None;
            }
        };
        Some(description)
    }

    /// Resolve a struct type into its layout and record the definition,
    /// recursing through nested structs. Returns the definition's name.
    /// Anonymous members get a synthesized name that is stable and
    /// collision-free within the parent struct.
    fn reflect_struct_definition(&mut self, ty: Handle<naga::Type>) -> Option<String> {
        let naga_ty = &self.ir.module.types[ty];
        let struct_name = naga_ty
            .name
            .clone()
            .unwrap_or_else(|| format!("AnonymousStruct{}", ty.index()));
        let TypeInner::Struct { ref members, span } = naga_ty.inner else {
            self.diagnostics
                .push(format!("'{struct_name}' is not a struct type"));
            return None;
        };
        if self.structs.iter().any(|s| s.name == struct_name) {
            return Some(struct_name);
        }
        let members = members.clone();

        let mut reflected = Vec::with_capacity(members.len());
        let mut previous_end = 0u32;
        for (index, member) in members.iter().enumerate() {
            let name = member
                .name
                .clone()
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| format!("_anonymous_member{index}"));
            let Some(mut reflected_member) = self.struct_member(&struct_name, &name, member.ty)
            else {
                continue;
            };
            reflected_member.offset = member.offset;
            if member.offset < previous_end {
                self.diagnostics.push(format!(
                    "'{struct_name}.{name}' at offset {} overlaps the previous member ending at {previous_end}",
                    member.offset
                ));
            }
            previous_end = member.offset + reflected_member.byte_length;
            reflected.push(reflected_member);
        }

        if span < previous_end {
            self.diagnostics.push(format!(
                "'{struct_name}' spans {span} bytes but its members end at {previous_end}"
            ));
        }
        self.structs.push(StructDefinition {
            name: struct_name.clone(),
            byte_length: span,
            members: reflected,
        });
        Some(struct_name)
    }

    fn struct_member(
        &mut self,
        struct_name: &str,
        name: &str,
        ty: Handle<naga::Type>,
    ) -> Option<StructMember> {
        let qualified = format!("{struct_name}.{name}");
        let (element_ty, array_elements, stride) = match self.ir.module.types[ty].inner {
            TypeInner::Array { base, size, stride } => {
                let count = self.array_element_count(&qualified, size)?;
                (base, Some(count), Some(stride))
            }
            _ => (ty, None, None),
        };

        let element_size = self.layouter[element_ty].size;
        let (base_type, type_name) = match &self.ir.module.types[element_ty].inner {
            TypeInner::Scalar(scalar) => (
                self.scalar_base_type(&qualified, *scalar)?,
                scalar_type_name(*scalar).to_string(),
            ),
            TypeInner::Vector { size, scalar } => (
                self.scalar_base_type(&qualified, *scalar)?,
                vector_type_name(*size, *scalar),
            ),
            TypeInner::Matrix {
                columns,
                rows,
                scalar,
            } => {
                let (columns, rows, scalar) = (*columns, *rows, *scalar);
                self.check_matrix_layout(&qualified, columns, rows, scalar, element_size);
                (
                    self.scalar_base_type(&qualified, scalar)?,
                    matrix_type_name(columns, rows),
                )
            }
            TypeInner::Struct { .. } => {
                let type_name = self.reflect_struct_definition(element_ty)?;
                (BaseType::Struct, type_name)
            }
            other => {
                self.diagnostics.push(format!(
                    "'{qualified}' has no defined reflection mapping: {other:?}"
                ));
                return None;
            }
        };

        let (byte_length, element_padding) = match (array_elements, stride) {
            (Some(count), Some(stride)) => {
                if stride < element_size {
                    self.diagnostics.push(format!(
                        "'{qualified}' array stride {stride} is smaller than its element size {element_size}"
                    ));
                    return None;
                }
                (stride * count, stride - element_size)
            }
            _ => (element_size, 0),
        };

        Some(StructMember {
            name: name.to_string(),
            type_name,
            base_type,
            offset: 0,
            size: element_size,
            byte_length,
            array_elements,
            element_padding,
        })
    }

    /// Ordered resource entries for every bound uniform. Byte offsets are
    /// positions within the combined per-stage uniform data and exist only
    /// for buffer-backed resources.
    fn reflect_resources(&mut self, sorted: &[Handle<GlobalVariable>]) -> Vec<ResourceEntry> {
        let mut entries = Vec::with_capacity(sorted.len());
        let mut data_offset = 0u32;
        for (index, &handle) in sorted.iter().enumerate() {
            let var = &self.ir.module.global_variables[handle];
            let Some(name) = var.name.clone().filter(|n| !n.is_empty()) else {
                continue; // already diagnosed in uniform_description
            };
            let set = var.binding.as_ref().map(|b| b.group).unwrap_or(0);
            let binding = self
                .backend
                .assigned_slot(handle)
                .or_else(|| var.binding.as_ref().map(|b| b.binding))
                .unwrap_or(index as u32);

            let (base_type, byte_offset) = match classify(&self.ir.module, var) {
                Some(UniformClass::Data) => {
                    let offset = data_offset;
                    let size = self.layouter[var.ty].size;
                    data_offset += size.next_multiple_of(UNIFORM_PACK_ALIGNMENT);
                    let base_type = match self.ir.module.types[var.ty].inner {
                        TypeInner::Struct { .. } => BaseType::Struct,
                        TypeInner::Scalar(scalar)
                        | TypeInner::Vector { scalar, .. }
                        | TypeInner::Matrix { scalar, .. } => self
                            .scalar_base_type(&name, scalar)
                            .unwrap_or(BaseType::Float),
                        _ => BaseType::Struct,
                    };
                    (base_type, Some(offset))
                }
                Some(UniformClass::SampledImage) => (BaseType::SampledImage, None),
                None => continue,
            };
            entries.push(ResourceEntry {
                name,
                set,
                binding,
                base_type,
                byte_offset,
            });
        }
        entries
    }

    /// Vertex input attributes in location order, tightly packed.
    fn reflect_inputs(&mut self) -> Vec<InputDescription> {
        let Some(entry_point) = self.ir.entry_point(self.options.stage) else {
            return Vec::new();
        };

        let mut located: Vec<(u32, &naga::FunctionArgument)> = entry_point
            .function
            .arguments
            .iter()
            .filter_map(|arg| match arg.binding {
                Some(naga::Binding::Location { location, .. }) => Some((location, arg)),
                _ => None,
            })
            .collect();
        located.sort_by_key(|&(location, _)| location);

        let mut inputs = Vec::with_capacity(located.len());
        let mut offset = 0u32;
        for (location, arg) in located {
            let name = arg
                .name
                .clone()
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| format!("input_{location}"));
            let (scalar, vec_size, columns) = match self.ir.module.types[arg.ty].inner {
                TypeInner::Scalar(scalar) => (scalar, 1, 1),
                TypeInner::Vector { size, scalar } => (scalar, size as u32, 1),
                TypeInner::Matrix {
                    columns,
                    rows,
                    scalar,
                } => (scalar, rows as u32, columns as u32),
                ref other => {
                    self.diagnostics.push(format!(
                        "vertex input '{name}' has no defined reflection mapping: {other:?}"
                    ));
                    continue;
                }
            };
            let Some(base_type) = self.scalar_base_type(&name, scalar) else {
                continue;
            };
            let byte_size = u32::from(scalar.width) * vec_size * columns;
            inputs.push(InputDescription {
                name,
                location,
                set: 0,
                binding: 0,
                base_type,
                bit_width: u32::from(scalar.width) * 8,
                vec_size,
                columns,
                offset,
            });
            offset += byte_size;
        }
        inputs
    }

    fn array_element_count(&mut self, context: &str, size: naga::ArraySize) -> Option<u32> {
        match size {
            naga::ArraySize::Constant(count) => Some(count.get()),
            naga::ArraySize::Dynamic => {
                self.diagnostics.push(format!(
                    "'{context}' is a dynamically sized array, which cannot be reflected"
                ));
                None
            }
        }
    }

    fn scalar_base_type(&mut self, context: &str, scalar: naga::Scalar) -> Option<BaseType> {
        match scalar.kind {
            ScalarKind::Bool => Some(BaseType::Bool),
            ScalarKind::Sint => Some(BaseType::SignedInt),
            ScalarKind::Uint => Some(BaseType::UnsignedInt),
            ScalarKind::Float => Some(BaseType::Float),
            _ => {
                self.diagnostics.push(format!(
                    "'{context}' has scalar kind {:?} with no defined mapping",
                    scalar.kind
                ));
                None
            }
        }
    }

    /// The layouter's reported size must agree with the matrix dimensions:
    /// column stride is the column vector rounded up to its alignment.
    fn check_matrix_layout(
        &mut self,
        context: &str,
        columns: naga::VectorSize,
        rows: naga::VectorSize,
        scalar: naga::Scalar,
        reported_size: u32,
    ) {
        let column_size = rows as u32 * u32::from(scalar.width);
        let column_stride = if rows == naga::VectorSize::Tri {
            4 * u32::from(scalar.width)
        } else {
            column_size
        };
        let expected = columns as u32 * column_stride;
        if expected != reported_size {
            self.diagnostics.push(format!(
                "'{context}' matrix dimensions {}x{} are inconsistent with the reported layout size {reported_size}",
                columns as u32, rows as u32
            ));
        }
    }
}

fn scalar_type_name(scalar: naga::Scalar) -> &'static str {
    match scalar.kind {
        ScalarKind::Bool => "bool",
        ScalarKind::Sint => "int",
        ScalarKind::Uint => "uint",
        _ => "float",
    }
}

fn vector_type_name(size: naga::VectorSize, scalar: naga::Scalar) -> String {
    let prefix = match scalar.kind {
        ScalarKind::Bool => "bvec",
        ScalarKind::Sint => "ivec",
        ScalarKind::Uint => "uvec",
        _ => "vec",
    };
    format!("{prefix}{}", size as u32)
}

fn matrix_type_name(columns: naga::VectorSize, rows: naga::VectorSize) -> String {
    if columns == rows {
        format!("mat{}", columns as u32)
    } else {
        format!("mat{}x{}", columns as u32, rows as u32)
    }
}

/// Assemble the runtime stage record from a reflection document and the
/// backend's compiled payload.
pub fn runtime_stage_data(
    document: &ReflectionDocument,
    payload: Vec<u8>,
    fallback_payload: Option<Vec<u8>>,
) -> RuntimeStageData {
    RuntimeStageData {
        entry_point: document.entry_point.clone(),
        stage: document.stage,
        target_platform: document.target_platform,
        payload,
        fallback_payload,
        uniforms: document.uniforms.clone(),
    }
}
