//! Native shading-language backend (MSL, desktop and mobile dialects).
//!
//! MSL has a single flat binding namespace per resource kind, so fragment
//! shaders get an explicit remap: data uniforms take ascending buffer slots
//! and sampled images take ascending texture/sampler slot pairs, both in
//! sorted uniform order starting at slot 0.

use std::collections::HashMap;

use naga::back::msl;
use naga::{GlobalVariable, Handle, ResourceBinding};

use crate::error::{CompileError, Result};
use crate::frontend::{ParsedIr, naga_stage};
use crate::options::{ShaderStage, SourceOptions, TargetPlatform};
use crate::uniform_sort::{UniformClass, sorted_uniforms};

use super::TargetOutput;

#[derive(Debug)]
pub struct MslBackend {
    platform: TargetPlatform,
    stage: naga::ShaderStage,
    lang_version: (u8, u8),
    zero_initialize: bool,
    assigned_slots: HashMap<Handle<GlobalVariable>, u32>,
    bind_targets: Vec<(ResourceBinding, msl::BindTarget)>,
}

impl MslBackend {
    pub fn new(ir: &ParsedIr, options: &SourceOptions) -> Result<Self> {
        let stage = naga_stage(options.stage)?;
        let lang_version = match options.target_platform {
            TargetPlatform::MobileNative => (2, 0),
            _ => (2, 1),
        };

        let mut backend = Self {
            platform: options.target_platform,
            stage,
            lang_version,
            zero_initialize: true,
            assigned_slots: HashMap::new(),
            bind_targets: Vec::new(),
        };
        if options.stage == ShaderStage::Fragment {
            backend.compute_fragment_remap(ir)?;
        }
        Ok(backend)
    }

    /// Two passes over the sorted uniforms: buffers first, then
    /// texture/sampler pairs, each slot space starting at 0. MSL binding
    /// slots are 8-bit; overflowing either slot space fails the remap.
    fn compute_fragment_remap(&mut self, ir: &ParsedIr) -> Result<()> {
        for (slot, handle) in sorted_uniforms(&ir.module, Some(UniformClass::Data))
            .into_iter()
            .enumerate()
        {
            self.assigned_slots.insert(handle, slot as u32);
            if let Some(binding) = ir.module.global_variables[handle].binding.clone() {
                let mut target = msl::BindTarget::default();
                target.buffer = Some(narrow_slot(slot, "buffer")?);
                self.bind_targets.push((binding, target));
            }
        }
        for (slot, handle) in sorted_uniforms(&ir.module, Some(UniformClass::SampledImage))
            .into_iter()
            .enumerate()
        {
            self.assigned_slots.insert(handle, slot as u32);
            if let Some(binding) = ir.module.global_variables[handle].binding.clone() {
                let mut target = msl::BindTarget::default();
                let texture_slot = narrow_slot(slot, "texture")?;
                target.texture = Some(texture_slot);
                target.sampler = Some(msl::BindSamplerTarget::Resource(texture_slot));
                self.bind_targets.push((binding, target));
            }
        }
        Ok(())
    }

    pub fn target_platform(&self) -> TargetPlatform {
        self.platform
    }

    pub fn assigned_slot(&self, var: Handle<GlobalVariable>) -> Option<u32> {
        self.assigned_slots.get(&var).copied()
    }

    pub fn emit(&self, ir: &ParsedIr) -> Result<TargetOutput> {
        let mut options = msl::Options::default();
        options.lang_version = self.lang_version;
        options.fake_missing_bindings = true;
        options.zero_initialize_workgroup_memory = self.zero_initialize;

        if !self.bind_targets.is_empty() {
            let mut resources = msl::EntryPointResources::default();
            for (binding, target) in &self.bind_targets {
                resources.resources.insert(binding.clone(), target.clone());
            }
            for entry_point in &ir.module.entry_points {
                options
                    .per_entry_point_map
                    .insert(entry_point.name.clone(), resources.clone());
            }
        }

        let pipeline_options = msl::PipelineOptions::default();
        let (text, translation) =
            msl::write_string(&ir.module, &ir.info, &options, &pipeline_options)
                .map_err(|e| CompileError::CrossCompilation(format!("MSL emission failed: {e}")))?;

        // The writer mangles entry symbols that collide with MSL keywords;
        // report the symbol it actually chose.
        let emitted_entry_point = match ir
            .module
            .entry_points
            .iter()
            .zip(&translation.entry_point_names)
            .find(|(ep, _)| ep.stage == self.stage)
        {
            Some((_, Ok(name))) => name.clone(),
            Some((_, Err(e))) => {
                return Err(CompileError::CrossCompilation(format!(
                    "MSL entry point rejected: {e}"
                )));
            }
            None => "main".to_string(),
        };

        Ok(TargetOutput {
            text,
            emitted_entry_point,
        })
    }
}

fn narrow_slot(slot: usize, space: &str) -> Result<u8> {
    u8::try_from(slot).map_err(|_| {
        CompileError::CrossCompilation(format!(
            "{space} slot {slot} exceeds the MSL binding slot limit of {}",
            u8::MAX
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ir_with_uniform_count(count: u32) -> ParsedIr {
        let mut module = naga::Module::default();
        let ty = module.types.insert(
            naga::Type {
                name: None,
                inner: naga::TypeInner::Scalar(naga::Scalar::F32),
            },
            naga::Span::UNDEFINED,
        );
        for i in 0..count {
            module.global_variables.append(
                naga::GlobalVariable {
                    name: Some(format!("u{i}")),
                    space: naga::AddressSpace::Uniform,
                    binding: Some(naga::ResourceBinding {
                        group: 0,
                        binding: i,
                    }),
                    ty,
                    init: None,
                },
                naga::Span::UNDEFINED,
            );
        }
        let info = naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::all(),
        )
        .validate(&module)
        .unwrap();
        ParsedIr { module, info }
    }

    #[test]
    fn fragment_remap_rejects_slot_overflow() {
        let options = SourceOptions {
            stage: ShaderStage::Fragment,
            target_platform: TargetPlatform::DesktopNative,
            ..SourceOptions::default()
        };
        assert!(MslBackend::new(&ir_with_uniform_count(8), &options).is_ok());

        let err = MslBackend::new(&ir_with_uniform_count(300), &options).unwrap_err();
        assert!(err.to_string().contains("slot limit"), "{err}");
    }
}
