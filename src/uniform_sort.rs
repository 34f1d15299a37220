//! Deterministic ordering of uniform declarations.
//!
//! User-facing uniform-set APIs index uniforms by this order, so it must not
//! depend on the backend's internal, usage-driven variable ordering:
//! explicitly bound variables come first (ascending by group, then binding),
//! then unbound variables in declaration order.

use naga::{AddressSpace, GlobalVariable, Handle, Module, TypeInner};

/// Coarse classification used to split binding spaces: buffer-backed data
/// uniforms versus opaque sampled-image uniforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniformClass {
    Data,
    SampledImage,
}

/// Classify a module-scope variable, or `None` when it is not a uniform at
/// all (inputs, outputs, private globals, push constants).
pub fn classify(module: &Module, var: &GlobalVariable) -> Option<UniformClass> {
    match var.space {
        AddressSpace::Uniform => Some(UniformClass::Data),
        AddressSpace::Handle => match module.types[var.ty].inner {
            TypeInner::Image { .. } | TypeInner::Sampler { .. } => {
                Some(UniformClass::SampledImage)
            }
            _ => None,
        },
        _ => None,
    }
}

/// Select every module-scope uniform variable, optionally filtered to one
/// class, ordered by the policy above.
pub fn sorted_uniforms(
    module: &Module,
    filter: Option<UniformClass>,
) -> Vec<Handle<GlobalVariable>> {
    let mut bound: Vec<(u32, u32, Handle<GlobalVariable>)> = Vec::new();
    let mut unbound: Vec<Handle<GlobalVariable>> = Vec::new();

    // Arena iteration order is declaration order.
    for (handle, var) in module.global_variables.iter() {
        let Some(class) = classify(module, var) else {
            continue;
        };
        if filter.is_some_and(|wanted| wanted != class) {
            continue;
        }
        match &var.binding {
            Some(binding) => bound.push((binding.group, binding.binding, handle)),
            None => unbound.push(handle),
        }
    }

    // Stable sort keeps declaration order for duplicate (group, binding)
    // pairs, which only occur when the front-end left bindings implicit.
    bound.sort_by_key(|&(group, binding, _)| (group, binding));

    bound
        .into_iter()
        .map(|(_, _, handle)| handle)
        .chain(unbound)
        .collect()
}
