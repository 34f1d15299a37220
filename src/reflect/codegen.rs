//! Generated declaration/definition source artifacts.
//!
//! Both generators are pure functions of the reflection document: no call
//! ordering, no clock, no filesystem. Snapshot tests compare their output
//! byte-for-byte.

use super::types::{BaseType, ReflectionDocument, StructDefinition};

fn sanitize_ident(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for (i, c) in name.chars().enumerate() {
        if c.is_ascii_alphanumeric() || c == '_' {
            if i == 0 && c.is_ascii_digit() {
                out.push('_');
            }
            out.push(c);
        } else {
            out.push('_');
        }
    }
    if out.is_empty() {
        out.push('_');
    }
    out
}

fn member_field_type(base_type: BaseType, type_name: &str) -> String {
    match base_type {
        BaseType::Struct => sanitize_ident(type_name),
        _ => type_name.to_string(),
    }
}

fn generated_banner(shader_name: &str) -> String {
    format!(
        "// Generated reflection for shader '{shader_name}'.\n\
         // Do not edit: regenerate from the shader source.\n"
    )
}

/// Header-style declarations: one struct per reflected layout plus extern
/// binding-slot constants.
pub fn generate_declarations(document: &ReflectionDocument) -> String {
    let shader = sanitize_ident(&document.shader_name).to_uppercase();
    let guard = format!(
        "{shader}_{}_REFLECTION_H_",
        document.stage.keyword().to_uppercase()
    );

    let mut out = generated_banner(&document.shader_name);
    out.push_str(&format!("#ifndef {guard}\n#define {guard}\n\n"));
    out.push_str(&format!("// entry point: {}\n", document.entry_point));

    for definition in &document.structs {
        out.push('\n');
        out.push_str(&struct_declaration(definition));
    }

    if !document.resources.is_empty() {
        out.push('\n');
        for resource in &document.resources {
            out.push_str(&format!(
                "extern const unsigned {shader}_{}_BINDING;\n",
                sanitize_ident(&resource.name).to_uppercase()
            ));
        }
    }

    out.push_str(&format!("\n#endif  // {guard}\n"));
    out
}

fn struct_declaration(definition: &StructDefinition) -> String {
    let mut out = format!("// total size: {} bytes\n", definition.byte_length);
    out.push_str(&format!("struct {} {{\n", sanitize_ident(&definition.name)));
    for member in &definition.members {
        let field_type = member_field_type(member.base_type, &member.type_name);
        let field_name = sanitize_ident(&member.name);
        match member.array_elements {
            Some(count) => out.push_str(&format!(
                "  {field_type} {field_name}[{count}];  // offset {}, stride {}\n",
                member.offset,
                member.size + member.element_padding
            )),
            None => out.push_str(&format!(
                "  {field_type} {field_name};  // offset {}, size {}\n",
                member.offset, member.size
            )),
        }
    }
    out.push_str("};\n");
    out
}

/// Definition side of the declarations: binding-slot constant values and a
/// uniform metadata table.
pub fn generate_definitions(document: &ReflectionDocument) -> String {
    let shader = sanitize_ident(&document.shader_name).to_uppercase();
    let mut out = generated_banner(&document.shader_name);

    if !document.resources.is_empty() {
        out.push('\n');
        for resource in &document.resources {
            out.push_str(&format!(
                "const unsigned {shader}_{}_BINDING = {};\n",
                sanitize_ident(&resource.name).to_uppercase(),
                resource.binding
            ));
        }
    }

    out.push_str(&format!(
        "\n// uniforms: {} ({} stage, {} platform)\n",
        document.uniforms.len(),
        document.stage.keyword(),
        document.target_platform.keyword()
    ));
    for uniform in &document.uniforms {
        let array = uniform
            .array_elements
            .map(|n| format!("[{n}]"))
            .unwrap_or_default();
        out.push_str(&format!(
            "//   {}{array}: location {}, {:?} {}x{}, {} bits\n",
            uniform.name,
            uniform.location,
            uniform.base_type,
            uniform.columns,
            uniform.rows,
            uniform.bit_width
        ));
    }
    out
}

/// The reflection document as pretty-printed JSON.
pub fn reflection_json(document: &ReflectionDocument) -> crate::error::Result<String> {
    serde_json::to_string_pretty(document).map_err(|e| {
        crate::error::CompileError::Serialization(format!("reflection JSON encoding failed: {e}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{ShaderStage, TargetPlatform};
    use crate::reflect::types::{StructMember, UniformDescription};

    fn sample_document() -> ReflectionDocument {
        ReflectionDocument {
            shader_name: "glow".to_string(),
            entry_point: "glow_fragment_main".to_string(),
            stage: ShaderStage::Fragment,
            target_platform: TargetPlatform::MobileEs,
            uniforms: vec![UniformDescription {
                name: "radius".to_string(),
                location: 0,
                base_type: BaseType::Float,
                rows: 1,
                columns: 1,
                bit_width: 32,
                array_elements: Some(4),
            }],
            inputs: Vec::new(),
            resources: Vec::new(),
            structs: vec![StructDefinition {
                name: "GlowArgs".to_string(),
                byte_length: 64,
                members: vec![StructMember {
                    name: "radius".to_string(),
                    type_name: "float".to_string(),
                    base_type: BaseType::Float,
                    offset: 0,
                    size: 4,
                    byte_length: 64,
                    array_elements: Some(4),
                    element_padding: 12,
                }],
            }],
        }
    }

    #[test]
    fn declarations_snapshot() {
        let expected = "\
// Generated reflection for shader 'glow'.
// Do not edit: regenerate from the shader source.
#ifndef GLOW_FRAGMENT_REFLECTION_H_
#define GLOW_FRAGMENT_REFLECTION_H_

// entry point: glow_fragment_main

// total size: 64 bytes
struct GlowArgs {
  float radius[4];  // offset 0, stride 16
};

#endif  // GLOW_FRAGMENT_REFLECTION_H_
";
        assert_eq!(generate_declarations(&sample_document()), expected);
    }

    #[test]
    fn definitions_snapshot() {
        let expected = "\
// Generated reflection for shader 'glow'.
// Do not edit: regenerate from the shader source.

// uniforms: 1 (fragment stage, mobile_es platform)
//   radius[4]: location 0, Float 1x1, 32 bits
";
        assert_eq!(generate_definitions(&sample_document()), expected);
    }

    #[test]
    fn identifiers_are_sanitized() {
        assert_eq!(sanitize_ident("2d.blur-pass"), "_2d_blur_pass");
        assert_eq!(sanitize_ident(""), "_");
    }
}
