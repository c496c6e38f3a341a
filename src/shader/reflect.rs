//! WGSL program reflection through naga.
//!
//! Produces the active-variable list a GL-style driver would report:
//! vertex entry point inputs become attributes, members of uniform blocks
//! become uniforms and sampled textures become samplers.

use naga::{AddressSpace, ArraySize, Binding, Module, ScalarKind, ShaderStage, TypeInner};

use crate::error::PipelineError;

use super::variable::{ActiveVariable, CompiledProgram, DataType, ProgramId, VariableRole};

/// Parse and validate `source`, then reflect the inputs of `vertex_entry`.
pub fn reflect_wgsl(
    id: ProgramId,
    name: &str,
    source: &str,
    vertex_entry: &str,
) -> Result<CompiledProgram, PipelineError> {
    let compilation = |diagnostic: String| PipelineError::Compilation {
        program: name.to_string(),
        diagnostic,
    };

    let module =
        naga::front::wgsl::parse_str(source).map_err(|e| compilation(e.emit_to_string(source)))?;

    let mut validator = naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    );
    validator
        .validate(&module)
        .map_err(|e| compilation(format!("Validation error: {e}")))?;

    let entry = module
        .entry_points
        .iter()
        .find(|ep| ep.name == vertex_entry && ep.stage == ShaderStage::Vertex)
        .ok_or_else(|| compilation(format!("Vertex entry point '{vertex_entry}' not found")))?;

    let mut program = CompiledProgram::new(id, name);

    for arg in &entry.function.arguments {
        match (&arg.binding, &module.types[arg.ty].inner) {
            (Some(Binding::Location { location, .. }), _) => {
                let arg_name = arg.name.clone().unwrap_or_default();
                program.active.push(attribute(&module, &arg_name, arg.ty, *location, name)?);
            }
            (None, TypeInner::Struct { members, .. }) => {
                for member in members {
                    if let Some(Binding::Location { location, .. }) = member.binding {
                        let member_name = member.name.clone().unwrap_or_default();
                        program
                            .active
                            .push(attribute(&module, &member_name, member.ty, location, name)?);
                    }
                }
            }
            _ => {}
        }
    }

    for (_, global) in module.global_variables.iter() {
        let binding = global.binding.as_ref().map_or(0, |b| b.binding);
        match global.space {
            AddressSpace::Uniform => match &module.types[global.ty].inner {
                TypeInner::Struct { members, .. } => {
                    for member in members {
                        let member_name = member.name.clone().unwrap_or_default();
                        let (data_type, array_size) = data_type(&module, member.ty)
                            .ok_or_else(|| unsupported(name, &member_name))?;
                        program.active.push(
                            ActiveVariable::uniform(member_name, data_type, binding)
                                .with_array_size(array_size),
                        );
                    }
                }
                _ => {
                    let global_name = global.name.clone().unwrap_or_default();
                    let (data_type, array_size) = data_type(&module, global.ty)
                        .ok_or_else(|| unsupported(name, &global_name))?;
                    program.active.push(
                        ActiveVariable::uniform(global_name, data_type, binding)
                            .with_array_size(array_size),
                    );
                }
            },
            AddressSpace::Handle => {
                if let TypeInner::Image { .. } = module.types[global.ty].inner {
                    program.active.push(ActiveVariable {
                        name: global.name.clone().unwrap_or_default(),
                        role: VariableRole::Uniform,
                        data_type: DataType::Sampler2D,
                        array_size: 1,
                        location: binding,
                    });
                }
            }
            _ => {}
        }
    }

    log::debug!(
        "Reflected WGSL program '{}' ({} active variables)",
        name,
        program.active.len()
    );

    Ok(program)
}

fn attribute(
    module: &Module,
    name: &str,
    ty: naga::Handle<naga::Type>,
    location: u32,
    program: &str,
) -> Result<ActiveVariable, PipelineError> {
    let (data_type, _) = data_type(module, ty).ok_or_else(|| unsupported(program, name))?;
    Ok(ActiveVariable::attribute(name, data_type, location))
}

fn unsupported(program: &str, name: &str) -> PipelineError {
    PipelineError::Compilation {
        program: program.to_string(),
        diagnostic: format!("Variable '{name}' has a type with no buffer representation"),
    }
}

/// Map a naga type to a data type and array length.
fn data_type(module: &Module, ty: naga::Handle<naga::Type>) -> Option<(DataType, usize)> {
    match &module.types[ty].inner {
        TypeInner::Scalar(scalar) => scalar_vector(scalar.kind, 1).map(|t| (t, 1)),
        TypeInner::Vector { size, scalar } => {
            scalar_vector(scalar.kind, *size as usize).map(|t| (t, 1))
        }
        TypeInner::Matrix {
            columns,
            rows,
            scalar,
        } if scalar.kind == ScalarKind::Float && columns == rows => {
            let matrix = match *columns as usize {
                2 => DataType::Mat2,
                3 => DataType::Mat3,
                _ => DataType::Mat4,
            };
            Some((matrix, 1))
        }
        TypeInner::Array {
            base,
            size: ArraySize::Constant(len),
            ..
        } => {
            let (element, inner) = data_type(module, *base)?;
            Some((element, inner * len.get() as usize))
        }
        _ => None,
    }
}

fn scalar_vector(kind: ScalarKind, components: usize) -> Option<DataType> {
    match kind {
        ScalarKind::Float => DataType::float_vector(components),
        ScalarKind::Sint | ScalarKind::Uint => DataType::int_vector(components),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEXTURED: &str = r#"
struct Camera {
    mvp: mat4x4<f32>,
    tint: vec4<f32>,
};

@group(0) @binding(0) var<uniform> camera: Camera;
@group(0) @binding(1) var albedo: texture_2d<f32>;
@group(0) @binding(2) var albedo_sampler: sampler;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) uv: vec2<f32>,
};

struct VertexOutput {
    @builtin(position) clip: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@vertex
fn vs_main(input: VertexInput, @builtin(vertex_index) index: u32) -> VertexOutput {
    var out: VertexOutput;
    out.clip = camera.mvp * vec4<f32>(input.position, 1.0);
    out.uv = input.uv;
    return out;
}
"#;

    #[test]
    fn test_reflect_vertex_inputs_and_uniforms() {
        let program = reflect_wgsl(ProgramId(7), "textured", TEXTURED, "vs_main").unwrap();
        let find = |name: &str| program.active.iter().find(|v| v.name == name).unwrap();

        let position = find("position");
        assert_eq!(position.role, VariableRole::Attribute);
        assert_eq!(position.data_type, DataType::Vec3);
        assert_eq!(position.location, 0);
        assert_eq!(find("uv").data_type, DataType::Vec2);

        assert_eq!(find("mvp").data_type, DataType::Mat4);
        assert_eq!(find("tint").role, VariableRole::Uniform);
        assert_eq!(find("albedo").data_type, DataType::Sampler2D);
        assert_eq!(find("albedo").location, 1);

        assert!(program.active.iter().all(|v| v.name != "index"));
        assert!(program.active.iter().all(|v| v.name != "albedo_sampler"));
    }

    #[test]
    fn test_parse_error_keeps_diagnostic() {
        let err = reflect_wgsl(ProgramId(8), "broken", "fn vs_main( {", "vs_main").unwrap_err();
        match err {
            PipelineError::Compilation { program, diagnostic } => {
                assert_eq!(program, "broken");
                assert!(!diagnostic.is_empty());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_entry_point() {
        let err = reflect_wgsl(ProgramId(9), "textured", TEXTURED, "main").unwrap_err();
        assert!(err.to_string().contains("'main' not found"));
    }
}
