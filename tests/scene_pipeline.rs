//! End-to-end: glTF scene to assembled meshes to draws on the dummy device.

mod common;

use std::sync::Arc;

use serde_json::json;

use graphics_layout::error::{ConsistencyError, FormatError, LayoutError, PipelineError};
use graphics_layout::gltf::{import_materials, import_meshes, NoExternalBuffers};
use graphics_layout::resources::builders;
use graphics_layout::resources::{AttributeSource, DrawMode, IndexSource, VertexSource};
use graphics_layout::shader::{ActiveVariable, CompiledProgram, DataType, ProgramId};
use graphics_layout::{
    compiler_for, BackendKind, BufferLayout, DummyDevice, Error, FixedFunctionState, GltfAsset,
    LayoutOptions, MappingSet, Material, MeshAssembler, RenderConfig, SemanticMap,
    VariableMapping, VariableRegistry,
};

use common::*;

/// Cube with interleaved position/normal/uv in one strided view.
fn cube_scene() -> Vec<u8> {
    let (vertices, indices) = builders::cube(1.0);
    let indices: Vec<u16> = indices.iter().map(|&i| i as u16).collect();

    let mut scene = SceneBuilder::new();
    let view = scene.view(bytemuck::cast_slice(&vertices), Some(32), VERTEX_TARGET);
    let position = scene.accessor(view, 0, FLOAT, "VEC3", 24);
    let normal = scene.accessor(view, 12, FLOAT, "VEC3", 24);
    let uv = scene.accessor(view, 24, FLOAT, "VEC2", 24);
    let index = scene.u16_indices(&indices);
    let material = scene.material(json!({
        "name": "glass",
        "pbrMetallicRoughness": { "baseColorFactor": [0.2, 0.4, 0.8, 0.5] },
        "alphaMode": "BLEND"
    }));
    let mesh = scene.mesh(
        "cube",
        json!({ "POSITION": position, "NORMAL": normal, "TEXCOORD_0": uv }),
        Some(index),
        Some(material),
    );
    scene.node(json!({ "mesh": mesh, "translation": [0.0, 2.0, 0.0] }));
    scene.build()
}

#[test]
fn test_lit_layout() {
    let registry = lit_registry();
    let layout = BufferLayout::from_registry(&registry, &LayoutOptions::new()).unwrap();

    let slot = layout.slot(0).unwrap();
    assert_eq!(slot.stride, 32);
    let offsets: Vec<_> = slot.attributes.iter().map(|a| (a.name.as_str(), a.offset)).collect();
    assert_eq!(offsets, [("a_position", 0), ("a_normal", 12), ("a_uv0", 24)]);

    let uniforms = layout.uniforms();
    assert_eq!(uniforms.entry("u_mvp").unwrap().offset, 0);
    assert_eq!(uniforms.entry("base_color").unwrap().offset, 64);
    assert_eq!(uniforms.size, 80);
    assert_eq!(uniforms.sampler_unit("u_albedo"), Some(0));
    layout.validate().unwrap();
}

#[test]
fn test_scene_to_draws() {
    init_logging();
    let config = RenderConfig::default();
    let asset = GltfAsset::from_slice(&cube_scene(), &NoExternalBuffers).unwrap();
    let registry = lit_registry();
    let layout = Arc::new(BufferLayout::from_registry(&registry, &config.layout_options()).unwrap());

    let materials = import_materials(&asset.document, registry.program(), "u_albedo");
    let fallback = Arc::new(Material::new("default", registry.program()));
    let jobs = import_meshes(
        asset.resolver(),
        &SemanticMap::default(),
        &layout,
        &materials,
        &fallback,
    )
    .unwrap();
    let meshes = config.assembler().build_all(jobs).unwrap();
    assert_eq!(meshes.len(), 1);

    let mesh = &meshes[0];
    assert_eq!(mesh.name, "cube");
    assert_eq!(mesh.vertex_count(), 24);
    assert_eq!(mesh.index_count(), 36);
    assert_eq!(mesh.primitive_count(), 12);
    let bounds = mesh.bounds().unwrap();
    assert_eq!(bounds.size(), glam::Vec3::splat(1.0));

    // Re-interleaved bytes match the source exactly: same stride and offsets.
    let (vertices, _) = builders::cube(1.0);
    assert_eq!(mesh.vertex_buffer(0).unwrap().data, bytemuck::cast_slice::<f32, u8>(&vertices));

    let instances = asset.document.world_transforms(0).unwrap();
    assert_eq!(instances[0].world.w_axis.y, 2.0);

    let device = DummyDevice::new();
    let state = mesh.material().fixed_function_state();
    assert!(!state.depth_write);

    for kind in [BackendKind::BindPerDraw, BackendKind::ExplicitPipeline] {
        let compiler = compiler_for(kind);
        let pipeline = compiler.compile(&device, &registry, &layout, state).unwrap();

        let mut uniforms = pipeline.uniforms().allocate();
        assert_eq!(mesh.material().apply_uniforms(pipeline.uniforms(), &mut uniforms), 1);
        assert_eq!(&uniforms[16..20], &[0.2, 0.4, 0.8, 0.5]);

        let gpu = mesh.upload(&device).unwrap();
        compiler.draw(&device, &pipeline, &gpu).unwrap();
        gpu.release(&device);
        compiler.destroy_all(&device);
    }

    let draws = device.draws();
    assert_eq!(draws.len(), 2);
    assert!(draws[0].pipeline.is_none());
    assert_eq!(draws[0].attributes.len(), 3);
    assert!(draws[1].pipeline.is_some());
    assert!(draws[1].attributes.is_empty());
    for call in &draws {
        assert_eq!(call.count, 36);
        assert_eq!(call.mode, DrawMode::Triangles);
        assert_eq!(call.index.unwrap().index_type, graphics_layout::IndexType::U16);
    }
    assert_eq!(device.live_buffers(), 0);
    assert_eq!(device.live_pipelines(), 0);
}

#[test]
fn test_accessor_element_bounds() {
    let positions: Vec<f32> = (0..72).map(|i| i as f32).collect();
    let mut scene = SceneBuilder::new();
    let accessor = scene.floats(&positions, "VEC3", 3);
    let asset = GltfAsset::from_slice(&scene.build(), &NoExternalBuffers).unwrap();

    let view = asset.resolver().resolve(accessor).unwrap();
    assert_eq!(view.count(), 24);
    assert_eq!(view.vectors::<3>().unwrap().count(), 24);
    assert_eq!(view.get::<3>(23).unwrap(), [69.0, 70.0, 71.0]);
    assert!(matches!(
        view.get::<3>(24),
        Err(FormatError::MalformedAccessor { accessor: 0, .. })
    ));
}

#[test]
fn test_accessor_exceeding_view_fails_on_resolve() {
    let mut scene = SceneBuilder::new();
    scene.view(&[0; 288], None, VERTEX_TARGET);
    let view = scene.raw_view(0, 280);
    let accessor = scene.accessor(view, 0, FLOAT, "VEC3", 24);
    let asset = GltfAsset::from_slice(&scene.build(), &NoExternalBuffers).unwrap();

    assert!(matches!(
        asset.resolver().resolve(accessor),
        Err(FormatError::MalformedAccessor { .. })
    ));
}

#[test]
fn test_index_out_of_range_is_lazy() {
    let mut scene = SceneBuilder::new();
    let position = scene.floats(&[0.0; 9], "VEC3", 3);
    let indices = scene.u16_indices(&[0, 1, 2, 0, 2, 3]);
    let asset = GltfAsset::from_slice(&scene.build(), &NoExternalBuffers).unwrap();
    let resolver = asset.resolver();

    // Construction succeeds; the bad value is found while decoding.
    let view = resolver.resolve(indices).unwrap();
    let decoded: Vec<_> = view.indices(3).unwrap().collect();
    let valid: Vec<u32> = decoded[..5].iter().map(|r| r.clone().unwrap()).collect();
    assert_eq!(valid, [0, 1, 2, 0, 2]);
    assert!(decoded[5].is_err());

    let layout = BufferLayout::from_registry(&lit_registry(), &LayoutOptions::new()).unwrap();
    let vertices = VertexSource::new()
        .with_position("a_position", AttributeSource::Accessor(resolver.resolve(position).unwrap()));
    let err = MeshAssembler::new()
        .build(
            &layout,
            &vertices,
            Some(IndexSource::Accessor(view)),
            Arc::new(Material::new("m", ProgramId(1))),
            DrawMode::Triangles,
        )
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Consistency(ConsistencyError::IndexOutOfRange {
            accessor: Some(1),
            position: 5,
            index: 3,
            vertex_count: 3,
        })
    ));
}

#[test]
fn test_vertex_count_mismatch_between_accessors() {
    let mut scene = SceneBuilder::new();
    let position = scene.floats(&[0.0; 36 * 3], "VEC3", 3);
    let normal = scene.floats(&[0.0; 24 * 3], "VEC3", 3);
    let asset = GltfAsset::from_slice(&scene.build(), &NoExternalBuffers).unwrap();
    let resolver = asset.resolver();

    let layout = BufferLayout::from_registry(&lit_registry(), &LayoutOptions::new()).unwrap();
    let vertices = VertexSource::new()
        .with("a_position", AttributeSource::Accessor(resolver.resolve(position).unwrap()))
        .with("a_normal", AttributeSource::Accessor(resolver.resolve(normal).unwrap()));
    let err = MeshAssembler::new()
        .build(
            &layout,
            &vertices,
            None,
            Arc::new(Material::new("m", ProgramId(1))),
            DrawMode::Triangles,
        )
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Consistency(ConsistencyError::VertexCountMismatch {
            slot: 0,
            expected: 36,
            found: 24,
            ..
        })
    ));
}

#[test]
fn test_float_round_trip_is_bit_exact() {
    let registry = lit_registry();
    let layout = BufferLayout::from_registry(&registry, &LayoutOptions::new().with_extra_stride(0, 4))
        .unwrap();
    let positions = [0.1, -3.75e-12, f32::MAX, 1e-40, -0.0, 7.0, f32::MIN_POSITIVE, 2.5, -1.0];
    let uvs = [0.333_333_34, 1.0 / 3.0, -2.0, 65504.0, 1e30, -1e-30];

    let vertices = VertexSource::new()
        .with("a_position", AttributeSource::floats(&positions, 3))
        .with("a_uv0", AttributeSource::floats(&uvs, 2));
    let mesh = MeshAssembler::new()
        .build(
            &layout,
            &vertices,
            None,
            Arc::new(Material::new("m", ProgramId(1))),
            DrawMode::Points,
        )
        .unwrap();
    let data = &mesh.vertex_buffer(0).unwrap().data;
    assert_eq!(data.len(), 3 * 36);

    for v in 0..3 {
        let p = layout.read_floats(data, "a_position", v).unwrap();
        let uv = layout.read_floats(data, "a_uv0", v).unwrap();
        for (got, want) in p.iter().zip(&positions[v * 3..v * 3 + 3]) {
            assert_eq!(got.to_bits(), want.to_bits());
        }
        for (got, want) in uv.iter().zip(&uvs[v * 2..v * 2 + 2]) {
            assert_eq!(got.to_bits(), want.to_bits());
        }
        // No normal source: zero-filled.
        assert_eq!(layout.read_floats(data, "a_normal", v).unwrap(), vec![0.0; 3]);
    }
}

#[test]
fn test_mapping_errors() {
    let program = lit_program().with_variable(ActiveVariable::attribute("a_tangent", DataType::Vec4, 3));
    let mappings = MappingSet::new(lit_mappings()).unwrap();
    assert_eq!(
        VariableRegistry::reflect(&program, &mappings).unwrap_err(),
        LayoutError::UnmappedVariable {
            program: "lit".into(),
            name: "a_tangent".into(),
        }
    );

    let mut duplicated = lit_mappings();
    duplicated.push(VariableMapping::attribute("a_normal", 1));
    assert_eq!(
        MappingSet::new(duplicated).unwrap_err(),
        LayoutError::DuplicateMapping {
            name: "a_normal".into()
        }
    );
}

#[test]
fn test_missing_slot_fails_before_any_draw() {
    let device = DummyDevice::new();
    let program = CompiledProgram::new(ProgramId(5), "two-slot")
        .with_variable(ActiveVariable::attribute("a_position", DataType::Vec3, 0))
        .with_variable(ActiveVariable::attribute("a_color", DataType::Vec4, 1));
    let mappings = MappingSet::new(vec![
        VariableMapping::attribute("a_position", 0),
        VariableMapping::attribute("a_color", 1),
    ])
    .unwrap();
    let registry = VariableRegistry::reflect(&program, &mappings).unwrap();

    // A layout built for a program that only reads slot 0.
    let single = CompiledProgram::new(ProgramId(6), "one-slot")
        .with_variable(ActiveVariable::attribute("a_position", DataType::Vec3, 0));
    let single = VariableRegistry::reflect(&single, &mappings).unwrap();
    let layout = BufferLayout::from_registry(&single, &LayoutOptions::new()).unwrap();

    for kind in [BackendKind::BindPerDraw, BackendKind::ExplicitPipeline] {
        let compiler = compiler_for(kind);
        let err = compiler
            .compile(&device, &registry, &layout, FixedFunctionState::default())
            .unwrap_err();
        match err {
            PipelineError::Compilation { program, diagnostic } => {
                assert_eq!(program, "two-slot");
                assert!(diagnostic.contains("a_color"), "{diagnostic}");
            }
            other => panic!("expected compilation error, got {other}"),
        }
        assert_eq!(compiler.cached(), 0);
    }
    assert_eq!(device.pipelines_created(), 0);
    assert!(device.draws().is_empty());
}

#[test]
fn test_explicit_pipeline_destroyed_once() {
    let device = DummyDevice::new();
    let registry = lit_registry();
    let layout = BufferLayout::from_registry(&registry, &LayoutOptions::new()).unwrap();
    let compiler = compiler_for(BackendKind::ExplicitPipeline);

    let pipeline = compiler
        .compile(&device, &registry, &layout, FixedFunctionState::default())
        .unwrap();
    compiler.destroy(&device, &pipeline);
    compiler.destroy(&device, &pipeline);
    compiler.destroy_all(&device);

    assert_eq!(device.pipelines_created(), 1);
    assert_eq!(device.pipelines_destroyed(), 1);
    assert_eq!(device.invalid_destroys(), 0);
}
