//! Load a glTF scene, assemble every primitive against a lit program and draw
//! it on the dummy device, printing layouts and per-mesh statistics.
//!
//! ```text
//! cargo run --example inspect -- scene.gltf --backend explicit
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use graphics_layout::gltf::{import_materials, import_meshes};
use graphics_layout::shader::{ActiveVariable, CompiledProgram, DataType, ProgramId};
use graphics_layout::{
    BackendKind, BufferLayout, DummyDevice, GltfAsset, MappingSet, Material, RenderConfig,
    SemanticMap, VariableMapping, VariableRegistry,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
enum CliBackend {
    /// Resolve attribute locations once, re-bind on every draw.
    #[default]
    BindPerDraw,
    /// Create immutable pipeline objects up front.
    Explicit,
}

impl From<CliBackend> for BackendKind {
    fn from(backend: CliBackend) -> Self {
        match backend {
            CliBackend::BindPerDraw => BackendKind::BindPerDraw,
            CliBackend::Explicit => BackendKind::ExplicitPipeline,
        }
    }
}

/// Inspect vertex layouts and assembled meshes of a glTF scene.
#[derive(Debug, Parser)]
#[command(name = "inspect", version)]
struct Args {
    /// `.gltf` or `.glb` file
    path: PathBuf,

    /// Backend style to compile for
    #[arg(long, default_value = "bind-per-draw", value_enum)]
    backend: CliBackend,

    /// JSON render configuration; `--backend` overrides its backend
    #[arg(long)]
    config: Option<PathBuf>,

    /// Put normals and uvs in a second vertex slot
    #[arg(long)]
    split_slots: bool,

    /// Assemble on a single thread
    #[arg(long)]
    sequential: bool,
}

fn lit_registry(split_slots: bool) -> graphics_layout::Result<VariableRegistry> {
    let program = CompiledProgram::new(ProgramId(1), "inspect_lit")
        .with_variable(ActiveVariable::attribute("a_position", DataType::Vec3, 0))
        .with_variable(ActiveVariable::attribute("a_normal", DataType::Vec3, 1))
        .with_variable(ActiveVariable::attribute("a_uv0", DataType::Vec2, 2))
        .with_variable(ActiveVariable::uniform("u_mvp", DataType::Mat4, 0))
        .with_variable(ActiveVariable::uniform("base_color", DataType::Vec4, 1))
        .with_variable(ActiveVariable::uniform("u_albedo", DataType::Sampler2D, 2));
    let extra = if split_slots { 1 } else { 0 };
    let mappings = MappingSet::new(vec![
        VariableMapping::attribute("a_position", 0),
        VariableMapping::attribute("a_normal", extra),
        VariableMapping::attribute("a_uv0", extra),
        VariableMapping::uniform("u_mvp"),
        VariableMapping::uniform("base_color"),
        VariableMapping::uniform("u_albedo"),
    ])?;
    Ok(VariableRegistry::reflect(&program, &mappings)?)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => RenderConfig::from_json(&std::fs::read_to_string(path)?)?,
        None => RenderConfig::default(),
    };
    config.backend = args.backend.into();
    if args.sequential {
        config.parallel_assembly = false;
    }

    let asset = GltfAsset::open(&args.path)?;
    let registry = lit_registry(args.split_slots)?;
    let layout = Arc::new(BufferLayout::from_registry(&registry, &config.layout_options())?);

    println!("Layout {:?}", layout.id());
    for slot in layout.slots() {
        println!("  slot {} stride {}", slot.slot, slot.stride);
        for attr in &slot.attributes {
            println!(
                "    {:<12} {:>4} {:?} (location {})",
                attr.name, attr.offset, attr.data_type, attr.location
            );
        }
    }
    println!("  uniforms: {} bytes", layout.uniforms().size);

    let materials = import_materials(&asset.document, registry.program(), "u_albedo");
    let fallback = Arc::new(Material::new("default", registry.program()));
    let jobs = import_meshes(
        asset.resolver(),
        &SemanticMap::default(),
        &layout,
        &materials,
        &fallback,
    )?;
    let meshes = config.assembler().build_all(jobs)?;

    let device = DummyDevice::new();
    let compiler = config.compiler();
    for mesh in &meshes {
        let pipeline = compiler.compile(
            &device,
            &registry,
            &layout,
            mesh.material().fixed_function_state(),
        )?;
        let gpu = mesh.upload(&device)?;
        compiler.draw(&device, &pipeline, &gpu)?;
        gpu.release(&device);

        let index = mesh
            .element_buffer()
            .map(|e| format!("{:?} x{}", e.index_type, e.count))
            .unwrap_or_else(|| "none".to_string());
        let bounds = mesh
            .bounds()
            .map(|b| format!("{:?}", b.size()))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<24} {:>6} vertices  {:>6} primitives  index {:<12} size {}  material '{}'",
            mesh.name,
            mesh.vertex_count(),
            mesh.primitive_count(),
            index,
            bounds,
            mesh.material().name
        );
    }

    if let Some(scene) = asset.document.default_scene() {
        let instances = asset.document.world_transforms(scene)?;
        println!("Scene {scene}: {} mesh instances", instances.len());
    }
    println!(
        "{} draws, {} pipelines cached on {:?}",
        device.draws().len(),
        compiler.cached(),
        compiler.kind()
    );
    compiler.destroy_all(&device);
    Ok(())
}
