use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, ValueEnum};

use endless_terrain::export;
use endless_terrain::falloff;
use endless_terrain::{
    ChunkCoord, FalloffCache, NormalizeMode, Result, TerrainError, TerrainGenerator, TerrainSettings,
    TerrainStreamer,
};

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Mode {
    /// Bordered height field as greyscale PNG
    Noise,
    /// Terrain band colours as PNG
    Colour,
    /// Falloff mask as greyscale PNG
    Falloff,
    /// Chunk mesh as OBJ
    Mesh,
    /// Walk a viewer along +x and stream chunks around it
    Stream,
}

#[derive(Parser, Debug)]
#[command(name = "endless-terrain")]
#[command(about = "Generate and stream procedural terrain chunks")]
struct Args {
    /// Settings file (JSON). Defaults are used for anything missing
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Terrain seed (overrides the settings file)
    #[arg(short, long)]
    seed: Option<String>,

    /// Normalize mode: local or global
    #[arg(long)]
    normalize: Option<NormalizeMode>,

    /// Use flat-shaded meshes
    #[arg(long)]
    flat_shading: bool,

    /// Apply the falloff mask
    #[arg(long)]
    falloff: bool,

    /// What to generate
    #[arg(short, long, value_enum, default_value_t = Mode::Noise)]
    mode: Mode,

    /// Noise mode: write only the visible region, without the border band
    #[arg(long)]
    interior: bool,

    /// Chunk grid X coordinate
    #[arg(long, default_value = "0", allow_negative_numbers = true)]
    chunk_x: i32,

    /// Chunk grid Y coordinate
    #[arg(long, default_value = "0", allow_negative_numbers = true)]
    chunk_y: i32,

    /// LOD index for colour and mesh output
    #[arg(long, default_value = "0")]
    lod: usize,

    /// Output path (defaults depend on the mode)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Viewer steps in stream mode
    #[arg(long, default_value = "20")]
    steps: usize,

    /// Distance per viewer step in world units (default: half a chunk)
    #[arg(long)]
    step: Option<f32>,

    /// Write the effective settings as JSON and exit
    #[arg(long)]
    dump_config: Option<PathBuf>,
}

fn load_settings(args: &Args) -> Result<TerrainSettings> {
    let mut settings = match &args.config {
        Some(path) => {
            println!("Loading settings from {}", path.display());
            TerrainSettings::from_json_file(path)?
        }
        None => TerrainSettings::default(),
    };
    if let Some(seed) = &args.seed {
        settings.noise.seed = seed.clone();
    }
    if let Some(mode) = args.normalize {
        settings.noise.normalize_mode = mode;
    }
    if args.flat_shading {
        settings.height.flat_shading = true;
    }
    if args.falloff {
        settings.height.falloff.enabled = true;
    }
    Ok(settings.validated())
}

fn output_path(args: &Args, default: &str) -> PathBuf {
    args.output.clone().unwrap_or_else(|| PathBuf::from(default))
}

fn check_lod(settings: &TerrainSettings, lod: usize) -> Result<()> {
    if lod >= settings.lod.len() {
        return Err(TerrainError::InvalidSettings(format!(
            "LOD {} requested but the table has {} levels",
            lod,
            settings.lod.len()
        )));
    }
    Ok(())
}

fn run(args: Args) -> Result<()> {
    let settings = load_settings(&args)?;
    settings.validate()?;

    if let Some(path) = &args.dump_config {
        std::fs::write(path, settings.to_json_pretty()?)?;
        println!("Settings written to {}", path.display());
        return Ok(());
    }

    let metrics = settings.metrics();
    println!("Seed: {} ({} normalize)", settings.noise.seed, settings.noise.normalize_mode);
    println!(
        "Chunk size: {} units, height field {}x{} (border {})",
        metrics.chunk_size, metrics.field_size, metrics.field_size, metrics.border
    );

    let coord = ChunkCoord::new(args.chunk_x, args.chunk_y);
    let center = coord.center(metrics.chunk_size);

    match args.mode {
        Mode::Falloff => {
            let shape = settings.height.falloff;
            let mask = falloff::generate(metrics.field_size, shape.transition, shape.deadzone);
            let path = output_path(&args, "falloff.png");
            export::export_falloff(&mask, &path)?;
            println!("Falloff mask saved to: {}", path.display());
        }
        Mode::Noise => {
            let generator = TerrainGenerator::new(&settings, &mut FalloffCache::new())?;
            println!("Generating height field for chunk ({}, {})...", coord.x, coord.y);
            let data = generator.map_data(center, 0);
            let (lo, hi) = data.height_field.min_max();
            println!("Height range: {:.3} to {:.3}", lo, hi);
            let path = output_path(&args, "heightmap.png");
            if args.interior {
                export::export_height_interior(&data.height_field, &path)?;
            } else {
                export::export_height_field(&data.height_field, &path)?;
            }
            println!("Height field saved to: {}", path.display());
        }
        Mode::Colour => {
            check_lod(&settings, args.lod)?;
            let generator = TerrainGenerator::new(&settings, &mut FalloffCache::new())?;
            println!("Classifying chunk ({}, {}) at LOD {}...", coord.x, coord.y, args.lod);
            let data = generator.map_data(center, args.lod);
            let unassigned = data.colors.unassigned_count();
            if unassigned > 0 {
                println!("  {} cells below the lowest band", unassigned);
            }
            let path = output_path(&args, "colourmap.png");
            export::export_color_map(&data.colors, &path)?;
            println!("Colour map saved to: {}", path.display());
        }
        Mode::Mesh => {
            check_lod(&settings, args.lod)?;
            let generator = TerrainGenerator::new(&settings, &mut FalloffCache::new())?;
            println!("Building mesh for chunk ({}, {}) at LOD {}...", coord.x, coord.y, args.lod);
            let data = generator.map_data(center, 0);
            let mesh = generator.mesh(&data.height_field, args.lod)?;
            println!(
                "  {} vertices, {} triangles{}",
                mesh.vertex_count(),
                mesh.triangle_count(),
                if mesh.flat_shaded { " (flat shaded)" } else { "" }
            );
            let path = output_path(&args, "chunk.obj");
            export::export_obj(&mesh, &path)?;
            println!("Mesh saved to: {}", path.display());
        }
        Mode::Stream => stream(&settings, &args)?,
    }
    Ok(())
}

fn stream(settings: &TerrainSettings, args: &Args) -> Result<()> {
    let generator = Arc::new(TerrainGenerator::new(settings, &mut FalloffCache::new())?);
    let scale = settings.height.terrain_scale;
    let step = args
        .step
        .unwrap_or(generator.metrics().chunk_size as f32 * scale / 2.0);
    let mut streamer = TerrainStreamer::with_generator(generator)?;

    println!("Streaming {} steps of {:.1} units...", args.steps, step);
    for i in 0..args.steps {
        streamer.set_viewer_position((i as f32 * step, 0.0));
        let report = streamer.tick();
        println!(
            "  step {:>3}: {}{} height fields, {} meshes delivered, {} requests, {} chunks tracked",
            i,
            if report.recomputed { "recomputed, " } else { "" },
            report.height_fields_delivered,
            report.meshes_delivered,
            report.requests_issued,
            streamer.tracked_count()
        );
        if !streamer.scheduler().wait_for_workers(Duration::from_secs(30)) {
            return Err(TerrainError::Runtime(format!("workers did not finish step {}", i)));
        }
    }

    // Deliver what is still outstanding.
    while !streamer.is_idle() {
        if !streamer.scheduler().wait_for_workers(Duration::from_secs(30)) {
            return Err(TerrainError::Runtime("workers did not finish".into()));
        }
        streamer.tick();
    }

    let visible = streamer.visible_chunks().count();
    let meshes: usize = streamer.chunks().map(|c| c.cached_lods().count()).sum();
    println!(
        "Done: {} chunks tracked, {} visible, {} cached meshes",
        streamer.tracked_count(),
        visible,
        meshes
    );
    log::info!("{} generation requests issued", streamer.scheduler().issued());
    Ok(())
}

fn main() {
    env_logger::init();
    let args = Args::parse();
    if let Err(e) = run(args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
