//! Terrasphere CLI - procedural cube-sphere terrain generator.
//!
//! Runs the terrain pipeline for a configuration and exports the
//! generated fields and mesh for inspection.

use std::path::PathBuf;
use std::time::Instant;

use clap::{Parser, Subcommand, ValueEnum};

use terrasphere::config::{KernelBackend, TerrainConfig};
use terrasphere::export::{export_assets, ExportOptions};
use terrasphere::geometry::Vertex;
use terrasphere::pipeline::TerrainPipeline;

/// Procedural cube-sphere terrain generator.
#[derive(Parser)]
#[command(name = "terrasphere")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Overrides applied on top of the configuration file.
#[derive(clap::Args)]
struct ConfigArgs {
    /// JSON configuration file; omitted fields take their defaults.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Grid cells per cube face edge.
    #[arg(long)]
    subdiv: Option<u32>,

    /// Texels per cubemap face edge.
    #[arg(long)]
    tile_size: Option<u32>,

    /// Planet radius in world units.
    #[arg(long)]
    radius: Option<f32>,
}

impl ConfigArgs {
    fn load(&self) -> Result<TerrainConfig, String> {
        let mut config = match &self.config {
            Some(path) => TerrainConfig::from_json_file(path)
                .map_err(|e| format!("failed to load {}: {}", path.display(), e))?,
            None => TerrainConfig::default(),
        };
        if let Some(subdiv) = self.subdiv {
            config.mesh.subdiv = subdiv;
        }
        if let Some(tile_size) = self.tile_size {
            config.textures.tile_size = tile_size;
        }
        if let Some(radius) = self.radius {
            config.mesh.radius = radius;
        }
        Ok(config)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Generate terrain and export it.
    Generate {
        #[command(flatten)]
        config: ConfigArgs,

        /// Kernel backend; overrides the configuration file.
        #[arg(short, long)]
        backend: Option<Backend>,

        /// Output directory for generated files.
        #[arg(short, long, default_value = "./output")]
        output: PathBuf,

        /// Base name for output files.
        #[arg(short, long, default_value = "planet")]
        name: String,

        /// Skip the 16-bit height PNGs.
        #[arg(long)]
        no_height_png: bool,

        /// Skip the color map PNGs.
        #[arg(long)]
        no_color_png: bool,

        /// Skip the normal map PNGs.
        #[arg(long)]
        no_normal_png: bool,

        /// Also write the raw f32 height field.
        #[arg(long)]
        height_raw: bool,

        /// Also write the raw vertex and index streams.
        #[arg(long)]
        mesh_raw: bool,

        /// Average normals across cube face seams.
        #[arg(long)]
        weld_seams: bool,
    },

    /// Display counts and memory use for a configuration.
    Info {
        #[command(flatten)]
        config: ConfigArgs,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Backend {
    /// GPU if a device can be acquired, otherwise the analytic CPU kernel.
    Auto,
    /// Require the wgpu compute kernel.
    Gpu,
    /// Analytic CPU kernel.
    Analytic,
}

impl From<Backend> for KernelBackend {
    fn from(b: Backend) -> Self {
        match b {
            Backend::Auto => KernelBackend::Auto,
            Backend::Gpu => KernelBackend::Gpu,
            Backend::Analytic => KernelBackend::Analytic,
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Generate {
            config,
            backend,
            output,
            name,
            no_height_png,
            no_color_png,
            no_normal_png,
            height_raw,
            mesh_raw,
            weld_seams,
        } => config.load().and_then(|mut cfg| {
            if let Some(b) = backend {
                cfg.backend = b.into();
            }
            cfg.mesh.weld_seams |= weld_seams;
            let export = ExportOptions {
                height_png: !no_height_png,
                color_png: !no_color_png,
                normal_png: !no_normal_png,
                height_raw,
                mesh_raw,
                ..Default::default()
            };
            run_generate(cfg, output, name, export)
        }),
        Commands::Info { config } => config.load().map(|cfg| run_info(&cfg)),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run_generate(config: TerrainConfig, output: PathBuf, name: String, export: ExportOptions) -> Result<(), String> {
    println!("Terrasphere - Cube-Sphere Terrain Generator");
    println!("===========================================");
    println!("Subdivision: {} cells per face edge", config.mesh.subdiv);
    println!("Tile size: {}x{} texels per face", config.textures.tile_size, config.textures.tile_size);
    println!("Radius: {}", config.mesh.radius);
    println!("Output: {}", output.display());
    println!();

    let start = Instant::now();
    let pipeline = TerrainPipeline::standard(config);
    let assets = pipeline
        .run_with_callbacks(
            |name, i, total| println!("  [{}/{}] Starting: {}", i + 1, total, name),
            |name, i, total| println!("  [{}/{}] Completed: {}", i + 1, total, name),
        )
        .map_err(|e| format!("generation failed: {}", e))?;
    println!("Generation completed in {:.2?} (kernel: {})", start.elapsed(), assets.backend);

    if let Some((min_h, max_h)) = assets.height.range() {
        println!("Height range: [{:.4}, {:.4}]", min_h, max_h);
    }

    let written = export_assets(&assets, &output, &name, &export).map_err(|e| format!("export failed: {}", e))?;
    println!("Wrote {} files to {}", written.len(), output.display());
    Ok(())
}

fn mb(bytes: u64) -> f64 {
    bytes as f64 / 1024.0 / 1024.0
}

fn run_info(config: &TerrainConfig) {
    let n = config.mesh.subdiv as u64 + 1;
    let vertices = 6 * n * n;
    let indices = 6 * (config.mesh.subdiv as u64).pow(2) * 6;
    let t = config.textures.tile_size as u64;
    let texels = 6 * t * t;

    let bytes_vertices = vertices * std::mem::size_of::<Vertex>() as u64;
    let bytes_indices = indices * 4;
    let bytes_field = texels * 4;

    println!("Terrasphere - Configuration Info");
    println!("================================");
    println!();
    println!("Mesh:");
    println!("  Subdivision: {:>12}", config.mesh.subdiv);
    println!("  Vertices:    {:>12}", vertices);
    println!("  Indices:     {:>12}", indices);
    println!("  Triangles:   {:>12}", indices / 3);
    println!();
    println!("Cubemap:");
    println!("  Tile size:   {:>12}", t);
    println!("  Per face:    {:>12} texels", t * t);
    println!("  Total:       {:>12} texels", texels);
    println!();
    println!("Memory usage:");
    println!("  Vertex stream:  {:>12} bytes ({:.2} MB)", bytes_vertices, mb(bytes_vertices));
    println!("  Index stream:   {:>12} bytes ({:.2} MB)", bytes_indices, mb(bytes_indices));
    println!("  Each field:     {:>12} bytes ({:.2} MB) x 3", bytes_field, mb(bytes_field));
    let total = bytes_vertices + bytes_indices + 3 * bytes_field;
    println!("  Total:          {:>12} bytes ({:.2} MB)", total, mb(total));
    println!();

    if t.is_power_of_two() {
        println!("Tile size: OK (power of 2)");
    } else {
        println!("Tile size: not a power of 2; texture sampling may be slower");
    }
}
