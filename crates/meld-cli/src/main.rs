//! Meld CLI - isosurface extraction and headless rendering

mod commands;
mod logging;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{init, inspect, mesh, render};

#[derive(Parser)]
#[command(name = "meld")]
#[command(about = "Metaball isosurfaces with deferred point lights", long_about = None)]
#[command(version)]
struct Cli {
    /// Log filter in env_logger syntax (overrides RUST_LOG)
    #[arg(long, global = true)]
    log: Option<String>,

    /// Shorthand for --log debug
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a scene config with every default filled in
    Init {
        /// Output path
        #[arg(default_value = "meld.toml")]
        path: String,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Extract the isosurface and report its statistics
    Mesh {
        /// Scene config (defaults are used when omitted)
        #[arg(long)]
        config: Option<String>,

        /// Lattice cells along each axis
        #[arg(long)]
        resolution: Option<u32>,

        /// Isosurface threshold
        #[arg(long)]
        threshold: Option<f32>,

        /// Animation progress to sample the sources at
        #[arg(long, default_value = "0")]
        time: f64,

        /// Sample the field with the compute kernel
        #[arg(long)]
        gpu: bool,

        /// Write the mesh as Wavefront OBJ
        #[arg(short, long)]
        output: Option<String>,

        /// Print statistics as JSON
        #[arg(long)]
        json: bool,
    },

    /// Render the scene to PNG (headless)
    Render {
        /// Scene config (defaults are used when omitted)
        #[arg(long)]
        config: Option<String>,

        /// Output image path
        #[arg(short, long, default_value = "render.png")]
        output: String,

        /// Image width in pixels
        #[arg(long)]
        width: Option<u32>,

        /// Image height in pixels
        #[arg(long)]
        height: Option<u32>,

        /// Display mode: scene or deferred
        #[arg(long)]
        mode: Option<String>,

        /// Number of point lights
        #[arg(long)]
        lights: Option<u32>,

        /// Animation progress of the first frame
        #[arg(long, default_value = "0")]
        time: f64,

        /// Render an animated sequence of this many frames
        #[arg(long, default_value = "1")]
        frames: u32,

        /// Frames per second of the sequence
        #[arg(long, default_value = "30")]
        fps: f64,

        /// Sample the field with the compute kernel
        #[arg(long)]
        gpu: bool,

        /// Draw this OBJ file instead of the isosurface
        #[arg(long)]
        obj: Option<String>,

        /// Camera orbit distance
        #[arg(long)]
        distance: Option<f32>,

        /// Camera horizontal angle in degrees
        #[arg(long)]
        yaw: Option<f32>,

        /// Camera vertical angle in degrees
        #[arg(long)]
        pitch: Option<f32>,
    },

    /// Print statistics for an OBJ file
    Inspect {
        /// Path to the OBJ file
        path: String,

        /// Print statistics as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let filter = if cli.verbose {
        Some("debug".to_string())
    } else {
        cli.log
    };
    logging::init_logging(filter.as_deref());

    match cli.command {
        Commands::Init { path, force } => init::run(&path, force),
        Commands::Mesh {
            config,
            resolution,
            threshold,
            time,
            gpu,
            output,
            json,
        } => mesh::run(mesh::MeshArgs {
            config,
            resolution,
            threshold,
            time,
            gpu,
            output,
            json,
        }),
        Commands::Render {
            config,
            output,
            width,
            height,
            mode,
            lights,
            time,
            frames,
            fps,
            gpu,
            obj,
            distance,
            yaw,
            pitch,
        } => render::run(render::RenderArgs {
            config,
            output,
            width,
            height,
            mode,
            lights,
            time,
            frames,
            fps,
            gpu,
            obj,
            distance,
            yaw,
            pitch,
        }),
        Commands::Inspect { path, json } => inspect::run(&path, json),
    }
}
