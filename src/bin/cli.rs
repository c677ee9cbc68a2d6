// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Resection Planning Team

//! Resection engine CLI

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use resection::geometry::{cut_with, derive_plane, tessellate, Contour, CutOptions};
use resection::io;
use resection::model::{default_grid, DEFAULT_GRID_HALF_EXTENT};
use resection::{PipelineConfig, ResectionKernel};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "resection")]
#[command(about = "Resection planning geometry engine", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to ./resection.toml when present)
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Cut an organ mesh with the plane through two anchor points
    Cut {
        /// Organ STL file
        organ: PathBuf,

        /// First anchor point, "x,y,z"
        #[arg(long, allow_hyphen_values = true)]
        p1: String,

        /// Second anchor point, "x,y,z"
        #[arg(long, allow_hyphen_values = true)]
        p2: String,

        /// Write the filled contour as STL
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Tessellate a Bezier control net
    Surface {
        /// Control points file (16 lines of "x y z"); default flat grid if omitted
        #[arg(short, long)]
        points: Option<PathBuf>,

        /// Output STL file
        #[arg(short, long)]
        output: PathBuf,

        /// Samples per direction (overrides the configuration)
        #[arg(short, long)]
        resolution: Option<u32>,
    },

    /// Cut the organ and fit the resection surface to the cutting plane
    Plan {
        /// Organ STL file
        organ: PathBuf,

        #[arg(long, allow_hyphen_values = true)]
        p1: String,

        #[arg(long, allow_hyphen_values = true)]
        p2: String,

        /// Half width of the fitted control grid
        #[arg(long, default_value_t = DEFAULT_GRID_HALF_EXTENT)]
        extent: f64,

        /// Output STL for the resection surface
        #[arg(long, default_value = "surface.stl")]
        surface_out: PathBuf,

        /// Output STL for the cross-section
        #[arg(long, default_value = "contour.stl")]
        contour_out: PathBuf,
    },

    /// Print the effective configuration as TOML
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::from_default_env().filter_level(level).init();

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Cut { organ, p1, p2, output } => cut_command(&config, &organ, &p1, &p2, output.as_deref()),
        Commands::Surface {
            points,
            output,
            resolution,
        } => surface_command(&config, points.as_deref(), &output, resolution),
        Commands::Plan {
            organ,
            p1,
            p2,
            extent,
            surface_out,
            contour_out,
        } => plan_command(config, &organ, &p1, &p2, extent, &surface_out, &contour_out),
        Commands::Config => {
            print!("{}", config.to_toml()?);
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    let mut config = match path {
        Some(path) => PipelineConfig::from_file(path)?,
        None => return PipelineConfig::load(),
    };
    config.apply_overrides(|key| std::env::var(key).ok())?;
    config.validate()?;
    Ok(config)
}

fn report_contour(contour: &Contour) {
    if contour.is_empty() {
        println!("{} plane does not intersect the organ", "Empty".yellow());
        return;
    }
    let closed = contour.loops.iter().filter(|l| l.closed).count();
    println!("{}", "Cross-section".bold());
    println!("  Loops:     {} ({} closed)", contour.loop_count(), closed);
    println!("  Points:    {}", contour.mesh.vertex_count());
    println!("  Area:      {:.3}", contour.area());
    println!("  Perimeter: {:.3}", contour.perimeter());
    if closed < contour.loop_count() {
        println!("  {} open polylines, organ surface is not closed", "Warning:".yellow());
    }
}

fn cut_command(config: &PipelineConfig, organ: &Path, p1: &str, p2: &str, output: Option<&Path>) -> Result<()> {
    let mesh = io::import_stl_with(organ, config.weld_tolerance)?;
    let plane = derive_plane(&io::parse_point(p1)?, &io::parse_point(p2)?);
    if plane.is_degenerate_within(config.plane_epsilon) {
        bail!("Anchor points coincide, no cutting plane");
    }

    let options = CutOptions {
        tolerance: config.cut_tolerance,
        weld_tolerance: config.weld_tolerance,
        ..CutOptions::default()
    };
    let start = std::time::Instant::now();
    let contour = cut_with(Some(&mesh), &plane, &options);
    log::debug!("Cut in {:.2?}", start.elapsed());

    report_contour(&contour);
    if let Some(output) = output {
        io::export_stl(&contour.mesh, output)?;
        println!("{} {}", "Wrote".green(), output.display());
    }
    Ok(())
}

fn surface_command(config: &PipelineConfig, points: Option<&Path>, output: &Path, resolution: Option<u32>) -> Result<()> {
    let control_points = match points {
        Some(path) => io::read_points(path)?,
        None => default_grid(DEFAULT_GRID_HALF_EXTENT),
    };
    let (res_u, res_v) = match resolution {
        Some(r) => (r, r),
        None => (config.resolution_u, config.resolution_v),
    };

    let mesh = tessellate(&control_points, res_u, res_v).context("Failed to tessellate control net")?;
    io::export_stl(&mesh, output)?;

    println!(
        "{} {} ({} vertices, {} triangles, area {:.3})",
        "Wrote".green(),
        output.display(),
        mesh.vertex_count(),
        mesh.triangle_count(),
        mesh.surface_area()
    );
    Ok(())
}

fn plan_command(
    config: PipelineConfig,
    organ: &Path,
    p1: &str,
    p2: &str,
    extent: f64,
    surface_out: &Path,
    contour_out: &Path,
) -> Result<()> {
    let mesh = io::import_stl_with(organ, config.weld_tolerance)?;
    let mut kernel = ResectionKernel::with_lookup(config, resection::model::MeshScene::new());
    let handle = kernel.lookup_mut().insert(mesh);

    kernel.set_target_organ(Some(handle));
    kernel.set_anchors(io::parse_point(p1)?, io::parse_point(p2)?)?;
    kernel.initialize_surface_from_anchors(extent)?;

    let Some(plane) = kernel.plane().copied() else {
        bail!("Anchor points coincide, no cutting plane");
    };
    println!(
        "Plane origin ({:.3}, {:.3}, {:.3}), normal ({:.3}, {:.3}, {:.3})",
        plane.origin.x, plane.origin.y, plane.origin.z, plane.normal.x, plane.normal.y, plane.normal.z
    );
    println!("Resection margin: {:.1} mm", kernel.net().resection_margin());

    match kernel.contour().get() {
        Some(contour) => {
            report_contour(contour);
            io::export_stl(&contour.mesh, contour_out)?;
            println!("{} {}", "Wrote".green(), contour_out.display());
        }
        None => println!("{} no contour published", "Warning:".yellow()),
    }

    match kernel.surface().get() {
        Some(surface) => {
            io::export_stl(surface, surface_out)?;
            println!("{} {}", "Wrote".green(), surface_out.display());
        }
        None => println!("{} surface not ready", "Warning:".yellow()),
    }

    Ok(())
}
