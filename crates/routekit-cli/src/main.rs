//! routekit command line interface
//!
//! Detects and parses rail-simulation content from the shell.
//!
//! # Usage
//!
//! ```bash
//! # Which dialect is this?
//! routekit detect routes/line1/route.csv
//! routekit detect trains/emu-205
//!
//! # Parse a route and print a summary, or the whole model
//! routekit route routes/line1/route.csv
//! routekit route routes/line1/map.txt --json
//!
//! # Parse an object into a mesh
//! routekit object objects/wall.x
//! ```
//!
//! Logging goes to stderr and defaults to `warn`; `RUST_LOG` overrides it.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use routekit_core::{
    config::loader::CONFIG_ENV, detect_object_format, detect_route_format,
    detect_vehicle_format, parse_object, parse_route, ConfigLoader, Diagnostic, ObjectFormat,
    ParseReport, ParserConfig, Severity,
};

#[derive(Parser)]
#[command(name = "routekit")]
#[command(version)]
#[command(about = "Detect and parse legacy rail-simulation routes, objects and vehicles")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Parser configuration file (YAML)
    #[arg(long, global = true, env = CONFIG_ENV)]
    config: Option<PathBuf>,

    /// Raise log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the format of a route or object file, or of a vehicle directory
    Detect {
        path: PathBuf,
    },

    /// Parse a route file
    Route {
        path: PathBuf,

        /// Print the full model and diagnostics as JSON
        #[arg(long)]
        json: bool,
    },

    /// Parse an object file into a triangle mesh
    Object {
        path: PathBuf,

        /// Print the mesh and diagnostics as JSON
        #[arg(long)]
        json: bool,
    },
}

// =============================================================================
// MAIN
// =============================================================================

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = load_config(cli.config.as_deref()).and_then(|config| match &cli.command {
        Commands::Detect { path } => cmd_detect(path, &config),
        Commands::Route { path, json } => cmd_route(path, *json, &config),
        Commands::Object { path, json } => cmd_object(path, *json, &config),
    });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}: {:#}", "error".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<ParserConfig> {
    let loader = match path {
        Some(path) => ConfigLoader::new(path),
        None => ConfigLoader::from_env(),
    };
    loader.load()
}

// =============================================================================
// COMMAND IMPLEMENTATIONS
// =============================================================================

fn cmd_detect(path: &Path, config: &ParserConfig) -> Result<()> {
    if path.is_dir() {
        let format = detect_vehicle_format(path);
        println!("{} vehicle: {:?}", path.display(), format);
        return Ok(());
    }
    anyhow::ensure!(path.exists(), "{} does not exist", path.display());

    // .csv is ambiguous between an object and an Extended-CSV route
    let object = detect_object_format(path, config);
    match object {
        ObjectFormat::Unknown | ObjectFormat::RouteCsv => {
            let detection = detect_route_format(path, config);
            println!("{} route: {}", path.display(), detection.format.to_string().green());
            if detection.host_extensions {
                println!("  uses host extension commands");
            }
            if let Some(diag) = &detection.diagnostic {
                print_diagnostic(diag);
            }
        }
        _ => println!("{} object: {}", path.display(), object.to_string().green()),
    }
    Ok(())
}

fn cmd_route(path: &Path, json: bool, config: &ParserConfig) -> Result<()> {
    let report =
        parse_route(path, config).with_context(|| format!("parsing route {}", path.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let route = &report.output;
    println!("{} {}", "OK".green(), path.display());
    if !route.comment.is_empty() {
        println!("  comment:     {}", route.comment);
    }
    println!("  gauge:       {} m", route.gauge);
    println!("  structures:  {}", route.structures.len());
    println!("  geometry:    {}", route.geometries.len());
    println!("  stations:    {}", route.stations.len());
    for station in &route.stations {
        debug!("station {} at {}", station.name, station.position);
        println!("    {:>10.1}  {}", station.position, station.name);
    }
    println!("  objects:     {}", route.objects.len());
    println!("  limits:      {}", route.speed_limits.len());
    println!("  rail events: {}", route.rails.len());
    println!("  repeaters:   {}", route.repeaters.len());
    let unresolved = route.unresolved_objects().count();
    if unresolved > 0 {
        println!(
            "  {} object(s) reference undefined structures",
            unresolved.to_string().yellow()
        );
    }
    print_diagnostics(&report);
    Ok(())
}

fn cmd_object(path: &Path, json: bool, config: &ParserConfig) -> Result<()> {
    let report =
        parse_object(path, config).with_context(|| format!("parsing object {}", path.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let mesh = &report.output;
    println!("{} {}", "OK".green(), path.display());
    println!("  vertices:  {}", mesh.vertex_count());
    println!("  triangles: {}", mesh.triangle_count());
    println!("  uvs:       {}", if mesh.uvs.is_empty() { "no" } else { "yes" });
    let [r, g, b, a] = mesh.material.color;
    println!("  color:     {} {} {} {}", r, g, b, a);
    if let Some(texture) = &mesh.material.texture {
        println!("  texture:   {}", texture);
    }
    print_diagnostics(&report);
    Ok(())
}

fn print_diagnostics<T>(report: &ParseReport<T>) {
    if report.diagnostics.is_empty() {
        return;
    }
    println!(
        "  {} diagnostic(s), {} warning(s):",
        report.diagnostics.len(),
        report.warnings().count()
    );
    for diag in &report.diagnostics {
        print_diagnostic(diag);
    }
}

fn print_diagnostic(diag: &Diagnostic) {
    let line = diag.to_string();
    let line = match diag.severity {
        Severity::Warning => line.yellow(),
        Severity::Hint => line.dimmed(),
    };
    println!("    {}", line);
}
