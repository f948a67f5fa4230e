//! pcbtherm command-line interface.

mod config;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::LevelFilter;

use pcbtherm::spice::{is_simulator_available, simulator_version};
use pcbtherm::{BackendSelection, Pipeline, ThermalLayers};

use crate::config::RunConfig;

#[derive(Parser)]
#[command(name = "pcbtherm")]
#[command(about = "Steady-state 2D PCB heat conduction solver")]
#[command(version)]
struct Cli {
    /// Verbose output (debug logging)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log level (error, warn, info, debug, trace); overrides RUST_LOG
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve a problem
    Run {
        /// Run configuration (JSON); defaults are used when omitted
        config: Option<PathBuf>,

        /// Built-in problem: tiny or scalable
        #[arg(long)]
        problem: Option<String>,

        /// Mesh size of the scalable problem, e.g. 40x30
        #[arg(long)]
        size: Option<String>,

        /// Comma-separated backends, e.g. direct,iterative,eigen,dense,spice;
        /// cg or gmres select the iterative backend with that method
        #[arg(long)]
        backends: Option<String>,

        /// Write the system as Matrix-Market files
        #[arg(long)]
        dump_mm: bool,

        /// Write the HTML page of the dense matrix
        #[arg(long)]
        dump_html: bool,

        /// Directory for diagnostic files
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Output the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print a default run configuration
    ExampleConfig,

    /// Check that the external circuit simulator can be run
    CheckSimulator {
        /// Run configuration whose simulator settings are checked
        config: Option<PathBuf>,
    },
}

fn init_logging(verbose: bool, level: Option<&str>) {
    let level = level
        .and_then(|l| l.parse::<LevelFilter>().ok())
        .or_else(|| {
            std::env::var("RUST_LOG")
                .ok()
                .and_then(|v| v.parse::<LevelFilter>().ok())
        })
        .unwrap_or(LevelFilter::Info);
    let level = if verbose { level.max(LevelFilter::Debug) } else { level };

    env_logger::Builder::new()
        .filter_level(level)
        .format_timestamp(None)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.log_level.as_deref());

    let result = match cli.command {
        Commands::Run {
            config,
            problem,
            size,
            backends,
            dump_mm,
            dump_html,
            output_dir,
            json,
        } => {
            let overrides = Overrides {
                problem,
                size,
                backends,
                dump_mm,
                dump_html,
                output_dir,
            };
            cmd_run(config, overrides, json)
        }
        Commands::ExampleConfig => cmd_example_config(),
        Commands::CheckSimulator { config } => cmd_check_simulator(config),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

struct Overrides {
    problem: Option<String>,
    size: Option<String>,
    backends: Option<String>,
    dump_mm: bool,
    dump_html: bool,
    output_dir: Option<PathBuf>,
}

impl Overrides {
    fn apply(self, config: &mut RunConfig) -> Result<()> {
        if let Some(problem) = &self.problem {
            config.set_problem(problem)?;
        }
        if let Some(size) = &self.size {
            config.set_size(size)?;
        }
        if let Some(list) = &self.backends {
            config.pipeline.backends = BackendSelection::from_names(list)
                .with_context(|| format!("invalid --backends '{list}'"))?;
        }
        let diagnostics = &mut config.pipeline.diagnostics;
        diagnostics.dump_matrix_market |= self.dump_mm;
        diagnostics.dump_dense_shadow |= self.dump_html;
        if let Some(dir) = self.output_dir {
            diagnostics.output_dir = dir;
        }
        Ok(())
    }
}

fn load_config(path: Option<PathBuf>) -> Result<RunConfig> {
    match path {
        Some(path) => RunConfig::load(&path),
        None => Ok(RunConfig::default()),
    }
}

fn cmd_run(path: Option<PathBuf>, overrides: Overrides, json: bool) -> Result<ExitCode> {
    let mut config = load_config(path)?;
    overrides.apply(&mut config)?;

    let registry = config.registry()?;
    let layers = ThermalLayers::resolve(&registry).context("resolving thermal layers")?;
    let mut grid = config
        .problem
        .build(&registry, &layers, &config.materials)
        .context("building problem")?;

    let pipeline = Pipeline::new(config.pipeline);
    let report = pipeline
        .run(&mut grid, &layers, config.materials.bound_cond)
        .context("running pipeline")?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("serializing report")?
        );
    } else {
        output::print_report(&report);
    }

    if report.has_temperatures() || !pipeline.config().backends.produces_temperatures() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

fn cmd_example_config() -> Result<ExitCode> {
    let text = serde_json::to_string_pretty(&RunConfig::default())
        .context("serializing default configuration")?;
    println!("{text}");
    Ok(ExitCode::SUCCESS)
}

fn cmd_check_simulator(path: Option<PathBuf>) -> Result<ExitCode> {
    let config = load_config(path)?.pipeline.spice;

    if is_simulator_available(&config) {
        match simulator_version(&config) {
            Ok(version) => println!("{} is available: {}", config.program, version),
            Err(e) => println!("{} found but version check failed: {}", config.program, e),
        }
        Ok(ExitCode::SUCCESS)
    } else {
        println!("{} not found in PATH", config.program);
        Ok(ExitCode::FAILURE)
    }
}
