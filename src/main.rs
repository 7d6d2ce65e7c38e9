use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use frida_builder::{config, Executor, Registry, SystemToolchain, ToolPaths};

/// Command-line arguments for frida-builder
#[derive(Parser, Debug)]
#[command(
    name = "frida-builder",
    about = "Bundle and compile Frida scripts through configurable workflows",
    version
)]
struct Cli {
    /// Comma-separated list of paths to files with workflows
    #[arg(long, default_value = "")]
    workflows: String,

    /// Where to output the bundle to
    #[arg(short = 'o', default_value = "bundle")]
    output: PathBuf,

    /// esbuild executable
    #[arg(long, env = "FRIDA_BUILDER_ESBUILD", default_value = "esbuild")]
    esbuild: PathBuf,

    /// terser executable
    #[arg(long, env = "FRIDA_BUILDER_TERSER", default_value = "terser")]
    terser: PathBuf,

    /// qjsc executable
    #[arg(long, env = "FRIDA_BUILDER_QJSC", default_value = "qjsc")]
    qjsc: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a workflow on an entrypoint
    Workflow {
        /// Name of the workflow to run
        name: String,

        /// Script to start from
        entrypoint: PathBuf,
    },

    /// List loaded workflows
    List,
}

fn main() -> Result<()> {
    let start = Instant::now();
    let cli = Cli::parse();

    init_logging();
    info!("running frida-builder v{}", env!("CARGO_PKG_VERSION"));

    let sources = config::workflow_sources(&config::split_paths(&cli.workflows));
    let registry = Registry::from_sources(&sources);
    info!("{} workflows loaded!", registry.len());

    match cli.command {
        Command::Workflow { name, entrypoint } => {
            let toolchain = SystemToolchain::new(ToolPaths {
                esbuild: cli.esbuild,
                terser: cli.terser,
                qjsc: cli.qjsc,
            });

            let executor = Executor::new(&registry, &toolchain, &entrypoint)?;
            let workdir = executor
                .run(&name)
                .with_context(|| format!("workflow {} failed", name.trim()))?;

            let bytes = workdir
                .finish(&cli.output)
                .with_context(|| format!("failed to write {}", cli.output.display()))?;

            info!(output = %cli.output.display(), bytes, "finished in {:?}!", start.elapsed());
        }
        Command::List => {
            for name in registry.names() {
                println!("{name}");
            }
        }
    }

    Ok(())
}

/// Log to stderr, filtered by `RUST_LOG` (default `info`).
fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}
