use clap::{Parser, Subcommand, ValueEnum};
use miette::{IntoDiagnostic, WrapErr};
use portgate_core::Node;
use portgate_scheduler::{Filter, PortFilter, SchedulingContext};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser)]
#[command(name = "portgate", about = "Port eligibility checks for container placement")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the nodes a container's ports can be placed on
    Check {
        /// Scheduling snapshot holding the container config and candidate nodes
        #[arg(long)]
        snapshot: PathBuf,
        /// Snapshot format, inferred from the file extension when omitted
        #[arg(long, value_enum)]
        format: Option<SnapshotFormat>,
        /// How to print the eligible nodes
        #[arg(long, value_enum, default_value_t = OutputFormat::Names)]
        output: OutputFormat,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum SnapshotFormat {
    Json,
    Yaml,
}

impl SnapshotFormat {
    fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml") | Some("yml") => Self::Yaml,
            _ => Self::Json,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// One node name per line
    Names,
    /// Eligible nodes as a JSON array
    Json,
}

fn main() -> miette::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Check {
            snapshot,
            format,
            output,
        } => run_check(&snapshot, format, output),
    }
}

/// Run the port filter against a snapshot and print the eligible nodes
fn run_check(
    path: &Path,
    format: Option<SnapshotFormat>,
    output: OutputFormat,
) -> miette::Result<()> {
    let context = load_snapshot(path, format)?;

    info!(
        "Checking container {} against {} nodes",
        context.config.name,
        context.nodes.len()
    );

    let eligible = PortFilter.filter(&context.config, &context.candidates())?;

    print!("{}", render(&eligible, output)?);

    Ok(())
}

/// Load a scheduling snapshot from disk
fn load_snapshot(path: &Path, format: Option<SnapshotFormat>) -> miette::Result<SchedulingContext> {
    let data = std::fs::read_to_string(path)
        .into_diagnostic()
        .wrap_err_with(|| format!("Failed to read snapshot {}", path.display()))?;

    let context = match format.unwrap_or_else(|| SnapshotFormat::from_path(path)) {
        SnapshotFormat::Json => portgate_core::from_json(&data)?,
        SnapshotFormat::Yaml => portgate_core::from_yaml(&data)?,
    };

    Ok(context)
}

fn render(nodes: &[&Node], output: OutputFormat) -> miette::Result<String> {
    match output {
        OutputFormat::Names => Ok(nodes.iter().map(|node| format!("{}\n", node)).collect()),
        OutputFormat::Json => {
            let mut json = portgate_core::to_json_pretty(&nodes)?;
            json.push('\n');
            Ok(json)
        }
    }
}
