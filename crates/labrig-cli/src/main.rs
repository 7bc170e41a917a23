mod cmd;
mod output;
mod plan;
mod root;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "labrig",
    about = "Idempotent single-node provisioner for GenAI lab appliances",
    version,
    propagate_version = true
)]
struct Cli {
    /// Appliance root (default: auto-detect from .labrig/ or .git/)
    #[arg(long, global = true, env = "LABRIG_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize labrig in the current directory
    Init,

    /// Run the provisioning sequence (safe to re-run any number of times)
    Up,

    /// Show the provisioning plan and which phases are already complete
    Plan,

    /// Show completed phases and recent journal activity
    Status,

    /// Forget all completion markers so the next 'up' reprovisions
    Reset {
        /// Confirm the reset
        #[arg(long)]
        yes: bool,
    },

    /// Block until a phase's completion marker exists (used by service units)
    #[command(hide = true, name = "await-marker")]
    AwaitMarker {
        /// Phase to wait for
        phase: String,

        /// Give up after this many seconds
        #[arg(long, default_value = "600")]
        timeout_secs: u64,

        /// Poll interval in seconds
        #[arg(long, default_value = "2")]
        interval_secs: u64,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Up | Commands::AwaitMarker { .. } => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    // Logs go to stderr so --json output stays parseable
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let root_path = cli.root.as_deref();
    let root = root::resolve_root(root_path);

    let result = match cli.command {
        Commands::Init => cmd::init::run(&root),
        Commands::Up => cmd::up::run(&root, cli.json),
        Commands::Plan => cmd::plan::run(&root, cli.json),
        Commands::Status => cmd::status::run(&root, cli.json),
        Commands::Reset { yes } => cmd::reset::run(&root, yes),
        Commands::AwaitMarker {
            phase,
            timeout_secs,
            interval_secs,
        } => cmd::await_marker::run(&root, &phase, timeout_secs, interval_secs),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
