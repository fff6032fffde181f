use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};

use tamarind::config::{self, Config};
use tamarind::docker;
use tamarind::{DockerProvisioner, Provisioner, StartOptions};

/// Start, list, and stop throwaway Neo4j databases in Docker.
#[derive(Parser)]
#[command(name = "tamarind")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (defaults to .tamarind.yml in the current directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a new database
    Start(StartArgs),

    /// List running databases
    Ps {
        #[arg(long, default_value = "table")]
        format: OutputFormat,
    },

    /// Stop a running database
    Stop { name: String },

    /// Print the bolt:// URI of a running database
    Url { name: String },

    /// Check that a running database accepts Bolt connections
    Ping {
        name: String,

        /// Seconds to wait for the handshake
        #[arg(long, default_value_t = 5)]
        timeout: u64,
    },
}

#[derive(Args)]
struct StartArgs {
    /// Instance name (letters, digits, '_', '.', '-')
    name: String,

    /// Block until the database accepts connections
    #[arg(long)]
    wait: bool,

    /// Host directory mounted at /data
    #[arg(long)]
    data_path: Option<PathBuf>,

    /// Do not mount a /data directory
    #[arg(long, conflicts_with = "data_path")]
    no_data: bool,

    /// Host directory mounted read-only at /import
    #[arg(long)]
    import_path: Option<PathBuf>,

    /// Mount ./import/<name> at /import
    #[arg(long)]
    mount_import: bool,

    /// Publish the browser ports 7474/7473
    #[arg(long)]
    browser: bool,

    /// Shell command run before the database starts
    #[arg(long, default_value = "")]
    run_before: String,

    /// Shell command run after the database starts
    #[arg(long, default_value = "")]
    run_after: String,

    /// Image to run instead of the configured one
    #[arg(long)]
    image: Option<String>,

    /// Readiness checks before giving up (with --wait)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    wait_attempts: Option<u32>,
}

impl From<StartArgs> for StartOptions {
    fn from(args: StartArgs) -> Self {
        StartOptions {
            wait: args.wait,
            data_path: args.data_path,
            use_data_path: !args.no_data,
            import_path: args.import_path,
            use_import_path: args.mount_import,
            mount_browser: args.browser,
            run_before: args.run_before,
            run_after: args.run_after,
            image: args.image,
            wait_attempt_limit: args.wait_attempts,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
enum OutputFormat {
    #[default]
    Table,
    Json,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.debug {
        "tamarind=debug"
    } else {
        "tamarind=info"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter))
        .format_target(false)
        .init();

    let cfg = load_config(cli.config.as_deref())?;
    let provisioner = DockerProvisioner::new(cfg)?;
    docker::ensure_available(provisioner.runtime())?;

    match cli.command {
        Commands::Start(args) => {
            let name = args.name.clone();
            let port = provisioner.start(&name, &args.into())?;
            println!("{name}\t{port}");
        }
        Commands::Ps { format } => {
            let running = provisioner.ps()?;
            match format {
                OutputFormat::Table => {
                    println!("NAME\tPORT");
                    for (name, port) in &running {
                        println!("{name}\t{port}");
                    }
                }
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&running)?);
                }
            }
        }
        Commands::Stop { name } => {
            provisioner.stop(&name)?;
        }
        Commands::Url { name } => {
            println!("{}", provisioner.get(&name)?.uri());
        }
        Commands::Ping { name, timeout } => {
            let graph = provisioner.get(&name)?;
            let version = graph
                .ping(Duration::from_secs(timeout))
                .with_context(|| format!("{name} is not accepting connections at {}", graph.uri()))?;
            println!("{name}\tbolt {version}");
        }
    }

    Ok(())
}

/// Explicit `--config` file, or `.tamarind.yml` in the current directory.
fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => config::load_file(path),
        None => {
            let cwd = std::env::current_dir().context("cannot determine working directory")?;
            config::load(&cwd)
        }
    }
}
