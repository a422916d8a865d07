mod commands;
mod config;
mod docker;
mod error;
mod shared;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use commands::{Family, Globals, NovncArgs, RunArgs};
use docker::DockerConfig;
use error::LaunchError;

#[derive(Parser)]
#[command(name = "wa")]
#[command(about = "Launch wa_simulator scripts and helpers inside Docker containers", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Validate and print the launch plan without contacting Docker
    #[arg(long, global = true)]
    dry_run: bool,

    /// Docker Engine socket [default: DOCKER_HOST or the platform socket]
    #[arg(long, env = "WA_DOCKER_SOCKET", global = true)]
    docker_socket: Option<String>,

    /// Also write logs to this directory
    #[arg(long, env = "WA_LOG_DIR", global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Simulator commands, with wa_simulator defaults built in
    Sim {
        #[command(subcommand)]
        command: SimCommands,
    },

    /// Generic docker commands
    Docker {
        #[command(subcommand)]
        command: DockerCommands,
    },
}

#[derive(Subcommand)]
enum SimCommands {
    /// Run a simulation script in a container
    Run(RunArgs),

    /// Start a noVNC container for viewing GUI windows in a browser
    Novnc(NovncArgs),
}

#[derive(Subcommand)]
enum DockerCommands {
    /// Run a script in a container
    Run {
        #[command(flatten)]
        args: RunArgs,

        /// Use the defaults for wa_simulator runs
        #[arg(long)]
        wasim: bool,
    },

    /// Start a noVNC container for viewing GUI windows in a browser
    Novnc(NovncArgs),
}

impl Cli {
    fn globals(&self) -> Globals {
        Globals {
            dry_run: self.dry_run,
            docker: DockerConfig {
                socket_path: self.docker_socket.clone(),
                ..Default::default()
            },
        }
    }
}

async fn dispatch(cli: &Cli) -> error::Result<i32> {
    let globals = cli.globals();

    match &cli.command {
        Commands::Sim { command } => match command {
            SimCommands::Run(args) => commands::run::execute(args, Family::Sim, false, &globals).await,
            SimCommands::Novnc(args) => commands::novnc::execute(args, Family::Sim, &globals).await,
        },
        Commands::Docker { command } => match command {
            DockerCommands::Run { args, wasim } => {
                commands::run::execute(args, Family::Docker, *wasim, &globals).await
            }
            DockerCommands::Novnc(args) => commands::novnc::execute(args, Family::Docker, &globals).await,
        },
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let logging = shared::logging::init_logging(cli.verbose, cli.log_dir.as_deref())?;

    let code = match dispatch(&cli).await {
        Ok(code) => code,
        Err(LaunchError::Interrupted) => {
            tracing::info!("Interrupted, container stopped");
            0
        }
        Err(e) => {
            let context = if e.is_validation() {
                "invalid launch configuration"
            } else {
                "container launch failed"
            };
            return Err(anyhow::Error::new(e).context(context));
        }
    };

    if code != 0 {
        drop(logging);
        std::process::exit(code);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sim_run_with_trailing_args() {
        let cli = Cli::try_parse_from([
            "wa", "-vv", "sim", "run", "--data", "../data", "demo.py", "--step", "0.1", "-q",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 2);
        let Commands::Sim { command: SimCommands::Run(args) } = cli.command else {
            panic!("expected sim run");
        };
        assert_eq!(args.script.to_str(), Some("demo.py"));
        assert_eq!(args.script_args, vec!["--step", "0.1", "-q"]);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "wa", "docker", "run", "--wasim", "--dry-run", "--docker-socket", "/tmp/docker.sock",
            "demo.py",
        ])
        .unwrap();

        let globals = cli.globals();
        assert!(globals.dry_run);
        assert_eq!(globals.docker.socket_path.as_deref(), Some("/tmp/docker.sock"));
        assert!(matches!(
            cli.command,
            Commands::Docker { command: DockerCommands::Run { wasim: true, .. } }
        ));
    }

    #[test]
    fn test_novnc_options() {
        let cli = Cli::try_parse_from(["wa", "sim", "novnc", "--ip", "172.20.0.9"]).unwrap();
        let Commands::Sim { command: SimCommands::Novnc(args) } = cli.command else {
            panic!("expected sim novnc");
        };
        assert_eq!(args.ip.as_deref(), Some("172.20.0.9"));
        assert_eq!(args.name, None);
    }

    #[test]
    fn test_run_requires_script() {
        assert!(Cli::try_parse_from(["wa", "docker", "run", "--image", "ubuntu"]).is_err());
    }
}
