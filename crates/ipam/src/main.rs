mod cli;
mod commands;
mod config;
mod error;
mod output;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use ipam_core::Ipam;

use crate::cli::{Cli, Command};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.global.verbose);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        // Config commands don't touch the data file
        Command::Config(args) => commands::config_cmd::handle(args, &cli.global),

        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "ipam", &mut std::io::stdout());
            Ok(())
        }

        Command::Subnets(args) => {
            let ipam = open(&cli.global).await?;
            commands::subnets::handle(&ipam, args, &cli.global).await
        }
        Command::Addresses(args) => {
            let ipam = open(&cli.global).await?;
            commands::addresses::handle(&ipam, args, &cli.global).await
        }
        Command::Zones(args) => {
            let ipam = open(&cli.global).await?;
            commands::zones::handle(&ipam, args, &cli.global).await
        }
    }
}

/// Open the data file selected by profile and flags.
async fn open(global: &cli::GlobalOpts) -> Result<Ipam, CliError> {
    let config = config::resolve_ipam_config(global)?;
    tracing::debug!(store = ?config.store, "opening store");
    Ok(Ipam::open(config).await?)
}
