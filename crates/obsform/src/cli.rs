use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;

use crate::args::Args;
use crate::commands::Command;
use crate::commands::ObsformCommand;

/// Build, edit and check clinical form record trees.
#[derive(Parser)]
#[command(name = "obsform")]
#[command(version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: ObsformCommand,

    #[command(flatten)]
    pub args: Args,
}

/// Parse CLI arguments and execute the chosen command
pub fn run(args: Vec<String>) -> Result<ExitCode> {
    let cli = Cli::try_parse_from(args).unwrap_or_else(|e| {
        e.exit();
    });

    let _guard = crate::logging::init_tracing(&cli.args.global);

    let exit = cli.command.execute(&cli.args)?;
    Ok(exit.report(cli.args.global.quiet))
}
