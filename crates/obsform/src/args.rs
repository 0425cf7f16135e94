use camino::Utf8PathBuf;
use clap::Parser;

#[derive(Parser)]
pub struct Args {
    #[command(flatten)]
    pub global: GlobalArgs,
}

#[derive(Parser, Debug, Clone)]
pub struct GlobalArgs {
    /// Do not print logs or summaries, only results.
    #[arg(global = true, long, short, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Use verbose output.
    #[arg(global = true, action = clap::ArgAction::Count, long, short, conflicts_with = "quiet")]
    pub verbose: u8,

    /// Also write logs to a daily rotated file in this directory.
    #[arg(global = true, long, value_name = "DIR")]
    pub log_dir: Option<Utf8PathBuf>,
}
