mod check;
mod flatten;
mod tree;

use anyhow::Context;
use anyhow::Result;
use camino::Utf8PathBuf;
use clap::Parser;
use clap::Subcommand;
use obsform_conf::Settings;
use obsform_model::FormDefinition;
use obsform_model::Observation;
use obsform_tree::snapshot::RecordSnapshot;
use obsform_tree::BuildOptions;
use obsform_tree::Record;
use obsform_tree::TreeBuilder;
use serde::Serialize;

use crate::args::Args;
use crate::exit::Exit;

pub trait Command {
    fn execute(&self, args: &Args) -> Result<Exit>;
}

#[derive(Debug, Subcommand)]
pub enum ObsformCommand {
    /// Validate stored observations against their form and list the findings
    Check(self::check::Check),
    /// Apply edits to a form's record tree and print the resulting save batch
    Flatten(self::flatten::Flatten),
    /// Print the record tree built from a form and its observations
    Tree(self::tree::Tree),
}

impl Command for ObsformCommand {
    fn execute(&self, args: &Args) -> Result<Exit> {
        match self {
            Self::Check(command) => command.execute(args),
            Self::Flatten(command) => command.execute(args),
            Self::Tree(command) => command.execute(args),
        }
    }
}

/// The form and observation files every command starts from.
#[derive(Debug, Parser)]
pub struct FormInput {
    /// Form definition (JSON).
    form: Utf8PathBuf,

    /// Stored observations for the form (JSON array). Omit for a blank form.
    observations: Option<Utf8PathBuf>,

    /// Directory holding `obsform.toml`. Defaults to the current directory.
    #[arg(long, value_name = "DIR")]
    project_root: Option<Utf8PathBuf>,
}

impl FormInput {
    pub fn settings(&self) -> Result<Settings> {
        let project_root = match &self.project_root {
            Some(root) => root.clone().into_std_path_buf(),
            None => std::env::current_dir().context("Failed to resolve the current directory")?,
        };
        Settings::new(&project_root).context("Failed to load settings")
    }

    pub fn load(&self, settings: &Settings) -> Result<Record> {
        let source = std::fs::read_to_string(&self.form)
            .with_context(|| format!("Failed to read form definition {}", self.form))?;
        let form = FormDefinition::from_json(&source)
            .with_context(|| format!("Invalid form definition {}", self.form))?;

        let observations = match &self.observations {
            Some(path) => {
                let source = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read observations {path}"))?;
                Observation::list_from_json(&source)
                    .with_context(|| format!("Invalid observations {path}"))?
            }
            None => Vec::new(),
        };

        tracing::debug!(
            form = %self.form,
            observations = observations.len(),
            "loaded form input"
        );

        let root = TreeBuilder::new(BuildOptions::from(settings))
            .build(&form, &observations)
            .with_context(|| format!("Failed to build the record tree for {}", self.form))?;

        if settings.debug {
            let snapshot = serde_json::to_string(&RecordSnapshot::from(&root))?;
            tracing::info!(tree = %snapshot, "built record tree");
        }

        Ok(root)
    }
}

/// Pretty-print `value` as JSON on stdout.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{rendered}");
    Ok(())
}
