use anyhow::Result;
use clap::Parser;
use obsform_tree::snapshot::RecordSnapshot;
use obsform_tree::view;

use crate::args::Args;
use crate::commands::print_json;
use crate::commands::Command;
use crate::commands::FormInput;
use crate::exit::Exit;

#[derive(Debug, Parser)]
pub struct Tree {
    #[command(flatten)]
    input: FormInput,

    /// Leave out removed and history records.
    #[arg(long)]
    active: bool,
}

impl Command for Tree {
    fn execute(&self, _args: &Args) -> Result<Exit> {
        let settings = self.input.settings()?;
        let root = self.input.load(&settings)?;
        let root = if self.active {
            view::to_active_tree(&root)
        } else {
            root
        };

        print_json(&RecordSnapshot::from(&root))?;
        Ok(Exit::success())
    }
}
