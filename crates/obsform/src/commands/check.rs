use anyhow::Result;
use clap::Parser;
use obsform_tree::view;
use obsform_tree::Validator;

use crate::args::Args;
use crate::commands::print_json;
use crate::commands::Command;
use crate::commands::FormInput;
use crate::exit::Exit;

#[derive(Debug, Parser)]
pub struct Check {
    #[command(flatten)]
    input: FormInput,

    /// Today's date (YYYY-MM-DD). Dates are only checked against the future
    /// when this is given.
    #[arg(long, value_name = "DATE")]
    today: Option<String>,
}

impl Command for Check {
    fn execute(&self, _args: &Args) -> Result<Exit> {
        let settings = self.input.settings()?;
        let root = self.input.load(&settings)?;

        let mut validator = Validator::new(settings.validation.clone());
        if let Some(today) = &self.today {
            validator = validator.with_today(today.clone());
        }
        let findings = view::to_error_list(&validator.validate(&root));
        print_json(&findings)?;

        let error_count = findings.iter().filter(|finding| finding.is_error()).count();
        let warning_count = findings.len() - error_count;
        let summary = format!(
            "Found {error_count} {} and {warning_count} {}.",
            if error_count == 1 { "error" } else { "errors" },
            if warning_count == 1 { "warning" } else { "warnings" },
        );

        if error_count > 0 {
            Ok(Exit::error().with_message(summary))
        } else if warning_count > 0 {
            Ok(Exit::success().with_message(summary))
        } else {
            Ok(Exit::success())
        }
    }
}
