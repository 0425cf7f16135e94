use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use obsform_model::Observation;
use obsform_path::FormFieldPath;
use obsform_tree::manager;
use obsform_tree::view;
use serde::Serialize;
use serde_json::Value;

use crate::args::Args;
use crate::commands::print_json;
use crate::commands::Command;
use crate::commands::FormInput;
use crate::exit::Exit;

/// Edits are applied in a fixed order: every `--add`, then every `--set`,
/// then every `--remove`.
#[derive(Debug, Parser)]
pub struct Flatten {
    #[command(flatten)]
    input: FormInput,

    /// Add a blank instance of the control at PATH.
    #[arg(long, value_name = "PATH")]
    add: Vec<FormFieldPath>,

    /// Set the value at PATH. Text that is not valid JSON is taken as a
    /// string.
    #[arg(long = "set", value_name = "PATH=VALUE", value_parser = parse_assignment)]
    set: Vec<(FormFieldPath, Value)>,

    /// Remove the instance at PATH.
    #[arg(long, value_name = "PATH")]
    remove: Vec<FormFieldPath>,
}

/// Everything storage needs for one save.
#[derive(Debug, Serialize)]
struct SaveBatch {
    observations: Vec<Observation>,
    voids: Vec<Observation>,
}

impl Command for Flatten {
    fn execute(&self, _args: &Args) -> Result<Exit> {
        let settings = self.input.settings()?;
        let mut root = self.input.load(&settings)?;

        for path in &self.add {
            root = manager::add(&root, path)
                .with_context(|| format!("Failed to add an instance of {path}"))?;
        }
        for (path, value) in &self.set {
            root = manager::update_value(&root, path, value.clone())
                .with_context(|| format!("Failed to set {path}"))?;
        }
        for path in &self.remove {
            root = manager::remove(&root, path)
                .with_context(|| format!("Failed to remove {path}"))?;
        }

        let batch = SaveBatch {
            observations: view::to_observation_list(&root)?,
            voids: view::to_void_list(&root)?,
        };
        print_json(&batch)?;

        Ok(Exit::success())
    }
}

fn parse_assignment(raw: &str) -> Result<(FormFieldPath, Value), String> {
    let (path, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected PATH=VALUE, got '{raw}'"))?;
    let path = path
        .trim()
        .parse::<FormFieldPath>()
        .map_err(|err| err.to_string())?;
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((path, value))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_parse_assignment() {
        let (path, value) = parse_assignment("F.1/1-0/2-0=120").unwrap();
        assert_eq!(path.to_string(), "F.1/1-0/2-0");
        assert_eq!(value, json!(120));

        let (_, value) = parse_assignment("F.1/3-0=Stable overnight").unwrap();
        assert_eq!(value, json!("Stable overnight"));

        let (_, value) = parse_assignment(r#"F.1/4-0=[{"uuid":"a-fever"}]"#).unwrap();
        assert_eq!(value, json!([{"uuid": "a-fever"}]));

        let (_, value) = parse_assignment("F.1/3-0=null").unwrap();
        assert_eq!(value, Value::Null);
    }

    #[test]
    fn test_parse_assignment_errors() {
        assert!(parse_assignment("F.1/1-0").is_err());
        assert!(parse_assignment("F.1/1=3").is_err());
    }
}
