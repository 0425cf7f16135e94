pub mod validation;

use std::path::Path;

use config::Config;
use config::ConfigError as ExternalConfigError;
use config::File;
use config::FileFormat;
use directories::ProjectDirs;
use serde::Deserialize;
use thiserror::Error;

pub use crate::validation::FindingSeverity;
pub use crate::validation::ValidationConfig;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration build/deserialize error")]
    Config(#[from] ExternalConfigError),
}

#[derive(Debug, Deserialize, PartialEq, Eq, Clone)]
#[serde(default)]
pub struct Settings {
    pub debug: bool,
    /// Rewrite observation paths saved before hierarchical form-field paths
    /// existed onto the nested scheme while building a tree.
    pub legacy_paths: bool,
    pub validation: ValidationConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            debug: false,
            legacy_paths: true,
            validation: ValidationConfig::default(),
        }
    }
}

impl Settings {
    pub fn new(project_root: &Path) -> Result<Self, ConfigError> {
        let user_config_file = ProjectDirs::from("org", "obsform", "obsform")
            .map(|proj_dirs| proj_dirs.config_dir().join("obsform.toml"));

        Self::load_from_paths(project_root, user_config_file.as_deref())
    }

    fn load_from_paths(
        project_root: &Path,
        user_config_path: Option<&Path>,
    ) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        if let Some(path) = user_config_path {
            tracing::debug!("Loading user settings from {}", path.display());
            builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(false));
        }

        builder = builder.add_source(
            File::from(project_root.join(".obsform.toml"))
                .format(FileFormat::Toml)
                .required(false),
        );

        builder = builder.add_source(
            File::from(project_root.join("obsform.toml"))
                .format(FileFormat::Toml)
                .required(false),
        );

        let config = builder.build()?;
        let settings = config.try_deserialize()?;
        Ok(settings)
    }
}
