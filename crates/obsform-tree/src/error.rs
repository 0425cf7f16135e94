use obsform_model::ModelError;
use obsform_path::PathError;
use thiserror::Error;

/// Structural failures. These indicate a broken caller contract and are
/// never used for validation outcomes or plain absence.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TreeError {
    #[error(transparent)]
    Path(#[from] PathError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("record '{path}' has no value mapper")]
    MissingMapper { path: String },

    #[error("no record at '{path}'")]
    PathNotFound { path: String },

    #[error("record '{path}' has been removed")]
    RecordRemoved { path: String },

    #[error("'{path}' is the form root")]
    FormRoot { path: String },

    #[error("record '{path}' does not accept a value of this shape")]
    UnsupportedValue { path: String },
}
