use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PathError {
    #[error("form-field path '{path}' is missing the form name")]
    MissingFormName { path: String },

    #[error("form-field path '{path}' is missing the form version")]
    MissingFormVersion { path: String },

    #[error("form-field path '{path}' has an empty segment")]
    EmptySegment { path: String },

    #[error("segment '{segment}' of '{path}' is missing its '-instance' suffix")]
    MissingInstance { path: String, segment: String },

    #[error("segment '{segment}' of '{path}' has no control id")]
    MissingControlId { path: String, segment: String },

    #[error("segment '{segment}' of '{path}' has an instance that is not a plain decimal number")]
    InvalidInstance { path: String, segment: String },

    #[error("form root '{path}' has no control instance")]
    FormRoot { path: String },

    #[error("no instance index is left after '{path}'")]
    InstanceOverflow { path: String },
}
