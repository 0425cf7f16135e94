use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ModelError {
    /// The input could not be decoded as the expected JSON shape.
    #[error("invalid JSON: {0}")]
    Json(String),

    #[error("form definition has no name")]
    MissingFormName,

    #[error("control id '{id}' is used more than once")]
    DuplicateControlId { id: String },

    #[error("control id '{id}' is empty or contains '/'")]
    InvalidControlId { id: String },

    #[error("control '{id}' stores observations but has no concept")]
    MissingConcept { id: String },
}

impl From<serde_json::Error> for ModelError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}
