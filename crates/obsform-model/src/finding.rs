use serde::Deserialize;
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FindingType {
    Error,
    Warning,
}

/// One validation result attached to a record. `message` is a stable code
/// such as `mandatory`; turning it into text is the UI's job.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Finding {
    #[serde(rename = "type")]
    pub kind: FindingType,
    pub message: String,
}

impl Finding {
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: FindingType::Error,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            kind: FindingType::Warning,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        self.kind == FindingType::Error
    }
}
