use std::fmt;

use crate::PathError;

/// One `<controlId>-<instance>` step of a form-field path.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Segment {
    control_id: String,
    instance: u32,
}

impl Segment {
    #[must_use]
    pub fn new(control_id: impl Into<String>, instance: u32) -> Self {
        Self {
            control_id: control_id.into(),
            instance,
        }
    }

    #[must_use]
    pub fn control_id(&self) -> &str {
        &self.control_id
    }

    #[must_use]
    pub fn instance(&self) -> u32 {
        self.instance
    }

    #[must_use]
    pub fn with_instance(&self, instance: u32) -> Self {
        Self {
            control_id: self.control_id.clone(),
            instance,
        }
    }

    /// Parse a single segment. `path` is only used for error reporting.
    ///
    /// The instance is split off at the last `-`, so control ids may contain
    /// dashes themselves.
    pub(crate) fn parse(raw: &str, path: &str) -> Result<Self, PathError> {
        if raw.is_empty() {
            return Err(PathError::EmptySegment {
                path: path.to_string(),
            });
        }

        let Some((control_id, instance)) = raw.rsplit_once('-') else {
            return Err(PathError::MissingInstance {
                path: path.to_string(),
                segment: raw.to_string(),
            });
        };

        if control_id.is_empty() {
            return Err(PathError::MissingControlId {
                path: path.to_string(),
                segment: raw.to_string(),
            });
        }

        if instance.is_empty() {
            return Err(PathError::MissingInstance {
                path: path.to_string(),
                segment: raw.to_string(),
            });
        }

        // Canonical decimal only, so every instance has exactly one spelling.
        let canonical = instance.bytes().all(|byte| byte.is_ascii_digit())
            && (instance == "0" || !instance.starts_with('0'));
        let instance = instance
            .parse::<u32>()
            .ok()
            .filter(|_| canonical)
            .ok_or_else(|| PathError::InvalidInstance {
                path: path.to_string(),
                segment: raw.to_string(),
            })?;

        Ok(Self::new(control_id, instance))
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.control_id, self.instance)
    }
}
