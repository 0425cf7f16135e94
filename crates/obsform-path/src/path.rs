use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;

use crate::PathError;
use crate::Segment;

/// A hierarchical, instance-addressed key for one control instance.
///
/// Wire format: `<formName>.<formVersion>/<id>-<instance>[/<id>-<instance>...]`.
/// A path without segments addresses the form itself and is only used for
/// the synthetic root of a record tree.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FormFieldPath {
    form_name: String,
    form_version: String,
    segments: Vec<Segment>,
}

impl FormFieldPath {
    #[must_use]
    pub fn form_root(form_name: impl Into<String>, form_version: impl Into<String>) -> Self {
        Self {
            form_name: form_name.into(),
            form_version: form_version.into(),
            segments: Vec::new(),
        }
    }

    pub fn parse(raw: &str) -> Result<Self, PathError> {
        let mut parts = raw.split('/');
        let prefix = parts.next().unwrap_or_default();

        let Some((form_name, form_version)) = prefix.rsplit_once('.') else {
            return Err(PathError::MissingFormVersion {
                path: raw.to_string(),
            });
        };
        if form_name.is_empty() {
            return Err(PathError::MissingFormName {
                path: raw.to_string(),
            });
        }
        if form_version.is_empty() {
            return Err(PathError::MissingFormVersion {
                path: raw.to_string(),
            });
        }

        let segments = parts
            .map(|segment| Segment::parse(segment, raw))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            form_name: form_name.to_string(),
            form_version: form_version.to_string(),
            segments,
        })
    }

    #[must_use]
    pub fn form_name(&self) -> &str {
        &self.form_name
    }

    #[must_use]
    pub fn form_version(&self) -> &str {
        &self.form_version
    }

    /// `formName.formVersion`
    #[must_use]
    pub fn form_prefix(&self) -> String {
        format!("{}.{}", self.form_name, self.form_version)
    }

    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    #[must_use]
    pub fn last(&self) -> Option<&Segment> {
        self.segments.last()
    }

    #[must_use]
    pub fn control_id(&self) -> Option<&str> {
        self.last().map(Segment::control_id)
    }

    #[must_use]
    pub fn instance(&self) -> Option<u32> {
        self.last().map(Segment::instance)
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    #[must_use]
    pub fn is_form_root(&self) -> bool {
        self.segments.is_empty()
    }

    #[must_use]
    pub fn belongs_to_form(&self, other: &Self) -> bool {
        self.form_name == other.form_name && self.form_version == other.form_version
    }

    #[must_use]
    pub fn child(&self, control_id: impl Into<String>, instance: u32) -> Self {
        let mut segments = self.segments.clone();
        segments.push(Segment::new(control_id, instance));
        Self {
            form_name: self.form_name.clone(),
            form_version: self.form_version.clone(),
            segments,
        }
    }

    pub fn with_instance(&self, instance: u32) -> Result<Self, PathError> {
        let mut segments = self.segments.clone();
        let Some(last) = segments.last_mut() else {
            return Err(PathError::FormRoot {
                path: self.to_string(),
            });
        };
        *last = last.with_instance(instance);
        Ok(Self {
            form_name: self.form_name.clone(),
            form_version: self.form_version.clone(),
            segments,
        })
    }

    /// The path one level up, or `None` for top-level paths and form roots.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        if self.segments.len() < 2 {
            return None;
        }
        Some(Self {
            form_name: self.form_name.clone(),
            form_version: self.form_version.clone(),
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    /// The path one level up, falling back to the form root for top-level
    /// paths. `None` only for the form root itself.
    #[must_use]
    pub fn container(&self) -> Option<Self> {
        if self.segments.is_empty() {
            return None;
        }
        Some(Self {
            form_name: self.form_name.clone(),
            form_version: self.form_version.clone(),
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    /// Segment-wise prefix test: true when `self` is `prefix` or one of its
    /// descendants.
    #[must_use]
    pub fn starts_with(&self, prefix: &Self) -> bool {
        self.belongs_to_form(prefix) && self.segments.starts_with(&prefix.segments)
    }

    /// True when `self` is a strict descendant of `ancestor`.
    #[must_use]
    pub fn is_descendant_of(&self, ancestor: &Self) -> bool {
        self.segments.len() > ancestor.segments.len() && self.starts_with(ancestor)
    }

    /// True when both paths share the same container and control id.
    #[must_use]
    pub fn is_instance_of_same_control(&self, other: &Self) -> bool {
        match (self.segments.split_last(), other.segments.split_last()) {
            (Some((last, head)), Some((other_last, other_head))) => {
                self.belongs_to_form(other)
                    && head == other_head
                    && last.control_id() == other_last.control_id()
            }
            _ => false,
        }
    }

    /// Move this path from under `old_prefix` to under `new_prefix`.
    ///
    /// Returns `None` when `self` does not start with `old_prefix`.
    #[must_use]
    pub fn rebase(&self, old_prefix: &Self, new_prefix: &Self) -> Option<Self> {
        if !self.starts_with(old_prefix) {
            return None;
        }
        let mut segments = new_prefix.segments.clone();
        segments.extend_from_slice(&self.segments[old_prefix.segments.len()..]);
        Some(Self {
            form_name: new_prefix.form_name.clone(),
            form_version: new_prefix.form_version.clone(),
            segments,
        })
    }
}

impl fmt::Display for FormFieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.form_name, self.form_version)?;
        for segment in &self.segments {
            write!(f, "/{segment}")?;
        }
        Ok(())
    }
}

impl FromStr for FormFieldPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for FormFieldPath {
    type Error = PathError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl TryFrom<&str> for FormFieldPath {
    type Error = PathError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<FormFieldPath> for String {
    fn from(path: FormFieldPath) -> Self {
        path.to_string()
    }
}
