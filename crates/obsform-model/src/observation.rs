use obsform_path::FormFieldPath;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::Concept;
use crate::ModelError;

/// Interpretation flag attached to abnormal results.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Interpretation {
    Abnormal,
}

/// A clinical observation, both as read from storage and as handed back
/// for persistence.
///
/// Group observations carry their members in `group_members`; everything
/// else is a leaf with a scalar or coded `value`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    pub concept: Concept,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    pub form_field_path: FormFieldPath,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form_namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encounter_uuid: Option<String>,
    #[serde(
        default,
        rename = "obsDateTime",
        alias = "obsDatetime",
        skip_serializing_if = "Option::is_none"
    )]
    pub obs_date_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interpretation: Option<Interpretation>,
    #[serde(default)]
    pub voided: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub inactive: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub group_members: Vec<Observation>,
}

impl Observation {
    /// A fresh, never persisted observation without a value.
    #[must_use]
    pub fn new(concept: Concept, form_field_path: FormFieldPath) -> Self {
        Self {
            uuid: None,
            concept,
            value: None,
            form_field_path,
            form_namespace: None,
            encounter_uuid: None,
            obs_date_time: None,
            comment: None,
            interpretation: None,
            voided: false,
            inactive: false,
            group_members: Vec::new(),
        }
    }

    pub fn list_from_json(source: &str) -> Result<Vec<Self>, ModelError> {
        Ok(serde_json::from_str(source)?)
    }

    #[must_use]
    pub fn is_persisted(&self) -> bool {
        self.uuid.is_some()
    }

    #[must_use]
    pub fn has_value(&self) -> bool {
        self.value.as_ref().is_some_and(|value| !is_empty_value(value))
    }

    /// Set the value. Clearing a value voids the observation; any real value
    /// un-voids it.
    #[must_use]
    pub fn with_value(&self, value: Option<Value>) -> Self {
        let value = value.filter(|value| !is_empty_value(value));
        Self {
            voided: value.is_none(),
            value,
            ..self.clone()
        }
    }

    #[must_use]
    pub fn with_comment(&self, comment: Option<String>) -> Self {
        Self {
            comment: comment.filter(|comment| !comment.trim().is_empty()),
            ..self.clone()
        }
    }

    #[must_use]
    pub fn with_interpretation(&self, interpretation: Option<Interpretation>) -> Self {
        Self {
            interpretation,
            ..self.clone()
        }
    }

    #[must_use]
    pub fn with_path(&self, form_field_path: FormFieldPath) -> Self {
        Self {
            form_field_path,
            ..self.clone()
        }
    }

    #[must_use]
    pub fn with_group_members(&self, group_members: Vec<Observation>) -> Self {
        Self {
            group_members,
            ..self.clone()
        }
    }

    /// Soft-delete this observation and all its members.
    #[must_use]
    pub fn voided(&self) -> Self {
        Self {
            voided: true,
            group_members: self.group_members.iter().map(Self::voided).collect(),
            ..self.clone()
        }
    }

    /// Clear `uuid` here and on every nested member.
    #[must_use]
    pub fn without_uuid(&self) -> Self {
        Self {
            uuid: None,
            group_members: self.group_members.iter().map(Self::without_uuid).collect(),
            ..self.clone()
        }
    }
}

/// Values the UI reports for a control that holds nothing.
#[must_use]
pub fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(fields) => fields.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}
