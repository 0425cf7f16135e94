use obsform_model::ControlType;
use obsform_model::Finding;
use serde::Serialize;
use serde_json::Value;

use crate::Record;

/// A plain, serializable view of a record tree.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RecordSnapshot {
    pub path: String,
    pub kind: ControlType,
    #[serde(skip_serializing_if = "Value::is_null")]
    pub value: Value,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub inactive: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub voided: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub persisted: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<Finding>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<RecordSnapshot>,
}

impl From<&Record> for RecordSnapshot {
    fn from(record: &Record) -> Self {
        // blank groups count as voided; only report stored voids
        let voided = record.is_voided() && record.is_persisted();

        Self {
            path: record.path().to_string(),
            kind: record.control().kind,
            value: record.computed_value(),
            inactive: !record.is_active(),
            voided,
            persisted: record
                .data_source()
                .is_some_and(crate::DataSource::is_persisted),
            errors: record.errors().to_vec(),
            children: record
                .children()
                .iter()
                .map(|child| Self::from(child.as_ref()))
                .collect(),
        }
    }
}
