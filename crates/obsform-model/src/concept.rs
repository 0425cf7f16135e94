use serde::Deserialize;
use serde::Serialize;

/// Datatype of a concept, as reported by the terminology service.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConceptDatatype {
    Numeric,
    Text,
    Coded,
    Boolean,
    Date,
    Datetime,
    Complex,
    #[default]
    #[serde(rename = "N/A")]
    NotApplicable,
    #[serde(other)]
    Other,
}

/// A clinical concept referenced by a control or an observation.
///
/// Numeric reference ranges are only meaningful for numeric concepts and are
/// consulted by the validator.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Concept {
    pub uuid: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub datatype: ConceptDatatype,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concept_class: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub units: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub low_normal: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hi_normal: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub low_absolute: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hi_absolute: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_decimal: Option<bool>,
}

impl Concept {
    #[must_use]
    pub fn new(uuid: impl Into<String>, name: impl Into<String>, datatype: ConceptDatatype) -> Self {
        Self {
            uuid: uuid.into(),
            name: name.into(),
            datatype,
            ..Self::default()
        }
    }

    /// The part of the concept carried on persisted observations.
    #[must_use]
    pub fn reference(&self) -> Self {
        Self::new(self.uuid.clone(), self.name.clone(), self.datatype)
    }

    #[must_use]
    pub fn is_numeric(&self) -> bool {
        self.datatype == ConceptDatatype::Numeric
    }

    #[must_use]
    pub fn is_date(&self) -> bool {
        matches!(
            self.datatype,
            ConceptDatatype::Date | ConceptDatatype::Datetime
        )
    }
}
