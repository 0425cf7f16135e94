use obsform_path::FormFieldPath;
use rustc_hash::FxHashSet;
use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;

use crate::Concept;
use crate::ModelError;

/// A declarative form: name, version and a tree of controls.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormDefinition {
    pub name: String,
    #[serde(deserialize_with = "string_or_number")]
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    #[serde(default)]
    pub controls: Vec<Control>,
}

impl FormDefinition {
    /// Parse a form definition and check that its control ids are unique.
    pub fn from_json(source: &str) -> Result<Self, ModelError> {
        let form: Self = serde_json::from_str(source)?;
        form.check()?;
        Ok(form)
    }

    /// Structural checks a form must pass before a record tree is built.
    pub fn check(&self) -> Result<(), ModelError> {
        if self.name.is_empty() {
            return Err(ModelError::MissingFormName);
        }

        let mut seen = FxHashSet::default();
        let mut stack: Vec<&Control> = self.controls.iter().collect();
        while let Some(control) = stack.pop() {
            if control.id.is_empty() || control.id.contains('/') {
                return Err(ModelError::InvalidControlId {
                    id: control.id.clone(),
                });
            }
            if !seen.insert(control.id.as_str()) {
                return Err(ModelError::DuplicateControlId {
                    id: control.id.clone(),
                });
            }
            if control.kind.is_data_bearing() && control.concept.is_none() {
                return Err(ModelError::MissingConcept {
                    id: control.id.clone(),
                });
            }
            stack.extend(control.controls.iter());
        }

        Ok(())
    }

    #[must_use]
    pub fn root_path(&self) -> FormFieldPath {
        FormFieldPath::form_root(self.name.clone(), self.version.clone())
    }

    /// Top-level controls in layout order.
    #[must_use]
    pub fn layout(&self) -> Vec<&Control> {
        layout_order(&self.controls)
    }
}

/// Control kinds. The kind is carried as opaque data for renderers; the tree
/// only distinguishes leaves, obs groups and plain containers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ControlType {
    ObsControl,
    ObsGroupControl,
    Section,
    Table,
    Label,
    #[serde(other)]
    Unknown,
}

impl ControlType {
    /// Controls that persist an observation of their own.
    #[must_use]
    pub fn is_data_bearing(self) -> bool {
        matches!(self, Self::ObsControl | Self::ObsGroupControl)
    }

    /// Layout-only containers that group children without an observation.
    #[must_use]
    pub fn is_container(self) -> bool {
        matches!(self, Self::Section | Self::Table)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Control {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ControlType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concept: Option<Concept>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<Label>,
    #[serde(default)]
    pub properties: Properties,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub controls: Vec<Control>,
}

impl Control {
    #[must_use]
    pub fn new(id: impl Into<String>, kind: ControlType) -> Self {
        Self {
            id: id.into(),
            kind,
            concept: None,
            label: None,
            properties: Properties::default(),
            controls: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_concept(mut self, concept: Concept) -> Self {
        self.concept = Some(concept);
        self
    }

    #[must_use]
    pub fn with_properties(mut self, properties: Properties) -> Self {
        self.properties = properties;
        self
    }

    #[must_use]
    pub fn with_controls(mut self, controls: Vec<Control>) -> Self {
        self.controls = controls;
        self
    }

    #[must_use]
    pub fn is_multi_select(&self) -> bool {
        self.kind == ControlType::ObsControl && self.properties.multi_select
    }

    /// Child controls in layout order.
    #[must_use]
    pub fn layout(&self) -> Vec<&Control> {
        layout_order(&self.controls)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Label {
    #[serde(default)]
    pub value: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Properties {
    pub location: Location,
    pub mandatory: bool,
    pub add_more: bool,
    pub multi_select: bool,
    pub notes: bool,
    pub hide_label: bool,
    pub abnormal: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_future_dates: Option<bool>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct Location {
    pub row: u32,
    pub column: u32,
}

fn layout_order(controls: &[Control]) -> Vec<&Control> {
    let mut ordered: Vec<&Control> = controls.iter().collect();
    // stable: ties keep definition order
    ordered.sort_by_key(|control| control.properties.location);
    ordered
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Version {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Version::deserialize(deserializer)? {
        Version::Text(text) => text,
        Version::Number(number) => number.to_string(),
    })
}
