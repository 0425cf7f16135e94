use obsform_model::is_empty_value;
use obsform_model::Control;
use obsform_model::ControlType;
use obsform_model::Observation;
use obsform_path::FormFieldPath;
use serde_json::Value;

use crate::TreeError;

/// The persisted data behind a record.
#[derive(Clone, Debug, PartialEq)]
pub enum DataSource {
    Single(Observation),
    /// One observation per selected answer of a multi-select control.
    List(Vec<Observation>),
}

impl DataSource {
    #[must_use]
    pub fn observations(&self) -> &[Observation] {
        match self {
            Self::Single(obs) => std::slice::from_ref(obs),
            Self::List(list) => list,
        }
    }

    #[must_use]
    pub fn is_persisted(&self) -> bool {
        self.observations().iter().any(Observation::is_persisted)
    }

    #[must_use]
    pub fn has_value(&self) -> bool {
        self.observations()
            .iter()
            .any(|obs| !obs.voided && obs.has_value())
    }

    #[must_use]
    pub fn is_voided(&self) -> bool {
        let observations = self.observations();
        !observations.is_empty() && observations.iter().all(|obs| obs.voided)
    }

    #[must_use]
    pub fn without_uuid(&self) -> Self {
        match self {
            Self::Single(obs) => Self::Single(obs.without_uuid()),
            Self::List(list) => Self::List(list.iter().map(Observation::without_uuid).collect()),
        }
    }

    /// The data source left behind when its record is removed: persisted
    /// observations are voided, everything else is dropped.
    #[must_use]
    pub fn removed(&self) -> Option<Self> {
        match self {
            Self::Single(obs) if obs.is_persisted() => Some(Self::Single(obs.voided())),
            Self::Single(_) => None,
            Self::List(list) => {
                let kept: Vec<Observation> = list
                    .iter()
                    .filter(|obs| obs.is_persisted())
                    .map(Observation::voided)
                    .collect();
                (!kept.is_empty()).then_some(Self::List(kept))
            }
        }
    }

    /// Observations worth sending to storage. Unsaved observations without a
    /// live value have nothing to persist.
    #[must_use]
    pub fn payload(&self) -> Vec<Observation> {
        self.observations()
            .iter()
            .filter(|obs| obs.is_persisted() || (!obs.voided && obs.has_value()))
            .cloned()
            .collect()
    }
}

/// Translates between what a control shows and what it stores.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValueMapper {
    /// A single observation with a scalar or coded value.
    Obs,
    /// A multi-select coded control, one observation per selected answer.
    ObsList,
    /// An obs group; its value lives in the member records.
    ObsGroup,
}

impl ValueMapper {
    #[must_use]
    pub fn for_control(control: &Control) -> Option<Self> {
        match control.kind {
            ControlType::ObsControl if control.properties.multi_select => Some(Self::ObsList),
            ControlType::ObsControl => Some(Self::Obs),
            ControlType::ObsGroupControl => Some(Self::ObsGroup),
            ControlType::Section | ControlType::Table | ControlType::Label | ControlType::Unknown => {
                None
            }
        }
    }

    /// Data source to UI value.
    #[must_use]
    pub fn to_ui(self, data_source: Option<&DataSource>) -> Value {
        match (self, data_source) {
            (Self::Obs, Some(DataSource::Single(obs))) if !obs.voided => {
                obs.value.clone().unwrap_or(Value::Null)
            }
            (Self::ObsList, Some(source)) => Value::Array(
                source
                    .observations()
                    .iter()
                    .filter(|obs| !obs.voided)
                    .filter_map(|obs| obs.value.clone())
                    .collect(),
            ),
            (Self::ObsList, None) => Value::Array(Vec::new()),
            _ => Value::Null,
        }
    }

    /// UI value to data source, starting from the current one.
    pub fn from_ui(
        self,
        current: Option<&DataSource>,
        control: &Control,
        path: &FormFieldPath,
        value: Value,
    ) -> Result<DataSource, TreeError> {
        match self {
            Self::Obs => {
                let base = match current {
                    Some(DataSource::Single(obs)) => obs.clone(),
                    Some(DataSource::List(_)) => {
                        return Err(TreeError::UnsupportedValue {
                            path: path.to_string(),
                        })
                    }
                    None => fresh_observation(control, path)?,
                };
                Ok(DataSource::Single(base.with_value(Some(value))))
            }
            Self::ObsList => {
                let selected = match value {
                    Value::Null => Vec::new(),
                    Value::Array(items) => items
                        .into_iter()
                        .filter(|item| !is_empty_value(item))
                        .collect(),
                    other if is_empty_value(&other) => Vec::new(),
                    other => vec![other],
                };
                let current = current.map(DataSource::observations).unwrap_or_default();
                Ok(DataSource::List(reconcile_selection(
                    current, selected, control, path,
                )?))
            }
            Self::ObsGroup => Err(TreeError::UnsupportedValue {
                path: path.to_string(),
            }),
        }
    }
}

pub(crate) fn fresh_observation(
    control: &Control,
    path: &FormFieldPath,
) -> Result<Observation, TreeError> {
    let concept = control
        .concept
        .as_ref()
        .ok_or_else(|| TreeError::MissingMapper {
            path: path.to_string(),
        })?;
    Ok(Observation::new(concept.reference(), path.clone()))
}

/// Keep observations whose answer is still selected, void persisted ones
/// that are not, and create observations for new answers.
fn reconcile_selection(
    current: &[Observation],
    mut selected: Vec<Value>,
    control: &Control,
    path: &FormFieldPath,
) -> Result<Vec<Observation>, TreeError> {
    let mut result = Vec::with_capacity(current.len().max(selected.len()));

    for obs in current {
        let position = obs
            .value
            .as_ref()
            .and_then(|value| selected.iter().position(|answer| same_answer(value, answer)));
        match position {
            Some(index) => result.push(obs.with_value(Some(selected.remove(index)))),
            None if obs.is_persisted() => result.push(obs.voided()),
            None => {}
        }
    }

    for answer in selected {
        result.push(fresh_observation(control, path)?.with_value(Some(answer)));
    }

    Ok(result)
}

/// Coded answers are compared by uuid when both sides carry one.
fn same_answer(left: &Value, right: &Value) -> bool {
    match (
        left.get("uuid").and_then(Value::as_str),
        right.get("uuid").and_then(Value::as_str),
    ) {
        (Some(left), Some(right)) => left == right,
        _ => left == right,
    }
}
