use std::sync::Arc;

use obsform_model::Control;
use obsform_model::ControlType;
use obsform_model::Finding;
use obsform_model::FormDefinition;
use obsform_model::Interpretation;
use obsform_model::Observation;
use obsform_path::FormFieldPath;
use serde_json::Value;

use crate::mapper::fresh_observation;
use crate::DataSource;
use crate::TreeError;
use crate::ValueMapper;

/// One control instance in a record tree.
///
/// Records are immutable. Every `with_*` method and every tree operation
/// returns a new value; children are shared through `Arc`, so an update only
/// copies the nodes on the path from the root to the changed record.
#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    control: Arc<Control>,
    path: FormFieldPath,
    children: Vec<Arc<Record>>,
    data_source: Option<DataSource>,
    mapper: Option<ValueMapper>,
    value: Value,
    active: bool,
    enabled: bool,
    hidden: bool,
    errors: Vec<Finding>,
    voided: bool,
}

impl Record {
    /// A bare record for `control` at `path`, without children or data.
    #[must_use]
    pub fn new(control: Arc<Control>, path: FormFieldPath) -> Self {
        let mapper = ValueMapper::for_control(&control);
        let value = mapper.map_or(Value::Null, |mapper| mapper.to_ui(None));
        Self {
            control,
            path,
            children: Vec::new(),
            data_source: None,
            mapper,
            value,
            active: true,
            enabled: true,
            hidden: false,
            errors: Vec::new(),
            voided: false,
        }
    }

    /// The synthetic root holding a form's top-level records.
    #[must_use]
    pub fn form_root(form: &FormDefinition, children: Vec<Arc<Record>>) -> Self {
        let control = Control::new(form.name.clone(), ControlType::Section)
            .with_controls(form.controls.clone());
        Self::new(Arc::new(control), form.root_path()).with_children(children)
    }

    /// A never-persisted record for `control` at `path`, with one blank
    /// instance of every child control.
    #[must_use]
    pub fn blank(control: Arc<Control>, path: FormFieldPath) -> Self {
        let children = control
            .layout()
            .into_iter()
            .map(|child| {
                let child_path = path.child(child.id.clone(), 0);
                Arc::new(Self::blank(Arc::new(child.clone()), child_path))
            })
            .collect();
        Self::new(control, path).with_children(children)
    }

    #[must_use]
    pub fn control(&self) -> &Control {
        &self.control
    }

    #[must_use]
    pub fn path(&self) -> &FormFieldPath {
        &self.path
    }

    #[must_use]
    pub fn children(&self) -> &[Arc<Record>] {
        &self.children
    }

    #[must_use]
    pub fn data_source(&self) -> Option<&DataSource> {
        self.data_source.as_ref()
    }

    #[must_use]
    pub fn mapper(&self) -> Option<ValueMapper> {
        self.mapper
    }

    #[must_use]
    pub fn value(&self) -> &Value {
        &self.value
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[must_use]
    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    #[must_use]
    pub fn errors(&self) -> &[Finding] {
        &self.errors
    }

    #[must_use]
    pub fn is_form_root(&self) -> bool {
        self.path.is_form_root()
    }

    /// Records that take part in the observation payload: bound records and
    /// the containers around them.
    #[must_use]
    pub fn carries_data(&self) -> bool {
        self.mapper.is_some() || self.control.kind.is_container() || self.is_form_root()
    }

    /// Leaf records report their own flag. An obs group is voided when every
    /// observation below it is voided or was never entered.
    #[must_use]
    pub fn is_voided(&self) -> bool {
        match self.mapper {
            Some(ValueMapper::ObsGroup) => self
                .children
                .iter()
                .filter(|child| child.carries_data())
                .all(|child| child.is_voided_or_empty()),
            _ => self.voided,
        }
    }

    fn is_voided_or_empty(&self) -> bool {
        match self.mapper {
            Some(ValueMapper::ObsGroup) => self.is_voided(),
            Some(_) => self.voided || !self.has_value(),
            None => self
                .children
                .iter()
                .filter(|child| child.carries_data())
                .all(|child| child.is_voided_or_empty()),
        }
    }

    #[must_use]
    pub fn has_value(&self) -> bool {
        match self.mapper {
            Some(ValueMapper::Obs | ValueMapper::ObsList) => {
                self.data_source.as_ref().is_some_and(DataSource::has_value)
            }
            Some(ValueMapper::ObsGroup) | None => {
                self.children.iter().any(|child| child.has_value())
            }
        }
    }

    /// True when this record or any record below it holds a stored
    /// observation.
    #[must_use]
    pub fn is_persisted(&self) -> bool {
        self.data_source
            .as_ref()
            .is_some_and(DataSource::is_persisted)
            || self.children.iter().any(|child| child.is_persisted())
    }

    /// Map a UI value into the data source. Records without a mapper store
    /// the value as is.
    pub fn with_value(&self, value: Value) -> Result<Self, TreeError> {
        if !self.active {
            return Err(TreeError::RecordRemoved {
                path: self.path.to_string(),
            });
        }

        match self.mapper {
            None => Ok(Self {
                value,
                ..self.clone()
            }),
            Some(mapper) => {
                let source =
                    mapper.from_ui(self.data_source.as_ref(), &self.control, &self.path, value)?;
                Ok(self.with_data_source(Some(source)))
            }
        }
    }

    /// Data source to UI value; the stored value for records without mapper.
    #[must_use]
    pub fn computed_value(&self) -> Value {
        match self.mapper {
            Some(mapper) => mapper.to_ui(self.data_source.as_ref()),
            None => self.value.clone(),
        }
    }

    /// Observations to persist for this record.
    ///
    /// Obs groups nest their members' payloads under `groupMembers`; sections,
    /// tables and the form root flatten their children's payloads.
    pub fn observation_payload(&self) -> Result<Vec<Observation>, TreeError> {
        match self.mapper {
            Some(ValueMapper::Obs | ValueMapper::ObsList) => Ok(self
                .data_source
                .as_ref()
                .map(DataSource::payload)
                .unwrap_or_default()),
            Some(ValueMapper::ObsGroup) => self.group_payload(),
            None if self.control.kind.is_container() || self.is_form_root() => {
                self.children_payload()
            }
            None => Err(TreeError::MissingMapper {
                path: self.path.to_string(),
            }),
        }
    }

    fn children_payload(&self) -> Result<Vec<Observation>, TreeError> {
        let mut payload = Vec::new();
        for child in self.children.iter().filter(|child| child.carries_data()) {
            payload.extend(child.observation_payload()?);
        }
        Ok(payload)
    }

    fn group_payload(&self) -> Result<Vec<Observation>, TreeError> {
        let members = self.children_payload()?;
        let group = match &self.data_source {
            Some(DataSource::Single(obs)) => obs.clone(),
            Some(DataSource::List(_)) | None => fresh_observation(&self.control, &self.path)?,
        };

        if members.is_empty() && !group.is_persisted() {
            return Ok(Vec::new());
        }

        let voided = self.is_voided();
        Ok(vec![Observation {
            voided,
            value: None,
            ..group.with_group_members(members)
        }])
    }

    /// Take this record out of the logical form. Stored observations are
    /// voided so storage can soft-delete them; unsaved data is dropped.
    #[must_use]
    pub fn mark_removed(&self) -> Self {
        let data_source = self.data_source.as_ref().and_then(DataSource::removed);
        let voided = self.mapper.is_some() && data_source.is_some();
        Self {
            active: false,
            value: self
                .mapper
                .map_or(Value::Null, |mapper| mapper.to_ui(data_source.as_ref())),
            data_source,
            voided,
            children: self
                .children
                .iter()
                .map(|child| Arc::new(child.mark_removed()))
                .collect(),
            ..self.clone()
        }
    }

    /// Only active children, recursively.
    #[must_use]
    pub fn prune_inactive(&self) -> Self {
        let children = self
            .children
            .iter()
            .filter(|child| child.active)
            .map(|child| Arc::new(child.prune_inactive()))
            .collect();
        self.with_children(children)
    }

    /// Findings of this record and everything below it. Hidden or disabled
    /// records contribute nothing, and neither do their descendants.
    #[must_use]
    pub fn collect_errors(&self) -> Vec<Finding> {
        if self.hidden || !self.enabled {
            return Vec::new();
        }

        let mut errors = self.errors.clone();
        for child in &self.children {
            errors.extend(child.collect_errors());
        }
        errors
    }

    /// Clear every stored identity in this subtree.
    #[must_use]
    pub fn strip_persisted_identity(&self) -> Self {
        Self {
            data_source: self.data_source.as_ref().map(DataSource::without_uuid),
            children: self
                .children
                .iter()
                .map(|child| Arc::new(child.strip_persisted_identity()))
                .collect(),
            ..self.clone()
        }
    }

    /// A blank copy of this record at `path`: no data, no findings, and one
    /// instance of each child control.
    ///
    /// Child controls reuse the shared definitions of this record's children
    /// where one exists.
    #[must_use]
    pub fn fresh_instance(&self, path: FormFieldPath) -> Self {
        let children = self
            .control
            .layout()
            .into_iter()
            .map(|child_control| {
                let child_path = path.child(child_control.id.clone(), 0);
                let template = self
                    .children
                    .iter()
                    .filter(|child| child.control.id == child_control.id)
                    .min_by_key(|child| child.path.instance());
                Arc::new(match template {
                    Some(template) => template.fresh_instance(child_path),
                    None => Self::blank(Arc::new(child_control.clone()), child_path),
                })
            })
            .collect();

        Self::new(Arc::clone(&self.control), path).with_children(children)
    }

    #[must_use]
    pub fn with_enabled(&self, enabled: bool) -> Self {
        Self {
            enabled,
            ..self.clone()
        }
    }

    #[must_use]
    pub fn with_hidden(&self, hidden: bool) -> Self {
        Self {
            hidden,
            ..self.clone()
        }
    }

    #[must_use]
    pub fn with_errors(&self, errors: Vec<Finding>) -> Self {
        Self {
            errors,
            ..self.clone()
        }
    }

    /// Attach a free-text note to the record's observation.
    pub fn with_comment(&self, comment: Option<String>) -> Result<Self, TreeError> {
        self.map_single_observation(|obs| obs.with_comment(comment))
    }

    pub fn with_interpretation(
        &self,
        interpretation: Option<Interpretation>,
    ) -> Result<Self, TreeError> {
        self.map_single_observation(|obs| obs.with_interpretation(interpretation))
    }

    fn map_single_observation(
        &self,
        f: impl FnOnce(&Observation) -> Observation,
    ) -> Result<Self, TreeError> {
        if self.mapper != Some(ValueMapper::Obs) {
            return Err(TreeError::UnsupportedValue {
                path: self.path.to_string(),
            });
        }
        let obs = match &self.data_source {
            Some(DataSource::Single(obs)) => obs.clone(),
            Some(DataSource::List(_)) | None => fresh_observation(&self.control, &self.path)?,
        };
        Ok(Self {
            data_source: Some(DataSource::Single(f(&obs))),
            ..self.clone()
        })
    }

    pub(crate) fn with_children(&self, children: Vec<Arc<Record>>) -> Self {
        Self {
            children,
            ..self.clone()
        }
    }

    pub(crate) fn with_data_source(&self, data_source: Option<DataSource>) -> Self {
        let value = self
            .mapper
            .map_or_else(|| self.value.clone(), |mapper| mapper.to_ui(data_source.as_ref()));
        let voided = data_source.as_ref().is_some_and(DataSource::is_voided);
        Self {
            data_source,
            value,
            voided,
            ..self.clone()
        }
    }

    /// Mark a subtree built from rows flagged inactive in storage. Unlike
    /// [`Record::mark_removed`] nothing is voided; the rows are history already.
    pub(crate) fn into_history(self) -> Self {
        Self {
            active: false,
            children: self
                .children
                .iter()
                .map(|child| Arc::new(Self::clone(child).into_history()))
                .collect(),
            ..self
        }
    }
}
