use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Arc;

use obsform_conf::Settings;
use obsform_model::Control;
use obsform_model::ControlType;
use obsform_model::FormDefinition;
use obsform_model::Observation;
use obsform_path::FormFieldPath;
use rustc_hash::FxHashMap;

use crate::DataSource;
use crate::Record;
use crate::TreeError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BuildOptions {
    /// Rewrite single-segment paths of nested controls onto the nested scheme.
    pub legacy_paths: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self { legacy_paths: true }
    }
}

impl From<&Settings> for BuildOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            legacy_paths: settings.legacy_paths,
        }
    }
}

/// Builds the initial record tree of a form from its stored observations.
#[derive(Clone, Debug, Default)]
pub struct TreeBuilder {
    options: BuildOptions,
}

impl TreeBuilder {
    #[must_use]
    pub fn new(options: BuildOptions) -> Self {
        Self { options }
    }

    /// Build the tree for `form`, attaching every observation to the control
    /// instance its path names.
    ///
    /// Controls without observations get one blank record at instance `0`.
    /// Observations that belong to another form or to no control of this one
    /// are skipped.
    pub fn build(
        &self,
        form: &FormDefinition,
        observations: &[Observation],
    ) -> Result<Record, TreeError> {
        form.check()?;

        let level = LevelBuilder {
            index: ControlIndex::new(form),
            legacy_paths: self.options.legacy_paths,
        };
        let root_path = form.root_path();
        let rows = level.top_level_rows(&root_path, observations);
        let children = level.build_level(&form.layout(), &root_path, &rows);

        tracing::debug!(
            form = %root_path,
            observations = observations.len(),
            attached = rows.len(),
            "built record tree"
        );

        Ok(Record::form_root(form, children))
    }
}

/// Control id to the ids of its ancestors, outermost first, ending with the
/// control itself.
struct ControlIndex<'a> {
    chains: FxHashMap<&'a str, Vec<&'a str>>,
}

impl<'a> ControlIndex<'a> {
    fn new(form: &'a FormDefinition) -> Self {
        let mut chains = FxHashMap::default();
        let mut stack: Vec<(&'a Control, Vec<&'a str>)> =
            form.controls.iter().map(|control| (control, Vec::new())).collect();

        while let Some((control, mut chain)) = stack.pop() {
            chain.push(control.id.as_str());
            for child in &control.controls {
                stack.push((child, chain.clone()));
            }
            chains.insert(control.id.as_str(), chain);
        }

        Self { chains }
    }

    fn contains(&self, control_id: &str) -> bool {
        self.chains.contains_key(control_id)
    }

    /// The nested path a legacy single-segment `path` stands for, relative to
    /// `anchor`. `anchor_id` is the control at `anchor`, `None` for the form
    /// root. Returns `None` when `path` needs no rewrite or cannot be placed.
    fn legacy_target(
        &self,
        path: &FormFieldPath,
        anchor: &FormFieldPath,
        anchor_id: Option<&str>,
    ) -> Option<FormFieldPath> {
        if path.depth() != 1 {
            return None;
        }

        let segment = path.last()?;
        let chain = self.chains.get(segment.control_id())?;
        let start = match anchor_id {
            Some(anchor_id) => chain.iter().position(|id| *id == anchor_id)? + 1,
            None => 0,
        };
        let between = chain.get(start..chain.len() - 1)?;
        if anchor_id.is_none() && between.is_empty() {
            return None;
        }

        let target = between
            .iter()
            .fold(anchor.clone(), |target, id| target.child(*id, 0));
        Some(target.child(segment.control_id(), segment.instance()))
    }
}

struct LevelBuilder<'a> {
    index: ControlIndex<'a>,
    legacy_paths: bool,
}

impl LevelBuilder<'_> {
    fn top_level_rows(&self, root: &FormFieldPath, observations: &[Observation]) -> Vec<Observation> {
        observations
            .iter()
            .filter_map(|obs| {
                let path = &obs.form_field_path;
                if !path.belongs_to_form(root) {
                    tracing::warn!(path = %path, form = %root, "skipping observation of another form");
                    return None;
                }
                let Some(control_id) = path.control_id() else {
                    tracing::warn!(path = %path, "skipping observation at the form root");
                    return None;
                };
                if !self.index.contains(control_id) {
                    tracing::warn!(path = %path, control = control_id, "skipping observation of unknown control");
                    return None;
                }
                Some(self.rewrite_legacy(obs, root, None))
            })
            .collect()
    }

    fn rewrite_legacy(
        &self,
        obs: &Observation,
        anchor: &FormFieldPath,
        anchor_id: Option<&str>,
    ) -> Observation {
        if !self.legacy_paths {
            return obs.clone();
        }

        match self
            .index
            .legacy_target(&obs.form_field_path, anchor, anchor_id)
        {
            Some(path) => {
                tracing::debug!(from = %obs.form_field_path, to = %path, "rewrote legacy path");
                obs.with_path(path)
            }
            None => obs.clone(),
        }
    }

    fn build_level(
        &self,
        controls: &[&Control],
        container: &FormFieldPath,
        rows: &[Observation],
    ) -> Vec<Arc<Record>> {
        controls
            .iter()
            .flat_map(|control| self.build_control(control, container, rows))
            .collect()
    }

    fn build_control(
        &self,
        control: &Control,
        container: &FormFieldPath,
        rows: &[Observation],
    ) -> Vec<Arc<Record>> {
        match control.kind {
            ControlType::ObsControl => Self::build_obs(control, container, rows),
            ControlType::ObsGroupControl => self.build_group(control, container, rows),
            ControlType::Section | ControlType::Table => {
                self.build_container(control, container, rows)
            }
            ControlType::Label | ControlType::Unknown => {
                let path = container.child(control.id.clone(), 0);
                vec![Arc::new(Record::blank(Arc::new(control.clone()), path))]
            }
        }
    }

    fn build_obs(
        control: &Control,
        container: &FormFieldPath,
        rows: &[Observation],
    ) -> Vec<Arc<Record>> {
        let shared = Arc::new(control.clone());
        let mut records: Vec<Arc<Record>> = direct_instances(rows, container, &control.id)
            .into_iter()
            .filter_map(|(instance, matched)| {
                let path = container.child(control.id.clone(), instance);
                let (chosen, history) = prefer_live(matched);
                let source = if control.is_multi_select() {
                    DataSource::List(chosen.into_iter().cloned().collect())
                } else {
                    if chosen.len() > 1 {
                        tracing::warn!(
                            path = %path,
                            rows = chosen.len(),
                            "several observations for a single-valued control, keeping the first"
                        );
                    }
                    DataSource::Single(chosen.first().copied()?.clone())
                };

                let record = Record::new(Arc::clone(&shared), path).with_data_source(Some(source));
                Some(Arc::new(if history {
                    record.into_history()
                } else {
                    record
                }))
            })
            .collect();

        ensure_live_instance(&mut records, &shared, container);
        records
    }

    fn build_group(
        &self,
        control: &Control,
        container: &FormFieldPath,
        rows: &[Observation],
    ) -> Vec<Arc<Record>> {
        let shared = Arc::new(control.clone());
        let layout = control.layout();
        let mut group_rows = direct_instances(rows, container, &control.id);
        let instances = instances_below(rows, container, &control.id);

        let mut records: Vec<Arc<Record>> = instances
            .into_iter()
            .map(|instance| {
                let path = container.child(control.id.clone(), instance);
                let (matched, history) = prefer_live(group_rows.remove(&instance).unwrap_or_default());
                let group_obs = matched.first().copied();

                let mut candidates: Vec<Observation> = rows
                    .iter()
                    .filter(|obs| obs.form_field_path.is_descendant_of(&path))
                    .cloned()
                    .collect();
                for member in group_obs.into_iter().flat_map(|obs| obs.group_members.iter()) {
                    let member = self.rewrite_legacy(member, &path, Some(&control.id));
                    if member.form_field_path.is_descendant_of(&path) {
                        candidates.push(member);
                    } else {
                        tracing::warn!(
                            group = %path,
                            member = %member.form_field_path,
                            "dropping group member outside its group"
                        );
                    }
                }

                let children = self.build_level(&layout, &path, &candidates);
                let record = Record::new(Arc::clone(&shared), path).with_children(children);
                Arc::new(match group_obs {
                    Some(obs) => {
                        let record = record.with_data_source(Some(DataSource::Single(
                            obs.with_group_members(Vec::new()),
                        )));
                        if history {
                            record.into_history()
                        } else {
                            record
                        }
                    }
                    None => record,
                })
            })
            .collect();

        ensure_live_instance(&mut records, &shared, container);
        records
    }

    fn build_container(
        &self,
        control: &Control,
        container: &FormFieldPath,
        rows: &[Observation],
    ) -> Vec<Arc<Record>> {
        let shared = Arc::new(control.clone());
        let layout = control.layout();
        let mut instances = instances_below(rows, container, &control.id);
        if instances.is_empty() {
            instances.insert(0);
        }

        instances
            .into_iter()
            .map(|instance| {
                let path = container.child(control.id.clone(), instance);
                let candidates: Vec<Observation> = rows
                    .iter()
                    .filter(|obs| obs.form_field_path.is_descendant_of(&path))
                    .cloned()
                    .collect();
                let children = self.build_level(&layout, &path, &candidates);
                Arc::new(Record::new(Arc::clone(&shared), path).with_children(children))
            })
            .collect()
    }
}

/// Rows sitting directly at `container/<control_id>-n`, keyed by `n`.
fn direct_instances<'a>(
    rows: &'a [Observation],
    container: &FormFieldPath,
    control_id: &str,
) -> BTreeMap<u32, Vec<&'a Observation>> {
    let mut by_instance: BTreeMap<u32, Vec<&'a Observation>> = BTreeMap::new();
    for obs in rows {
        let path = &obs.form_field_path;
        if path.depth() == container.depth() + 1
            && path.starts_with(container)
            && path.control_id() == Some(control_id)
        {
            if let Some(instance) = path.instance() {
                by_instance.entry(instance).or_default().push(obs);
            }
        }
    }
    by_instance
}

/// Instances of `control_id` under `container` named by any row at or below
/// them.
fn instances_below(rows: &[Observation], container: &FormFieldPath, control_id: &str) -> BTreeSet<u32> {
    rows.iter()
        .map(|obs| &obs.form_field_path)
        .filter(|path| path.is_descendant_of(container))
        .filter_map(|path| path.segments().get(container.depth()))
        .filter(|segment| segment.control_id() == control_id)
        .map(|segment| segment.instance())
        .collect()
}

/// Give a control whose stored instances are all history one blank live
/// instance after them.
fn ensure_live_instance(records: &mut Vec<Arc<Record>>, control: &Arc<Control>, container: &FormFieldPath) {
    if records.iter().any(|record| record.is_active()) {
        return;
    }

    let last = records
        .iter()
        .filter_map(|record| record.path().instance())
        .max();
    let Some(next) = last.map_or(Some(0), |max| max.checked_add(1)) else {
        tracing::warn!(control = %control.id, "no instance index left for a live instance");
        return;
    };
    let path = container.child(control.id.clone(), next);
    records.push(Arc::new(Record::blank(Arc::clone(control), path)));
}

/// Live rows when there are any, otherwise the history rows. The flag is true
/// for the latter.
fn prefer_live(rows: Vec<&Observation>) -> (Vec<&Observation>, bool) {
    let live: Vec<&Observation> = rows.iter().copied().filter(|obs| !obs.inactive).collect();
    if live.is_empty() {
        (rows, true)
    } else {
        (live, false)
    }
}
