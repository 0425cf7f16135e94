use obsform_model::Finding;
use obsform_model::Observation;

use crate::Record;
use crate::TreeError;

/// The tree a renderer shows: removed and history records are gone.
#[must_use]
pub fn to_active_tree(root: &Record) -> Record {
    root.prune_inactive()
}

/// Observations to persist for the active part of the tree, group members
/// nested under their group.
pub fn to_observation_list(root: &Record) -> Result<Vec<Observation>, TreeError> {
    to_active_tree(root).observation_payload()
}

/// Void instructions for stored observations of records removed since the
/// tree was built. History rows that were already inactive in storage are
/// not repeated.
pub fn to_void_list(root: &Record) -> Result<Vec<Observation>, TreeError> {
    let mut voids = Vec::new();
    collect_voids(root, &mut voids)?;
    Ok(voids)
}

/// Findings of the active tree, hidden and disabled records excluded.
#[must_use]
pub fn to_error_list(root: &Record) -> Vec<Finding> {
    to_active_tree(root).collect_errors()
}

fn collect_voids(record: &Record, voids: &mut Vec<Observation>) -> Result<(), TreeError> {
    if record.is_active() {
        for child in record.children() {
            collect_voids(child, voids)?;
        }
        return Ok(());
    }

    if record.carries_data() {
        for obs in record.observation_payload()? {
            voids.extend(persisted_voids(obs));
        }
    }
    Ok(())
}

/// Voided stored observations in `obs`. Unsaved groups are unwrapped so the
/// stored members inside them still reach storage.
fn persisted_voids(obs: Observation) -> Vec<Observation> {
    if obs.is_persisted() {
        return if obs.voided { vec![obs] } else { Vec::new() };
    }
    obs.group_members
        .into_iter()
        .flat_map(persisted_voids)
        .collect()
}
