//! Path-keyed queries and edits over a record tree.
//!
//! Every edit takes the current root and returns a new one. Only the records
//! on the path from the root to the edited record are rebuilt; everything else
//! is shared with the previous tree.

use std::sync::Arc;

use obsform_path::generate_next_path;
use obsform_path::FormFieldPath;
use serde_json::Value;

use crate::Record;
use crate::TreeError;

/// The record at exactly `path`.
#[must_use]
pub fn find<'a>(root: &'a Record, path: &FormFieldPath) -> Option<&'a Record> {
    if !path.starts_with(root.path()) {
        return None;
    }

    let mut current = root;
    while current.path() != path {
        current = current
            .children()
            .iter()
            .find(|child| path.starts_with(child.path()))
            .map(Arc::as_ref)?;
    }
    Some(current)
}

/// Replace the record sharing `record`'s path. `None` when there is no such
/// record.
#[must_use]
pub fn update(root: &Record, record: Record) -> Option<Record> {
    let path = record.path().clone();
    map_at(root, &path, |_| Ok(record)).ok().flatten()
}

/// Set the UI value of the record at `path`.
pub fn update_value(root: &Record, path: &FormFieldPath, value: Value) -> Result<Record, TreeError> {
    map_at(root, path, |record| record.with_value(value))?.ok_or_else(|| {
        TreeError::PathNotFound {
            path: path.to_string(),
        }
    })
}

/// Add a blank instance of the control at `template_path`.
///
/// The new instance index is one past the highest index any sibling of the
/// same control carries, removed ones included. The record is inserted right
/// after the last of those siblings.
pub fn add(root: &Record, template_path: &FormFieldPath) -> Result<Record, TreeError> {
    let template = find(root, template_path).ok_or_else(|| TreeError::PathNotFound {
        path: template_path.to_string(),
    })?;
    let parent = find_parent(root, template_path).ok_or_else(|| TreeError::FormRoot {
        path: template_path.to_string(),
    })?;

    let next = generate_next_path(
        parent.children().iter().map(|child| child.path()),
        template_path,
    )?;
    let fresh = Arc::new(template.strip_persisted_identity().fresh_instance(next));

    tracing::debug!(template = %template_path, path = %fresh.path(), "adding instance");

    let parent_path = parent.path().clone();
    map_at(root, &parent_path, |parent| {
        let mut children = parent.children().to_vec();
        let position = children
            .iter()
            .rposition(|child| child.path().is_instance_of_same_control(template_path))
            .map_or(children.len(), |index| index + 1);
        children.insert(position, fresh);
        Ok(parent.with_children(children))
    })?
    .ok_or_else(|| TreeError::PathNotFound {
        path: parent_path.to_string(),
    })
}

/// Remove the record at `path` from the logical form.
///
/// Subtrees holding stored observations stay in the tree, inactive and
/// voided, so the removal can be sent to storage. Anything else is dropped.
pub fn remove(root: &Record, path: &FormFieldPath) -> Result<Record, TreeError> {
    let target = find(root, path).ok_or_else(|| TreeError::PathNotFound {
        path: path.to_string(),
    })?;
    if !target.is_active() {
        return Err(TreeError::RecordRemoved {
            path: path.to_string(),
        });
    }
    let parent = find_parent(root, path).ok_or_else(|| TreeError::FormRoot {
        path: path.to_string(),
    })?;

    let updated = if target.is_persisted() {
        tracing::debug!(path = %path, "voiding removed instance");
        map_at(root, path, |record| Ok(record.mark_removed()))?
    } else {
        tracing::debug!(path = %path, "dropping unsaved instance");
        let parent_path = parent.path().clone();
        map_at(root, &parent_path, |parent| {
            let children = parent
                .children()
                .iter()
                .filter(|child| child.path() != path)
                .cloned()
                .collect();
            Ok(parent.with_children(children))
        })?
    };

    updated.ok_or_else(|| TreeError::PathNotFound {
        path: path.to_string(),
    })
}

/// The record whose children include the record at `path`. `None` for the
/// form root and for paths not in the tree.
#[must_use]
pub fn find_parent<'a>(root: &'a Record, path: &FormFieldPath) -> Option<&'a Record> {
    let container = path.container()?;
    let parent = find(root, &container)?;
    parent
        .children()
        .iter()
        .any(|child| child.path() == path)
        .then_some(parent)
}

/// All other children of `target`'s parent.
#[must_use]
pub fn siblings(root: &Record, target: Option<&Record>) -> Vec<Arc<Record>> {
    let Some(target) = target else {
        return Vec::new();
    };

    find_parent(root, target.path())
        .map(|parent| {
            parent
                .children()
                .iter()
                .filter(|child| child.path() != target.path())
                .cloned()
                .collect()
        })
        .unwrap_or_default()
}

/// Active instances of the control at `path`, itself included, leaving out
/// instances whose stored data has been voided.
#[must_use]
pub fn brother_trees(root: &Record, path: &FormFieldPath) -> Vec<Arc<Record>> {
    let Some(parent) = find_parent(root, path) else {
        return Vec::new();
    };

    parent
        .children()
        .iter()
        .filter(|child| child.path().is_instance_of_same_control(path))
        .filter(|child| child.is_active() && !(child.is_voided() && child.is_persisted()))
        .cloned()
        .collect()
}

/// Depth-first, pre-order traversal of every record, inactive ones included.
#[must_use]
pub fn walk(root: &Record) -> Walk<'_> {
    Walk { stack: vec![root] }
}

pub struct Walk<'a> {
    stack: Vec<&'a Record>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = &'a Record;

    fn next(&mut self) -> Option<Self::Item> {
        let record = self.stack.pop()?;
        self.stack
            .extend(record.children().iter().rev().map(Arc::as_ref));
        Some(record)
    }
}

/// Rebuild the spine from `node` down to `path`, replacing the record there
/// with `f`'s result. `Ok(None)` when `path` is not in the tree.
fn map_at<F>(node: &Record, path: &FormFieldPath, f: F) -> Result<Option<Record>, TreeError>
where
    F: FnOnce(&Record) -> Result<Record, TreeError>,
{
    if node.path() == path {
        return f(node).map(Some);
    }

    let Some(index) = node
        .children()
        .iter()
        .position(|child| path.starts_with(child.path()))
    else {
        return Ok(None);
    };
    let Some(child) = map_at(&node.children()[index], path, f)? else {
        return Ok(None);
    };

    let mut children = node.children().to_vec();
    children[index] = Arc::new(child);
    Ok(Some(node.with_children(children)))
}
