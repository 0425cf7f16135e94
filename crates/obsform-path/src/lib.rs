//! Hierarchical instance paths for form controls.
//!
//! Every control instance in a rendered form is identified by a form-field
//! path such as `Vitals.3/1-0/2-1`: the form name and version, followed by
//! one `<controlId>-<instance>` segment per nesting level. The same string is
//! stored on persisted observations, so these paths double as the join key
//! between a form definition and saved data.
//!
//! All comparisons are done segment by segment; `F.1/1-0` is never treated
//! as a prefix of `F.1/1-05`.

mod error;
mod path;
mod segment;

pub use error::PathError;
pub use path::FormFieldPath;
pub use segment::Segment;

/// Compute the path for a new instance of `base`'s control.
///
/// Only paths in `existing` that are instances of the same control under the
/// same container are considered. The returned instance index is strictly
/// greater than every one of them (and than `base`'s own), so indices freed by
/// removals are never reused.
pub fn generate_next_path<'a, I>(existing: I, base: &FormFieldPath) -> Result<FormFieldPath, PathError>
where
    I: IntoIterator<Item = &'a FormFieldPath>,
{
    let Some(base_instance) = base.instance() else {
        return Err(PathError::FormRoot {
            path: base.to_string(),
        });
    };

    let max = existing
        .into_iter()
        .filter(|path| path.is_instance_of_same_control(base))
        .filter_map(FormFieldPath::instance)
        .fold(base_instance, u32::max);

    let next = max.checked_add(1).ok_or_else(|| PathError::InstanceOverflow {
        path: base.to_string(),
    })?;
    base.with_instance(next)
}

/// Strip the last segment. Top-level paths and form roots have no parent.
#[must_use]
pub fn parent_path_of(path: &FormFieldPath) -> Option<FormFieldPath> {
    path.parent()
}

/// True when `path` is `prefix` or a descendant of it, compared on whole
/// segments.
#[must_use]
pub fn prefix_matches(path: &FormFieldPath, prefix: &FormFieldPath) -> bool {
    path.starts_with(prefix)
}
