//! Field lookup over relation paths.
//!
//! A path such as `"author__profile__email"` is split into segments and
//! resolved one hop at a time. To-one hops descend into the related object;
//! to-many hops fan out and the branches are flattened into a single
//! [`FieldValue::Many`]. A missing field anywhere along the way resolves to
//! [`FieldValue::Null`], never to an error.

use crate::{FieldValue, Object};

/// Separator between path segments. A single `.` is accepted as well.
pub const PATH_DELIMITER: &str = "__";

/// Split a relation path into its segments, dropping empty ones.
pub fn path_segments(path: &str) -> Vec<&str> {
    path.split(PATH_DELIMITER)
        .flat_map(|part| part.split('.'))
        .filter(|seg| !seg.is_empty())
        .collect()
}

/// Resolve `path` starting from `obj`.
pub fn field_lookup(obj: &dyn Object, path: &str) -> FieldValue {
    let segments = path_segments(path);
    if segments.is_empty() {
        return FieldValue::Null;
    }
    lookup_segments(obj, &segments)
}

fn lookup_segments(obj: &dyn Object, segments: &[&str]) -> FieldValue {
    let Some((first, rest)) = segments.split_first() else {
        return FieldValue::Null;
    };

    let value = obj.field(first).unwrap_or_default();
    if rest.is_empty() {
        value
    } else {
        descend(value, rest)
    }
}

fn descend(value: FieldValue, rest: &[&str]) -> FieldValue {
    match value {
        FieldValue::Object(related) => lookup_segments(related.as_ref(), rest),
        FieldValue::Many(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                match descend(item, rest) {
                    FieldValue::Null => {}
                    FieldValue::Many(nested) => out.extend(nested),
                    single => out.push(single),
                }
            }
            FieldValue::Many(out)
        }
        // Scalars have no fields to traverse into.
        _ => FieldValue::Null,
    }
}
