//! Ancestry walker — applies a per-level function from the root kind down
//! to a concrete type and deep-merges the results.

use objgraph_core::{merge_deep, GraphError};
use serde_json::{Map, Value};
use tracing::debug;

use crate::registry::TypeRegistry;

/// Walk `ty`'s ancestry and merge what `level_fn` returns for each level.
///
/// The chain runs from `ty` up to its root kind (the parentless base of its
/// lattice), so every ancestor level contributes. `ty` is only walked when it
/// is, or descends from, one of `root_kinds`. Levels are visited root first,
/// so later (more specific) levels overwrite earlier ones on conflicting
/// scalars while nested objects are merged. A non-object result is appended
/// under the next free positional key.
///
/// `level_fn` receives `(level, immediate_parent)`, where
/// `immediate_parent` is the direct parent of `ty` itself. It is the same
/// for every level of one walk.
///
/// Types outside every listed root kind produce an empty object.
pub fn walk<F>(
    registry: &TypeRegistry,
    ty: &str,
    root_kinds: &[String],
    mut level_fn: F,
) -> Result<Value, GraphError>
where
    F: FnMut(&str, Option<&str>) -> Result<Value, GraphError>,
{
    let mut merged = Value::Object(Map::new());

    let mut chain = registry.ancestry_of(ty);
    let listed = chain.iter().any(|t| root_kinds.iter().any(|r| r == t));
    if !listed {
        debug!("walk: '{}' is outside the root kinds, nothing to merge", ty);
        return Ok(merged);
    }

    let immediate_parent = chain.get(1).cloned();
    chain.reverse();

    let mut appended = 0usize;
    for level in &chain {
        let out = level_fn(level, immediate_parent.as_deref())?;
        if out.is_object() {
            merge_deep(&mut merged, &out);
        } else if let Value::Object(map) = &mut merged {
            while map.contains_key(&appended.to_string()) {
                appended += 1;
            }
            map.insert(appended.to_string(), out);
            appended += 1;
        }
    }
    Ok(merged)
}
