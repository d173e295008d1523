use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Stable identity of a persisted record. `0` is reserved for "no record",
/// matching the zero foreign key of an unset to-one relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub u64);

impl RecordId {
    /// Interpret a stored foreign-key value. Zero, null, and non-numeric
    /// values all mean the relation is unset.
    pub fn from_value(value: &Value) -> Option<RecordId> {
        let raw = match value {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }?;
        (raw != 0).then_some(RecordId(raw))
    }

    pub fn to_value(self) -> Value {
        Value::from(self.0)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Deep-merge `overlay` into `base`.
///
/// - object ∘ object: merged key by key, recursing into nested objects.
/// - anything else: `overlay` replaces `base` (including `null`).
///
/// Unlike RFC 7386 merge patch, `null` never removes a key.
pub fn merge_deep(base: &mut Value, overlay: &Value) {
    match (base.as_object_mut(), overlay.as_object()) {
        (Some(base_obj), Some(overlay_obj)) => {
            for (key, value) in overlay_obj {
                match base_obj.get_mut(key) {
                    Some(existing) if existing.is_object() && value.is_object() => {
                        merge_deep(existing, value);
                    }
                    _ => {
                        base_obj.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        _ => *base = overlay.clone(),
    }
}
