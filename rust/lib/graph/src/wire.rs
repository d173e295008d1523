//! Wire forms exchanged with the edit surface.
//!
//! ```json
//! {"data": {"type": "Page", "fields": {"Title": "Home", "Owner": null, "Comments": []}},
//!  "types": {"Page": {"base": "SiteTree", "fields": {...}}}}
//! ```

use objgraph_core::GraphError;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::catalog::TypeCatalog;

static NULL: Value = Value::Null;

/// One object and its relation subtree.
///
/// Field values are scalars, nested records (`{"type", "fields"}`), `null`
/// for an unset to-one relation, or arrays of nested records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectRecord {
    #[serde(rename = "type")]
    pub type_name: String,

    #[serde(default)]
    pub fields: Map<String, Value>,
}

impl ObjectRecord {
    pub fn new(type_name: impl Into<String>, fields: Map<String, Value>) -> Self {
        Self {
            type_name: type_name.into(),
            fields,
        }
    }

    /// Read a nested record leniently: empty or non-record values yield `None`.
    pub fn from_value(value: &Value) -> Option<ObjectRecord> {
        if is_empty_structure(value) {
            return None;
        }
        let record: ObjectRecord = serde_json::from_value(value.clone()).ok()?;
        (!record.is_empty()).then_some(record)
    }

    pub fn into_value(self) -> Value {
        json!({"type": self.type_name, "fields": Value::Object(self.fields)})
    }

    /// A record without a type carries nothing to save.
    pub fn is_empty(&self) -> bool {
        self.type_name.is_empty()
    }

    /// Field value, `null` when absent.
    pub fn field(&self, name: &str) -> &Value {
        self.fields.get(name).unwrap_or(&NULL)
    }
}

/// True for values that mean "no structure": `null`, `false`, `0`, `""`,
/// `"0"`, `[]` and `{}`.
pub fn is_empty_structure(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty() || s == "0",
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}

/// Top-level representation sent to the edit surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryRepresentation {
    pub data: ObjectRecord,
    pub types: TypeCatalog,
}

#[derive(Debug, Deserialize)]
struct SavePayload {
    data: Value,
}

/// Parse a save payload `{"data": ObjectRecord}`.
///
/// An empty `data` is a valid "nothing to save"; anything that is not the
/// expected shape is [`GraphError::Malformed`]. Extra keys (such as the
/// `types` echoed back by the edit surface) are ignored.
pub fn parse_save_payload(raw: &str) -> Result<Option<ObjectRecord>, GraphError> {
    let payload: SavePayload = serde_json::from_str(raw)
        .map_err(|e| GraphError::Malformed(format!("save payload: {}", e)))?;
    if is_empty_structure(&payload.data) {
        return Ok(None);
    }
    let record: ObjectRecord = serde_json::from_value(payload.data)
        .map_err(|e| GraphError::Malformed(format!("save payload data: {}", e)))?;
    Ok(Some(record))
}
