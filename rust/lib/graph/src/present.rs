//! Editor payload — the hidden JSON value and read-only text summary handed
//! to an edit surface, and the submit path back into the deserializer.

use objgraph_core::{GraphConfig, GraphError, RecordId};
use serde_json::{Map, Value};

use crate::de::GraphDeserializer;
use crate::registry::TypeRegistry;
use crate::ser::GraphSerializer;
use crate::store::ObjectStore;
use crate::wire::{ObjectRecord, QueryRepresentation};

const INDENT: &str = "  ";

#[derive(Debug, Clone)]
pub struct EditorPayload {
    id: RecordId,
    representation: QueryRepresentation,
}

impl EditorPayload {
    /// Serialize record `id` together with a fresh catalog.
    pub fn load(
        registry: &TypeRegistry,
        store: &dyn ObjectStore,
        id: RecordId,
        config: &GraphConfig,
    ) -> Result<Self, GraphError> {
        let representation = GraphSerializer::new(registry, store, config).serialize_with_catalog(id)?;
        Ok(Self { id, representation })
    }

    pub fn id(&self) -> RecordId {
        self.id
    }

    pub fn representation(&self) -> &QueryRepresentation {
        &self.representation
    }

    /// JSON string for an opaque hidden form value.
    pub fn hidden_value(&self) -> Result<String, GraphError> {
        Ok(serde_json::to_string(&self.representation)?)
    }

    /// Multi-line text rendering for display-only contexts.
    ///
    /// ```text
    /// Page #3
    ///   Title: Home
    ///   Author: Member
    ///     Name: Ann
    ///   Comments:
    ///     1. Comment
    ///       Body: first
    /// ```
    pub fn summary(&self) -> String {
        let data = &self.representation.data;
        let mut lines = vec![format!("{} {}", data.type_name, self.id)];
        field_lines(&mut lines, &data.fields, 1);
        lines.join("\n")
    }
}

/// Save a submitted edit surface payload `{"data": ObjectRecord}`.
pub fn submit(
    registry: &TypeRegistry,
    store: &mut dyn ObjectStore,
    config: &GraphConfig,
    raw: &str,
) -> Result<Option<RecordId>, GraphError> {
    GraphDeserializer::new(registry, store, config).deserialize_top_level(raw)
}

fn field_lines(lines: &mut Vec<String>, fields: &Map<String, Value>, depth: usize) {
    let pad = INDENT.repeat(depth);
    for (name, value) in fields {
        match value {
            Value::Array(items) if items.is_empty() => lines.push(format!("{pad}{name}: (none)")),
            Value::Array(items) => {
                lines.push(format!("{pad}{name}:"));
                for (i, item) in items.iter().enumerate() {
                    item_lines(lines, i + 1, item, depth + 1);
                }
            }
            _ => match as_record(value) {
                Some(record) => {
                    lines.push(format!("{pad}{name}: {}", record.type_name));
                    field_lines(lines, &record.fields, depth + 1);
                }
                None => lines.push(format!("{pad}{name}: {}", scalar_text(value))),
            },
        }
    }
}

fn item_lines(lines: &mut Vec<String>, n: usize, item: &Value, depth: usize) {
    let pad = INDENT.repeat(depth);
    match as_record(item) {
        Some(record) => {
            lines.push(format!("{pad}{n}. {}", record.type_name));
            field_lines(lines, &record.fields, depth + 1);
        }
        None => lines.push(format!("{pad}{n}. {}", scalar_text(item))),
    }
}

fn as_record(value: &Value) -> Option<ObjectRecord> {
    match value {
        Value::Object(map) if map.contains_key("type") => ObjectRecord::from_value(value),
        _ => None,
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::Null => "-".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use objgraph_kv::MemoryKV;
    use serde_json::json;

    use crate::registry::TypeDef;
    use crate::store::KvObjectStore;

    fn setup() -> (Arc<TypeRegistry>, KvObjectStore) {
        let reg = Arc::new(
            TypeRegistry::new(vec![
                TypeDef::new("Page")
                    .with_db("Title", "Varchar")
                    .with_db("Sort", "Int")
                    .with_has_one("Author", "Member")
                    .with_has_many("Comments", "Comment")
                    .with_has_many("Tags", "Comment"),
                TypeDef::new("Member").with_db("Name", "Varchar"),
                TypeDef::new("Comment").with_db("Body", "Text"),
            ])
            .unwrap(),
        );
        let store = KvObjectStore::new(Arc::new(MemoryKV::new()), reg.clone());
        (reg, store)
    }

    fn sample(s: &mut KvObjectStore) -> RecordId {
        let page = s.create("Page").unwrap();
        s.set_attr(page, "Title", json!("Home")).unwrap();
        s.set_attr(page, "Sort", json!(2)).unwrap();
        let author = s.create("Member").unwrap();
        s.set_attr(author, "Name", json!("Ann")).unwrap();
        s.set_foreign_key(page, "Author", Some(author)).unwrap();
        for body in ["first", "second"] {
            let c = s.create("Comment").unwrap();
            s.set_attr(c, "Body", json!(body)).unwrap();
            s.add_related(page, "Comments", c).unwrap();
        }
        page
    }

    #[test]
    fn summary_renders_nested_text() {
        let (reg, mut s) = setup();
        let page = sample(&mut s);
        let payload = EditorPayload::load(&reg, &s, page, &GraphConfig::default()).unwrap();
        let expected = [
            "Page #1",
            "  Title: Home",
            "  Sort: 2",
            "  Author: Member",
            "    Name: Ann",
            "  Comments:",
            "    1. Comment",
            "      Body: first",
            "    2. Comment",
            "      Body: second",
            "  Tags: (none)",
        ]
        .join("\n");
        assert_eq!(payload.summary(), expected);
    }

    #[test]
    fn null_values_render_as_dash() {
        let (reg, mut s) = setup();
        let page = s.create("Page").unwrap();
        let payload = EditorPayload::load(&reg, &s, page, &GraphConfig::default()).unwrap();
        let summary = payload.summary();
        assert!(summary.contains("  Title: -"));
        assert!(summary.contains("  Author: -"));
    }

    #[test]
    fn hidden_value_round_trips_through_submit() {
        let (reg, mut s) = setup();
        let page = sample(&mut s);
        let config = GraphConfig::default();
        let payload = EditorPayload::load(&reg, &s, page, &config).unwrap();
        let hidden = payload.hidden_value().unwrap();

        let parsed: Value = serde_json::from_str(&hidden).unwrap();
        assert_eq!(parsed["data"]["type"], json!("Page"));
        assert!(parsed["types"]["Member"].is_object());

        let copy = submit(&reg, &mut s, &config, &hidden).unwrap().unwrap();
        assert_ne!(copy, page);
        let copied = EditorPayload::load(&reg, &s, copy, &config).unwrap();
        assert_eq!(copied.representation().data, payload.representation().data);
    }

    #[test]
    fn submit_rejects_malformed() {
        let (reg, mut s) = setup();
        let err = submit(&reg, &mut s, &GraphConfig::default(), "[]").unwrap_err();
        assert_eq!(err.error_code(), "MALFORMED_INPUT");
    }
}
