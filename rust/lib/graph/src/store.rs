//! Object store — live record operations used by the serializer and
//! deserializer, plus a KV-backed implementation.
//!
//! `KvObjectStore` keeps each record as JSON under `record:<id>`. Mutations
//! are staged in memory and reach the backend only on [`ObjectStore::write`],
//! which also ends staging for that record. `create` writes once so the new
//! record has an identity immediately.

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;
use objgraph_core::{GraphError, RecordId};
use objgraph_kv::{KVError, KVStore};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::registry::{foreign_key_column, RelationKind, TypeRegistry, FOREIGN_KEY_TYPE};

const RECORD_PREFIX: &str = "record:";
const NEXT_ID_KEY: &str = "meta:next_id";

/// Live record operations.
pub trait ObjectStore {
    /// Instantiate a record of `ty` and write it once to obtain its identity.
    fn create(&mut self, ty: &str) -> Result<RecordId, GraphError>;

    /// Persist the current state of a record.
    fn write(&mut self, id: RecordId) -> Result<(), GraphError>;

    fn type_of(&self, id: RecordId) -> Result<String, GraphError>;

    fn get_attr(&self, id: RecordId, name: &str) -> Result<Value, GraphError>;

    fn set_attr(&mut self, id: RecordId, name: &str, value: Value) -> Result<(), GraphError>;

    /// Target of to-one relation `field`; `None` when the foreign key is zero.
    fn get_foreign_key(&self, id: RecordId, field: &str) -> Result<Option<RecordId>, GraphError>;

    fn set_foreign_key(
        &mut self,
        id: RecordId,
        field: &str,
        target: Option<RecordId>,
    ) -> Result<(), GraphError>;

    /// Members of to-many relation `field`, in insertion order.
    fn related(&self, id: RecordId, field: &str) -> Result<Vec<RecordId>, GraphError>;

    fn clear_related(&mut self, id: RecordId, field: &str) -> Result<(), GraphError>;

    fn add_related(&mut self, id: RecordId, field: &str, child: RecordId) -> Result<(), GraphError>;
}

/// Stored form of one record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub id: RecordId,

    #[serde(rename = "type")]
    pub type_name: String,

    /// Scalar columns and to-one foreign keys.
    #[serde(default)]
    pub attrs: Map<String, Value>,

    /// To-many relation members.
    #[serde(default)]
    pub has_many: IndexMap<String, Vec<RecordId>>,
}

fn kv_err(e: KVError) -> GraphError {
    GraphError::Storage(e.to_string())
}

fn record_key(id: RecordId) -> String {
    format!("{}{}", RECORD_PREFIX, id.0)
}

/// [`ObjectStore`] over any [`KVStore`] backend.
pub struct KvObjectStore {
    kv: Arc<dyn KVStore>,
    registry: Arc<TypeRegistry>,
    staged: HashMap<RecordId, StoredRecord>,
}

impl KvObjectStore {
    pub fn new(kv: Arc<dyn KVStore>, registry: Arc<TypeRegistry>) -> Self {
        Self {
            kv,
            registry,
            staged: HashMap::new(),
        }
    }

    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    /// Current state of a record: staged if touched, else as persisted.
    pub fn record(&self, id: RecordId) -> Result<Cow<'_, StoredRecord>, GraphError> {
        if let Some(staged) = self.staged.get(&id) {
            return Ok(Cow::Borrowed(staged));
        }
        self.fetch(id).map(Cow::Owned)
    }

    /// All persisted records, ordered by key.
    pub fn list(&self) -> Result<Vec<StoredRecord>, GraphError> {
        let entries = self.kv.scan(RECORD_PREFIX).map_err(kv_err)?;
        let mut records = Vec::with_capacity(entries.len());
        for (_key, bytes) in entries {
            records.push(serde_json::from_slice(&bytes)?);
        }
        Ok(records)
    }

    /// Drop staged changes that were never written.
    pub fn discard(&mut self) {
        self.staged.clear();
    }

    fn fetch(&self, id: RecordId) -> Result<StoredRecord, GraphError> {
        let bytes = self
            .kv
            .get(&record_key(id))
            .map_err(kv_err)?
            .ok_or_else(|| GraphError::NotFound(format!("record {} not found", id)))?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn staged_mut(&mut self, id: RecordId) -> Result<&mut StoredRecord, GraphError> {
        if !self.staged.contains_key(&id) {
            let record = self.fetch(id)?;
            self.staged.insert(id, record);
        }
        self.staged
            .get_mut(&id)
            .ok_or_else(|| GraphError::Internal(format!("record {} vanished from stage", id)))
    }

    fn next_id(&self) -> Result<RecordId, GraphError> {
        let next = match self.kv.get(NEXT_ID_KEY).map_err(kv_err)? {
            Some(bytes) => serde_json::from_slice::<u64>(&bytes)?,
            None => 1,
        };
        Ok(RecordId(next))
    }

    fn persist(&self, record: &StoredRecord, next_id: Option<RecordId>) -> Result<(), GraphError> {
        let key = record_key(record.id);
        let bytes = serde_json::to_vec(record)?;
        match next_id {
            Some(next) => {
                let counter = serde_json::to_vec(&next.0)?;
                self.kv
                    .batch_set(&[(key.as_str(), bytes.as_slice()), (NEXT_ID_KEY, counter.as_slice())])
                    .map_err(kv_err)
            }
            None => self.kv.set(&key, &bytes).map_err(kv_err),
        }
    }

    fn check_column(&self, ty: &str, name: &str) -> Result<(), GraphError> {
        if self.registry.describe_columns(ty).contains_key(name) {
            Ok(())
        } else {
            Err(GraphError::UnknownColumn(format!(
                "'{}' is not a column of {}",
                name, ty
            )))
        }
    }

    fn check_relation(&self, ty: &str, field: &str, kind: RelationKind) -> Result<(), GraphError> {
        match self.registry.relation(ty, field) {
            Some((found, _)) if found == kind => Ok(()),
            _ => Err(GraphError::UnknownRelation(format!(
                "'{}' is not a {} relation of {}",
                field,
                match kind {
                    RelationKind::ToOne => "to-one",
                    RelationKind::ToMany => "to-many",
                },
                ty
            ))),
        }
    }
}

impl ObjectStore for KvObjectStore {
    fn create(&mut self, ty: &str) -> Result<RecordId, GraphError> {
        if !self.registry.contains(ty) {
            return Err(GraphError::NotFound(format!("unknown type '{}'", ty)));
        }
        let id = self.next_id()?;
        let defaults = self.registry.defaults_of(ty);

        let mut attrs = Map::new();
        for (column, declared) in self.registry.describe_columns(ty) {
            let value = if declared == FOREIGN_KEY_TYPE {
                Value::from(0)
            } else {
                defaults.get(&column).cloned().unwrap_or(Value::Null)
            };
            attrs.insert(column, value);
        }
        let record = StoredRecord {
            id,
            type_name: ty.to_string(),
            attrs,
            has_many: IndexMap::new(),
        };

        self.persist(&record, Some(RecordId(id.0 + 1)))?;
        debug!("KvObjectStore: created {} {}", ty, id);
        Ok(id)
    }

    fn write(&mut self, id: RecordId) -> Result<(), GraphError> {
        match self.staged.remove(&id) {
            Some(record) => {
                let persisted = self.persist(&record, None);
                if persisted.is_err() {
                    self.staged.insert(id, record);
                }
                persisted
            }
            None => {
                // Nothing staged; confirm it exists so writes never invent records.
                self.fetch(id)?;
                Ok(())
            }
        }
    }

    fn type_of(&self, id: RecordId) -> Result<String, GraphError> {
        Ok(self.record(id)?.type_name.clone())
    }

    fn get_attr(&self, id: RecordId, name: &str) -> Result<Value, GraphError> {
        let record = self.record(id)?;
        self.check_column(&record.type_name, name)?;
        Ok(record.attrs.get(name).cloned().unwrap_or(Value::Null))
    }

    fn set_attr(&mut self, id: RecordId, name: &str, value: Value) -> Result<(), GraphError> {
        let ty = self.type_of(id)?;
        self.check_column(&ty, name)?;
        self.staged_mut(id)?.attrs.insert(name.to_string(), value);
        Ok(())
    }

    fn get_foreign_key(&self, id: RecordId, field: &str) -> Result<Option<RecordId>, GraphError> {
        let record = self.record(id)?;
        self.check_relation(&record.type_name, field, RelationKind::ToOne)?;
        Ok(record
            .attrs
            .get(&foreign_key_column(field))
            .and_then(RecordId::from_value))
    }

    fn set_foreign_key(
        &mut self,
        id: RecordId,
        field: &str,
        target: Option<RecordId>,
    ) -> Result<(), GraphError> {
        let ty = self.type_of(id)?;
        self.check_relation(&ty, field, RelationKind::ToOne)?;
        let value = target.map(RecordId::to_value).unwrap_or_else(|| Value::from(0));
        self.staged_mut(id)?
            .attrs
            .insert(foreign_key_column(field), value);
        Ok(())
    }

    fn related(&self, id: RecordId, field: &str) -> Result<Vec<RecordId>, GraphError> {
        let record = self.record(id)?;
        self.check_relation(&record.type_name, field, RelationKind::ToMany)?;
        Ok(record.has_many.get(field).cloned().unwrap_or_default())
    }

    fn clear_related(&mut self, id: RecordId, field: &str) -> Result<(), GraphError> {
        let ty = self.type_of(id)?;
        self.check_relation(&ty, field, RelationKind::ToMany)?;
        self.staged_mut(id)?.has_many.insert(field.to_string(), Vec::new());
        Ok(())
    }

    fn add_related(&mut self, id: RecordId, field: &str, child: RecordId) -> Result<(), GraphError> {
        let ty = self.type_of(id)?;
        self.check_relation(&ty, field, RelationKind::ToMany)?;
        // The child must exist, staged or persisted.
        self.record(child)?;
        self.staged_mut(id)?
            .has_many
            .entry(field.to_string())
            .or_default()
            .push(child);
        Ok(())
    }
}
