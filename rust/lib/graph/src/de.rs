//! Graph deserializer — nested [`ObjectRecord`] back into live records.
//!
//! Every save creates new records; the only way to touch an existing one is
//! [`GraphDeserializer::apply`]. Failures stop further mutation but leave
//! records already written in place.

use objgraph_core::{GraphConfig, GraphError, RecordId};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::ancestry::walk;
use crate::catalog::build_catalog;
use crate::hooks::TypeHooks;
use crate::input::coerce_scalar;
use crate::registry::TypeRegistry;
use crate::store::ObjectStore;
use crate::wire::{is_empty_structure, parse_save_payload, ObjectRecord};

pub struct GraphDeserializer<'a> {
    registry: &'a TypeRegistry,
    store: &'a mut dyn ObjectStore,
    root_kinds: Vec<String>,
    max_depth: usize,
    depth: usize,
}

impl<'a> GraphDeserializer<'a> {
    pub fn new(
        registry: &'a TypeRegistry,
        store: &'a mut dyn ObjectStore,
        config: &GraphConfig,
    ) -> Self {
        Self {
            registry,
            store,
            root_kinds: registry.root_kinds(),
            max_depth: config.max_depth,
            depth: 0,
        }
    }

    /// Only types under these root kinds are accepted.
    pub fn with_root_kinds(mut self, root_kinds: Vec<String>) -> Self {
        self.root_kinds = root_kinds;
        self
    }

    pub fn registry(&self) -> &'a TypeRegistry {
        self.registry
    }

    pub fn store(&mut self) -> &mut dyn ObjectStore {
        &mut *self.store
    }

    /// Parse a raw `{"data": ObjectRecord}` payload and save it.
    pub fn deserialize_top_level(&mut self, raw: &str) -> Result<Option<RecordId>, GraphError> {
        let Some(record) = parse_save_payload(raw)? else {
            debug!("deserialize_top_level: empty payload");
            return Ok(None);
        };
        let saved = self.deserialize(&record)?;
        match saved {
            Some(id) => info!("saved {} {}", record.type_name, id),
            None => info!("nothing saved for type '{}'", record.type_name),
        }
        Ok(saved)
    }

    /// Save a nested value leniently; anything that is not a record is `None`.
    pub fn deserialize_value(&mut self, value: &Value) -> Result<Option<RecordId>, GraphError> {
        match ObjectRecord::from_value(value) {
            Some(record) => self.deserialize(&record),
            None => Ok(None),
        }
    }

    /// Create a new record from `record` and its relation subtree.
    ///
    /// Empty records and types missing from the catalog yield `Ok(None)`
    /// without writing anything.
    pub fn deserialize(&mut self, record: &ObjectRecord) -> Result<Option<RecordId>, GraphError> {
        if record.is_empty() {
            return Ok(None);
        }
        if !self.accepts(&record.type_name)? {
            return Ok(None);
        }
        self.nested(|de| {
            let id = de.store.create(&record.type_name)?;
            de.populate(id, record)?;
            de.store.write(id)?;
            Ok(Some(id))
        })
    }

    /// Overwrite existing record `id` from `record`.
    ///
    /// The record keeps its identity; to-many relations are replaced by the
    /// submitted lists. A type that differs from the stored one yields
    /// `Ok(None)`.
    pub fn apply(&mut self, id: RecordId, record: &ObjectRecord) -> Result<Option<RecordId>, GraphError> {
        let stored = self.store.type_of(id)?;
        if record.is_empty() || stored != record.type_name {
            warn!(
                "apply: record {} is '{}', refusing '{}'",
                id, stored, record.type_name
            );
            return Ok(None);
        }
        if !self.accepts(&record.type_name)? {
            return Ok(None);
        }
        self.nested(|de| {
            de.populate(id, record)?;
            de.store.write(id)?;
            Ok(Some(id))
        })
    }

    /// Type gate: only types present in a freshly built catalog are saved.
    fn accepts(&self, ty: &str) -> Result<bool, GraphError> {
        let catalog = build_catalog(self.registry, &self.root_kinds)?;
        if !catalog.contains(ty) {
            warn!("rejecting record of unknown type '{}'", ty);
            return Ok(false);
        }
        Ok(true)
    }

    fn nested<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, GraphError>,
    ) -> Result<T, GraphError> {
        if self.depth >= self.max_depth {
            return Err(GraphError::DepthExceeded(self.max_depth));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    fn populate(&mut self, id: RecordId, record: &ObjectRecord) -> Result<(), GraphError> {
        let registry = self.registry;
        let root_kinds = self.root_kinds.clone();
        let hooks = registry.hooks_for(&record.type_name);

        walk(registry, &record.type_name, &root_kinds, |level, _parent| {
            self.populate_level(id, level, record, hooks.as_deref())?;
            Ok(Value::Object(Map::new()))
        })?;
        Ok(())
    }

    fn populate_level(
        &mut self,
        id: RecordId,
        level: &str,
        record: &ObjectRecord,
        hooks: Option<&dyn TypeHooks>,
    ) -> Result<(), GraphError> {
        let registry = self.registry;
        let Some(def) = registry.def(level) else {
            return Ok(());
        };

        for name in def.db.keys() {
            let value = coerce_scalar(record.field(name).clone());
            self.store.set_attr(id, name, value)?;
        }

        if registry.traverse_has_one(level) {
            for name in def.has_one.keys() {
                let child = record.field(name);
                if is_empty_structure(child) {
                    continue;
                }
                if let Some(target) = self.resolve_child(hooks, id, name, child)? {
                    self.store.set_foreign_key(id, name, Some(target))?;
                }
            }
        }

        if registry.traverse_has_many(level) {
            for name in def.has_many.keys() {
                self.store.clear_related(id, name)?;
                let Value::Array(children) = record.field(name) else {
                    continue;
                };
                for child in children {
                    if is_empty_structure(child) {
                        continue;
                    }
                    if let Some(member) = self.resolve_child(hooks, id, name, child)? {
                        self.store.add_related(id, name, member)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn resolve_child(
        &mut self,
        hooks: Option<&dyn TypeHooks>,
        id: RecordId,
        field: &str,
        child: &Value,
    ) -> Result<Option<RecordId>, GraphError> {
        if let Some(result) = hooks.and_then(|h| h.resolve_relation_structure(self, id, field, child)) {
            return result;
        }
        match ObjectRecord::from_value(child) {
            Some(nested) => self.deserialize(&nested),
            None => {
                debug!("{} {}: skipping malformed nested record", id, field);
                Ok(None)
            }
        }
    }
}
