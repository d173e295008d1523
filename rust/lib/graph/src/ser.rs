//! Graph serializer — live object graph to nested [`ObjectRecord`].

use std::cell::Cell;

use objgraph_core::{GraphConfig, GraphError, RecordId};
use serde_json::{Map, Value};

use crate::ancestry::walk;
use crate::catalog::build_catalog;
use crate::hooks::TypeHooks;
use crate::registry::TypeRegistry;
use crate::store::ObjectStore;
use crate::wire::{ObjectRecord, QueryRepresentation};

pub struct GraphSerializer<'a> {
    registry: &'a TypeRegistry,
    store: &'a dyn ObjectStore,
    root_kinds: Vec<String>,
    max_depth: usize,
    depth: Cell<usize>,
}

impl<'a> GraphSerializer<'a> {
    /// Serializer rooted at every root kind of the registry.
    pub fn new(registry: &'a TypeRegistry, store: &'a dyn ObjectStore, config: &GraphConfig) -> Self {
        Self {
            registry,
            store,
            root_kinds: registry.root_kinds(),
            max_depth: config.max_depth,
            depth: Cell::new(0),
        }
    }

    /// Restrict the walk and the catalog to these root kinds.
    pub fn with_root_kinds(mut self, root_kinds: Vec<String>) -> Self {
        self.root_kinds = root_kinds;
        self
    }

    pub fn registry(&self) -> &'a TypeRegistry {
        self.registry
    }

    pub fn store(&self) -> &'a dyn ObjectStore {
        self.store
    }

    /// Serialize record `id` with its whole relation subtree.
    pub fn serialize(&self, id: RecordId) -> Result<ObjectRecord, GraphError> {
        let depth = self.depth.get();
        if depth >= self.max_depth {
            return Err(GraphError::DepthExceeded(self.max_depth));
        }
        self.depth.set(depth + 1);
        let result = self.serialize_record(id);
        self.depth.set(depth);
        result
    }

    /// `{data, types}` for the edit surface.
    pub fn serialize_with_catalog(&self, id: RecordId) -> Result<QueryRepresentation, GraphError> {
        Ok(QueryRepresentation {
            data: self.serialize(id)?,
            types: build_catalog(self.registry, &self.root_kinds)?,
        })
    }

    fn serialize_record(&self, id: RecordId) -> Result<ObjectRecord, GraphError> {
        let ty = self.store.type_of(id)?;
        let hooks = self.registry.hooks_for(&ty);

        let merged = walk(self.registry, &ty, &self.root_kinds, |level, _parent| {
            self.level_fields(id, level, hooks.as_deref())
        })?;
        let fields = match merged {
            Value::Object(fields) => fields,
            _ => Map::new(),
        };
        Ok(ObjectRecord::new(ty, fields))
    }

    /// Fields declared at `level`: its scalar columns read straight from the
    /// record, then its traversed relations.
    fn level_fields(
        &self,
        id: RecordId,
        level: &str,
        hooks: Option<&dyn TypeHooks>,
    ) -> Result<Value, GraphError> {
        let mut fields = Map::new();
        let Some(def) = self.registry.def(level) else {
            return Ok(Value::Object(fields));
        };

        for name in def.db.keys() {
            fields.insert(name.clone(), self.store.get_attr(id, name)?);
        }

        if self.registry.traverse_has_one(level) {
            for name in def.has_one.keys() {
                let value = match hooks.and_then(|h| h.build_relation_structure(self, id, name)) {
                    Some(custom) => custom?,
                    None => match self.store.get_foreign_key(id, name)? {
                        Some(child) => self.serialize(child)?.into_value(),
                        None => Value::Null,
                    },
                };
                fields.insert(name.clone(), value);
            }
        }

        if self.registry.traverse_has_many(level) {
            for name in def.has_many.keys() {
                let value = match hooks.and_then(|h| h.build_relation_structure(self, id, name)) {
                    Some(custom) => custom?,
                    None => {
                        let children = self
                            .store
                            .related(id, name)?
                            .into_iter()
                            .map(|child| self.serialize(child).map(ObjectRecord::into_value))
                            .collect::<Result<Vec<_>, _>>()?;
                        Value::Array(children)
                    }
                };
                fields.insert(name.clone(), value);
            }
        }

        Ok(Value::Object(fields))
    }
}
