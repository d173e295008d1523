//! Type registry — the inheritance lattice of record types.
//!
//! Each [`TypeDef`] declares only its own level: scalar columns, to-one and
//! to-many relations, and default values. Everything inherited is computed
//! by walking `parent` links up to a root kind.

use std::sync::Arc;

use indexmap::IndexMap;
use objgraph_core::GraphError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::hooks::{CatalogAugmenter, TypeHooks};

/// Declared type reported by `describe_columns` for to-one foreign keys.
pub const FOREIGN_KEY_TYPE: &str = "ForeignKey";

/// Name of the column holding the foreign key of a to-one relation.
pub fn foreign_key_column(field: &str) -> String {
    format!("{}ID", field)
}

/// How a relation field links to other records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    /// Single related record, stored as a foreign key on the owner.
    ToOne,
    /// Ordered collection of records owned by the parent.
    ToMany,
}

/// One level of the type lattice as declared (un-inherited).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TypeDef {
    /// Type name (e.g. `Page`).
    pub name: String,

    /// Immediate supertype. `None` marks a root kind.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,

    /// Scalar columns: field name → declared db type (e.g. `Int`, `Enum('a','b')`).
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub db: IndexMap<String, String>,

    /// To-one relations: field name → target type.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub has_one: IndexMap<String, String>,

    /// To-many relations: field name → target type.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub has_many: IndexMap<String, String>,

    /// Default values for fields declared at this level.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub defaults: IndexMap<String, Value>,

    /// Whether to-one relations are traversed. Inherited when unset; defaults to true.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traverse_has_one: Option<bool>,

    /// Whether to-many relations are traversed. Inherited when unset; defaults to true.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traverse_has_many: Option<bool>,
}

impl TypeDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn with_db(mut self, field: impl Into<String>, declared: impl Into<String>) -> Self {
        self.db.insert(field.into(), declared.into());
        self
    }

    pub fn with_has_one(mut self, field: impl Into<String>, target: impl Into<String>) -> Self {
        self.has_one.insert(field.into(), target.into());
        self
    }

    pub fn with_has_many(mut self, field: impl Into<String>, target: impl Into<String>) -> Self {
        self.has_many.insert(field.into(), target.into());
        self
    }

    pub fn with_default(mut self, field: impl Into<String>, value: Value) -> Self {
        self.defaults.insert(field.into(), value);
        self
    }

    pub fn with_traversal(mut self, has_one: bool, has_many: bool) -> Self {
        self.traverse_has_one = Some(has_one);
        self.traverse_has_many = Some(has_many);
        self
    }
}

/// On-disk shape of a type-definition file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeFile {
    pub types: Vec<TypeDef>,
}

#[derive(Clone)]
struct TypeEntry {
    def: TypeDef,
    children: Vec<String>,
    hooks: Option<Arc<dyn TypeHooks>>,
    augmenter: Option<Arc<dyn CatalogAugmenter>>,
}

/// Registry of every known record type, in registration order.
#[derive(Clone, Default)]
pub struct TypeRegistry {
    entries: IndexMap<String, TypeEntry>,
}

impl TypeRegistry {
    /// Build a registry from type definitions.
    ///
    /// Parents may be declared after their children. Fails on duplicate
    /// names, unknown parents, unknown relation targets and parent cycles.
    pub fn new(defs: Vec<TypeDef>) -> Result<Self, GraphError> {
        let mut entries: IndexMap<String, TypeEntry> = IndexMap::new();
        for def in defs {
            if entries.contains_key(&def.name) {
                return Err(GraphError::InvalidSchema(format!(
                    "type '{}' is defined more than once",
                    def.name
                )));
            }
            entries.insert(
                def.name.clone(),
                TypeEntry {
                    def,
                    children: vec![],
                    hooks: None,
                    augmenter: None,
                },
            );
        }

        let mut links = Vec::new();
        for (name, entry) in &entries {
            if let Some(parent) = &entry.def.parent {
                if !entries.contains_key(parent) {
                    return Err(GraphError::InvalidSchema(format!(
                        "type '{}' extends unknown type '{}'",
                        name, parent
                    )));
                }
                links.push((parent.clone(), name.clone()));
            }
            let relations = entry.def.has_one.iter().chain(entry.def.has_many.iter());
            for (field, target) in relations {
                if !entries.contains_key(target) {
                    return Err(GraphError::InvalidSchema(format!(
                        "relation '{}.{}' targets unknown type '{}'",
                        name, field, target
                    )));
                }
            }
        }
        for (parent, child) in links {
            if let Some(entry) = entries.get_mut(&parent) {
                entry.children.push(child);
            }
        }

        let registry = Self { entries };
        for name in registry.entries.keys() {
            registry.check_acyclic(name)?;
        }
        debug!("TypeRegistry: {} types registered", registry.entries.len());
        Ok(registry)
    }

    /// Parse a YAML type-definition file (`types: [...]`).
    pub fn from_yaml_str(source: &str) -> Result<Self, GraphError> {
        let file: TypeFile = serde_yaml::from_str(source)
            .map_err(|e| GraphError::InvalidSchema(format!("type file: {}", e)))?;
        Self::new(file.types)
    }

    /// Parse a JSON type-definition file (`{"types": [...]}`).
    pub fn from_json_str(source: &str) -> Result<Self, GraphError> {
        let file: TypeFile = serde_json::from_str(source)
            .map_err(|e| GraphError::InvalidSchema(format!("type file: {}", e)))?;
        Self::new(file.types)
    }

    /// Attach capability hooks to a type. Subclasses inherit them.
    pub fn with_hooks(mut self, ty: &str, hooks: Arc<dyn TypeHooks>) -> Result<Self, GraphError> {
        self.entry_mut(ty)?.hooks = Some(hooks);
        Ok(self)
    }

    /// Register a catalog augmenter for a type. Subclasses inherit it.
    pub fn with_augmenter(
        mut self,
        ty: &str,
        augmenter: Arc<dyn CatalogAugmenter>,
    ) -> Result<Self, GraphError> {
        self.entry_mut(ty)?.augmenter = Some(augmenter);
        Ok(self)
    }

    fn entry_mut(&mut self, ty: &str) -> Result<&mut TypeEntry, GraphError> {
        self.entries
            .get_mut(ty)
            .ok_or_else(|| GraphError::InvalidSchema(format!("unknown type '{}'", ty)))
    }

    fn check_acyclic(&self, ty: &str) -> Result<(), GraphError> {
        let mut current = self.parent_of(ty);
        for _ in 0..self.entries.len() {
            match current {
                Some(parent) if parent == ty => break,
                Some(parent) => current = self.parent_of(parent),
                None => return Ok(()),
            }
        }
        Err(GraphError::InvalidSchema(format!(
            "type '{}' is its own ancestor",
            ty
        )))
    }

    /// Entries from `ty` up to its root, leaf first.
    fn lineage<'s>(&'s self, ty: &str) -> impl Iterator<Item = &'s TypeEntry> + 's {
        let mut next = self.entries.get(ty);
        std::iter::from_fn(move || {
            let entry = next?;
            next = entry
                .def
                .parent
                .as_deref()
                .and_then(|p| self.entries.get(p));
            Some(entry)
        })
        .take(self.entries.len())
    }

    pub fn contains(&self, ty: &str) -> bool {
        self.entries.contains_key(ty)
    }

    /// The un-inherited declaration of a type.
    pub fn def(&self, ty: &str) -> Option<&TypeDef> {
        self.entries.get(ty).map(|e| &e.def)
    }

    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Types without a parent, in registration order.
    pub fn root_kinds(&self) -> Vec<String> {
        self.entries
            .values()
            .filter(|e| e.def.parent.is_none())
            .map(|e| e.def.name.clone())
            .collect()
    }

    pub fn parent_of(&self, ty: &str) -> Option<&str> {
        self.entries.get(ty)?.def.parent.as_deref()
    }

    /// `ty` and its supertypes, leaf to root. Empty for unknown types.
    pub fn ancestry_of(&self, ty: &str) -> Vec<String> {
        self.lineage(ty).map(|e| e.def.name.clone()).collect()
    }

    /// The root kind `ty` descends from (itself if it is a root).
    pub fn root_kind_of(&self, ty: &str) -> Option<String> {
        self.lineage(ty).last().map(|e| e.def.name.clone())
    }

    /// `ty` followed by all of its descendants, depth-first in registration order.
    pub fn subclasses_of(&self, ty: &str) -> Vec<String> {
        let mut out = Vec::new();
        if self.contains(ty) {
            self.collect_subclasses(ty, &mut out);
        }
        out
    }

    fn collect_subclasses(&self, ty: &str, out: &mut Vec<String>) {
        out.push(ty.to_string());
        if let Some(entry) = self.entries.get(ty) {
            for child in &entry.children {
                self.collect_subclasses(child, out);
            }
        }
    }

    /// Effective to-one traversal flag: nearest explicit setting, else true.
    pub fn traverse_has_one(&self, ty: &str) -> bool {
        self.lineage(ty)
            .find_map(|e| e.def.traverse_has_one)
            .unwrap_or(true)
    }

    /// Effective to-many traversal flag: nearest explicit setting, else true.
    pub fn traverse_has_many(&self, ty: &str) -> bool {
        self.lineage(ty)
            .find_map(|e| e.def.traverse_has_many)
            .unwrap_or(true)
    }

    /// Kind and target of a relation declared on `ty` or any of its ancestors.
    pub fn relation(&self, ty: &str, field: &str) -> Option<(RelationKind, &str)> {
        self.lineage(ty).find_map(|e| {
            if let Some(target) = e.def.has_one.get(field) {
                Some((RelationKind::ToOne, target.as_str()))
            } else {
                e.def
                    .has_many
                    .get(field)
                    .map(|target| (RelationKind::ToMany, target.as_str()))
            }
        })
    }

    /// All stored columns of `ty`, root level first: scalar fields plus one
    /// foreign-key column per to-one relation.
    pub fn describe_columns(&self, ty: &str) -> IndexMap<String, String> {
        let levels: Vec<&TypeEntry> = self.lineage(ty).collect();
        let mut columns = IndexMap::new();
        for entry in levels.into_iter().rev() {
            for (field, declared) in &entry.def.db {
                columns.insert(field.clone(), declared.clone());
            }
            for field in entry.def.has_one.keys() {
                columns.insert(foreign_key_column(field), FOREIGN_KEY_TYPE.to_string());
            }
        }
        columns
    }

    /// Merged default values of `ty`; descendants override ancestors.
    pub fn defaults_of(&self, ty: &str) -> IndexMap<String, Value> {
        let levels: Vec<&TypeEntry> = self.lineage(ty).collect();
        let mut defaults = IndexMap::new();
        for entry in levels.into_iter().rev() {
            for (field, value) in &entry.def.defaults {
                defaults.insert(field.clone(), value.clone());
            }
        }
        defaults
    }

    /// Hooks registered on `ty` or its nearest ancestor that has any.
    pub fn hooks_for(&self, ty: &str) -> Option<Arc<dyn TypeHooks>> {
        self.lineage(ty).find_map(|e| e.hooks.clone())
    }

    /// Catalog augmenter registered on `ty` or its nearest ancestor that has one.
    pub fn augmenter_for(&self, ty: &str) -> Option<Arc<dyn CatalogAugmenter>> {
        self.lineage(ty).find_map(|e| e.augmenter.clone())
    }
}
