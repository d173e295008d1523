//! Schema catalog — merged field schemas for every subclass of the root kinds.
//!
//! The catalog is rebuilt on every call so it always reflects the registry
//! as it is right now; nothing is cached.

use std::collections::HashSet;

use indexmap::IndexMap;
use objgraph_core::GraphError;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ancestry::walk;
use crate::input::{derive_input_descriptor, InputDescriptor};
use crate::registry::TypeRegistry;

/// Merged schema of one record type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TypeSchema {
    /// Direct parent of the type, `null` for root kinds.
    #[serde(default)]
    pub base: Option<String>,

    /// Field name → input descriptor, ancestors' fields first.
    #[serde(default)]
    pub fields: IndexMap<String, InputDescriptor>,
}

/// Record type → merged schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeCatalog {
    types: IndexMap<String, TypeSchema>,
}

impl TypeCatalog {
    pub fn get(&self, ty: &str) -> Option<&TypeSchema> {
        self.types.get(ty)
    }

    pub fn get_mut(&mut self, ty: &str) -> Option<&mut TypeSchema> {
        self.types.get_mut(ty)
    }

    pub fn contains(&self, ty: &str) -> bool {
        self.types.contains_key(ty)
    }

    /// Insert or replace a schema.
    pub fn insert(&mut self, ty: impl Into<String>, schema: TypeSchema) {
        self.types.insert(ty.into(), schema);
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TypeSchema)> {
        self.types.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Build the catalog for every subclass of every root kind.
///
/// Each schema merges the full ancestry of its type, including levels above
/// the listed root kind.
///
/// After each type's schema is inserted, that type's catalog augmenter (if
/// any) runs against the catalog built so far.
pub fn build_catalog(
    registry: &TypeRegistry,
    root_kinds: &[String],
) -> Result<TypeCatalog, GraphError> {
    let mut catalog = TypeCatalog::default();
    let mut built: HashSet<String> = HashSet::new();

    for root in root_kinds {
        for ty in registry.subclasses_of(root) {
            // Overlapping root kinds list a subtree twice.
            if !built.insert(ty.clone()) {
                continue;
            }
            let merged = walk(registry, &ty, root_kinds, |level, parent| {
                Ok(serde_json::to_value(build_type_schema(registry, level, parent))?)
            })?;
            let schema: TypeSchema = serde_json::from_value(merged)?;
            catalog.insert(ty.clone(), schema);

            if let Some(augmenter) = registry.augmenter_for(&ty) {
                augmenter.augment_types(&mut catalog);
            }
        }
    }

    debug!("build_catalog: {} types", catalog.len());
    Ok(catalog)
}

/// Schema contributed by one level: its own scalar columns, plus its own
/// relations when that kind of relation is traversed for the level.
pub fn build_type_schema(registry: &TypeRegistry, ty: &str, base: Option<&str>) -> TypeSchema {
    let mut schema = TypeSchema {
        base: base.map(str::to_string),
        fields: IndexMap::new(),
    };
    let Some(def) = registry.def(ty) else {
        return schema;
    };

    let mut declared: Vec<(&String, &String)> = def.db.iter().collect();
    if registry.traverse_has_one(ty) {
        declared.extend(def.has_one.iter());
    }
    if registry.traverse_has_many(ty) {
        declared.extend(def.has_many.iter());
    }

    for (field, declared_type) in declared {
        schema.fields.insert(
            field.clone(),
            derive_input_descriptor(registry, ty, field, declared_type),
        );
    }
    schema
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use serde_json::json;

    use crate::hooks::{CatalogAugmenter, TypeHooks};
    use crate::input::{InputDescriptor, InputKind};
    use crate::registry::TypeDef;

    fn registry() -> TypeRegistry {
        TypeRegistry::new(vec![
            TypeDef::new("SiteTree")
                .with_db("Title", "Varchar(255)")
                .with_db("Status", "ENUM('draft','live')")
                .with_has_one("Owner", "Member"),
            TypeDef::new("Page")
                .with_parent("SiteTree")
                .with_db("Status", "ENUM('hidden','shown')")
                .with_has_many("Comments", "Comment"),
            TypeDef::new("BlogPost")
                .with_parent("Page")
                .with_db("Views", "Int")
                .with_traversal(true, false),
            TypeDef::new("Member").with_db("Email", "Varchar"),
            TypeDef::new("Comment").with_db("Body", "Text"),
        ])
        .unwrap()
    }

    fn field_names(schema: &TypeSchema) -> Vec<&str> {
        schema.fields.keys().map(String::as_str).collect()
    }

    #[test]
    fn catalog_covers_every_subclass() {
        let reg = registry();
        let catalog = build_catalog(&reg, &reg.root_kinds()).unwrap();
        let names: Vec<&str> = catalog.type_names().collect();
        assert_eq!(names, vec!["SiteTree", "Page", "BlogPost", "Member", "Comment"]);
    }

    #[test]
    fn schema_merges_ancestor_fields() {
        let reg = registry();
        let catalog = build_catalog(&reg, &reg.root_kinds()).unwrap();

        let page = catalog.get("Page").unwrap();
        assert_eq!(page.base.as_deref(), Some("SiteTree"));
        assert_eq!(field_names(page), vec!["Title", "Status", "Owner", "Comments"]);
        assert_eq!(page.fields["Owner"].kind, InputKind::ToOne);
        assert_eq!(page.fields["Comments"].kind, InputKind::ToMany);

        let root = catalog.get("SiteTree").unwrap();
        assert_eq!(root.base, None);
        assert_eq!(field_names(root), vec!["Title", "Status", "Owner"]);
    }

    #[test]
    fn descendant_overrides_deep_merge_options() {
        let reg = registry();
        let catalog = build_catalog(&reg, &reg.root_kinds()).unwrap();
        let status = &catalog.get("Page").unwrap().fields["Status"];
        assert_eq!(status.default, json!("hidden"));
        // Option maps from both levels are unioned, ancestor entries first.
        let options: Vec<&str> = status.options.as_ref().unwrap().keys().map(String::as_str).collect();
        assert_eq!(options, vec!["draft", "live", "hidden", "shown"]);
    }

    #[test]
    fn base_is_parent_of_queried_type() {
        let reg = registry();
        let catalog = build_catalog(&reg, &reg.root_kinds()).unwrap();
        assert_eq!(catalog.get("BlogPost").unwrap().base.as_deref(), Some("Page"));
    }

    #[test]
    fn traversal_flag_hides_level_relations() {
        let reg = TypeRegistry::new(vec![
            TypeDef::new("Box")
                .with_db("Label", "Varchar")
                .with_has_one("Lid", "Lid")
                .with_has_many("Items", "Lid")
                .with_traversal(false, false),
            TypeDef::new("Lid"),
        ])
        .unwrap();
        let schema = build_type_schema(&reg, "Box", None);
        assert_eq!(field_names(&schema), vec!["Label"]);
    }

    #[test]
    fn wire_shape() {
        let reg = TypeRegistry::new(vec![TypeDef::new("Flag").with_db("On", "Boolean")]).unwrap();
        let catalog = build_catalog(&reg, &reg.root_kinds()).unwrap();
        assert_eq!(
            serde_json::to_value(&catalog).unwrap(),
            json!({"Flag": {"base": null, "fields": {"On": {"type": "bool", "default": "", "options": null}}}})
        );
    }

    struct Synthetic;

    impl CatalogAugmenter for Synthetic {
        fn augment_types(&self, catalog: &mut TypeCatalog) {
            let mut schema = TypeSchema::default();
            schema
                .fields
                .insert("Note".into(), InputDescriptor::new(InputKind::Text));
            catalog.insert("VirtualNote", schema);
        }
    }

    #[test]
    fn augmenter_injects_entries() {
        let reg = registry().with_augmenter("Comment", Arc::new(Synthetic)).unwrap();
        let catalog = build_catalog(&reg, &reg.root_kinds()).unwrap();
        assert!(catalog.contains("VirtualNote"));
        assert_eq!(catalog.type_names().last(), Some("VirtualNote"));
    }

    struct TitleAsSelect;

    impl TypeHooks for TitleAsSelect {
        fn describe_field(&self, _registry: &TypeRegistry, field: &str) -> Option<InputDescriptor> {
            (field == "Title").then(|| InputDescriptor::new(InputKind::Select).with_options(["A", "B"]))
        }
    }

    #[test]
    fn field_hook_applies_through_catalog() {
        let reg = registry().with_hooks("SiteTree", Arc::new(TitleAsSelect)).unwrap();
        let catalog = build_catalog(&reg, &reg.root_kinds()).unwrap();
        let title = &catalog.get("BlogPost").unwrap().fields["Title"];
        assert_eq!(title.kind, InputKind::Select);
    }

    #[test]
    fn narrowed_roots_keep_ancestor_fields() {
        let reg = registry();
        let catalog = build_catalog(&reg, &["Page".to_string()]).unwrap();
        let names: Vec<&str> = catalog.type_names().collect();
        assert_eq!(names, vec!["Page", "BlogPost"]);

        let post = catalog.get("BlogPost").unwrap();
        assert_eq!(post.base.as_deref(), Some("Page"));
        assert_eq!(field_names(post), vec!["Title", "Status", "Owner", "Comments", "Views"]);
    }

    struct Counting(std::sync::atomic::AtomicUsize);

    impl CatalogAugmenter for Counting {
        fn augment_types(&self, _catalog: &mut TypeCatalog) {
            self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        }
    }

    #[test]
    fn overlapping_roots_build_each_type_once() {
        let counter = Arc::new(Counting(Default::default()));
        let reg = registry().with_augmenter("Page", counter.clone()).unwrap();
        let catalog =
            build_catalog(&reg, &["SiteTree".to_string(), "Page".to_string()]).unwrap();
        assert_eq!(catalog.len(), 3);
        // Page and BlogPost, once each.
        assert_eq!(counter.0.load(std::sync::atomic::Ordering::SeqCst), 2);
        assert_eq!(
            field_names(catalog.get("Page").unwrap()),
            vec!["Title", "Status", "Owner", "Comments"]
        );
    }

    #[test]
    fn unknown_roots_are_skipped() {
        let reg = registry();
        let catalog = build_catalog(&reg, &["Nope".to_string()]).unwrap();
        assert!(catalog.is_empty());
    }
}
