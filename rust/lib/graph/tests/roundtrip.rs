//! End-to-end: YAML type file → registry → serialize → deserialize.

use std::sync::Arc;

use objgraph::{
    build_catalog, GraphConfig, GraphDeserializer, GraphSerializer, InputKind, KvObjectStore,
    ObjectRecord, ObjectStore, RecordId, TypeRegistry,
};
use objgraph_kv::{MemoryKV, RedbStore};
use serde_json::{json, Value};

const TYPES: &str = r#"
types:
  - name: SiteTree
    db:
      Title: Varchar(255)
      ShowInMenus: Boolean
    has_one:
      Owner: Member
  - name: Page
    parent: SiteTree
    db:
      Layout: "ENUM('wide','narrow')"
    has_many:
      Sections: Section
    defaults:
      Layout: narrow
  - name: BlogPost
    parent: Page
    db:
      Views: Int
  - name: Member
    db:
      Email: Varchar
  - name: Section
    db:
      Heading: Varchar
      Sort: Int
    has_one:
      Image: File
  - name: File
    db:
      Path: Varchar
"#;

fn registry() -> Arc<TypeRegistry> {
    Arc::new(TypeRegistry::from_yaml_str(TYPES).unwrap())
}

/// A blog post with an owner and two sections, one with an image.
fn build_graph(store: &mut dyn ObjectStore) -> RecordId {
    let post = store.create("BlogPost").unwrap();
    store.set_attr(post, "Title", json!("Hello")).unwrap();
    store.set_attr(post, "ShowInMenus", json!(1)).unwrap();
    store.set_attr(post, "Layout", json!("wide")).unwrap();
    store.set_attr(post, "Views", json!(42)).unwrap();

    let owner = store.create("Member").unwrap();
    store.set_attr(owner, "Email", json!("ann@example.com")).unwrap();
    store.write(owner).unwrap();
    store.set_foreign_key(post, "Owner", Some(owner)).unwrap();

    for (i, heading) in ["Intro", "Body"].into_iter().enumerate() {
        let section = store.create("Section").unwrap();
        store.set_attr(section, "Heading", json!(heading)).unwrap();
        store.set_attr(section, "Sort", json!(i as i64)).unwrap();
        if i == 1 {
            let file = store.create("File").unwrap();
            store.set_attr(file, "Path", json!("assets/body.png")).unwrap();
            store.write(file).unwrap();
            store.set_foreign_key(section, "Image", Some(file)).unwrap();
        }
        store.write(section).unwrap();
        store.add_related(post, "Sections", section).unwrap();
    }
    store.write(post).unwrap();
    post
}

fn round_trip(store: &mut dyn ObjectStore, reg: &TypeRegistry) {
    let config = GraphConfig::default();
    let post = build_graph(store);

    let original = GraphSerializer::new(reg, &*store, &config).serialize(post).unwrap();
    let copy = GraphDeserializer::new(reg, &mut *store, &config)
        .deserialize(&original)
        .unwrap()
        .unwrap();
    assert_ne!(copy, post);

    let restored = GraphSerializer::new(reg, &*store, &config).serialize(copy).unwrap();
    assert_eq!(restored, original);
}

#[test]
fn round_trip_in_memory() {
    let reg = registry();
    let mut store = KvObjectStore::new(Arc::new(MemoryKV::new()), reg.clone());
    round_trip(&mut store, &reg);
}

#[test]
fn round_trip_in_redb() {
    let dir = tempfile::tempdir().unwrap();
    let reg = registry();
    let kv = Arc::new(RedbStore::open(&dir.path().join("graph.redb")).unwrap());
    let mut store = KvObjectStore::new(kv.clone(), reg.clone());
    round_trip(&mut store, &reg);

    // Everything was written: a second store over the same file sees it.
    let reopened = KvObjectStore::new(kv, reg.clone());
    assert_eq!(reopened.list().unwrap().len(), 10);
}

#[test]
fn serialized_shape_follows_ancestry() {
    let reg = registry();
    let mut store = KvObjectStore::new(Arc::new(MemoryKV::new()), reg.clone());
    let post = build_graph(&mut store);
    let config = GraphConfig::default();

    let rep = GraphSerializer::new(&reg, &store, &config)
        .serialize_with_catalog(post)
        .unwrap();
    let fields: Vec<&str> = rep.data.fields.keys().map(String::as_str).collect();
    assert_eq!(
        fields,
        vec!["Title", "ShowInMenus", "Owner", "Layout", "Sections", "Views"]
    );
    assert_eq!(
        rep.data.field("Sections")[1]["fields"]["Image"],
        json!({"type": "File", "fields": {"Path": "assets/body.png"}})
    );

    let schema = rep.types.get("BlogPost").unwrap();
    assert_eq!(schema.base.as_deref(), Some("Page"));
    assert_eq!(schema.fields["ShowInMenus"].kind, InputKind::Bool);
    assert_eq!(schema.fields["Views"].kind, InputKind::Int);
    assert_eq!(schema.fields["Layout"].kind, InputKind::Select);
    assert_eq!(schema.fields["Layout"].default, json!("narrow"));
    assert_eq!(schema.fields["Owner"].kind, InputKind::ToOne);
    assert_eq!(schema.fields["Sections"].kind, InputKind::ToMany);
}

#[test]
fn defaults_seed_new_records() {
    let reg = registry();
    let mut store = KvObjectStore::new(Arc::new(MemoryKV::new()), reg.clone());
    let page = store.create("Page").unwrap();
    assert_eq!(store.get_attr(page, "Layout").unwrap(), json!("narrow"));
    assert_eq!(store.get_attr(page, "OwnerID").unwrap(), json!(0));
}

#[test]
fn edited_payload_saves_as_new_graph() {
    let reg = registry();
    let mut store = KvObjectStore::new(Arc::new(MemoryKV::new()), reg.clone());
    let config = GraphConfig::default();
    let post = build_graph(&mut store);

    let rep = GraphSerializer::new(&reg, &store, &config)
        .serialize_with_catalog(post)
        .unwrap();
    let mut payload = serde_json::to_value(&rep).unwrap();
    payload["data"]["fields"]["Title"] = json!("Edited");
    payload["data"]["fields"]["Views"] = json!("7");
    payload["data"]["fields"]["Sections"] = json!([
        null,
        {"type": "Section", "fields": {"Heading": "Only", "Sort": "0", "Image": ""}}
    ]);

    let saved = GraphDeserializer::new(&reg, &mut store, &config)
        .deserialize_top_level(&payload.to_string())
        .unwrap()
        .unwrap();

    let out = GraphSerializer::new(&reg, &store, &config).serialize(saved).unwrap();
    assert_eq!(out.field("Title"), &json!("Edited"));
    assert_eq!(out.field("Views"), &json!(7));
    let sections = out.field("Sections").as_array().unwrap();
    assert_eq!(sections.len(), 1);
    assert_eq!(
        ObjectRecord::from_value(&sections[0]).unwrap().field("Image"),
        &Value::Null
    );
    assert_eq!(out.field("Owner")["fields"]["Email"], json!("ann@example.com"));
}

#[test]
fn catalog_is_rebuilt_from_registry() {
    let reg = registry();
    let catalog = build_catalog(&reg, &["SiteTree".to_string()]).unwrap();
    let names: Vec<&str> = catalog.type_names().collect();
    assert_eq!(names, vec!["SiteTree", "Page", "BlogPost"]);
}
