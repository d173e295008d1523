//! Subcommand implementations over a registry file and a redb store.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use objgraph::{
    build_catalog, submit, EditorPayload, GraphDeserializer, KvObjectStore, ObjectRecord,
    TypeRegistry,
};
use objgraph_core::{GraphConfig, RecordId};
use objgraph_kv::{KVStore, RedbStore};
use serde_json::Value;
use tracing::info;

/// Everything a subcommand needs: configuration, registry and store.
pub struct Context {
    config: GraphConfig,
    registry: Arc<TypeRegistry>,
    store: KvObjectStore,
}

impl Context {
    pub fn open(config: GraphConfig) -> Result<Self> {
        let schema_path = config.resolve_schema_path();
        info!("Loading types from {}", schema_path.display());
        let registry = Arc::new(load_registry(&schema_path)?);

        let db_path = config.resolve_db_path();
        if let Some(dir) = db_path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        let kv: Arc<dyn KVStore> = Arc::new(
            RedbStore::open(&db_path)
                .map_err(|e| anyhow::anyhow!("failed to open KV store: {}", e))?,
        );
        let store = KvObjectStore::new(kv, registry.clone());

        Ok(Self {
            config,
            registry,
            store,
        })
    }
}

/// Load type definitions; `.json` files are JSON, everything else YAML.
fn load_registry(path: &Path) -> Result<TypeRegistry> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let registry = match path.extension().and_then(|e| e.to_str()) {
        Some("json") => TypeRegistry::from_json_str(&source)?,
        _ => TypeRegistry::from_yaml_str(&source)?,
    };
    Ok(registry)
}

pub fn catalog(ctx: &Context) -> Result<()> {
    let catalog = build_catalog(&ctx.registry, &ctx.registry.root_kinds())?;
    println!("{}", serde_json::to_string_pretty(&catalog)?);
    Ok(())
}

pub fn create(ctx: &mut Context, type_name: &str, json_body: &str) -> Result<()> {
    let fields = match serde_json::from_str(json_body)? {
        Value::Object(fields) => fields,
        _ => anyhow::bail!("--json must be a JSON object of fields"),
    };
    let record = ObjectRecord::new(type_name, fields);
    let saved = GraphDeserializer::new(&ctx.registry, &mut ctx.store, &ctx.config)
        .deserialize(&record)?;
    print_saved(saved);
    Ok(())
}

pub fn export(ctx: &Context, id: u64) -> Result<()> {
    let payload = EditorPayload::load(&ctx.registry, &ctx.store, RecordId(id), &ctx.config)?;
    println!("{}", serde_json::to_string_pretty(payload.representation())?);
    Ok(())
}

pub fn import(ctx: &mut Context, file: &Path) -> Result<()> {
    let raw = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let saved = submit(&ctx.registry, &mut ctx.store, &ctx.config, &raw)?;
    print_saved(saved);
    Ok(())
}

pub fn summary(ctx: &Context, id: u64) -> Result<()> {
    let payload = EditorPayload::load(&ctx.registry, &ctx.store, RecordId(id), &ctx.config)?;
    println!("{}", payload.summary());
    Ok(())
}

fn print_saved(saved: Option<RecordId>) {
    match saved {
        Some(id) => println!("{}", id.0),
        None => println!("nothing saved"),
    }
}
