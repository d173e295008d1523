use std::path::PathBuf;

/// Default recursion limit for serialize and save walks.
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// Configuration shared by the graph library and the `graphctl` binary.
#[derive(Debug, Clone)]
pub struct GraphConfig {
    /// Directory holding the database and type-definition files.
    pub data_dir: Option<PathBuf>,

    /// Path to the redb database file.
    /// Defaults to `{data_dir}/graph.redb` if not specified.
    pub db_path: Option<PathBuf>,

    /// Type-definition file (YAML or JSON).
    /// Defaults to `{data_dir}/types.yaml` if not specified.
    pub schema_path: Option<PathBuf>,

    /// Maximum nesting depth followed through relations. A graph with a
    /// cycle would otherwise recurse forever.
    pub max_depth: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            db_path: None,
            schema_path: None,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl GraphConfig {
    /// Resolve the redb database path, falling back to `{data_dir}/graph.redb`.
    pub fn resolve_db_path(&self) -> PathBuf {
        self.db_path
            .clone()
            .unwrap_or_else(|| self.resolve_data_subpath("graph.redb"))
    }

    /// Resolve the type-definition path, falling back to `{data_dir}/types.yaml`.
    pub fn resolve_schema_path(&self) -> PathBuf {
        self.schema_path
            .clone()
            .unwrap_or_else(|| self.resolve_data_subpath("types.yaml"))
    }

    fn resolve_data_subpath(&self, name: &str) -> PathBuf {
        self.data_dir
            .as_ref()
            .map(|d| d.join(name))
            .unwrap_or_else(|| PathBuf::from(name))
    }
}
