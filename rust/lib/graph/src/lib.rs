//! objgraph — nested JSON views of polymorphic record graphs.
//!
//! Records belong to a single-inheritance type hierarchy ([`TypeRegistry`]).
//! [`GraphSerializer`] turns a live record and everything it relates to into
//! one nested [`ObjectRecord`] plus a [`TypeCatalog`] describing how each
//! field should be edited; [`GraphDeserializer`] takes the edited structure
//! back and persists it through an [`ObjectStore`].
//!
//! ```text
//! TypeRegistry ──► catalog::build_catalog ──► TypeCatalog
//!      │                                          │
//!      └─► ancestry::walk ◄── ser / de ◄── ObjectStore (KvObjectStore)
//! ```

pub mod ancestry;
pub mod catalog;
pub mod de;
pub mod hooks;
pub mod input;
pub mod present;
pub mod registry;
pub mod ser;
pub mod store;
pub mod wire;

pub use catalog::{build_catalog, TypeCatalog, TypeSchema};
pub use de::GraphDeserializer;
pub use hooks::{CatalogAugmenter, TypeHooks};
pub use input::{InputDescriptor, InputKind};
pub use present::{submit, EditorPayload};
pub use registry::{RelationKind, TypeDef, TypeRegistry};
pub use ser::GraphSerializer;
pub use store::{KvObjectStore, ObjectStore, StoredRecord};
pub use wire::{ObjectRecord, QueryRepresentation};

pub use objgraph_core::{GraphConfig, GraphError, RecordId};
