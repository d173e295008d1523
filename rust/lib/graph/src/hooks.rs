//! Capability hooks — per-type overrides of the default catalog, serialize
//! and save behavior.
//!
//! Hooks are registered on a type with [`TypeRegistry::with_hooks`] and
//! apply to its subclasses too. Every method defaults to `None`, meaning
//! "no override, use the default logic".
//!
//! [`TypeRegistry::with_hooks`]: crate::registry::TypeRegistry::with_hooks

use objgraph_core::{GraphError, RecordId};
use serde_json::Value;

use crate::catalog::TypeCatalog;
use crate::de::GraphDeserializer;
use crate::input::InputDescriptor;
use crate::registry::TypeRegistry;
use crate::ser::GraphSerializer;

pub trait TypeHooks: Send + Sync {
    /// Full input descriptor for `field`, replacing type-based inference.
    fn describe_field(&self, _registry: &TypeRegistry, _field: &str) -> Option<InputDescriptor> {
        None
    }

    /// Wire value for relation `field` of record `id`.
    ///
    /// For to-one relations return a record value or `null`; for to-many
    /// relations return an array.
    fn build_relation_structure(
        &self,
        _ser: &GraphSerializer<'_>,
        _id: RecordId,
        _field: &str,
    ) -> Option<Result<Value, GraphError>> {
        None
    }

    /// Resolve one nested record of relation `field` while saving record `id`.
    ///
    /// Called once for a to-one relation and once per element for to-many.
    /// `Ok(None)` leaves the relation unlinked.
    fn resolve_relation_structure(
        &self,
        _de: &mut GraphDeserializer<'_>,
        _id: RecordId,
        _field: &str,
        _child: &Value,
    ) -> Option<Result<Option<RecordId>, GraphError>> {
        None
    }
}

/// Types that inject synthetic entries into the catalog.
///
/// Invoked right after the type's own schema is inserted, with everything
/// built so far.
pub trait CatalogAugmenter: Send + Sync {
    fn augment_types(&self, catalog: &mut TypeCatalog);
}
