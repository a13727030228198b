use std::sync::Arc;

use orbit_adapters::{Lookup, Reference};
use orbit_core::{RecordId, API_ID_FIELD};
use orbit_storage::{Filter, RecordStore};
use tracing::debug;

use crate::upsert::{UpsertError, Upserter};

/// Turns an embedded reference into a store identifier, creating the
/// referenced record from its seed when the lookup misses.
#[derive(Clone)]
pub struct RelationResolver {
    store: Arc<dyn RecordStore>,
    upserter: Upserter,
}

impl RelationResolver {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            upserter: Upserter::new(store.clone()),
            store,
        }
    }

    /// `Ok(None)` when nothing matches and the reference carries no seed.
    pub async fn resolve(&self, reference: &Reference) -> Result<Option<RecordId>, UpsertError> {
        let collection = reference.kind.collection();
        let filter = match &reference.lookup {
            Lookup::ApiId(id) => Filter::eq(API_ID_FIELD, *id),
            Lookup::Name(name) => Filter::eq("name", name.as_str()),
        };

        let found = self
            .store
            .find_first(collection, &filter)
            .await
            .map_err(|source| UpsertError::Lookup {
                collection,
                identity: filter.to_query(),
                source,
            })?;
        if let Some(record) = found {
            return Ok(Some(record.id));
        }

        match &reference.seed {
            Some(seed) => Ok(Some(self.upserter.upsert(seed).await?.id)),
            None => {
                debug!(collection, lookup = ?reference.lookup, "reference not mirrored yet");
                Ok(None)
            }
        }
    }
}
