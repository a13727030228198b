use std::sync::Arc;

use orbit_core::{Candidate, RecordId};
use orbit_storage::{Filter, RecordStore, StoreError};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum UpsertError {
    #[error("lookup of {identity} in {collection} failed: {source}")]
    Lookup {
        collection: &'static str,
        identity: String,
        #[source]
        source: StoreError,
    },
    #[error("create of {label:?} in {collection} failed: {source}")]
    Create {
        collection: &'static str,
        label: String,
        #[source]
        source: StoreError,
    },
    #[error("could not serialize {label:?} for {collection}: {source}")]
    Encode {
        collection: &'static str,
        label: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upserted {
    pub id: RecordId,
    pub created: bool,
}

/// Create-if-absent keyed on the candidate's identity. Existing records are
/// returned untouched; nothing is ever updated in place.
#[derive(Clone)]
pub struct Upserter {
    store: Arc<dyn RecordStore>,
}

impl Upserter {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    pub async fn upsert(&self, candidate: &Candidate) -> Result<Upserted, UpsertError> {
        let collection = candidate.kind().collection();
        let identity = candidate.identity();
        let filter = Filter::for_identity(&identity);

        let existing = self
            .store
            .find_first(collection, &filter)
            .await
            .map_err(|source| UpsertError::Lookup {
                collection,
                identity: identity.to_string(),
                source,
            })?;
        if let Some(record) = existing {
            debug!(collection, %identity, id = %record.id, "record already present");
            return Ok(Upserted {
                id: record.id,
                created: false,
            });
        }

        let body = candidate.to_body().map_err(|source| UpsertError::Encode {
            collection,
            label: candidate.label(),
            source,
        })?;
        let id = self
            .store
            .create(collection, &body)
            .await
            .map_err(|source| UpsertError::Create {
                collection,
                label: candidate.label(),
                source,
            })?;
        info!(collection, %identity, id = %id, label = %candidate.label(), "created record");
        Ok(Upserted { id, created: true })
    }
}
