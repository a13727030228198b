use async_trait::async_trait;
use orbit_core::{normalize_key, IdentityKey, RecordId, API_ID_FIELD};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("store returned {status} for {url}: {body}")]
    Status {
        status: u16,
        url: String,
        body: String,
    },
    #[error("could not decode store response: {0}")]
    Decode(String),
    #[error("store authentication failed: {0}")]
    Auth(String),
    #[error("could not encode record body: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Lookup predicate understood by every store implementation.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq { field: String, value: JsonValue },
    /// Equality after trim + lowercase on both sides.
    NormalizedEq { field: String, value: String },
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        Filter::Eq {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn normalized_eq(field: impl Into<String>, value: &str) -> Self {
        Filter::NormalizedEq {
            field: field.into(),
            value: normalize_key(value),
        }
    }

    pub fn for_identity(identity: &IdentityKey) -> Self {
        match identity {
            IdentityKey::ApiId(id) => Filter::eq(API_ID_FIELD, *id),
            IdentityKey::Normalized { field, value } => Filter::normalized_eq(*field, value),
        }
    }

    pub fn field(&self) -> &str {
        match self {
            Filter::Eq { field, .. } | Filter::NormalizedEq { field, .. } => field,
        }
    }

    pub fn matches(&self, fields: &Map<String, JsonValue>) -> bool {
        match self {
            Filter::Eq { field, value } => fields.get(field) == Some(value),
            Filter::NormalizedEq { field, value } => fields
                .get(field)
                .and_then(JsonValue::as_str)
                .is_some_and(|stored| normalize_key(stored) == *value),
        }
    }

    /// Filter expression for the store's query API. `NormalizedEq` becomes a
    /// case-insensitive contains match and needs a client-side recheck.
    pub fn to_query(&self) -> String {
        match self {
            Filter::Eq { field, value } => match value {
                JsonValue::String(text) => format!("({field}=\"{}\")", escape(text)),
                other => format!("({field}={other})"),
            },
            Filter::NormalizedEq { field, value } => format!("({field}~\"{}\")", escape(value)),
        }
    }
}

fn escape(raw: &str) -> String {
    raw.replace('\\', "\\\\").replace('"', "\\\"")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub id: RecordId,
    #[serde(flatten)]
    pub fields: Map<String, JsonValue>,
}

impl StoredRecord {
    pub fn text(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(JsonValue::as_str)
    }
}

/// The local record store. Records are never updated in place.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Obtain whatever session the store needs. No-op for stores without auth.
    async fn authenticate(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn find_first(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Option<StoredRecord>, StoreError>;

    async fn create(&self, collection: &str, body: &JsonValue) -> Result<RecordId, StoreError>;

    async fn delete(&self, collection: &str, id: &RecordId) -> Result<(), StoreError>;

    /// One page (1-based) of records in creation order. An empty page means the end.
    async fn list_page(
        &self,
        collection: &str,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<StoredRecord>, StoreError>;
}
