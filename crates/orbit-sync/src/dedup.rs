use std::collections::HashSet;
use std::sync::Arc;

use anyhow::{Context, Result};
use orbit_core::{normalize_key, RecordId};
use orbit_storage::{RecordStore, StoredRecord};
use serde::Serialize;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy)]
pub struct DedupConfig {
    pub page_size: u32,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self { page_size: 100 }
    }
}

/// Which records survive a dedupe and which go.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DedupPlan {
    pub keep: Vec<RecordId>,
    pub remove: Vec<RecordId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DedupReport {
    pub collection: String,
    pub field: String,
    pub scanned: usize,
    pub removed: usize,
    pub failed: usize,
}

/// Sweeps a collection for records whose key field collides after
/// normalization, keeping the earliest-created one.
pub struct DedupEngine {
    store: Arc<dyn RecordStore>,
    config: DedupConfig,
}

impl DedupEngine {
    pub fn new(store: Arc<dyn RecordStore>, config: DedupConfig) -> Self {
        Self { store, config }
    }

    /// Records must be in creation order. Records with an empty or missing key
    /// are left alone.
    pub fn plan(records: &[StoredRecord], field: &str) -> DedupPlan {
        let mut seen = HashSet::new();
        let mut plan = DedupPlan::default();
        for record in records {
            let key = normalize_key(record.text(field).unwrap_or_default());
            if key.is_empty() || seen.insert(key) {
                plan.keep.push(record.id.clone());
            } else {
                plan.remove.push(record.id.clone());
            }
        }
        plan
    }

    pub async fn run(&self, collection: &str, field: &str) -> Result<DedupReport> {
        let records = self.scan(collection).await?;
        let plan = Self::plan(&records, field);
        info!(
            collection,
            field,
            scanned = records.len(),
            duplicates = plan.remove.len(),
            "dedupe scan finished"
        );

        let mut report = DedupReport {
            collection: collection.to_string(),
            field: field.to_string(),
            scanned: records.len(),
            removed: 0,
            failed: 0,
        };
        for id in &plan.remove {
            match self.store.delete(collection, id).await {
                Ok(()) => report.removed += 1,
                Err(err) => {
                    warn!(collection, id = %id, error = %err, "could not delete duplicate");
                    report.failed += 1;
                }
            }
        }
        info!(collection, removed = report.removed, failed = report.failed, "dedupe finished");
        Ok(report)
    }

    async fn scan(&self, collection: &str) -> Result<Vec<StoredRecord>> {
        let mut records = Vec::new();
        let mut page = 1;
        loop {
            let batch = self
                .store
                .list_page(collection, page, self.config.page_size)
                .await
                .with_context(|| format!("listing {collection} page {page}"))?;
            if batch.is_empty() {
                break;
            }
            records.extend(batch);
            page += 1;
        }
        Ok(records)
    }
}
