use std::sync::Arc;

use chrono::{DateTime, Utc};
use orbit_adapters::{mapper_for, EntityMapper, Mapped, MappedItem};
use orbit_core::EntityKind;
use orbit_storage::{start_url, PageFetcher, RecordStore};
use serde::Serialize;
use serde_json::Value as JsonValue;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::SyncJob;
use crate::resolve::RelationResolver;
use crate::upsert::Upserter;

#[derive(Debug, Clone, Serialize)]
pub struct PassSummary {
    pub run_id: Uuid,
    pub kind: EntityKind,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub pages: usize,
    pub seen: usize,
    pub created: usize,
    pub existing: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Set when the listing could not be walked to its end.
    pub stopped_early: Option<String>,
}

impl PassSummary {
    fn start(kind: EntityKind) -> Self {
        let now = Utc::now();
        Self {
            run_id: Uuid::new_v4(),
            kind,
            started_at: now,
            finished_at: now,
            pages: 0,
            seen: 0,
            created: 0,
            existing: 0,
            skipped: 0,
            failed: 0,
            stopped_early: None,
        }
    }

    pub fn completed(&self) -> bool {
        self.stopped_early.is_none()
    }

    fn record(&mut self, outcome: ItemOutcome) {
        self.seen += 1;
        match outcome {
            ItemOutcome::Created => self.created += 1,
            ItemOutcome::Existing => self.existing += 1,
            ItemOutcome::Skipped => self.skipped += 1,
            ItemOutcome::Failed => self.failed += 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ItemOutcome {
    Created,
    Existing,
    Skipped,
    Failed,
}

/// One fetch-map-resolve-upsert walk over a listing.
#[derive(Clone)]
pub struct SyncPipeline {
    fetcher: Arc<PageFetcher>,
    resolver: RelationResolver,
    upserter: Upserter,
}

impl SyncPipeline {
    pub fn new(fetcher: Arc<PageFetcher>, store: Arc<dyn RecordStore>) -> Self {
        Self {
            fetcher,
            resolver: RelationResolver::new(store.clone()),
            upserter: Upserter::new(store),
        }
    }

    /// Walks every page of the job's listing. Item failures are counted and
    /// skipped; a fetch failure ends the pass with what was written so far.
    pub async fn run_pass(&self, job: &SyncJob) -> PassSummary {
        let mut summary = PassSummary::start(job.kind);
        let span = info_span!("sync_pass", kind = %job.kind, run_id = %summary.run_id);
        self.walk(job, &mut summary).instrument(span).await;
        summary.finished_at = Utc::now();
        summary
    }

    async fn walk(&self, job: &SyncJob, summary: &mut PassSummary) {
        let Some(mapper) = mapper_for(job.kind) else {
            warn!("no listing mapper for this kind");
            summary.stopped_early = Some(format!("{} has no listing mapper", job.kind));
            return;
        };
        let url = match start_url(&job.url, job.page_size) {
            Ok(url) => url,
            Err(err) => {
                error!(error = %err, "invalid job endpoint");
                summary.stopped_early = Some(err.to_string());
                return;
            }
        };

        info!(url = %url, "sync pass started");
        let mut cursor = self.fetcher.fetch_all(&url, job.page_size);
        loop {
            let page = match cursor.next_page().await {
                Ok(Some(page)) => page,
                Ok(None) => break,
                Err(err) => {
                    error!(error = %err, "fetch failed; ending pass early");
                    summary.stopped_early = Some(err.to_string());
                    break;
                }
            };
            summary.pages += 1;
            debug!(page = summary.pages, items = page.results.len(), "processing page");
            for raw in &page.results {
                let outcome = self.process_item(mapper.as_ref(), raw).await;
                summary.record(outcome);
            }
        }

        info!(
            pages = summary.pages,
            seen = summary.seen,
            created = summary.created,
            existing = summary.existing,
            skipped = summary.skipped,
            failed = summary.failed,
            complete = summary.completed(),
            "sync pass finished"
        );
    }

    async fn process_item(&self, mapper: &dyn EntityMapper, raw: &JsonValue) -> ItemOutcome {
        let MappedItem {
            mut candidate,
            relations,
        } = match mapper.map(raw) {
            Ok(Mapped::Item(item)) => item,
            Ok(Mapped::Skip(reason)) => {
                debug!(%reason, "item skipped");
                return ItemOutcome::Skipped;
            }
            Err(err) => {
                warn!(error = %err, "could not map item");
                return ItemOutcome::Failed;
            }
        };

        for slot in relations {
            match self.resolver.resolve(&slot.reference).await {
                Ok(Some(id)) => {
                    if !candidate.set_relation(slot.field, id) {
                        warn!(field = ?slot.field, label = %candidate.label(), "relation slot not supported");
                    }
                }
                Ok(None) if slot.required => {
                    info!(
                        label = %candidate.label(),
                        field = ?slot.field,
                        lookup = ?slot.reference.lookup,
                        "required relation unresolved; skipping item"
                    );
                    return ItemOutcome::Skipped;
                }
                Ok(None) => {}
                Err(err) if slot.required => {
                    warn!(label = %candidate.label(), error = %err, "required relation failed; skipping item");
                    return ItemOutcome::Failed;
                }
                Err(err) => {
                    warn!(label = %candidate.label(), field = ?slot.field, error = %err, "relation left empty");
                }
            }
        }

        match self.upserter.upsert(&candidate).await {
            Ok(upserted) if upserted.created => ItemOutcome::Created,
            Ok(_) => ItemOutcome::Existing,
            Err(err) => {
                warn!(error = %err, "upsert failed");
                ItemOutcome::Failed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orbit_storage::{FetchPolicy, HttpClientConfig, MemoryStore, RecordingSleeper};
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn pipeline(store: Arc<MemoryStore>) -> SyncPipeline {
        let fetcher = PageFetcher::new(
            HttpClientConfig {
                policy: FetchPolicy {
                    max_transport_retries: Some(0),
                    ..FetchPolicy::default()
                },
                ..HttpClientConfig::default()
            },
            Arc::new(RecordingSleeper::new()),
        )
        .expect("fetcher");
        SyncPipeline::new(Arc::new(fetcher), store)
    }

    fn job(server: &MockServer, kind: EntityKind, route: &str) -> SyncJob {
        SyncJob {
            kind,
            url: format!("{}{route}", server.uri()),
            page_size: 2,
        }
    }

    async fn mount_single_page(server: &MockServer, route: &str, results: JsonValue) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "count": results.as_array().map(Vec::len),
                "next": null,
                "results": results,
            })))
            .mount(server)
            .await;
    }

    fn launch(id: &str, title: &str, provider_id: i64) -> JsonValue {
        json!({
            "id": id,
            "name": title,
            "net": "2025-03-01T12:00:00Z",
            "launch_service_provider": {"id": provider_id, "name": "SpaceX", "type": "Commercial"},
            "rocket": {"configuration": {"id": 164, "name": "Falcon 9", "full_name": "Falcon 9 Block 5"}},
            "pad": {"id": 80, "name": "SLC-40", "location": {"name": "Cape Canaveral"}},
            "mission": {"id": 7001, "name": title, "type": "Communications"}
        })
    }

    #[tokio::test]
    async fn second_pass_over_same_listing_creates_nothing() {
        let server = MockServer::start().await;
        mount_single_page(
            &server,
            "/launches/",
            json!([launch("a1", "Falcon 9 | Starlink 12-1", 121), launch("a2", "Falcon 9 | Starlink 12-2", 121)]),
        )
        .await;
        let store = Arc::new(MemoryStore::new());
        let pipeline = pipeline(store.clone());
        let job = job(&server, EntityKind::Launch, "/launches/");

        let first = pipeline.run_pass(&job).await;
        assert!(first.completed());
        assert_eq!(first.created, 2);
        assert_eq!(store.records("events").len(), 2);
        assert_eq!(store.records("agencies").len(), 1);
        let creates_after_first = store.create_calls();

        let second = pipeline.run_pass(&job).await;
        assert_eq!(second.created, 0);
        assert_eq!(second.existing, 2);
        assert_eq!(store.create_calls(), creates_after_first);
        assert_ne!(first.run_id, second.run_id);

        let provider = store.records("agencies")[0].id.clone();
        let event = &store.records("events")[0];
        assert_eq!(event.fields["provider"], json!(provider.as_str()));
    }

    #[tokio::test]
    async fn failed_optional_relation_leaves_the_field_empty() {
        let server = MockServer::start().await;
        mount_single_page(
            &server,
            "/launches/",
            json!([launch("b1", "Falcon 9 | Starlink 6-1", 121)]),
        )
        .await;
        let store = Arc::new(MemoryStore::new());
        store.reject_creates_in("agencies");

        let summary = pipeline(store.clone())
            .run_pass(&job(&server, EntityKind::Launch, "/launches/"))
            .await;

        assert!(summary.completed());
        assert_eq!(summary.created, 1);
        assert_eq!(summary.failed, 0);
        assert!(store.records("agencies").is_empty());
        let events = store.records("events");
        assert_eq!(events.len(), 1);
        assert!(events[0].fields.get("provider").is_none());
        assert!(events[0].fields.get("rocket").is_some());
    }

    #[tokio::test]
    async fn spacewalk_with_unmirrored_expedition_is_never_written() {
        let server = MockServer::start().await;
        mount_single_page(
            &server,
            "/spacewalks/",
            json!([{"id": 300, "name": "US EVA 91", "expedition": {"id": 72, "name": "Expedition 72"}}]),
        )
        .await;
        let store = Arc::new(MemoryStore::new());

        let summary = pipeline(store.clone())
            .run_pass(&job(&server, EntityKind::Spacewalk, "/spacewalks/"))
            .await;

        assert_eq!(summary.skipped, 1);
        assert_eq!(store.create_calls(), 0);
        assert!(store.records("spacewalks").is_empty());
    }

    #[tokio::test]
    async fn spacewalk_links_expedition_once_mirrored() {
        let server = MockServer::start().await;
        mount_single_page(
            &server,
            "/spacewalks/",
            json!([{"id": 300, "name": "US EVA 91", "expedition": {"id": 72, "name": "Expedition 72"}}]),
        )
        .await;
        let store = Arc::new(MemoryStore::new());
        let expedition = store.insert("expeditions", json!({"api_id": 72, "name": "Expedition 72"}));

        let summary = pipeline(store.clone())
            .run_pass(&job(&server, EntityKind::Spacewalk, "/spacewalks/"))
            .await;

        assert_eq!(summary.created, 1);
        let walks = store.records("spacewalks");
        assert_eq!(walks[0].fields["expedition"], json!(expedition.as_str()));
    }

    #[tokio::test]
    async fn server_error_ends_pass_but_keeps_earlier_pages() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/agencies/"))
            .and(query_param("offset", "0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [{"id": 1, "name": "NASA"}, {"id": 2, "name": "ESA"}],
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/agencies/"))
            .and(query_param("offset", "2"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;
        let store = Arc::new(MemoryStore::new());

        let summary = pipeline(store.clone())
            .run_pass(&job(&server, EntityKind::Agency, "/agencies/"))
            .await;

        assert!(!summary.completed());
        assert_eq!(summary.pages, 1);
        assert_eq!(summary.created, 2);
        assert_eq!(store.records("agencies").len(), 2);
    }

    #[tokio::test]
    async fn malformed_and_failing_items_do_not_stop_the_page() {
        let server = MockServer::start().await;
        mount_single_page(
            &server,
            "/agencies/",
            json!([{"id": "not-a-number"}, {"id": 3, "name": "JAXA"}, {"name": "no id"}]),
        )
        .await;
        let store = Arc::new(MemoryStore::new());

        let summary = pipeline(store.clone())
            .run_pass(&job(&server, EntityKind::Agency, "/agencies/"))
            .await;

        assert!(summary.completed());
        assert_eq!(summary.seen, 3);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.created, 1);
    }

    #[tokio::test]
    async fn kind_without_listing_stops_immediately() {
        let server = MockServer::start().await;
        let store = Arc::new(MemoryStore::new());
        let summary = pipeline(store)
            .run_pass(&job(&server, EntityKind::Mission, "/missions/"))
            .await;
        assert!(!summary.completed());
        assert_eq!(summary.pages, 0);
    }
}
