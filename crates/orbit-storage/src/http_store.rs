//! REST client for the local record store (collection/record API with admin login).

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use orbit_core::RecordId;
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::store::{Filter, RecordStore, StoreError, StoredRecord};

/// Candidates fetched per normalized lookup before the client-side recheck.
const NORMALIZED_SCAN_PAGE: u32 = 200;

/// `created` has second resolution; `id` breaks ties so pages never overlap.
const STABLE_SORT: &str = "created,id";

#[derive(Debug, Clone)]
pub struct StoreCredentials {
    pub identity: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct StoreClientConfig {
    pub base_url: String,
    pub auth_path: String,
    pub credentials: Option<StoreCredentials>,
    pub timeout: Duration,
}

impl Default for StoreClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8090".to_string(),
            auth_path: "/api/admins/auth-with-password".to_string(),
            credentials: None,
            timeout: Duration::from_secs(20),
        }
    }
}

#[derive(Debug, Deserialize)]
struct AuthResponse {
    token: String,
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    items: Vec<StoredRecord>,
}

#[derive(Debug, Deserialize)]
struct CreatedResponse {
    id: RecordId,
}

#[derive(Debug)]
pub struct StoreClient {
    client: reqwest::Client,
    config: StoreClientConfig,
    token: RwLock<Option<String>>,
}

impl StoreClient {
    pub fn new(config: StoreClientConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .context("building store http client")?;
        Ok(Self {
            client,
            config,
            token: RwLock::new(None),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn records_url(&self, collection: &str) -> String {
        self.url(&format!("/api/collections/{collection}/records"))
    }

    pub async fn login(&self) -> Result<(), StoreError> {
        let credentials = self
            .config
            .credentials
            .as_ref()
            .ok_or_else(|| StoreError::Auth("no store credentials configured".to_string()))?;

        let url = self.url(&self.config.auth_path);
        let resp = self
            .client
            .post(&url)
            .json(&json!({
                "identity": credentials.identity,
                "password": credentials.password,
            }))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(StoreError::Auth(format!("{status}: {body}")));
        }

        let auth: AuthResponse = resp
            .json()
            .await
            .map_err(|err| StoreError::Decode(err.to_string()))?;
        *self.token.write().await = Some(auth.token);
        info!(identity = %credentials.identity, "authenticated with record store");
        Ok(())
    }

    async fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.token.read().await.as_deref() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn list(&self, collection: &str, query: &[(&str, String)]) -> Result<Vec<StoredRecord>, StoreError> {
        let url = self.records_url(collection);
        let request = self.authorized(self.client.get(&url).query(query)).await;
        let resp = checked(request.send().await?, &url).await?;
        let list: ListResponse = resp
            .json()
            .await
            .map_err(|err| StoreError::Decode(err.to_string()))?;
        Ok(list.items)
    }
}

async fn checked(resp: reqwest::Response, url: &str) -> Result<reqwest::Response, StoreError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(StoreError::Status {
        status: status.as_u16(),
        url: url.to_string(),
        body,
    })
}

#[async_trait]
impl RecordStore for StoreClient {
    async fn authenticate(&self) -> Result<(), StoreError> {
        self.login().await
    }

    async fn find_first(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Option<StoredRecord>, StoreError> {
        // The server-side `~` match is a superset; keep paging until a
        // candidate passes the exact recheck or the result set runs out.
        let per_page = match filter {
            Filter::Eq { .. } => 1,
            Filter::NormalizedEq { .. } => NORMALIZED_SCAN_PAGE,
        };
        let mut page: u32 = 1;
        loop {
            let query = [
                ("filter", filter.to_query()),
                ("page", page.to_string()),
                ("perPage", per_page.to_string()),
                ("sort", STABLE_SORT.to_string()),
            ];
            let items = self.list(collection, &query).await?;
            let hits = items.len();
            debug!(collection, filter = %filter.to_query(), page, hits, "store lookup");
            if let Some(found) = items.into_iter().find(|record| filter.matches(&record.fields)) {
                return Ok(Some(found));
            }
            if matches!(filter, Filter::Eq { .. }) || hits < per_page as usize {
                return Ok(None);
            }
            page += 1;
        }
    }

    async fn create(&self, collection: &str, body: &JsonValue) -> Result<RecordId, StoreError> {
        let url = self.records_url(collection);
        let request = self.authorized(self.client.post(&url).json(body)).await;
        let resp = checked(request.send().await?, &url).await?;
        let created: CreatedResponse = resp
            .json()
            .await
            .map_err(|err| StoreError::Decode(err.to_string()))?;
        Ok(created.id)
    }

    async fn delete(&self, collection: &str, id: &RecordId) -> Result<(), StoreError> {
        let url = format!("{}/{}", self.records_url(collection), id);
        let request = self.authorized(self.client.delete(&url)).await;
        checked(request.send().await?, &url).await?;
        Ok(())
    }

    async fn list_page(
        &self,
        collection: &str,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<StoredRecord>, StoreError> {
        let query = [
            ("page", page.to_string()),
            ("perPage", per_page.to_string()),
            ("sort", STABLE_SORT.to_string()),
        ];
        self.list(collection, &query).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer, credentials: Option<StoreCredentials>) -> StoreClient {
        StoreClient::new(StoreClientConfig {
            base_url: server.uri(),
            credentials,
            ..StoreClientConfig::default()
        })
        .expect("client")
    }

    fn admin() -> Option<StoreCredentials> {
        Some(StoreCredentials {
            identity: "admin@example.com".into(),
            password: "hunter22".into(),
        })
    }

    #[tokio::test]
    async fn login_token_is_sent_on_later_requests() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/admins/auth-with-password"))
            .and(body_json(json!({"identity": "admin@example.com", "password": "hunter22"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "tok-1"})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/collections/agencies/records"))
            .and(header("authorization", "Bearer tok-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "new-agency"})))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, admin());
        client.authenticate().await.expect("login");
        let id = client
            .create("agencies", &json!({"api_id": 121, "name": "SpaceX"}))
            .await
            .expect("create");
        assert_eq!(id, RecordId::new("new-agency"));
    }

    #[tokio::test]
    async fn missing_credentials_fail_authentication() {
        let server = MockServer::start().await;
        let client = client_for(&server, None);
        assert!(matches!(client.authenticate().await, Err(StoreError::Auth(_))));
    }

    #[tokio::test]
    async fn rejected_login_is_an_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad credentials"))
            .mount(&server)
            .await;
        let client = client_for(&server, admin());
        assert!(matches!(client.authenticate().await, Err(StoreError::Auth(_))));
    }

    #[tokio::test]
    async fn normalized_lookup_rechecks_candidates_client_side() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/collections/events/records"))
            .and(query_param("filter", "(title~\"launch a\")"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "page": 1,
                "items": [
                    {"id": "wide", "title": "Launch AB"},
                    {"id": "hit", "title": " launch A"},
                ],
            })))
            .mount(&server)
            .await;

        let client = client_for(&server, None);
        let found = client
            .find_first("events", &Filter::normalized_eq("title", "Launch A"))
            .await
            .expect("lookup")
            .expect("found");
        assert_eq!(found.id, RecordId::new("hit"));
    }

    #[tokio::test]
    async fn normalized_lookup_pages_past_near_misses() {
        let server = MockServer::start().await;
        let near_misses: Vec<_> = (0..NORMALIZED_SCAN_PAGE)
            .map(|i| json!({"id": format!("near-{i}"), "title": "Starlink Group 6-1N"}))
            .collect();
        Mock::given(method("GET"))
            .and(path("/api/collections/events/records"))
            .and(query_param("page", "1"))
            .and(query_param("perPage", "200"))
            .and(query_param("sort", "created,id"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": near_misses})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/collections/events/records"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{"id": "exact", "title": "Starlink Group 6-1"}],
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, None);
        let found = client
            .find_first("events", &Filter::normalized_eq("title", "starlink group 6-1"))
            .await
            .expect("lookup")
            .expect("found on the second page");
        assert_eq!(found.id, RecordId::new("exact"));
    }

    #[tokio::test]
    async fn normalized_lookup_stops_on_a_short_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/collections/events/records"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{"id": "near", "title": "Launch AB"}],
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, None);
        let found = client
            .find_first("events", &Filter::normalized_eq("title", "Launch A"))
            .await
            .expect("lookup");
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn listing_sorts_by_creation_then_id() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/collections/missions/records"))
            .and(query_param("page", "3"))
            .and(query_param("perPage", "50"))
            .and(query_param("sort", "created,id"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{"id": "m1", "name": "Artemis II"}],
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, None);
        let page = client.list_page("missions", 3, 50).await.expect("list");
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].text("name"), Some("Artemis II"));
    }

    #[tokio::test]
    async fn api_id_lookup_with_no_items_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/collections/rockets/records"))
            .and(query_param("filter", "(api_id=42)"))
            .and(query_param("perPage", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": []})))
            .mount(&server)
            .await;

        let client = client_for(&server, None);
        let found = client
            .find_first("rockets", &Filter::eq("api_id", 42))
            .await
            .expect("lookup");
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn failed_delete_reports_status() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/collections/missions/records/m1"))
            .respond_with(ResponseTemplate::new(404).set_body_string("missing"))
            .mount(&server)
            .await;

        let client = client_for(&server, None);
        let err = client
            .delete("missions", &RecordId::new("m1"))
            .await
            .expect_err("404");
        assert!(matches!(err, StoreError::Status { status: 404, .. }));
    }
}
