use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use orbit_core::EntityKind;
use orbit_storage::{PageFetcher, RecordStore, Sleeper, StoreClient, TokioSleeper};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::config::{AuthPolicy, SyncConfig, SyncJob};
use crate::pipeline::{PassSummary, SyncPipeline};

#[derive(Debug, Clone, Copy)]
pub struct SchedulerConfig {
    /// Wait after the first complete pass of a job.
    pub initial_interval: Duration,
    /// Wait after every other pass.
    pub steady_interval: Duration,
    pub auth: AuthPolicy,
}

impl From<&SyncConfig> for SchedulerConfig {
    fn from(config: &SyncConfig) -> Self {
        Self {
            initial_interval: config.initial_interval,
            steady_interval: config.steady_interval,
            auth: config.auth,
        }
    }
}

/// Runs one independent periodic job per enabled kind until told to stop.
pub struct SyncScheduler {
    pipeline: SyncPipeline,
    store: Arc<dyn RecordStore>,
    jobs: Vec<SyncJob>,
    config: SchedulerConfig,
    sleeper: Arc<dyn Sleeper>,
}

impl SyncScheduler {
    pub fn new(
        pipeline: SyncPipeline,
        store: Arc<dyn RecordStore>,
        jobs: Vec<SyncJob>,
        config: SchedulerConfig,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        Self {
            pipeline,
            store,
            jobs,
            config,
            sleeper,
        }
    }

    /// Wires the REST store, the source fetcher and the job registry from config.
    pub fn from_config(config: &SyncConfig) -> Result<Self> {
        let store: Arc<dyn RecordStore> = Arc::new(
            StoreClient::new(config.store_client_config()).context("building store client")?,
        );
        let sleeper: Arc<dyn Sleeper> = Arc::new(TokioSleeper);
        let fetcher = PageFetcher::new(config.http_client_config(), sleeper.clone())
            .context("building source client")?;
        let jobs = config.resolve_jobs()?;
        Ok(Self::new(
            SyncPipeline::new(Arc::new(fetcher), store.clone()),
            store,
            jobs,
            SchedulerConfig::from(config),
            sleeper,
        ))
    }

    pub fn store(&self) -> Arc<dyn RecordStore> {
        self.store.clone()
    }

    pub fn jobs(&self) -> &[SyncJob] {
        &self.jobs
    }

    pub async fn authenticate_with_retry(&self) -> Result<()> {
        let AuthPolicy { attempts, delay } = self.config.auth;
        for attempt in 1..=attempts {
            match self.store.authenticate().await {
                Ok(()) => {
                    info!(attempt, "record store session ready");
                    return Ok(());
                }
                Err(err) => {
                    warn!(attempt, attempts, error = %err, "record store authentication failed");
                    if attempt < attempts {
                        self.sleeper.sleep(delay).await;
                    }
                }
            }
        }
        bail!("could not authenticate with the record store after {attempts} attempts")
    }

    /// A single pass for one kind. The store must already be authenticated.
    pub async fn run_once(&self, kind: EntityKind) -> Result<PassSummary> {
        let job = self
            .jobs
            .iter()
            .find(|job| job.kind == kind)
            .ok_or_else(|| anyhow!("no enabled sync job for {kind}"))?;
        Ok(self.pipeline.run_pass(job).await)
    }

    /// Authenticates, then runs every job until `stop` flips to `true` or its
    /// sender goes away. An in-flight pass finishes before its job exits.
    pub async fn run_forever(&self, stop: watch::Receiver<bool>) -> Result<()> {
        if self.jobs.is_empty() {
            bail!("no sync jobs are enabled");
        }
        self.authenticate_with_retry().await?;

        let mut tasks = JoinSet::new();
        for job in &self.jobs {
            let span = info_span!("sync_job", kind = %job.kind);
            tasks.spawn(
                run_job(
                    self.pipeline.clone(),
                    job.clone(),
                    self.sleeper.clone(),
                    self.config,
                    stop.clone(),
                )
                .instrument(span),
            );
        }
        info!(jobs = self.jobs.len(), "scheduler started");

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((kind, passes)) => info!(%kind, passes, "sync job stopped"),
                Err(err) => error!(error = %err, "sync job panicked"),
            }
        }
        Ok(())
    }
}

async fn run_job(
    pipeline: SyncPipeline,
    job: SyncJob,
    sleeper: Arc<dyn Sleeper>,
    config: SchedulerConfig,
    mut stop: watch::Receiver<bool>,
) -> (EntityKind, usize) {
    let mut passes = 0;
    let mut warmed_up = false;
    loop {
        if *stop.borrow() {
            break;
        }
        let summary = pipeline.run_pass(&job).await;
        passes += 1;

        let wait = if summary.completed() && !warmed_up {
            warmed_up = true;
            config.initial_interval
        } else {
            config.steady_interval
        };
        debug!(passes, wait_secs = wait.as_secs(), "waiting for next pass");

        tokio::select! {
            _ = sleeper.sleep(wait) => {}
            changed = stop.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }
    (job.kind, passes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use orbit_storage::{
        FetchPolicy, HttpClientConfig, MemoryStore, RecordingSleeper, StoreClientConfig,
        StoreCredentials,
    };
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Records waits and raises the stop flag once `after` waits were requested.
    #[derive(Debug)]
    struct StopAfter {
        recorded: RecordingSleeper,
        after: usize,
        stop: watch::Sender<bool>,
    }

    #[async_trait]
    impl Sleeper for StopAfter {
        async fn sleep(&self, duration: Duration) {
            self.recorded.sleep(duration).await;
            if self.recorded.slept().len() >= self.after {
                let _ = self.stop.send(true);
            }
        }
    }

    fn scheduler_config() -> SchedulerConfig {
        SchedulerConfig {
            initial_interval: Duration::from_secs(60),
            steady_interval: Duration::from_secs(1800),
            auth: AuthPolicy {
                attempts: 3,
                delay: Duration::from_secs(2),
            },
        }
    }

    fn pipeline(store: Arc<dyn RecordStore>) -> SyncPipeline {
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

    fn agency_job(server: &MockServer) -> SyncJob {
        SyncJob {
            kind: EntityKind::Agency,
            url: format!("{}/agencies/", server.uri()),
            page_size: 10,
        }
    }

    #[tokio::test]
    async fn short_wait_after_first_pass_then_steady_interval() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/agencies/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "next": null,
                "results": [{"id": 121, "name": "SpaceX"}],
            })))
            .mount(&server)
            .await;

        let store = Arc::new(MemoryStore::new());
        let (tx, rx) = watch::channel(false);
        let sleeper = Arc::new(StopAfter {
            recorded: RecordingSleeper::new(),
            after: 3,
            stop: tx,
        });
        let scheduler = SyncScheduler::new(
            pipeline(store.clone()),
            store.clone(),
            vec![agency_job(&server)],
            scheduler_config(),
            sleeper.clone(),
        );

        scheduler.run_forever(rx).await.expect("run");

        assert_eq!(
            sleeper.recorded.slept(),
            vec![
                Duration::from_secs(60),
                Duration::from_secs(1800),
                Duration::from_secs(1800)
            ]
        );
        assert_eq!(store.create_calls(), 1);
        assert_eq!(store.records("agencies").len(), 1);
    }

    #[tokio::test]
    async fn failed_first_pass_waits_the_steady_interval() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/agencies/"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let store = Arc::new(MemoryStore::new());
        let (tx, rx) = watch::channel(false);
        let sleeper = Arc::new(StopAfter {
            recorded: RecordingSleeper::new(),
            after: 2,
            stop: tx,
        });
        let scheduler = SyncScheduler::new(
            pipeline(store.clone()),
            store,
            vec![agency_job(&server)],
            scheduler_config(),
            sleeper.clone(),
        );

        scheduler.run_forever(rx).await.expect("run");
        assert_eq!(
            sleeper.recorded.slept(),
            vec![Duration::from_secs(1800), Duration::from_secs(1800)]
        );
    }

    #[tokio::test]
    async fn stop_before_start_runs_no_pass() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/agencies/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"results": []})))
            .expect(0)
            .mount(&server)
            .await;

        let store = Arc::new(MemoryStore::new());
        let (tx, rx) = watch::channel(false);
        tx.send(true).expect("send stop");
        let scheduler = SyncScheduler::new(
            pipeline(store.clone()),
            store,
            vec![agency_job(&server)],
            scheduler_config(),
            Arc::new(RecordingSleeper::new()),
        );
        scheduler.run_forever(rx).await.expect("run");
    }

    fn store_client(server: &MockServer) -> Arc<dyn RecordStore> {
        Arc::new(
            StoreClient::new(StoreClientConfig {
                base_url: server.uri(),
                credentials: Some(StoreCredentials {
                    identity: "admin@example.com".to_string(),
                    password: "secret".to_string(),
                }),
                ..StoreClientConfig::default()
            })
            .expect("client"),
        )
    }

    #[tokio::test]
    async fn authentication_gives_up_after_configured_attempts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/admins/auth-with-password"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad credentials"))
            .expect(3)
            .mount(&server)
            .await;

        let store = store_client(&server);
        let sleeper = Arc::new(RecordingSleeper::new());
        let scheduler = SyncScheduler::new(
            pipeline(store.clone()),
            store,
            vec![agency_job(&server)],
            scheduler_config(),
            sleeper.clone(),
        );

        let (_tx, rx) = watch::channel(false);
        let err = scheduler.run_forever(rx).await.expect_err("auth exhausted");
        assert!(err.to_string().contains("3 attempts"));
        assert_eq!(
            sleeper.slept(),
            vec![Duration::from_secs(2), Duration::from_secs(2)]
        );
    }

    #[tokio::test]
    async fn authentication_recovers_within_budget() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/admins/auth-with-password"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/admins/auth-with-password"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "t0k"})))
            .mount(&server)
            .await;

        let store = store_client(&server);
        let sleeper = Arc::new(RecordingSleeper::new());
        let scheduler = SyncScheduler::new(
            pipeline(store.clone()),
            store,
            Vec::new(),
            scheduler_config(),
            sleeper.clone(),
        );

        scheduler.authenticate_with_retry().await.expect("auth");
        assert_eq!(sleeper.slept(), vec![Duration::from_secs(2)]);
    }

    #[tokio::test]
    async fn run_once_rejects_kinds_without_a_job() {
        let server = MockServer::start().await;
        let store: Arc<dyn RecordStore> = Arc::new(MemoryStore::new());
        let scheduler = SyncScheduler::new(
            pipeline(store.clone()),
            store,
            vec![agency_job(&server)],
            scheduler_config(),
            Arc::new(RecordingSleeper::new()),
        );
        assert!(scheduler.run_once(EntityKind::Launch).await.is_err());
    }
}
