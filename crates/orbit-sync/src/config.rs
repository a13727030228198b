use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use orbit_core::EntityKind;
use orbit_storage::{FetchPolicy, HttpClientConfig, StoreClientConfig, StoreCredentials};
use serde::Deserialize;

const DEFAULT_SOURCE_BASE_URL: &str = "https://ll.thespacedevs.com/2.3.0";

/// Bounded retry for the startup login; exhausting it is fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthPolicy {
    pub attempts: usize,
    pub delay: Duration,
}

impl Default for AuthPolicy {
    fn default() -> Self {
        Self {
            attempts: 10,
            delay: Duration::from_secs(2),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub store_url: String,
    pub store_identity: Option<String>,
    pub store_password: Option<String>,
    pub store_auth_path: String,
    pub source_base_url: String,
    pub user_agent: String,
    pub http_timeout_secs: u64,
    pub initial_interval: Duration,
    pub steady_interval: Duration,
    pub page_size: u32,
    pub auth: AuthPolicy,
    pub fetch: FetchPolicy,
    pub jobs_file: Option<PathBuf>,
}

impl SyncConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Self {
        let number = |key: &str, default: u64| {
            var(key)
                .and_then(|v| v.trim().parse::<u64>().ok())
                .unwrap_or(default)
        };
        let non_empty = |key: &str| var(key).filter(|v| !v.trim().is_empty());
        let auth_defaults = AuthPolicy::default();

        Self {
            store_url: non_empty("ORBIT_STORE_URL")
                .unwrap_or_else(|| "http://127.0.0.1:8090".to_string()),
            store_identity: non_empty("ORBIT_STORE_IDENTITY"),
            store_password: non_empty("ORBIT_STORE_PASSWORD"),
            store_auth_path: non_empty("ORBIT_STORE_AUTH_PATH")
                .unwrap_or_else(|| "/api/admins/auth-with-password".to_string()),
            source_base_url: non_empty("ORBIT_SOURCE_BASE_URL")
                .unwrap_or_else(|| DEFAULT_SOURCE_BASE_URL.to_string()),
            user_agent: non_empty("ORBIT_USER_AGENT")
                .unwrap_or_else(|| "orbit-mirror/0.1".to_string()),
            http_timeout_secs: number("ORBIT_HTTP_TIMEOUT_SECS", 20),
            initial_interval: Duration::from_secs(number("ORBIT_INITIAL_INTERVAL_SECS", 60)),
            steady_interval: Duration::from_secs(number("ORBIT_STEADY_INTERVAL_SECS", 1800)),
            page_size: u32::try_from(number("ORBIT_PAGE_SIZE", 50))
                .unwrap_or(50)
                .max(1),
            auth: AuthPolicy {
                attempts: usize::try_from(number("ORBIT_AUTH_ATTEMPTS", auth_defaults.attempts as u64))
                    .unwrap_or(auth_defaults.attempts)
                    .max(1),
                delay: Duration::from_secs(number(
                    "ORBIT_AUTH_DELAY_SECS",
                    auth_defaults.delay.as_secs(),
                )),
            },
            fetch: FetchPolicy::default(),
            jobs_file: non_empty("ORBIT_JOBS_FILE").map(PathBuf::from),
        }
    }

    pub fn store_client_config(&self) -> StoreClientConfig {
        let credentials = match (&self.store_identity, &self.store_password) {
            (Some(identity), Some(password)) => Some(StoreCredentials {
                identity: identity.clone(),
                password: password.clone(),
            }),
            _ => None,
        };
        StoreClientConfig {
            base_url: self.store_url.clone(),
            auth_path: self.store_auth_path.clone(),
            credentials,
            timeout: Duration::from_secs(self.http_timeout_secs),
        }
    }

    pub fn http_client_config(&self) -> HttpClientConfig {
        HttpClientConfig {
            timeout: Duration::from_secs(self.http_timeout_secs),
            user_agent: Some(self.user_agent.clone()),
            policy: self.fetch,
        }
    }

    /// The YAML registry from `ORBIT_JOBS_FILE` when set, otherwise the built-in one.
    pub fn load_jobs(&self) -> Result<JobRegistry> {
        match &self.jobs_file {
            Some(path) => JobRegistry::load(path),
            None => Ok(JobRegistry::builtin()),
        }
    }

    pub fn resolve_jobs(&self) -> Result<Vec<SyncJob>> {
        Ok(self
            .load_jobs()?
            .jobs
            .iter()
            .filter(|job| job.enabled)
            .map(|job| job.resolve(&self.source_base_url, self.page_size))
            .collect())
    }
}

fn enabled_by_default() -> bool {
    true
}

/// One entry of the job registry: which kind to sync from which listing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct JobSpec {
    pub kind: EntityKind,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    /// Absolute URL, or a path relative to the source base URL.
    pub endpoint: String,
    #[serde(default)]
    pub page_size: Option<u32>,
}

impl JobSpec {
    fn new(kind: EntityKind, endpoint: &str) -> Self {
        Self {
            kind,
            enabled: true,
            endpoint: endpoint.to_string(),
            page_size: None,
        }
    }

    pub fn resolve(&self, base_url: &str, default_page_size: u32) -> SyncJob {
        let url = if self.endpoint.starts_with("http://") || self.endpoint.starts_with("https://") {
            self.endpoint.clone()
        } else {
            format!(
                "{}/{}",
                base_url.trim_end_matches('/'),
                self.endpoint.trim_start_matches('/')
            )
        };
        SyncJob {
            kind: self.kind,
            url,
            page_size: self.page_size.unwrap_or(default_page_size).max(1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct JobRegistry {
    pub jobs: Vec<JobSpec>,
}

impl JobRegistry {
    pub fn builtin() -> Self {
        Self {
            jobs: vec![
                JobSpec::new(EntityKind::Launch, "launches/upcoming/?mode=detailed"),
                JobSpec::new(EntityKind::Agency, "agencies/?mode=detailed"),
                JobSpec::new(EntityKind::Rocket, "launcher_configurations/?mode=detailed"),
                JobSpec::new(EntityKind::Pad, "pads/"),
                JobSpec::new(EntityKind::Station, "space_stations/?mode=detailed"),
                JobSpec::new(EntityKind::Astronaut, "astronauts/?mode=detailed"),
                JobSpec::new(EntityKind::Program, "programs/"),
                JobSpec::new(EntityKind::Payload, "payloads/?mode=detailed"),
                JobSpec::new(EntityKind::Expedition, "expeditions/?mode=detailed"),
                JobSpec::new(EntityKind::Spacewalk, "spacewalks/?mode=detailed"),
                JobSpec::new(EntityKind::DockingEvent, "docking_events/?mode=detailed"),
                JobSpec::new(EntityKind::DockingLocation, "docking_locations/"),
                JobSpec::new(EntityKind::Landing, "landings/"),
            ],
        }
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self> {
        serde_yaml::from_str(raw).context("parsing job registry yaml")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading job registry {}", path.display()))?;
        Self::from_yaml_str(&raw).with_context(|| format!("loading {}", path.display()))
    }
}

/// A registry entry with its URL and page size settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncJob {
    pub kind: EntityKind,
    pub url: String,
    pub page_size: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn config_from(pairs: &[(&str, &str)]) -> SyncConfig {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        SyncConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_env_is_empty() {
        let config = config_from(&[]);
        assert_eq!(config.store_url, "http://127.0.0.1:8090");
        assert_eq!(config.source_base_url, DEFAULT_SOURCE_BASE_URL);
        assert_eq!(config.initial_interval, Duration::from_secs(60));
        assert_eq!(config.steady_interval, Duration::from_secs(1800));
        assert_eq!(config.page_size, 50);
        assert_eq!(config.auth, AuthPolicy::default());
        assert!(config.store_client_config().credentials.is_none());
        assert_eq!(config.resolve_jobs().expect("jobs").len(), 13);
    }

    #[test]
    fn env_overrides_and_bad_numbers_fall_back() {
        let config = config_from(&[
            ("ORBIT_STORE_IDENTITY", "admin@example.com"),
            ("ORBIT_STORE_PASSWORD", "secret"),
            ("ORBIT_PAGE_SIZE", "100"),
            ("ORBIT_AUTH_ATTEMPTS", "three"),
            ("ORBIT_STEADY_INTERVAL_SECS", "600"),
        ]);
        assert_eq!(config.page_size, 100);
        assert_eq!(config.auth.attempts, 10);
        assert_eq!(config.steady_interval, Duration::from_secs(600));
        let store = config.store_client_config();
        assert_eq!(
            store.credentials.map(|c| c.identity),
            Some("admin@example.com".to_string())
        );
    }

    #[test]
    fn endpoints_resolve_against_base_url() {
        let relative = JobSpec::new(EntityKind::Pad, "/pads/");
        assert_eq!(
            relative.resolve("https://ll.example/2.3.0/", 50).url,
            "https://ll.example/2.3.0/pads/"
        );
        let absolute = JobSpec {
            page_size: Some(10),
            ..JobSpec::new(EntityKind::Pad, "http://mirror.local/pads/")
        };
        let job = absolute.resolve("https://ll.example/2.3.0", 50);
        assert_eq!(job.url, "http://mirror.local/pads/");
        assert_eq!(job.page_size, 10);
    }

    #[test]
    fn registry_loads_from_yaml_file() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        writeln!(
            file,
            "jobs:\n  - kind: launch\n    endpoint: launches/upcoming/\n    page_size: 25\n  - kind: docking_event\n    enabled: false\n    endpoint: docking_events/\n"
        )
        .expect("write");

        let registry = JobRegistry::load(file.path()).expect("load");
        assert_eq!(registry.jobs.len(), 2);
        assert_eq!(registry.jobs[0].kind, EntityKind::Launch);
        assert!(registry.jobs[0].enabled);
        assert_eq!(registry.jobs[0].page_size, Some(25));
        assert!(!registry.jobs[1].enabled);

        let config = SyncConfig {
            jobs_file: Some(file.path().to_path_buf()),
            ..config_from(&[])
        };
        let jobs = config.resolve_jobs().expect("jobs");
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].url, "https://ll.thespacedevs.com/2.3.0/launches/upcoming/");
    }

    #[test]
    fn unknown_kind_in_yaml_is_rejected() {
        assert!(JobRegistry::from_yaml_str("jobs:\n  - kind: comet\n    endpoint: x/\n").is_err());
    }
}
