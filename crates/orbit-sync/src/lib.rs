//! Sync engine for the Orbit mirror: walks source listings, links embedded
//! references, writes new records, sweeps duplicates and schedules it all.

mod config;
mod dedup;
mod pipeline;
mod resolve;
mod scheduler;
mod upsert;

pub use config::{AuthPolicy, JobRegistry, JobSpec, SyncConfig, SyncJob};
pub use dedup::{DedupConfig, DedupEngine, DedupPlan, DedupReport};
pub use pipeline::{PassSummary, SyncPipeline};
pub use resolve::RelationResolver;
pub use scheduler::{SchedulerConfig, SyncScheduler};
pub use upsert::{UpsertError, Upserted, Upserter};

pub const CRATE_NAME: &str = "orbit-sync";
