//! Network plumbing for the Orbit mirror: the paginated source fetcher, the record
//! store seam with its REST implementation, and the injectable clock.
//!
//! The in-memory store and the recording sleeper are test doubles, built only
//! for this crate's tests or with the `test-util` feature.

mod clock;
mod fetch;
mod http_store;
#[cfg(any(test, feature = "test-util"))]
mod memory;
mod store;

#[cfg(any(test, feature = "test-util"))]
pub use clock::RecordingSleeper;
pub use clock::{Sleeper, TokioSleeper};
pub use fetch::{
    classify_status, parse_retry_hint, start_url, FetchError, FetchPolicy, HttpClientConfig,
    Page, PageCursor, PageFetcher, ResponseDisposition,
};
pub use http_store::{StoreClient, StoreClientConfig, StoreCredentials};
#[cfg(any(test, feature = "test-util"))]
pub use memory::MemoryStore;
pub use store::{Filter, RecordStore, StoreError, StoredRecord};

pub const CRATE_NAME: &str = "orbit-storage";
