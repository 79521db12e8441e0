//! Local caching module for portal data.
//!
//! This module provides the `CacheStore`, a TTL cache layered over a
//! persistent key-value `Storage` backend. Each entry records when it was
//! written and how long it stays fresh; expired entries read as misses and
//! are removed lazily, by the startup janitor, or by a sweep after a quota
//! failure.
//!
//! Pieces:
//! - `storage`: file and in-memory key-value backends
//! - `policy`: resource key to TTL table
//! - `keys`: the only place cache keys are built
//! - `singleflight`: coalesces concurrent misses for the same key

pub mod clock;
pub mod entry;
pub mod janitor;
pub mod keys;
pub mod policy;
pub mod singleflight;
pub mod storage;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use entry::CacheEntry;
pub use janitor::{spawn_janitor, DEFAULT_SWEEP_DELAY};
pub use keys::ResourceKey;
pub use policy::{CachePolicy, DEFAULT_TTL};
pub use singleflight::{FlightOutcome, SingleFlight};
pub use storage::{FileStorage, MemoryStorage, Storage, StorageError};
pub use store::{CacheStats, CacheStore, FetchOptions, CACHE_PREFIX};
