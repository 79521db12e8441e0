//! Core library for the officials portal.
//!
//! - `api`: `PortalClient` and the per-resource wrappers
//! - `cache`: TTL cache with key-based invalidation
//! - `models`: portal records as the functions return them
//! - `auth`: session file and keychain token
//! - `config`: config file and environment overrides
//! - `mock`: member fixtures served when the functions are offline

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod mock;
pub mod models;

pub use api::{ApiError, ClientConfig, PortalClient};
pub use cache::{CacheStore, FetchOptions, ResourceKey};
pub use config::Config;
