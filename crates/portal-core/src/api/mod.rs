//! REST API client module for the portal's serverless functions.
//!
//! This module provides the `PortalClient` and one wrapper per resource.
//! Reads go through the TTL cache and are retried on transient failures;
//! writes go straight to the network and invalidate the cache keys they
//! affect before returning.

pub mod client;
pub mod collection;
pub mod error;
pub mod evaluations;
pub mod members;
pub mod resources;
pub mod retry;
pub mod transport;

pub use client::{ClientConfig, PortalClient, DEFAULT_BASE_URL};
pub use collection::Collection;
pub use error::ApiError;
pub use evaluations::EvaluationsApi;
pub use members::{MemberActivitiesApi, MembersApi};
pub use resources::{PublicPagesApi, ResourcesApi};
pub use retry::{retry, RetryPolicy};
pub use transport::{ApiRequest, HttpTransport, Transport};
