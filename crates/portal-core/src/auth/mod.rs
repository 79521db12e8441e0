//! Authentication module for managing the signed-in account.
//!
//! This module provides:
//! - `Session`: who is signed in, persisted as `session.json`
//! - `CredentialStore`: the access token, kept in the OS keychain
//!
//! Signing out also wipes the response cache, since cached lists may hold
//! data only that account was allowed to see.

pub mod credentials;
pub mod session;

use anyhow::Result;
use tracing::info;

use crate::api::PortalClient;

pub use credentials::CredentialStore;
pub use session::{Session, SessionData, DEFAULT_TOKEN_EXPIRY_MINUTES};

/// Forget the session, its keychain token, and every cached response.
/// Returns the number of cache entries removed.
pub async fn logout(session: &mut Session, client: &PortalClient) -> Result<usize> {
    if let Some(email) = session.email().map(str::to_string) {
        CredentialStore::delete(&email)?;
        info!(email = %email, "Signed out");
    }
    session.clear()?;
    Ok(client.clear_all().await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::client::test_support::client;
    use crate::api::transport::fake::FakeTransport;
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_logout_without_session_still_clears_cache() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = Session::new(dir.path().to_path_buf());
        let (client, _) = client(Arc::new(FakeTransport::ok(json!([]))));
        client.cache().save("members", &json!([{ "id": "m1" }]));
        client.cache().save("evaluations_member_m1", &json!([]));

        assert_eq!(logout(&mut session, &client).await.unwrap(), 2);
        assert_eq!(client.cache().stats().entries, 0);
    }
}
