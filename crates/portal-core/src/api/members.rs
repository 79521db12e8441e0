//! Members, their activity log, and account invitations.
//!
//! These are the only wrappers with a development fallback: when mock data
//! is enabled and the functions cannot be reached, reads and creates are
//! answered from the in-memory fixtures instead of failing.

use serde_json::{json, Value};
use tracing::info;

use crate::cache::{keys, FetchOptions, ResourceKey};
use crate::models::{Member, MemberActivity};

use super::client::PortalClient;
use super::transport::ApiRequest;
use super::ApiError;

const MEMBERS_PATH: &str = "/members";
const ACTIVITIES_PATH: &str = "/member-activities";
const AUTH_ADMIN_PATH: &str = "/supabase-auth-admin";

/// Role sent with an invite when the member has none.
const DEFAULT_INVITE_ROLE: &str = "official";

fn members_key() -> Vec<String> {
    vec![ResourceKey::Members.as_str().to_string()]
}

/// Treat "no such member" as an empty lookup.
fn found<T>(result: Result<Option<T>, ApiError>) -> Result<Option<T>, ApiError> {
    match result {
        Err(e) if e.is_not_found() => Ok(None),
        other => other,
    }
}

pub struct MembersApi<'a> {
    client: &'a PortalClient,
}

impl MembersApi<'_> {
    pub async fn get_all(&self, options: FetchOptions) -> Result<Vec<Member>, ApiError> {
        let result = self
            .client
            .fetch_cached(
                ResourceKey::Members.as_str(),
                ApiRequest::get(MEMBERS_PATH),
                options,
            )
            .await;
        match result {
            Err(e) => match self.client.mock_fallback(&e, "members") {
                Some(mock) => Ok(mock.members()),
                None => Err(e),
            },
            ok => ok,
        }
    }

    async fn lookup(&self, param: &str, value: &str) -> Result<Option<Member>, ApiError> {
        let request = ApiRequest::get(MEMBERS_PATH).query(param, value);
        found(self.client.fetch_uncached(request).await)
    }

    /// The member linked to an auth account.
    pub async fn get_by_user_id(&self, user_id: &str) -> Result<Option<Member>, ApiError> {
        match self.lookup("user_id", user_id).await {
            Err(e) => match self.client.mock_fallback(&e, "member lookup") {
                Some(mock) => Ok(mock.member_by_user_id(user_id)),
                None => Err(e),
            },
            ok => ok,
        }
    }

    pub async fn get_by_email(&self, email: &str) -> Result<Option<Member>, ApiError> {
        match self.lookup("email", email).await {
            Err(e) => match self.client.mock_fallback(&e, "member lookup") {
                Some(_) => Ok(None),
                None => Err(e),
            },
            ok => ok,
        }
    }

    pub async fn get_by_id(&self, id: &str) -> Result<Option<Member>, ApiError> {
        match self.lookup("id", id).await {
            Err(e) => match self.client.mock_fallback(&e, "member lookup") {
                Some(mock) => Ok(mock.member_by_id(id)),
                None => Err(e),
            },
            ok => ok,
        }
    }

    pub async fn create(&self, member: &Member) -> Result<Member, ApiError> {
        let request = ApiRequest::post(MEMBERS_PATH, serde_json::to_value(member)?);
        match self.client.mutate(request, &members_key()).await {
            Err(e) => match self.client.mock_fallback(&e, "member create") {
                Some(mock) => {
                    let created = mock.create_member(member);
                    self.client.invalidate(ResourceKey::Members.as_str()).await;
                    Ok(created)
                }
                None => Err(e),
            },
            ok => ok,
        }
    }

    /// Write only the fields in `changes`.
    pub async fn update(&self, id: &str, changes: &Value) -> Result<Member, ApiError> {
        let request = ApiRequest::update(MEMBERS_PATH, id, changes)?;
        match self.client.mutate(request, &members_key()).await {
            Err(e) => match self.client.mock_fallback(&e, "member update") {
                Some(mock) => {
                    let updated = mock
                        .update_member(id, changes)
                        .ok_or_else(|| ApiError::NotFound(format!("member {}", id)))?;
                    self.client.invalidate(ResourceKey::Members.as_str()).await;
                    Ok(updated)
                }
                None => Err(e),
            },
            ok => ok,
        }
    }

    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        let request = ApiRequest::delete(MEMBERS_PATH).query("id", id);
        match self.client.mutate_discard(request, &members_key()).await {
            Err(e) => match self.client.mock_fallback(&e, "member delete") {
                Some(mock) => {
                    mock.delete_member(id);
                    self.client.invalidate(ResourceKey::Members.as_str()).await;
                    self.client
                        .invalidate_by_prefix(ResourceKey::MemberActivities.as_str())
                        .await;
                    Ok(())
                }
                None => Err(e),
            },
            ok => ok,
        }
    }

    // ===== Account invitations =====

    /// Re-send the sign-up invitation for `member`.
    pub async fn resend_invite(&self, member: &Member) -> Result<Value, ApiError> {
        let token = self.client.require_token()?;
        let body = json!({
            "action": "resend",
            "email": member.email,
            "name": member.name,
            "role": member.role.as_deref().unwrap_or(DEFAULT_INVITE_ROLE),
        });
        let request = ApiRequest::post(AUTH_ADMIN_PATH, body).bearer(Some(token));
        let response = self.client.mutate(request, &members_key()).await?;
        info!(email = %member.email, "Invite re-sent");
        Ok(response)
    }

    pub async fn send_password_reset(&self, email: &str) -> Result<Value, ApiError> {
        let token = self.client.require_token()?;
        let body = json!({ "action": "reset_password", "email": email });
        let request = ApiRequest::put(AUTH_ADMIN_PATH, body).bearer(Some(token));
        self.client.mutate(request, &[]).await
    }

    /// Re-send invitations to every member who has not signed in yet.
    pub async fn resend_pending_invites(&self) -> Result<Value, ApiError> {
        let token = self.client.require_token()?;
        let body = json!({ "action": "resend_pending" });
        let request = ApiRequest::post(AUTH_ADMIN_PATH, body).bearer(Some(token));
        self.client.mutate(request, &members_key()).await
    }
}

pub struct MemberActivitiesApi<'a> {
    client: &'a PortalClient,
}

impl MemberActivitiesApi<'_> {
    /// All activities, or one member's when `member_id` is given.
    pub async fn get_all(
        &self,
        member_id: Option<&str>,
        options: FetchOptions,
    ) -> Result<Vec<MemberActivity>, ApiError> {
        let member_id = keys::scope_id(member_id);
        let mut request = ApiRequest::get(ACTIVITIES_PATH);
        if let Some(id) = member_id {
            request = request.query("member_id", id);
        }
        let result = self
            .client
            .fetch_cached(&keys::member_activities(member_id), request, options)
            .await;
        match result {
            Err(e) => match self.client.mock_fallback(&e, "activities") {
                Some(mock) => Ok(mock.activities(member_id)),
                None => Err(e),
            },
            ok => ok,
        }
    }

    pub async fn create(&self, activity: &MemberActivity) -> Result<MemberActivity, ApiError> {
        let invalidations = keys::member_activity_invalidations(activity.member_id.as_deref());
        let request = ApiRequest::post(ACTIVITIES_PATH, serde_json::to_value(activity)?);
        match self.client.mutate(request, &invalidations).await {
            Err(e) => match self.client.mock_fallback(&e, "activity create") {
                Some(mock) => {
                    let created = mock.create_activity(activity);
                    self.client.invalidate_keys(&invalidations).await;
                    Ok(created)
                }
                None => Err(e),
            },
            ok => ok,
        }
    }

    /// Write only the fields in `changes`. The member's list is dropped for
    /// the `member_id` in `changes` and for the one the server reports back.
    pub async fn update(&self, id: &str, changes: &Value) -> Result<MemberActivity, ApiError> {
        let sent = changes.get("member_id").and_then(Value::as_str);
        let request = ApiRequest::update(ACTIVITIES_PATH, id, changes)?;
        let updated: MemberActivity = self
            .client
            .mutate(request, &keys::member_activity_invalidations(sent))
            .await?;
        if keys::scope_id(updated.member_id.as_deref()) != keys::scope_id(sent) {
            self.client
                .invalidate_keys(&keys::member_activity_invalidations(updated.member_id.as_deref()))
                .await;
        }
        Ok(updated)
    }

    pub async fn delete(&self, id: &str, member_id: Option<&str>) -> Result<(), ApiError> {
        let request = ApiRequest::delete(ACTIVITIES_PATH).query("id", id);
        self.client
            .mutate_discard(request, &keys::member_activity_invalidations(member_id))
            .await
    }
}

impl PortalClient {
    pub fn members(&self) -> MembersApi<'_> {
        MembersApi { client: self }
    }

    pub fn member_activities(&self) -> MemberActivitiesApi<'_> {
        MemberActivitiesApi { client: self }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::client::test_support::{client, client_with_config};
    use crate::api::client::ClientConfig;
    use crate::api::retry::RetryPolicy;
    use crate::api::transport::fake::FakeTransport;
    use reqwest::Method;
    use std::sync::Arc;

    fn offline() -> Arc<FakeTransport> {
        Arc::new(FakeTransport::new(|_| {
            Err(ApiError::Network("connection refused".to_string()))
        }))
    }

    fn mock_config() -> ClientConfig {
        ClientConfig {
            use_mock_data: true,
            retry: RetryPolicy::none(),
            ..ClientConfig::default()
        }
    }

    #[tokio::test]
    async fn test_activity_create_invalidates_scoped_and_unscoped() {
        let transport = Arc::new(FakeTransport::new(|req| {
            if req.method == Method::POST {
                Ok(json!({ "id": "a9", "member_id": "m1", "activity_type": "game", "activity_date": "2024-12-01" }))
            } else {
                Ok(json!([]))
            }
        }));
        let (client, _) = client(transport.clone());
        let activities = client.member_activities();

        activities.get_all(None, FetchOptions::default()).await.unwrap();
        activities.get_all(Some("m1"), FetchOptions::default()).await.unwrap();
        activities.get_all(Some("m2"), FetchOptions::default()).await.unwrap();
        assert_eq!(transport.calls()[1].query_value("member_id"), Some("m1"));

        activities
            .create(&MemberActivity {
                member_id: Some("m1".to_string()),
                activity_type: "game".to_string(),
                activity_date: "2024-12-01".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();

        let cache = client.cache();
        assert!(cache.get::<Value>("memberActivities").is_none());
        assert!(cache.get::<Value>("memberActivities_m1").is_none());
        assert!(cache.get::<Value>("memberActivities_m2").is_some());
    }

    #[tokio::test]
    async fn test_blank_member_id_reads_and_writes_share_a_key() {
        let transport = Arc::new(FakeTransport::new(|req| {
            if req.method == Method::POST {
                Ok(json!({ "id": "a9", "member_id": "", "activity_type": "game" }))
            } else {
                Ok(json!([]))
            }
        }));
        let (client, _) = client(transport.clone());
        let activities = client.member_activities();

        activities.get_all(Some(""), FetchOptions::default()).await.unwrap();
        assert_eq!(transport.calls()[0].query_value("member_id"), None);
        activities
            .create(&MemberActivity {
                member_id: Some(String::new()),
                activity_type: "game".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
        activities.get_all(Some(""), FetchOptions::default()).await.unwrap();

        assert_eq!(transport.count(Method::GET, "/member-activities"), 2);
    }

    #[tokio::test]
    async fn test_member_update_sends_only_supplied_fields() {
        let transport = Arc::new(FakeTransport::new(|req| {
            if req.method == Method::PUT {
                Ok(json!({ "id": "m1", "name": "Emily Johnson", "email": "emily@example.com", "rank": 4 }))
            } else {
                Ok(json!([]))
            }
        }));
        let (client, _) = client(transport.clone());

        client.members().get_all(FetchOptions::default()).await.unwrap();
        let updated = client.members().update("m1", &json!({ "rank": 4 })).await.unwrap();
        assert_eq!(updated.name, "Emily Johnson");

        let put = transport.calls().into_iter().find(|c| c.method == Method::PUT).unwrap();
        let body = put.body.unwrap();
        let mut keys: Vec<_> = body.as_object().unwrap().keys().cloned().collect();
        keys.sort();
        assert_eq!(keys, vec!["id", "rank"]);
        assert!(client.cache().get::<Value>("members").is_none());
    }

    #[tokio::test]
    async fn test_activity_update_drops_the_member_list_the_server_reports() {
        let transport = Arc::new(FakeTransport::new(|req| {
            if req.method == Method::PUT {
                Ok(json!({ "id": "a1", "member_id": "m1", "notes": "Rescheduled" }))
            } else {
                Ok(json!([]))
            }
        }));
        let (client, _) = client(transport.clone());
        let activities = client.member_activities();

        activities.get_all(Some("m1"), FetchOptions::default()).await.unwrap();
        activities.get_all(Some("m2"), FetchOptions::default()).await.unwrap();
        activities
            .update("a1", &json!({ "notes": "Rescheduled" }))
            .await
            .unwrap();

        let cache = client.cache();
        assert!(cache.get::<Value>("memberActivities_m1").is_none());
        assert!(cache.get::<Value>("memberActivities_m2").is_some());
    }

    #[tokio::test]
    async fn test_activity_delete_with_member() {
        let transport = Arc::new(FakeTransport::ok(json!([])));
        let (client, _) = client(transport.clone());
        let activities = client.member_activities();

        activities.get_all(Some("m1"), FetchOptions::default()).await.unwrap();
        activities.delete("a1", Some("m1")).await.unwrap();
        activities.get_all(Some("m1"), FetchOptions::default()).await.unwrap();

        assert_eq!(transport.count(Method::GET, "/member-activities"), 2);
    }

    #[tokio::test]
    async fn test_lookups_are_uncached_and_treat_404_as_none() {
        let transport = Arc::new(FakeTransport::new(|req| {
            if req.query_value("email").is_some() {
                Err(ApiError::from_status(404, r#"{"error":"Member not found"}"#))
            } else {
                Ok(json!({ "id": "m1", "name": "Emily Johnson", "email": "emily@example.com" }))
            }
        }));
        let (client, _) = client(transport.clone());
        let members = client.members();

        let by_id = members.get_by_id("m1").await.unwrap();
        assert_eq!(by_id.unwrap().name, "Emily Johnson");
        assert!(members.get_by_email("nobody@example.com").await.unwrap().is_none());
        members.get_by_id("m1").await.unwrap();

        assert_eq!(transport.call_count(), 3);
        assert_eq!(client.cache().stats().entries, 0);
    }

    #[tokio::test]
    async fn test_invites_require_token() {
        let transport = Arc::new(FakeTransport::ok(json!({ "success": true })));
        let (client, _) = client(transport.clone());

        let err = client.members().resend_pending_invites().await.unwrap_err();
        assert_eq!(err, ApiError::NotAuthenticated);
        assert_eq!(err.code(), "AUTH_ERROR");
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn test_resend_invite_sends_token_and_default_role() {
        let transport = Arc::new(FakeTransport::ok(json!({ "success": true })));
        let (client, _) = client(transport.clone());
        let client = client.with_token("jwt-123");
        client.cache().save("members", &json!([]));

        let member = Member {
            name: "Pat Lee".to_string(),
            email: "pat@example.com".to_string(),
            ..Default::default()
        };
        let response = client.members().resend_invite(&member).await.unwrap();
        assert_eq!(response["success"], true);

        let call = &transport.calls()[0];
        assert_eq!(call.path, "/supabase-auth-admin");
        assert_eq!(call.bearer.as_deref(), Some("jwt-123"));
        let body = call.body.as_ref().unwrap();
        assert_eq!(body["action"], "resend");
        assert_eq!(body["role"], "official");
        assert!(client.cache().get::<Value>("members").is_none());
    }

    #[tokio::test]
    async fn test_password_reset_leaves_members_cached() {
        let transport = Arc::new(FakeTransport::ok(json!({ "success": true })));
        let (client, _) = client(transport.clone());
        let client = client.with_token("jwt-123");
        client.cache().save("members", &json!([]));

        client.members().send_password_reset("pat@example.com").await.unwrap();

        assert_eq!(transport.calls()[0].method, Method::PUT);
        assert!(client.cache().get::<Value>("members").is_some());
    }

    #[tokio::test]
    async fn test_offline_without_mock_flag_propagates() {
        let (client, _) = client_with_config(
            offline(),
            ClientConfig {
                retry: RetryPolicy::none(),
                ..ClientConfig::default()
            },
        );
        let err = client.members().get_all(FetchOptions::default()).await.unwrap_err();
        assert_eq!(err.code(), "NETWORK_ERROR");
    }

    #[tokio::test]
    async fn test_offline_with_mock_flag_uses_fixtures() {
        let (client, _) = client_with_config(offline(), mock_config());

        let members = client.members().get_all(FetchOptions::default()).await.unwrap();
        assert_eq!(members.len(), 5);
        // Fixtures are never written to the durable cache.
        assert!(client.cache().get::<Value>("members").is_none());

        let created = client
            .members()
            .create(&Member {
                name: "Pat Lee".to_string(),
                email: "pat@example.com".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(created.id.unwrap().starts_with("mock-member-"));
        assert_eq!(client.members().get_all(FetchOptions::default()).await.unwrap().len(), 6);

        let promoted = client
            .members()
            .update("mock-member-3", &json!({ "rank": 4 }))
            .await
            .unwrap();
        assert_eq!(promoted.rank, Some(4));
        assert_eq!(promoted.name, "Emily Johnson");

        let emily = client.members().get_by_user_id("user-official-1").await.unwrap();
        assert_eq!(emily.unwrap().name, "Emily Johnson");
        assert!(client.members().get_by_email("dev@example.com").await.unwrap().is_none());

        let activities = client
            .member_activities()
            .get_all(Some("mock-member-1"), FetchOptions::default())
            .await
            .unwrap();
        assert_eq!(activities.len(), 3);
    }

    #[tokio::test]
    async fn test_mock_flag_does_not_mask_server_errors() {
        let transport = Arc::new(FakeTransport::new(|_| {
            Err(ApiError::from_status(500, r#"{"error":"db down"}"#))
        }));
        let (client, _) = client_with_config(transport, mock_config());

        let err = client.members().get_all(FetchOptions::default()).await.unwrap_err();
        assert_eq!(err.status(), Some(500));
    }
}
