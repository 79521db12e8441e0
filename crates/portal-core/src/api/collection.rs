//! Generic CRUD wrapper for resources that follow the plain
//! `GET list / POST / PUT / DELETE ?id=` contract.

use std::marker::PhantomData;

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::cache::{keys, FetchOptions, ResourceKey};
use crate::models::{
    Active, Announcement, CalendarEvent, ExecutiveMember, Newsletter, Official, PublicNewsItem,
    PublicResource, PublicTrainingEvent, RuleModification, Slugged,
};

use super::client::PortalClient;
use super::transport::ApiRequest;
use super::ApiError;

/// One resource endpoint and the cache keys it owns.
pub struct Collection<'a, T> {
    client: &'a PortalClient,
    path: &'static str,
    key: String,
    /// Keys dropped after every mutation. Always includes `key`.
    invalidates: Vec<String>,
    _marker: PhantomData<fn() -> T>,
}

impl<'a, T> Collection<'a, T>
where
    T: Serialize + DeserializeOwned,
{
    pub(crate) fn new(client: &'a PortalClient, path: &'static str, key: ResourceKey) -> Self {
        Self {
            client,
            path,
            key: key.as_str().to_string(),
            invalidates: vec![key.as_str().to_string()],
            _marker: PhantomData,
        }
    }

    pub(crate) fn also_invalidates(mut self, key: String) -> Self {
        self.invalidates.push(key);
        self
    }

    pub fn path(&self) -> &'static str {
        self.path
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    fn body(item: &T) -> Result<Value, ApiError> {
        serde_json::to_value(item).map_err(ApiError::from)
    }

    pub async fn get_all(&self, options: FetchOptions) -> Result<Vec<T>, ApiError> {
        self.client
            .fetch_cached(&self.key, ApiRequest::get(self.path), options)
            .await
    }

    pub async fn create(&self, item: &T) -> Result<T, ApiError> {
        let request = ApiRequest::post(self.path, Self::body(item)?);
        self.client.mutate(request, &self.invalidates).await
    }

    /// Send only the fields in `changes`; everything else keeps its
    /// stored value.
    pub async fn update(&self, id: &str, changes: &Value) -> Result<T, ApiError> {
        let request = ApiRequest::update(self.path, id, changes)?;
        self.client.mutate(request, &self.invalidates).await
    }

    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        let request = ApiRequest::delete(self.path).query("id", id);
        self.client.mutate_discard(request, &self.invalidates).await
    }

    /// Uncached list read with query filters.
    async fn query(&self, params: &[(&str, String)]) -> Result<Vec<T>, ApiError> {
        let request = params
            .iter()
            .fold(ApiRequest::get(self.path), |req, (k, v)| req.query(*k, v.clone()));
        self.client.fetch_uncached(request).await
    }
}

impl<T> Collection<'_, T>
where
    T: Serialize + DeserializeOwned + Active,
{
    /// The cached list, minus hidden items.
    pub async fn get_active(&self) -> Result<Vec<T>, ApiError> {
        let all = self.get_all(FetchOptions::default()).await?;
        Ok(all.into_iter().filter(|item| item.is_active()).collect())
    }
}

impl<T> Collection<'_, T>
where
    T: Serialize + DeserializeOwned + Slugged,
{
    /// Single item by URL slug; always goes to the network.
    pub async fn get_by_slug(&self, slug: &str) -> Result<T, ApiError> {
        let request = ApiRequest::get(self.path).query("slug", slug);
        self.client.fetch_uncached(request).await
    }
}

impl Collection<'_, PublicTrainingEvent> {
    /// Active events on or after `now`'s calendar day.
    pub async fn get_upcoming(&self, now: DateTime<Utc>) -> Result<Vec<PublicTrainingEvent>, ApiError> {
        let active = self.get_active().await?;
        Ok(active.into_iter().filter(|e| e.is_upcoming(now)).collect())
    }
}

impl Collection<'_, PublicResource> {
    pub async fn get_by_category(&self, category: &str) -> Result<Vec<PublicResource>, ApiError> {
        self.query(&[("category", category.to_string())]).await
    }
}

impl Collection<'_, Official> {
    pub async fn get_by_level(&self, level: u8) -> Result<Vec<Official>, ApiError> {
        self.query(&[("level", level.to_string())]).await
    }
}

impl Collection<'_, ExecutiveMember> {
    /// Every executive including inactive ones, cached separately from the
    /// default (active-only) list.
    pub async fn get_all_including_inactive(
        &self,
        options: FetchOptions,
    ) -> Result<Vec<ExecutiveMember>, ApiError> {
        let request = ApiRequest::get(self.path).query("active", "false");
        self.client
            .fetch_cached(&keys::executive_team(true), request, options)
            .await
    }
}

// ===== Accessors =====

impl PortalClient {
    pub fn calendar_events(&self) -> Collection<'_, CalendarEvent> {
        Collection::new(self, "/calendar-events", ResourceKey::CalendarEvents)
    }

    pub fn announcements(&self) -> Collection<'_, Announcement> {
        Collection::new(self, "/announcements", ResourceKey::Announcements)
    }

    pub fn rule_modifications(&self) -> Collection<'_, RuleModification> {
        Collection::new(self, "/rule-modifications", ResourceKey::RuleModifications)
    }

    pub fn newsletters(&self) -> Collection<'_, Newsletter> {
        Collection::new(self, "/newsletters", ResourceKey::Newsletters)
    }

    pub fn public_news(&self) -> Collection<'_, PublicNewsItem> {
        Collection::new(self, "/public-news", ResourceKey::PublicNews)
    }

    pub fn public_training(&self) -> Collection<'_, PublicTrainingEvent> {
        Collection::new(self, "/public-training", ResourceKey::PublicTraining)
    }

    pub fn public_resources(&self) -> Collection<'_, PublicResource> {
        Collection::new(self, "/public-resources", ResourceKey::PublicResources)
    }

    pub fn officials(&self) -> Collection<'_, Official> {
        Collection::new(self, "/officials", ResourceKey::Officials)
    }

    pub fn executive_team(&self) -> Collection<'_, ExecutiveMember> {
        Collection::new(self, "/executive-team", ResourceKey::ExecutiveTeam)
            .also_invalidates(keys::executive_team(true))
    }
}
