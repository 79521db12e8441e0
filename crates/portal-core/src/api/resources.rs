//! Portal resource library and editable public pages.

use serde_json::Value;

use crate::cache::{keys, FetchOptions, ResourceKey};
use crate::models::{PublicPage, Resource};

use super::client::PortalClient;
use super::transport::ApiRequest;
use super::ApiError;

const RESOURCES_PATH: &str = "/resources";
const PUBLIC_PAGES_PATH: &str = "/public-pages";

/// The members' resource library. The full list and the featured list are
/// cached under separate keys; every mutation drops both.
pub struct ResourcesApi<'a> {
    client: &'a PortalClient,
}

impl ResourcesApi<'_> {
    fn invalidations() -> [String; 2] {
        [keys::resources(false), keys::resources(true)]
    }

    pub async fn get_all(&self, featured: bool, options: FetchOptions) -> Result<Vec<Resource>, ApiError> {
        let mut request = ApiRequest::get(RESOURCES_PATH);
        if featured {
            request = request.query("featured", "true");
        }
        self.client
            .fetch_cached(&keys::resources(featured), request, options)
            .await
    }

    pub async fn create(&self, resource: &Resource) -> Result<Resource, ApiError> {
        let request = ApiRequest::post(RESOURCES_PATH, serde_json::to_value(resource)?);
        self.client.mutate(request, &Self::invalidations()).await
    }

    pub async fn update(&self, id: &str, changes: &Value) -> Result<Resource, ApiError> {
        let request = ApiRequest::update(RESOURCES_PATH, id, changes)?;
        self.client.mutate(request, &Self::invalidations()).await
    }

    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        let request = ApiRequest::delete(RESOURCES_PATH).query("id", id);
        self.client.mutate_discard(request, &Self::invalidations()).await
    }
}

/// Public site pages. Pages are seeded server-side, so there is no create
/// or delete.
pub struct PublicPagesApi<'a> {
    client: &'a PortalClient,
}

impl PublicPagesApi<'_> {
    pub async fn get_all(&self, options: FetchOptions) -> Result<Vec<PublicPage>, ApiError> {
        self.client
            .fetch_cached(
                ResourceKey::PublicPages.as_str(),
                ApiRequest::get(PUBLIC_PAGES_PATH),
                options,
            )
            .await
    }

    pub async fn get_by_name(&self, page_name: &str) -> Result<PublicPage, ApiError> {
        let request = ApiRequest::get(PUBLIC_PAGES_PATH).query("page_name", page_name);
        self.client.fetch_uncached(request).await
    }

    pub async fn update(&self, id: &str, changes: &Value) -> Result<PublicPage, ApiError> {
        self.client
            .mutate(
                ApiRequest::update(PUBLIC_PAGES_PATH, id, changes)?,
                &[ResourceKey::PublicPages.as_str().to_string()],
            )
            .await
    }
}

impl PortalClient {
    pub fn resources(&self) -> ResourcesApi<'_> {
        ResourcesApi { client: self }
    }

    pub fn public_pages(&self) -> PublicPagesApi<'_> {
        PublicPagesApi { client: self }
    }
}
