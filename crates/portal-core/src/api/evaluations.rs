use serde_json::Value;

use crate::cache::{keys, FetchOptions, ResourceKey};
use crate::models::Evaluation;

use super::client::PortalClient;
use super::transport::ApiRequest;
use super::ApiError;

const EVALUATIONS_PATH: &str = "/evaluations";

/// Game evaluations. Lists are cached per member and per evaluator as well
/// as in full; the bearer token is forwarded on every call when present.
pub struct EvaluationsApi<'a> {
    client: &'a PortalClient,
}

impl EvaluationsApi<'_> {
    fn authed(&self, request: ApiRequest) -> ApiRequest {
        request.bearer(self.client.token())
    }

    async fn list(&self, key: &str, request: ApiRequest, options: FetchOptions) -> Result<Vec<Evaluation>, ApiError> {
        self.client
            .fetch_cached(key, self.authed(request), options)
            .await
    }

    pub async fn get_all(&self, options: FetchOptions) -> Result<Vec<Evaluation>, ApiError> {
        self.list(
            ResourceKey::Evaluations.as_str(),
            ApiRequest::get(EVALUATIONS_PATH),
            options,
        )
        .await
    }

    /// One member's evaluations. A blank id reads the full list.
    pub async fn get_by_member(&self, member_id: &str, options: FetchOptions) -> Result<Vec<Evaluation>, ApiError> {
        if keys::scope_id(Some(member_id)).is_none() {
            return self.get_all(options).await;
        }
        self.list(
            &keys::evaluations_for_member(member_id),
            ApiRequest::get(EVALUATIONS_PATH).query("member_id", member_id),
            options,
        )
        .await
    }

    pub async fn get_by_evaluator(
        &self,
        evaluator_id: &str,
        options: FetchOptions,
    ) -> Result<Vec<Evaluation>, ApiError> {
        if keys::scope_id(Some(evaluator_id)).is_none() {
            return self.get_all(options).await;
        }
        self.list(
            &keys::evaluations_for_evaluator(evaluator_id),
            ApiRequest::get(EVALUATIONS_PATH).query("evaluator_id", evaluator_id),
            options,
        )
        .await
    }

    pub async fn get_by_id(&self, id: &str) -> Result<Evaluation, ApiError> {
        let request = self.authed(ApiRequest::get(EVALUATIONS_PATH).query("id", id));
        self.client.fetch_uncached(request).await
    }

    pub async fn create(&self, evaluation: &Evaluation) -> Result<Evaluation, ApiError> {
        let request = self.authed(ApiRequest::post(
            EVALUATIONS_PATH,
            serde_json::to_value(evaluation)?,
        ));
        let invalidations = keys::evaluation_invalidations(
            Some(evaluation.member_id.as_str()),
            evaluation.evaluator_id.as_deref(),
        );
        self.client.mutate(request, &invalidations).await
    }

    /// Write only the fields in `changes`. Scoped lists are dropped for the
    /// ids in `changes` and for the ones the server reports back.
    pub async fn update(&self, id: &str, changes: &Value) -> Result<Evaluation, ApiError> {
        let sent = |field: &str| changes.get(field).and_then(Value::as_str);
        let request = self.authed(ApiRequest::update(EVALUATIONS_PATH, id, changes)?);
        let updated: Evaluation = self
            .client
            .mutate(
                request,
                &keys::evaluation_invalidations(sent("member_id"), sent("evaluator_id")),
            )
            .await?;
        self.client
            .invalidate_keys(&keys::evaluation_invalidations(
                Some(updated.member_id.as_str()),
                updated.evaluator_id.as_deref(),
            ))
            .await;
        Ok(updated)
    }

    pub async fn delete(
        &self,
        id: &str,
        member_id: Option<&str>,
        evaluator_id: Option<&str>,
    ) -> Result<(), ApiError> {
        let request = self.authed(ApiRequest::delete(EVALUATIONS_PATH).query("id", id));
        self.client
            .mutate_discard(request, &keys::evaluation_invalidations(member_id, evaluator_id))
            .await
    }
}

impl PortalClient {
    pub fn evaluations(&self) -> EvaluationsApi<'_> {
        EvaluationsApi { client: self }
    }
}
