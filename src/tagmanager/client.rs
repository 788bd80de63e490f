use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use serde_json::Value;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::errors::CreationError;
use super::types::{ResourceId, ResourceRequest};
use crate::auth::AccessToken;
use crate::config::TagManagerConfig;

/// "Create resource of kind K under parent P". One call, one remote request,
/// no retries.
#[async_trait]
pub trait ResourceApi: Send + Sync {
    async fn create(
        &self,
        token: &AccessToken,
        request: &ResourceRequest,
    ) -> Result<ResourceId, CreationError>;
}

/// Tag Manager API v2 over HTTPS, throttled client-side.
#[derive(Debug)]
pub struct TagManagerClient {
    http: reqwest::Client,
    base_url: String,
    rate_limiter: Arc<DefaultDirectRateLimiter>,
}

impl TagManagerClient {
    pub fn new(config: &TagManagerConfig) -> Result<Self, CreationError> {
        let per_second = NonZeroU32::new(config.requests_per_second).unwrap_or(NonZeroU32::MIN);
        let rate_limiter = Arc::new(RateLimiter::direct(Quota::per_second(per_second)));

        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| CreationError::transport(e.to_string()))?;

        Ok(Self {
            http,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            rate_limiter,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, request: &ResourceRequest) -> String {
        format!(
            "{}/{}/{}",
            self.base_url,
            request.parent,
            request.kind().collection()
        )
    }
}

#[async_trait]
impl ResourceApi for TagManagerClient {
    async fn create(
        &self,
        token: &AccessToken,
        request: &ResourceRequest,
    ) -> Result<ResourceId, CreationError> {
        let kind = request.kind();
        let url = self.endpoint(request);

        self.rate_limiter.until_ready().await;
        debug!(%kind, name = %request.name, %url, "Creating Tag Manager resource");

        let response = self
            .http
            .post(&url)
            .bearer_auth(token.secret())
            .json(&request.to_body())
            .send()
            .await
            .map_err(|e| CreationError::transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| CreationError::transport(e.to_string()))?;

        if !status.is_success() {
            let err = CreationError::from_response(status.as_u16(), &body);
            warn!(%kind, name = %request.name, code = status.as_u16(), error = %err, "Tag Manager rejected request");
            return Err(err);
        }

        let parsed: Value = serde_json::from_str(&body)
            .map_err(|e| CreationError::invalid_response(format!("{kind} response is not JSON: {e}")))?;

        parsed
            .get(kind.id_field())
            .and_then(Value::as_str)
            .map(ResourceId::from)
            .ok_or_else(|| {
                CreationError::invalid_response(format!(
                    "{kind} response did not include {}",
                    kind.id_field()
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tagmanager::types::{ResourceConfig, TriggerConfig, WorkspacePath};

    #[test]
    fn test_endpoint_joins_parent_and_collection() {
        let client = TagManagerClient::new(&TagManagerConfig {
            api_base_url: "https://tagmanager.googleapis.com/tagmanager/v2/".to_string(),
            ..TagManagerConfig::default()
        })
        .unwrap();
        let request = ResourceRequest::new(
            WorkspacePath::new("1", "2", "3"),
            "trigger",
            ResourceConfig::Trigger(TriggerConfig {
                event_name: "core-web-vitals".to_string(),
            }),
        );

        assert_eq!(
            client.endpoint(&request),
            "https://tagmanager.googleapis.com/tagmanager/v2/accounts/1/containers/2/workspaces/3/triggers"
        );
    }

    #[test]
    fn test_zero_rate_is_clamped() {
        let client = TagManagerClient::new(&TagManagerConfig {
            requests_per_second: 0,
            ..TagManagerConfig::default()
        });
        assert!(client.is_ok());
    }
}
