//! HTTP client for the adjudication services
//!
//! Implements every collaborator seam of `ct-core` against the REST API:
//! claim submission, claim lookup, result persistence and supporting
//! resource creation.

use async_trait::async_trait;
use ct_core::api::{
    ApiError, ClaimStatusSource, ClaimSubmitter, ResourceKind, ResourceRegistry, ResultRecord,
    ResultStore, SubmitEnvelope,
};
use ct_core::HarnessConfig;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

pub type ClientResult<T> = Result<T, ClientError>;

/// REST client for the claims API
#[derive(Clone)]
pub struct HttpClaimsApi {
    client: reqwest::Client,
    base_url: Url,
    api_token: Option<String>,
}

impl HttpClaimsApi {
    pub fn new(config: &HarnessConfig) -> ClientResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: normalize_base(&config.base_url)?,
            api_token: config.api_token.clone(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build an endpoint URL from path segments, percent-encoding each one
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::Transport(format!("{} cannot be a base URL", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.api_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ApiError> {
        let response = builder.send().await.map_err(transport)?;
        let status = response.status();
        let text = response.text().await.map_err(transport)?;

        if !status.is_success() {
            return Err(status_error(status, &text));
        }

        let body = if text.trim().is_empty() { "null" } else { text.as_str() };
        serde_json::from_str(body).map_err(|e| ApiError::Decode(e.to_string()))
    }
}

fn normalize_base(raw: &str) -> ClientResult<Url> {
    let mut url = Url::parse(raw).map_err(|e| ClientError::InvalidUrl(format!("{}: {}", raw, e)))?;
    if url.cannot_be_a_base() {
        return Err(ClientError::InvalidUrl(raw.to_string()));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

fn transport(e: reqwest::Error) -> ApiError {
    ApiError::Transport(e.to_string())
}

/// Build the error for a non-success answer, keeping the body structured
/// when it is JSON.
pub fn status_error(status: StatusCode, text: &str) -> ApiError {
    let body = if text.trim().is_empty() {
        None
    } else {
        Some(serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string())))
    };

    ApiError::Status {
        status: status.as_u16(),
        body,
        message: status.canonical_reason().unwrap_or("Request failed").to_string(),
    }
}

#[async_trait]
impl ClaimSubmitter for HttpClaimsApi {
    async fn submit_claim(&self, payload: &Value) -> Result<SubmitEnvelope, ApiError> {
        let url = self.endpoint(&["claims", "submit"])?;
        tracing::debug!("POST {}", url);
        self.send(self.request(Method::POST, url).json(payload)).await
    }
}

#[async_trait]
impl ClaimStatusSource for HttpClaimsApi {
    async fn fetch_claim(&self, claim_id: &str) -> Result<Value, ApiError> {
        let url = self.endpoint(&["claims", claim_id])?;
        tracing::debug!("GET {}", url);
        self.send(self.request(Method::GET, url)).await
    }
}

#[async_trait]
impl ResultStore for HttpClaimsApi {
    async fn create_result(&self, record: &ResultRecord) -> Result<(), ApiError> {
        let url = self.endpoint(&["results"])?;
        let _: Value = self.send(self.request(Method::POST, url).json(record)).await?;
        Ok(())
    }
}

#[async_trait]
impl ResourceRegistry for HttpClaimsApi {
    async fn ensure_resource(&self, kind: ResourceKind, resource: &Value) -> Result<(), ApiError> {
        let url = self.endpoint(&["resources", kind.path()])?;
        let _: Value = self.send(self.request(Method::POST, url).json(resource)).await?;
        Ok(())
    }
}
