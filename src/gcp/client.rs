//! GCP Client
//!
//! Combines a token source, the HTTP client and the API endpoints.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use url::Url;

use super::auth::{GcpCredentials, TokenSource};
use super::error::ClientError;
use super::http::GcpHttpClient;

/// Base URLs of the REST APIs wrappers talk to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub compute: String,
    pub sql: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            compute: "https://compute.googleapis.com".to_string(),
            sql: "https://sqladmin.googleapis.com".to_string(),
        }
    }
}

impl Endpoints {
    /// Point every API at one server (used with mock servers)
    pub fn single(base: &str) -> Self {
        Self {
            compute: base.to_string(),
            sql: base.to_string(),
        }
    }

    pub fn validate(&self) -> Result<(), ClientError> {
        for endpoint in [&self.compute, &self.sql] {
            parse_base(endpoint)?;
        }
        Ok(())
    }
}

/// The REST API a collection belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Api {
    Compute,
    Sql,
}

fn parse_base(endpoint: &str) -> Result<Url, ClientError> {
    let url = Url::parse(endpoint).map_err(|source| ClientError::InvalidEndpoint {
        endpoint: endpoint.to_string(),
        source,
    })?;
    if url.cannot_be_a_base() {
        return Err(ClientError::CannotBeABase {
            endpoint: endpoint.to_string(),
        });
    }
    Ok(url)
}

/// Main GCP client
#[derive(Clone)]
pub struct GcpClient {
    credentials: Arc<dyn TokenSource>,
    http: GcpHttpClient,
    endpoints: Endpoints,
}

impl GcpClient {
    /// Create a client authenticated with Application Default Credentials
    pub async fn new(endpoints: Endpoints) -> anyhow::Result<Self> {
        let credentials = GcpCredentials::new().await?;
        Ok(Self::with_token_source(Arc::new(credentials), endpoints)?)
    }

    /// Create a client with an explicit token source
    pub fn with_token_source(
        credentials: Arc<dyn TokenSource>,
        endpoints: Endpoints,
    ) -> Result<Self, ClientError> {
        endpoints.validate()?;
        Ok(Self {
            credentials,
            http: GcpHttpClient::new()?,
            endpoints,
        })
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Build a URL under `api` from raw path segments (each is percent-encoded)
    pub fn url(&self, api: Api, segments: &[&str], query: &[(&str, &str)]) -> Result<Url, ClientError> {
        let base = match api {
            Api::Compute => &self.endpoints.compute,
            Api::Sql => &self.endpoints.sql,
        };
        let mut url = parse_base(base)?;

        url.path_segments_mut()
            .map_err(|()| ClientError::CannotBeABase {
                endpoint: base.clone(),
            })?
            .pop_if_empty()
            .extend(segments);

        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }

        Ok(url)
    }

    /// Make an authenticated GET request
    pub async fn get(&self, url: Url) -> Result<Value, ClientError> {
        let token = self
            .credentials
            .token()
            .await
            .map_err(|e| ClientError::Auth(format!("{e:#}")))?;
        self.http.get(url, &token).await
    }
}
