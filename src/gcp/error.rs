use thiserror::Error;

use crate::error::DiscoveryError;

/// Failures talking to a GCP REST API.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("resource not found: {url}")]
    NotFound { url: String },

    #[error("API request failed with status {status}: {url}")]
    Status { status: u16, url: String },

    #[error("failed to send request: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("failed to parse response JSON: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("failed to obtain access token: {0}")]
    Auth(String),

    #[error("invalid endpoint '{endpoint}': {source}")]
    InvalidEndpoint {
        endpoint: String,
        #[source]
        source: url::ParseError,
    },

    #[error("endpoint '{endpoint}' cannot carry a path")]
    CannotBeABase { endpoint: String },

    #[error("{collection} needs {expected} parent identifiers, got {found}")]
    Parents {
        collection: &'static str,
        expected: usize,
        found: usize,
    },
}

impl ClientError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Classify for the discovery layer: 404 becomes `NotFound`, anything
    /// else an upstream failure with this error as its cause.
    pub fn into_discovery(self, item_type: &str, scope: &str, query: &str) -> DiscoveryError {
        if self.is_not_found() {
            DiscoveryError::not_found(item_type, scope, query)
        } else {
            DiscoveryError::upstream(item_type, self)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_maps_to_discovery_not_found() {
        let err = ClientError::NotFound {
            url: "https://compute.googleapis.com/x".to_string(),
        }
        .into_discovery("gcp-compute-disk", "proj.us-central1-a", "disk1");
        assert!(err.is_not_found());
    }

    #[test]
    fn test_status_maps_to_upstream() {
        let err = ClientError::Status {
            status: 503,
            url: "https://compute.googleapis.com/x".to_string(),
        }
        .into_discovery("gcp-compute-disk", "proj.us-central1-a", "disk1");
        assert!(matches!(err, DiscoveryError::Upstream { .. }));
        assert!(err.to_string().contains("503"));
    }
}
