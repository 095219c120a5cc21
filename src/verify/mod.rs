pub mod http;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use http::{HealthStatus, HttpVerifier};

/// Body of `POST /verify`
#[derive(Debug, Clone, Serialize)]
pub struct VerificationRequest<'a> {
    pub title: &'a str,
}

/// Verdict returned by the verification service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub verified: bool,
    pub probability: f64,
    /// The server leaves this out on plain acceptances
    #[serde(default)]
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub similar_titles: Option<Vec<String>>,
}

/// Anything that went wrong while asking the service for a verdict.
///
/// The variants only exist so the log line says what happened; every one of
/// them is shown to the user the same way.
#[derive(Debug, Error)]
pub enum RequestFailure {
    #[error("request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("server answered with status {0}")]
    Status(u16),

    #[error("could not decode verdict: {0}")]
    Decode(#[source] reqwest::Error),
}

/// Something that can judge a title
#[async_trait]
pub trait Verifier: Send + Sync {
    async fn verify(&self, title: &str) -> Result<VerificationResult, RequestFailure>;
}
