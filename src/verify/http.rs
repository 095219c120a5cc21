use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use super::{RequestFailure, VerificationRequest, VerificationResult, Verifier};

/// What `GET /health` told us about the service
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    Healthy,
    /// Server answered, but not with a healthy status
    Degraded(String),
    /// Could not get an answer at all
    Unreachable(String),
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthStatus::Healthy)
    }

    pub fn label(&self) -> &'static str {
        match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::Degraded(_) => "degraded",
            HealthStatus::Unreachable(_) => "unreachable",
        }
    }
}

#[derive(Debug, Deserialize)]
struct HealthResponse {
    status: String,
}

/// Verifier that talks to the service over HTTP
pub struct HttpVerifier {
    client: reqwest::Client,
    base_url: String,
}

impl HttpVerifier {
    /// Build a verifier for `base_url`. No timeout is applied unless one is given.
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Probe `GET /health`. Never fails; problems are folded into the status.
    pub async fn health(&self) -> HealthStatus {
        let url = format!("{}/health", self.base_url);

        let response = match self.client.get(&url).send().await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!("Health probe to {} failed: {}", url, e);
                return HealthStatus::Unreachable(e.to_string());
            }
        };

        let code = response.status();
        match response.json::<HealthResponse>().await {
            Ok(body) if code.is_success() && body.status == "healthy" => HealthStatus::Healthy,
            Ok(body) => HealthStatus::Degraded(format!("{} ({})", body.status, code.as_u16())),
            Err(_) => HealthStatus::Degraded(format!("unexpected answer ({})", code.as_u16())),
        }
    }
}

#[async_trait]
impl Verifier for HttpVerifier {
    async fn verify(&self, title: &str) -> Result<VerificationResult, RequestFailure> {
        let url = format!("{}/verify", self.base_url);
        tracing::debug!("POST {} title={:?}", url, title);

        let response = self
            .client
            .post(&url)
            .json(&VerificationRequest { title })
            .send()
            .await
            .map_err(RequestFailure::Transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(RequestFailure::Status(status.as_u16()));
        }

        response
            .json::<VerificationResult>()
            .await
            .map_err(RequestFailure::Decode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::task::JoinHandle;

    /// Accept one connection, answer it with `status` and `body`, and hand back the raw request
    async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let request = read_request(&mut socket).await;
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
            request
        });

        (format!("http://{}", addr), handle)
    }

    async fn read_request(socket: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);

            if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                let head = String::from_utf8_lossy(&buf[..end]).to_lowercase();
                let body_len = head
                    .lines()
                    .find_map(|l| l.strip_prefix("content-length:"))
                    .and_then(|v| v.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= end + 4 + body_len {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    }

    #[tokio::test]
    async fn test_verify_posts_title_and_decodes_verdict() {
        let (url, server) = serve_once(
            "200 OK",
            r#"{"verified":true,"probability":0.87,"reason":"ok","similar_titles":["A","B"]}"#,
        )
        .await;

        let verifier = HttpVerifier::new(&url, None).unwrap();
        let result = verifier.verify("Morning Star").await.unwrap();

        assert!(result.verified);
        assert_eq!(result.probability, 0.87);
        assert_eq!(result.reason, "ok");
        assert_eq!(result.similar_titles, Some(vec!["A".to_string(), "B".to_string()]));

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /verify HTTP/1.1"));
        assert!(request.to_lowercase().contains("content-type: application/json"));
        assert!(request.ends_with(r#"{"title":"Morning Star"}"#));
    }

    #[tokio::test]
    async fn test_verify_sends_blank_title() {
        let (url, server) = serve_once("200 OK", r#"{"verified":true,"probability":1.0}"#).await;

        let verifier = HttpVerifier::new(&url, None).unwrap();
        verifier.verify("").await.unwrap();

        let request = server.await.unwrap();
        assert!(request.ends_with(r#"{"title":""}"#));
    }

    #[tokio::test]
    async fn test_trailing_slash_is_trimmed() {
        let (url, server) = serve_once("200 OK", r#"{"verified":true,"probability":1.0}"#).await;

        let verifier = HttpVerifier::new(&format!("{}/", url), None).unwrap();
        assert_eq!(verifier.base_url(), url);
        verifier.verify("x").await.unwrap();

        assert!(server.await.unwrap().starts_with("POST /verify "));
    }

    #[tokio::test]
    async fn test_error_status_is_a_failure() {
        let (url, _server) = serve_once("400 Bad Request", r#"{"error":"No title provided"}"#).await;

        let verifier = HttpVerifier::new(&url, None).unwrap();
        let err = verifier.verify("x").await.unwrap_err();
        assert!(matches!(err, RequestFailure::Status(400)));
    }

    #[tokio::test]
    async fn test_malformed_body_is_a_failure() {
        let (url, _server) = serve_once("200 OK", "<html>not json</html>").await;

        let verifier = HttpVerifier::new(&url, None).unwrap();
        let err = verifier.verify("x").await.unwrap_err();
        assert!(matches!(err, RequestFailure::Decode(_)));
    }

    #[tokio::test]
    async fn test_refused_connection_is_a_failure() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let verifier = HttpVerifier::new(&format!("http://{}", addr), None).unwrap();
        let err = verifier.verify("x").await.unwrap_err();
        assert!(matches!(err, RequestFailure::Transport(_)));
    }

    #[tokio::test]
    async fn test_health_probe() {
        let (url, server) = serve_once("200 OK", r#"{"status":"healthy"}"#).await;

        let verifier = HttpVerifier::new(&url, None).unwrap();
        assert_eq!(verifier.health().await, HealthStatus::Healthy);
        assert!(server.await.unwrap().starts_with("GET /health HTTP/1.1"));
    }

    #[tokio::test]
    async fn test_health_probe_degraded_and_unreachable() {
        let (url, _server) = serve_once("503 Service Unavailable", r#"{"status":"loading"}"#).await;
        let verifier = HttpVerifier::new(&url, None).unwrap();
        let status = verifier.health().await;
        assert_eq!(status, HealthStatus::Degraded("loading (503)".to_string()));
        assert_eq!(status.label(), "degraded");

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let verifier = HttpVerifier::new(&format!("http://{}", addr), None).unwrap();
        assert!(matches!(verifier.health().await, HealthStatus::Unreachable(_)));
    }
}
