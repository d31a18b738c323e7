//! Ephemeral credential providers.
//!
//! The session manager treats credential minting as an opaque async call. Two providers are
//! available: one asks a minting endpoint (the usual deployment, where the long-lived key lives
//! on a server), the other mints directly with a long-lived key held by this process.

use crate::error::CredentialError;
use crate::types::credential::{ClientSecret, ClientSecretRequest, CredentialEnvelope};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

/// A short-lived token that authorizes one realtime session.
#[derive(Debug)]
pub struct Credential(SecretString);

impl Credential {
    pub fn new(token: &str) -> Self {
        Self(SecretString::from(token.to_string()))
    }

    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn obtain(&self) -> Result<Credential, CredentialError>;
}

/// Fetches credentials from an endpoint answering `{ data: { value } }` or `{ error }`.
pub struct HttpCredentialProvider {
    http: reqwest::Client,
    endpoint: String,
}

impl HttpCredentialProvider {
    pub fn new(endpoint: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.to_string(),
        }
    }
}

/// Interprets a minting endpoint response.
pub fn credential_from_envelope(
    status: u16,
    envelope: CredentialEnvelope,
) -> Result<Credential, CredentialError> {
    if let Some(message) = envelope.error {
        return Err(CredentialError::Upstream { status, message });
    }
    if !(200..300).contains(&status) {
        return Err(CredentialError::Upstream {
            status,
            message: "credential endpoint returned no error message".to_string(),
        });
    }
    credential_from_secret(envelope.data)
}

/// Raw body text of a failed response, for when it carries no structured error.
fn upstream_message(body: &str) -> String {
    let body = body.trim();
    if body.is_empty() {
        "credential endpoint returned no error message".to_string()
    } else {
        body.to_string()
    }
}

fn credential_from_secret(secret: Option<ClientSecret>) -> Result<Credential, CredentialError> {
    secret
        .and_then(|secret| secret.value)
        .filter(|value| !value.is_empty())
        .map(|value| Credential::new(&value))
        .ok_or(CredentialError::MissingToken)
}

#[async_trait]
impl CredentialProvider for HttpCredentialProvider {
    async fn obtain(&self) -> Result<Credential, CredentialError> {
        let response = self.http.get(&self.endpoint).send().await?;
        let status = response.status();
        let body = response.text().await?;

        match serde_json::from_str::<CredentialEnvelope>(&body) {
            Ok(envelope) => credential_from_envelope(status.as_u16(), envelope),
            Err(_) if !status.is_success() => Err(CredentialError::Upstream {
                status: status.as_u16(),
                message: upstream_message(&body),
            }),
            Err(e) => {
                tracing::debug!("credential endpoint body is not an envelope: {}", e);
                Err(CredentialError::MissingToken)
            }
        }
    }
}

/// Mints credentials straight from `POST {api_base}/realtime/client_secrets`.
pub struct DirectCredentialProvider {
    http: reqwest::Client,
    api_base: String,
    api_key: Option<SecretString>,
    model: String,
}

impl DirectCredentialProvider {
    pub fn new(api_base: &str, api_key: Option<SecretString>, model: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: api_base.trim_end_matches('/').to_string(),
            api_key,
            model: model.to_string(),
        }
    }
}

#[async_trait]
impl CredentialProvider for DirectCredentialProvider {
    async fn obtain(&self) -> Result<Credential, CredentialError> {
        let api_key = self
            .api_key
            .as_ref()
            .filter(|key| !key.expose_secret().is_empty())
            .ok_or_else(|| CredentialError::MissingSecret("OPENAI_API_KEY is not set".to_string()))?;

        let response = self
            .http
            .post(format!("{}/realtime/client_secrets", self.api_base))
            .bearer_auth(api_key.expose_secret())
            .json(&ClientSecretRequest::realtime(&self.model))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            // OpenAI reports failures as `{ "error": { "message": ... } }`.
            let message = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|value| value["error"]["message"].as_str().map(str::to_string))
                .unwrap_or_else(|| upstream_message(&body));
            return Err(CredentialError::Upstream {
                status: status.as_u16(),
                message,
            });
        }

        let Ok(secret) = serde_json::from_str::<ClientSecret>(&body) else {
            return Err(CredentialError::MissingToken);
        };
        if let Some(expires_at) = secret.expires_at {
            tracing::debug!(expires_at, "minted ephemeral key");
        }
        credential_from_secret(Some(secret))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Answers exactly one HTTP request with `status` and `body`, returning the base URL.
    async fn serve_once(status: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
                let Some(end) = request.windows(4).position(|w| w == b"\r\n\r\n") else {
                    continue;
                };
                let headers = String::from_utf8_lossy(&request[..end]).to_ascii_lowercase();
                let length = headers
                    .lines()
                    .find_map(|line| line.strip_prefix("content-length:"))
                    .and_then(|value| value.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if request.len() >= end + 4 + length {
                    break;
                }
            }
            let response = format!(
                "HTTP/1.1 {}\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn envelope(json: serde_json::Value) -> CredentialEnvelope {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn data_value_becomes_credential() {
        let credential = credential_from_envelope(
            200,
            envelope(serde_json::json!({ "data": { "value": "ek_123", "expires_at": 1760000000 } })),
        )
        .unwrap();
        assert_eq!(credential.expose(), "ek_123");
    }

    #[test]
    fn error_body_is_upstream_failure() {
        let err = credential_from_envelope(502, envelope(serde_json::json!({ "error": "x" })))
            .unwrap_err();
        assert!(matches!(
            err,
            CredentialError::Upstream { status: 502, ref message } if message == "x"
        ));
    }

    #[test]
    fn missing_or_empty_value_is_missing_token() {
        for body in [
            serde_json::json!({}),
            serde_json::json!({ "data": {} }),
            serde_json::json!({ "data": { "value": "" } }),
        ] {
            let err = credential_from_envelope(200, envelope(body)).unwrap_err();
            assert!(matches!(err, CredentialError::MissingToken));
        }
    }

    #[test]
    fn non_success_status_without_message_is_upstream_failure() {
        let err = credential_from_envelope(503, CredentialEnvelope::default()).unwrap_err();
        assert!(matches!(err, CredentialError::Upstream { status: 503, .. }));
    }

    #[test]
    fn credential_debug_does_not_leak_token() {
        let credential = Credential::new("ek_secret");
        assert!(!format!("{:?}", credential).contains("ek_secret"));
    }

    #[tokio::test]
    async fn direct_provider_without_key_reports_missing_secret() {
        let provider = DirectCredentialProvider::new("https://api.openai.com/v1", None, "gpt-realtime");
        let err = provider.obtain().await.unwrap_err();
        assert!(matches!(err, CredentialError::MissingSecret(_)));

        let provider = DirectCredentialProvider::new(
            "https://api.openai.com/v1",
            Some(SecretString::from(String::new())),
            "gpt-realtime",
        );
        assert!(matches!(
            provider.obtain().await.unwrap_err(),
            CredentialError::MissingSecret(_)
        ));
    }

    #[tokio::test]
    async fn endpoint_envelope_yields_credential() {
        let base = serve_once("200 OK", r#"{"data":{"value":"ek_live"}}"#).await;
        let provider = HttpCredentialProvider::new(&format!("{}/token", base));

        assert_eq!(provider.obtain().await.unwrap().expose(), "ek_live");
    }

    #[tokio::test]
    async fn endpoint_error_envelope_keeps_its_message() {
        let base = serve_once("500 Internal Server Error", r#"{"error":"x"}"#).await;
        let provider = HttpCredentialProvider::new(&base);

        let err = provider.obtain().await.unwrap_err();
        assert!(matches!(
            err,
            CredentialError::Upstream { status: 500, ref message } if message == "x"
        ));
    }

    #[tokio::test]
    async fn endpoint_html_failure_is_upstream_not_network() {
        let base = serve_once("502 Bad Gateway", "<html>Bad Gateway</html>").await;
        let provider = HttpCredentialProvider::new(&base);

        let err = provider.obtain().await.unwrap_err();
        assert!(matches!(
            err,
            CredentialError::Upstream { status: 502, ref message } if message.contains("Bad Gateway")
        ));
    }

    #[tokio::test]
    async fn endpoint_success_without_envelope_is_missing_token() {
        let base = serve_once("200 OK", "ok").await;
        let provider = HttpCredentialProvider::new(&base);

        assert!(matches!(
            provider.obtain().await.unwrap_err(),
            CredentialError::MissingToken
        ));
    }

    #[tokio::test]
    async fn direct_provider_mints_client_secret() {
        let base = serve_once("200 OK", r#"{"value":"ek_direct","expires_at":1760000000}"#).await;
        let provider = DirectCredentialProvider::new(
            &base,
            Some(SecretString::from("sk-test".to_string())),
            "gpt-realtime",
        );

        assert_eq!(provider.obtain().await.unwrap().expose(), "ek_direct");
    }

    #[tokio::test]
    async fn direct_provider_surfaces_openai_error_message() {
        let base = serve_once(
            "401 Unauthorized",
            r#"{"error":{"message":"Incorrect API key provided","type":"invalid_request_error"}}"#,
        )
        .await;
        let provider = DirectCredentialProvider::new(
            &base,
            Some(SecretString::from("sk-wrong".to_string())),
            "gpt-realtime",
        );

        let err = provider.obtain().await.unwrap_err();
        assert!(matches!(
            err,
            CredentialError::Upstream { status: 401, ref message } if message == "Incorrect API key provided"
        ));
    }
}
