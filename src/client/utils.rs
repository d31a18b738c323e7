use crate::client::consts::AUTHORIZATION_HEADER;
use crate::client::TransportConfig;
use crate::credential::Credential;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;

/// Upgrade request for `{base_url}/realtime?model=...`, authorized by the ephemeral credential.
pub fn build_request(config: &TransportConfig, credential: &Credential) -> tokio_tungstenite::tungstenite::Result<Request> {
    let mut request = format!("{}/realtime?model={}", config.base_url(), config.model()).into_client_request()?;
    request.headers_mut()
        .insert(
            AUTHORIZATION_HEADER,
            format!("Bearer {}", credential.expose()).as_str().parse()?
        );
    Ok(request)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_targets_model_with_bearer_credential() {
        let config = TransportConfig::new("wss://api.openai.com/v1/", "gpt-realtime");
        let request = build_request(&config, &Credential::new("ek_abc")).unwrap();

        assert_eq!(request.uri().to_string(), "wss://api.openai.com/v1/realtime?model=gpt-realtime");
        assert_eq!(request.headers()[AUTHORIZATION_HEADER], "Bearer ek_abc");
    }
}
