//! Wire shapes for minting ephemeral realtime credentials.

/// Body returned by a credential-minting endpoint: `{ data: { value } }` or `{ error }`.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct CredentialEnvelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<ClientSecret>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A minted client secret, as returned by `POST /realtime/client_secrets`.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct ClientSecret {
    #[serde(default)]
    pub value: Option<String>,
    /// Unix seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
}

/// Request body for `POST /realtime/client_secrets`.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ClientSecretRequest {
    pub session: ClientSecretSession,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ClientSecretSession {
    #[serde(rename = "type")]
    pub session_type: String,
    pub model: String,
}

impl ClientSecretRequest {
    pub fn realtime(model: &str) -> Self {
        Self {
            session: ClientSecretSession {
                session_type: "realtime".to_string(),
                model: model.to_string(),
            },
        }
    }
}
