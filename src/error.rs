use tokio_tungstenite::tungstenite;

/// Failures while obtaining an ephemeral session credential.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("credential secret is not configured: {0}")]
    MissingSecret(String),
    #[error("credential request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("credential endpoint returned {status}: {message}")]
    Upstream { status: u16, message: String },
    #[error("credential response did not contain a token")]
    MissingToken,
}

/// Session-level failures once a credential is in hand.
#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    #[error("session is already connected")]
    AlreadyConnected,
    #[error("session is not connected")]
    NotConnected,
    #[error("timed out opening the realtime socket")]
    Timeout,
    #[error("realtime transport error: {0}")]
    Transport(#[from] tungstenite::Error),
    #[error("failed to encode client event: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Malformed arguments passed to a structured callable.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ToolValidationError {
    #[error("arguments must be a JSON object")]
    NotAnObject,
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
    #[error("field `{field}` must be a string, got {found}")]
    NotAString {
        field: &'static str,
        found: &'static str,
    },
}

/// Why a single tool call could not be executed. Never fatal to the session.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("unknown tool `{0}`")]
    UnknownTool(String),
    #[error("arguments are not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error(transparent)]
    Validation(#[from] ToolValidationError),
}

/// A suggestion segment that does not look like `<phonetic> (<translation>)`.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("suggestion segment `{0}` has no `(translation)` group")]
pub struct SuggestionParseError(pub String);
