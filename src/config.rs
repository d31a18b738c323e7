//! Application Configuration Module
//!
//! Loads settings from environment variables (and `.env`, for local development) into a single
//! struct that the binary hands to the credential provider, the transport and the agent.

use crate::types::audio::Voice;
use secrecy::SecretString;
use std::path::PathBuf;
use tracing::Level;

pub const BASE_URL: &str = "wss://api.openai.com/v1";
pub const API_BASE: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-realtime";
pub const DEFAULT_TRANSCRIPTION_MODEL: &str = "gpt-4o-mini-transcribe";
pub const DEFAULT_LANGUAGE: &str = "Gujarati";
pub const ASSISTANT_NAME: &str = "Language Tutor";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid log level provided for RUST_LOG: {0}")]
    InvalidLogLevel(String),
    #[error("Invalid voice provided for TUTOR_VOICE: {0}")]
    InvalidVoice(String),
    #[error("Failed to read instructions from {path}: {source}")]
    Instructions {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Where ephemeral credentials come from.
#[derive(Debug)]
pub enum CredentialSource {
    /// A minting endpoint answering `{ data: { value } }` or `{ error }`.
    Endpoint(String),
    /// Mint directly with a long-lived key. `None` surfaces as a credential error on connect.
    ApiKey(Option<SecretString>),
}

/// Everything that shapes the agent the model plays. Fixed for a session's lifetime.
#[derive(Debug, Clone)]
pub struct AgentProfile {
    pub name: String,
    pub instructions: String,
    pub voice: Voice,
    pub language: String,
    pub transcription_model: String,
}

impl AgentProfile {
    pub fn new(language: &str) -> Self {
        Self {
            name: ASSISTANT_NAME.to_string(),
            instructions: default_instructions(language),
            voice: Voice::Marin,
            language: language.to_string(),
            transcription_model: DEFAULT_TRANSCRIPTION_MODEL.to_string(),
        }
    }
}

pub fn default_instructions(language: &str) -> String {
    format!(
        "You are a {language} language tutor. We practice a conversation through role play where \
         you are my {language} friend asking about my day. Reply in {language} when I speak \
         {language}, and answer as my tutor when I ask how to say something. Rate my pronunciation \
         out of 5 and suggest 3 phrases I could answer with. Whenever you reply, call display_output \
         with the phonetic {language} and the English translation of both my turn and yours."
    )
}

#[derive(Debug)]
pub struct Config {
    pub credentials: CredentialSource,
    pub base_url: String,
    pub api_base: String,
    pub model: String,
    pub log_level: Level,
    pub agent: AgentProfile,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    // *   `TUTOR_CREDENTIAL_ENDPOINT`: (Optional) Minting endpoint. Takes precedence over the key.
    // *   `OPENAI_API_KEY`: (Optional) Long-lived key used to mint credentials directly.
    // *   `REALTIME_BASE_URL`: (Optional) Defaults to "wss://api.openai.com/v1".
    // *   `OPENAI_API_BASE`: (Optional) Defaults to "https://api.openai.com/v1".
    // *   `REALTIME_MODEL`: (Optional) Defaults to "gpt-realtime".
    // *   `TUTOR_VOICE`: (Optional) Defaults to "marin".
    // *   `TUTOR_LANGUAGE`: (Optional) Defaults to "Gujarati".
    // *   `TUTOR_INSTRUCTIONS_PATH`: (Optional) File replacing the default persona instructions.
    // *   `RUST_LOG`: (Optional) The logging level. Defaults to "INFO".
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Config::from_env`], reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let credentials = match var("TUTOR_CREDENTIAL_ENDPOINT") {
            Some(endpoint) => CredentialSource::Endpoint(endpoint),
            None => CredentialSource::ApiKey(var("OPENAI_API_KEY").map(SecretString::from)),
        };

        let base_url = var("REALTIME_BASE_URL").unwrap_or_else(|| BASE_URL.to_string());
        let api_base = var("OPENAI_API_BASE").unwrap_or_else(|| API_BASE.to_string());
        let model = var("REALTIME_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let log_level_str = var("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str
            .parse::<Level>()
            .map_err(|_| ConfigError::InvalidLogLevel(log_level_str))?;

        let language = var("TUTOR_LANGUAGE").unwrap_or_else(|| DEFAULT_LANGUAGE.to_string());
        let mut agent = AgentProfile::new(&language);

        if let Some(voice) = var("TUTOR_VOICE") {
            agent.voice = voice
                .parse::<Voice>()
                .map_err(|_| ConfigError::InvalidVoice(voice))?;
        }

        if let Some(path) = var("TUTOR_INSTRUCTIONS_PATH").map(PathBuf::from) {
            agent.instructions = std::fs::read_to_string(&path)
                .map_err(|source| ConfigError::Instructions { path, source })?;
        }

        Ok(Self {
            credentials,
            base_url,
            api_base,
            model,
            log_level,
            agent,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_without_any_variables() {
        let config = Config::from_lookup(lookup(&[])).unwrap();

        assert!(matches!(config.credentials, CredentialSource::ApiKey(None)));
        assert_eq!(config.base_url, BASE_URL);
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.log_level, Level::INFO);
        assert_eq!(config.agent.voice, Voice::Marin);
        assert_eq!(config.agent.language, "Gujarati");
        assert!(config.agent.instructions.contains("display_output"));
    }

    #[test]
    fn endpoint_takes_precedence_over_api_key() {
        let config = Config::from_lookup(lookup(&[
            ("TUTOR_CREDENTIAL_ENDPOINT", "http://localhost:8787/api/ephemeral-key"),
            ("OPENAI_API_KEY", "sk-test"),
        ]))
        .unwrap();

        assert!(matches!(
            config.credentials,
            CredentialSource::Endpoint(ref url) if url.ends_with("/api/ephemeral-key")
        ));
    }

    #[test]
    fn api_key_is_kept_secret() {
        let config = Config::from_lookup(lookup(&[("OPENAI_API_KEY", "sk-test")])).unwrap();
        let CredentialSource::ApiKey(Some(key)) = &config.credentials else {
            panic!("expected an api key");
        };
        assert_eq!(key.expose_secret(), "sk-test");
        assert!(!format!("{:?}", config).contains("sk-test"));
    }

    #[test]
    fn language_and_voice_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("TUTOR_LANGUAGE", "Hindi"),
            ("TUTOR_VOICE", "Coral"),
            ("RUST_LOG", "debug"),
        ]))
        .unwrap();

        assert_eq!(config.agent.voice, Voice::Coral);
        assert!(config.agent.instructions.contains("Hindi"));
        assert_eq!(config.log_level, Level::DEBUG);
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(matches!(
            Config::from_lookup(lookup(&[("RUST_LOG", "loud")])),
            Err(ConfigError::InvalidLogLevel(_))
        ));
        assert!(matches!(
            Config::from_lookup(lookup(&[("TUTOR_VOICE", "robot")])),
            Err(ConfigError::InvalidVoice(_))
        ));
        assert!(matches!(
            Config::from_lookup(lookup(&[("TUTOR_INSTRUCTIONS_PATH", "/nonexistent/persona.md")])),
            Err(ConfigError::Instructions { .. })
        ));
    }
}
