//! Realtime session capability and its lifecycle owner.
//!
//! A [`RealtimeSession`] is the hosted connection seen as `{connect, close, on history}`, so
//! the [`SessionManager`] can run against the WebSocket transport or a test substitute.

mod history;
mod manager;

pub use history::{log_session_history, History, HistoryItem, HistoryKind};
pub use manager::{SessionManager, SessionState};

use crate::config::AgentProfile;
use crate::credential::Credential;
use crate::error::ConnectError;
use crate::tools::ToolRegistry;
use crate::types::Session;
use async_trait::async_trait;
use std::sync::Arc;

/// Called with the full history every time it changes. May contain partial entries.
pub type HistoryHandler = Arc<dyn Fn(&[HistoryItem]) + Send + Sync>;

/// Called when the remote side ends a connected session. Not called for a local close.
pub type DisconnectHandler = Arc<dyn Fn() + Send + Sync>;

/// The agent a session is bound to: persona, voice and the tool set, with the registry that
/// executes it. Immutable; a different tool set means a new definition and a new session.
pub struct AgentDefinition {
    name: String,
    session: Session,
    registry: Arc<ToolRegistry>,
}

impl AgentDefinition {
    pub fn new(profile: &AgentProfile, registry: Arc<ToolRegistry>) -> Self {
        let session = Session::new()
            .with_instructions(&profile.instructions)
            .with_voice(profile.voice.clone())
            .with_input_transcription(&profile.transcription_model)
            .with_tools(registry.schemas())
            .build();

        Self {
            name: profile.name.clone(),
            session,
            registry,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The `session.update` payload sent once the connection is open.
    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }
}

#[async_trait]
pub trait RealtimeSession: Send {
    /// Opens the connection with a freshly minted credential.
    async fn connect(&mut self, credential: &Credential) -> Result<(), ConnectError>;

    /// Adds a typed user turn and asks the model to respond.
    async fn send_text(&mut self, text: &str) -> Result<(), ConnectError>;

    /// Closes the connection and releases its tasks. Safe to call in any state, any number of times.
    async fn close(&mut self);

    fn on_history_updated(&mut self, handler: HistoryHandler);

    fn on_disconnected(&mut self, handler: DisconnectHandler);
}

/// Builds unconnected sessions bound to an agent.
pub trait SessionFactory: Send + Sync {
    fn create(&self, agent: Arc<AgentDefinition>) -> Box<dyn RealtimeSession>;
}
