mod client;
pub mod config;
pub mod credential;
pub mod error;
pub mod session;
pub mod sink;
pub mod suggestions;
pub mod tools;

pub use tutor_realtime_types as types;
pub use client::{TransportConfig, WebSocketSession, WebSocketSessionFactory};
pub use credential::{Credential, CredentialProvider, DirectCredentialProvider, HttpCredentialProvider};
pub use session::{AgentDefinition, RealtimeSession, SessionFactory, SessionManager, SessionState};
pub use sink::{ConversationMessage, ConversationTurn, MessageSink};
pub use tools::ToolRegistry;
