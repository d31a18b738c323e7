use crate::credential::Credential;
use crate::error::ConnectError;
use crate::session::{
    AgentDefinition, DisconnectHandler, History, HistoryHandler, RealtimeSession, SessionFactory,
};
use crate::types;
use crate::types::events::client::{
    ConversationItemCreateEvent, ResponseCreateEvent, SessionUpdateEvent,
};
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use std::sync::{Arc, Mutex, PoisonError};
use tokio_tungstenite::tungstenite::Message;

mod consts;
mod utils;

use consts::{CLOSE_TIMEOUT, CONNECT_TIMEOUT, DEFAULT_CAPACITY};

pub type ClientTx = tokio::sync::mpsc::Sender<types::ClientEvent>;
type Handlers = Arc<Mutex<Vec<HistoryHandler>>>;
type DisconnectHandlers = Arc<Mutex<Vec<DisconnectHandler>>>;

/// Where and how to open realtime sockets.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    base_url: String,
    model: String,
}

impl TransportConfig {
    pub fn new(base_url: &str, model: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

struct Connection {
    c_tx: ClientTx,
    send_handle: tokio::task::JoinHandle<()>,
    recv_handle: tokio::task::JoinHandle<()>,
}

/// A realtime session over a WebSocket.
///
/// Tool calls are answered from inside the receive task, so a `display_output` call is
/// recorded even if nobody is reading events.
pub struct WebSocketSession {
    config: TransportConfig,
    agent: Arc<AgentDefinition>,
    handlers: Handlers,
    disconnect_handlers: DisconnectHandlers,
    connection: Option<Connection>,
}

impl WebSocketSession {
    pub fn new(config: TransportConfig, agent: Arc<AgentDefinition>) -> Self {
        Self {
            config,
            agent,
            handlers: Arc::new(Mutex::new(Vec::new())),
            disconnect_handlers: Arc::new(Mutex::new(Vec::new())),
            connection: None,
        }
    }

    async fn send_client_event(&self, event: types::ClientEvent) -> Result<(), ConnectError> {
        let connection = self.connection.as_ref().ok_or(ConnectError::NotConnected)?;
        connection
            .c_tx
            .send(event)
            .await
            .map_err(|_| ConnectError::NotConnected)
    }
}

fn notify(handlers: &Handlers, history: &History) {
    let handlers = handlers.lock().unwrap_or_else(PoisonError::into_inner);
    for handler in handlers.iter() {
        handler(history.items());
    }
}

fn notify_disconnected(handlers: &DisconnectHandlers) {
    let handlers = handlers.lock().unwrap_or_else(PoisonError::into_inner);
    for handler in handlers.iter() {
        handler();
    }
}

async fn handle_server_event(
    event: types::ServerEvent,
    agent: &AgentDefinition,
    c_tx: &ClientTx,
    history: &mut History,
    handlers: &Handlers,
) {
    if history.apply(&event) {
        notify(handlers, history);
    }

    match event {
        types::ServerEvent::SessionCreated(created) => {
            tracing::info!(session_id = created.session_id().unwrap_or("unknown"), "session created");
        }
        types::ServerEvent::SessionUpdated(updated) => {
            tracing::info!(tools = ?updated.tool_names(), "session updated");
        }
        types::ServerEvent::ResponseOutputItemDone(done) => {
            if let types::Item::FunctionCall(call) = done.item() {
                let output = agent.registry().respond(call);
                let events = [
                    types::ClientEvent::ConversationItemCreate(ConversationItemCreateEvent::new(
                        types::Item::FunctionCallOutput(output),
                    )),
                    types::ClientEvent::ResponseCreate(ResponseCreateEvent::new()),
                ];
                for event in events {
                    if let Err(e) = c_tx.send(event).await {
                        tracing::error!("failed to send tool output: {}", e);
                    }
                }
            }
        }
        types::ServerEvent::ResponseDone(done) => {
            if let Some(usage) = done.response().usage() {
                tracing::debug!(
                    "total_tokens: {}, input_tokens: {}, output_tokens: {}",
                    usage.total_tokens(),
                    usage.input_tokens(),
                    usage.output_tokens()
                );
            }
        }
        types::ServerEvent::Error(e) => {
            tracing::error!("server error: {}", e.error());
        }
        _ => {}
    }
}

#[async_trait]
impl RealtimeSession for WebSocketSession {
    async fn connect(&mut self, credential: &Credential) -> Result<(), ConnectError> {
        match self.connection.as_ref().map(|c| c.recv_handle.is_finished()) {
            Some(false) => return Err(ConnectError::AlreadyConnected),
            // The server ended the previous connection; release it before reopening.
            Some(true) => self.close().await,
            None => {}
        }

        let request = utils::build_request(&self.config, credential)?;
        let (ws_stream, _) =
            tokio::time::timeout(CONNECT_TIMEOUT, tokio_tungstenite::connect_async(request))
                .await
                .map_err(|_| ConnectError::Timeout)??;
        let (mut write, mut read) = ws_stream.split();

        let (c_tx, mut c_rx) = tokio::sync::mpsc::channel::<types::ClientEvent>(DEFAULT_CAPACITY);

        let send_handle = tokio::spawn(async move {
            while let Some(event) = c_rx.recv().await {
                match serde_json::to_string(&event) {
                    Ok(text) => {
                        if let Err(e) = write.send(Message::Text(text)).await {
                            tracing::error!("failed to send message: {}", e);
                        }
                    }
                    Err(e) => {
                        tracing::error!("failed to serialize event: {}", e);
                    }
                }
            }
            // Every sender is gone: the session is closing.
            if let Err(e) = write.close().await {
                tracing::debug!("failed to close socket: {}", e);
            }
        });

        let agent = self.agent.clone();
        let handlers = self.handlers.clone();
        let disconnect_handlers = self.disconnect_handlers.clone();
        let tool_tx = c_tx.clone();
        let recv_handle = tokio::spawn(async move {
            let mut history = History::new();
            while let Some(message) = read.next().await {
                let message = match message {
                    Err(e) => {
                        tracing::error!("failed to read message: {}", e);
                        break;
                    }
                    Ok(message) => message,
                };
                match message {
                    Message::Text(text) => match serde_json::from_str::<types::ServerEvent>(&text) {
                        Ok(event) => {
                            handle_server_event(event, &agent, &tool_tx, &mut history, &handlers)
                                .await;
                        }
                        Err(e) => {
                            tracing::error!("failed to deserialize event: {}, text=> {:?}", e, text);
                        }
                    },
                    Message::Binary(bin) => {
                        tracing::warn!("unexpected binary message: {} bytes", bin.len());
                    }
                    Message::Close(reason) => {
                        tracing::info!("connection closed: {:?}", reason);
                        break;
                    }
                    _ => {}
                }
            }
            // Only reached when the server side ends; a local close aborts this task.
            notify_disconnected(&disconnect_handlers);
        });

        self.connection = Some(Connection {
            c_tx,
            send_handle,
            recv_handle,
        });

        let configure = types::ClientEvent::SessionUpdate(SessionUpdateEvent::new(
            self.agent.session().clone(),
        ));
        if let Err(e) = self.send_client_event(configure).await {
            self.close().await;
            return Err(e);
        }
        Ok(())
    }

    async fn send_text(&mut self, text: &str) -> Result<(), ConnectError> {
        let message = types::MessageItem::builder()
            .with_role(types::MessageRole::User)
            .with_input_text(text)
            .build();
        self.send_client_event(types::ClientEvent::ConversationItemCreate(
            ConversationItemCreateEvent::new(types::Item::Message(message)),
        ))
        .await?;
        self.send_client_event(types::ClientEvent::ResponseCreate(ResponseCreateEvent::new()))
            .await
    }

    async fn close(&mut self) {
        let Some(connection) = self.connection.take() else {
            return;
        };
        let Connection {
            c_tx,
            send_handle,
            recv_handle,
        } = connection;

        // The receive task holds a sender for tool outputs; stop it so the send task drains.
        recv_handle.abort();
        drop(c_tx);
        let send_abort = send_handle.abort_handle();
        if tokio::time::timeout(CLOSE_TIMEOUT, send_handle).await.is_err() {
            tracing::warn!("socket did not close in time, aborting");
            send_abort.abort();
        }
        tracing::info!("realtime socket closed");
    }

    fn on_history_updated(&mut self, handler: HistoryHandler) {
        self.handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(handler);
    }

    fn on_disconnected(&mut self, handler: DisconnectHandler) {
        self.disconnect_handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(handler);
    }
}

impl Drop for WebSocketSession {
    fn drop(&mut self) {
        if let Some(connection) = self.connection.take() {
            connection.recv_handle.abort();
            connection.send_handle.abort();
        }
    }
}

/// Creates [`WebSocketSession`]s sharing one transport configuration.
pub struct WebSocketSessionFactory {
    config: TransportConfig,
}

impl WebSocketSessionFactory {
    pub fn new(config: TransportConfig) -> Self {
        Self { config }
    }
}

impl SessionFactory for WebSocketSessionFactory {
    fn create(&self, agent: Arc<AgentDefinition>) -> Box<dyn RealtimeSession> {
        Box::new(WebSocketSession::new(self.config.clone(), agent))
    }
}
