use super::{
    log_session_history, AgentDefinition, DisconnectHandler, HistoryHandler, RealtimeSession,
    SessionFactory,
};
use crate::config::AgentProfile;
use crate::credential::CredentialProvider;
use crate::error::ConnectError;
use crate::tools::ToolRegistry;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Connected,
    Closed,
}

type SharedSession = Arc<tokio::sync::Mutex<Box<dyn RealtimeSession>>>;

struct Inner {
    state: SessionState,
    /// Bumped by every teardown and re-initialize; a connect that started under an older
    /// generation is stale when it settles.
    generation: u64,
    /// Stays in place while a connect or send is using it, so teardown can always reach it.
    session: Option<SharedSession>,
    agent: Option<Arc<AgentDefinition>>,
    state_tx: watch::Sender<SessionState>,
}

impl Inner {
    fn set_state(&mut self, state: SessionState) {
        self.state = state;
        self.state_tx.send_replace(state);
    }
}

fn lock_inner(inner: &Mutex<Inner>) -> MutexGuard<'_, Inner> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Owns the one realtime session of a tutoring conversation.
///
/// `connect` and `teardown` take `&self` so teardown can run while a connect is still waiting
/// on the network. The state lock is never held across an await; the session itself sits
/// behind an async lock that teardown waits on before closing.
pub struct SessionManager {
    profile: AgentProfile,
    credentials: Arc<dyn CredentialProvider>,
    factory: Arc<dyn SessionFactory>,
    inner: Arc<Mutex<Inner>>,
}

impl SessionManager {
    pub fn new(
        profile: AgentProfile,
        credentials: Arc<dyn CredentialProvider>,
        factory: Arc<dyn SessionFactory>,
    ) -> Self {
        let (state_tx, _) = watch::channel(SessionState::Disconnected);
        Self {
            profile,
            credentials,
            factory,
            inner: Arc::new(Mutex::new(Inner {
                state: SessionState::Disconnected,
                generation: 0,
                session: None,
                agent: None,
                state_tx,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        lock_inner(&self.inner)
    }

    pub fn state(&self) -> SessionState {
        self.lock().state
    }

    /// Observes every state transition, including a server-side disconnect.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.lock().state_tx.subscribe()
    }

    pub fn agent(&self) -> Option<Arc<AgentDefinition>> {
        self.lock().agent.clone()
    }

    /// Binds a fresh, unconnected session to `registry`'s tool set.
    ///
    /// Any previous session is closed first; tools are never patched into a live session.
    pub async fn initialize(&self, registry: Arc<ToolRegistry>) {
        let (generation, previous) = {
            let mut inner = self.lock();
            inner.generation += 1;
            inner.set_state(SessionState::Disconnected);
            inner.agent = None;
            (inner.generation, inner.session.take())
        };
        if let Some(previous) = previous {
            tracing::info!("closing previous session before re-initializing");
            previous.lock().await.close().await;
        }

        let agent = Arc::new(AgentDefinition::new(&self.profile, registry));
        let mut session = self.factory.create(agent.clone());
        let forward: HistoryHandler = Arc::new(log_session_history);
        session.on_history_updated(forward);
        session.on_disconnected(self.disconnect_handler(generation));

        let mut inner = self.lock();
        if inner.generation != generation {
            tracing::debug!("initialize superseded while closing the previous session");
            return;
        }
        inner.session = Some(Arc::new(tokio::sync::Mutex::new(session)));
        inner.agent = Some(agent.clone());
        tracing::info!(
            agent = agent.name(),
            tools = ?agent.registry().names(),
            "session initialized"
        );
    }

    /// Moves a connected manager back to `Disconnected` when the server drops the session.
    fn disconnect_handler(&self, generation: u64) -> DisconnectHandler {
        let inner = Arc::downgrade(&self.inner);
        Arc::new(move || {
            let Some(inner) = inner.upgrade() else {
                return;
            };
            let mut inner = lock_inner(&inner);
            if inner.generation == generation && inner.state == SessionState::Connected {
                tracing::warn!("realtime session ended by the server");
                inner.set_state(SessionState::Disconnected);
            }
        })
    }

    /// Obtains a credential and opens the session. Returns the state once everything settled.
    ///
    /// Failures are logged and leave the manager `Disconnected`; nothing is retried. If
    /// `teardown` ran meanwhile the outcome is discarded. Dropping the future before it
    /// settles also leaves the manager `Disconnected`.
    pub async fn connect(&self) -> SessionState {
        let (generation, session) = {
            let mut inner = self.lock();
            if inner.state != SessionState::Disconnected {
                tracing::warn!(state = ?inner.state, "connect ignored");
                return inner.state;
            }
            let Some(session) = inner.session.clone() else {
                tracing::warn!("connect called before initialize");
                return inner.state;
            };
            inner.set_state(SessionState::Connecting);
            (inner.generation, session)
        };
        let pending = PendingConnect {
            inner: &self.inner,
            generation,
        };
        tracing::info!("connecting session");

        let result = match self.credentials.obtain().await {
            Ok(credential) => {
                if self.lock().generation != generation {
                    tracing::info!("torn down while obtaining a credential, not connecting");
                    return self.state();
                }
                session
                    .lock()
                    .await
                    .connect(&credential)
                    .await
                    .map_err(ConnectFailure::from)
            }
            Err(e) => Err(ConnectFailure::Credential(e)),
        };
        pending.settle(result)
    }

    /// Sends a typed user turn over the connected session.
    pub async fn send_text(&self, text: &str) -> Result<(), ConnectError> {
        let session = {
            let inner = self.lock();
            if inner.state != SessionState::Connected {
                return Err(ConnectError::NotConnected);
            }
            inner.session.clone().ok_or(ConnectError::NotConnected)?
        };
        let result = session.lock().await.send_text(text).await;
        result
    }

    /// Closes the session and leaves the manager `Closed`. Idempotent.
    ///
    /// The state is `Closed` immediately; the close itself waits for an in-flight connect or
    /// send on the session to finish or be dropped.
    pub async fn teardown(&self) {
        let session = {
            let mut inner = self.lock();
            if inner.state == SessionState::Closed && inner.session.is_none() {
                tracing::debug!("teardown: already closed");
                return;
            }
            inner.generation += 1;
            inner.set_state(SessionState::Closed);
            inner.agent = None;
            inner.session.take()
        };

        if let Some(session) = session {
            session.lock().await.close().await;
        }
        tracing::info!("session torn down");
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        let inner = self.lock();
        if inner.state != SessionState::Closed {
            tracing::warn!(state = ?inner.state, "session manager dropped without teardown");
        }
    }
}

/// A connect between leaving `Disconnected` and settling.
///
/// Dropped without `settle`, it puts a still-current manager back to `Disconnected`.
struct PendingConnect<'a> {
    inner: &'a Mutex<Inner>,
    generation: u64,
}

impl PendingConnect<'_> {
    fn settle(self, result: Result<(), ConnectFailure>) -> SessionState {
        let mut inner = lock_inner(self.inner);
        if inner.generation != self.generation {
            // Teardown or re-initialize owns closing the session.
            tracing::info!(
                connected = result.is_ok(),
                "discarding connect that settled after teardown"
            );
            return inner.state;
        }
        match result {
            Ok(()) => {
                tracing::info!("session connected");
                inner.set_state(SessionState::Connected);
            }
            Err(e) => {
                tracing::error!("failed to connect session: {}", e);
                inner.set_state(SessionState::Disconnected);
            }
        }
        inner.state
    }
}

impl Drop for PendingConnect<'_> {
    fn drop(&mut self) {
        let mut inner = lock_inner(self.inner);
        if inner.generation == self.generation && inner.state == SessionState::Connecting {
            tracing::warn!("connect cancelled before it settled");
            inner.set_state(SessionState::Disconnected);
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum ConnectFailure {
    #[error(transparent)]
    Credential(crate::error::CredentialError),
    #[error(transparent)]
    Connect(#[from] ConnectError),
}
