use crate::types::{Item, ServerEvent};

#[derive(Debug, Clone, PartialEq)]
pub enum HistoryKind {
    Message {
        role: String,
        text: Option<String>,
    },
    FunctionCall {
        name: String,
        call_id: String,
        arguments: String,
        output: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryItem {
    pub item_id: String,
    pub status: Option<String>,
    pub kind: HistoryKind,
}

/// Local view of the hosted conversation, rebuilt from server events.
#[derive(Debug, Default)]
pub struct History {
    items: Vec<HistoryItem>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[HistoryItem] {
        &self.items
    }

    /// Folds one server event in. Returns whether the history changed.
    pub fn apply(&mut self, event: &ServerEvent) -> bool {
        match event {
            ServerEvent::ConversationItemCreated(created) => self.upsert(created.item()),
            ServerEvent::ResponseOutputItemDone(done) => self.upsert(done.item()),
            ServerEvent::ConversationItemInputAudioTranscriptionCompleted(completed) => {
                let Some(item) = self.find_mut(completed.item_id()) else {
                    return false;
                };
                match &mut item.kind {
                    HistoryKind::Message { text, .. } => {
                        *text = Some(completed.transcript().to_string());
                        true
                    }
                    HistoryKind::FunctionCall { .. } => false,
                }
            }
            _ => false,
        }
    }

    fn find_mut(&mut self, item_id: &str) -> Option<&mut HistoryItem> {
        self.items.iter_mut().find(|item| item.item_id == item_id)
    }

    fn upsert(&mut self, item: &Item) -> bool {
        let entry = match item {
            Item::Message(message) => HistoryItem {
                item_id: message.id().unwrap_or_default().to_string(),
                status: message.status().map(|s| s.as_str().to_string()),
                kind: HistoryKind::Message {
                    role: message.role().as_str().to_string(),
                    text: message.text(),
                },
            },
            Item::FunctionCall(call) => HistoryItem {
                item_id: call.id().unwrap_or_default().to_string(),
                status: call.status().map(|s| s.as_str().to_string()),
                kind: HistoryKind::FunctionCall {
                    name: call.name().to_string(),
                    call_id: call.call_id().to_string(),
                    arguments: call.arguments().to_string(),
                    output: None,
                },
            },
            Item::FunctionCallOutput(output) => {
                // Outputs attach to the call they answer rather than standing alone.
                return self.attach_output(output.call_id(), output.output());
            }
            Item::Other => return false,
        };

        match self.find_mut(&entry.item_id) {
            Some(existing) => {
                let merged = merge(existing, entry);
                let changed = *existing != merged;
                *existing = merged;
                changed
            }
            None => {
                self.items.push(entry);
                true
            }
        }
    }

    fn attach_output(&mut self, answered: &str, result: &str) -> bool {
        for item in self.items.iter_mut() {
            if let HistoryKind::FunctionCall { call_id, output, .. } = &mut item.kind {
                if call_id == answered {
                    *output = Some(result.to_string());
                    return true;
                }
            }
        }
        false
    }
}

/// Keeps what an earlier event already knew when a later one is only partial.
fn merge(existing: &HistoryItem, mut incoming: HistoryItem) -> HistoryItem {
    match (&existing.kind, &mut incoming.kind) {
        (HistoryKind::Message { text: old, .. }, HistoryKind::Message { text, .. }) => {
            if text.is_none() {
                *text = old.clone();
            }
        }
        (
            HistoryKind::FunctionCall { output: old, .. },
            HistoryKind::FunctionCall { output, .. },
        ) => {
            if output.is_none() {
                *output = old.clone();
            }
        }
        _ => {}
    }
    if incoming.status.is_none() {
        incoming.status = existing.status.clone();
    }
    incoming
}

/// Forwards a history snapshot to the logs. Entries can be incomplete or repeated.
pub fn log_session_history(items: &[HistoryItem]) {
    tracing::debug!(items = items.len(), "session history updated");
    for item in items {
        match &item.kind {
            HistoryKind::Message { role, text } => tracing::debug!(
                item_id = %item.item_id,
                status = item.status.as_deref().unwrap_or("unknown"),
                "{}: {}",
                role,
                text.as_deref().unwrap_or("...")
            ),
            HistoryKind::FunctionCall { name, arguments, output, .. } => tracing::debug!(
                item_id = %item.item_id,
                status = item.status.as_deref().unwrap_or("unknown"),
                "call {}({}) -> {}",
                name,
                arguments,
                output.as_deref().unwrap_or("pending")
            ),
        }
    }
}
