//! Append-only store of the structured turns reported through `display_output`.

use crate::suggestions::{parse_suggestions, Suggestion};
use chrono::{DateTime, Utc};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;

/// Sequence-assigned identifier. Never reused within a sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
pub struct MessageId(u64);

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "msg-{}", self.0)
    }
}

/// The six text fields of one turn pair, exactly as the model reported them.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationTurn {
    pub user_phonetic_text: String,
    pub user_english_text: String,
    pub pronunciation_rating: String,
    pub ai_phonetic_text: String,
    pub ai_english_text: String,
    pub suggestions: String,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationMessage {
    id: MessageId,
    #[serde(flatten)]
    turn: ConversationTurn,
    timestamp: DateTime<Utc>,
}

impl ConversationMessage {
    pub fn id(&self) -> MessageId {
        self.id
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn user_phonetic_text(&self) -> &str {
        &self.turn.user_phonetic_text
    }

    pub fn user_english_text(&self) -> &str {
        &self.turn.user_english_text
    }

    pub fn pronunciation_rating(&self) -> &str {
        &self.turn.pronunciation_rating
    }

    pub fn ai_phonetic_text(&self) -> &str {
        &self.turn.ai_phonetic_text
    }

    pub fn ai_english_text(&self) -> &str {
        &self.turn.ai_english_text
    }

    /// Raw suggestions text as stored.
    pub fn suggestions(&self) -> &str {
        &self.turn.suggestions
    }

    /// Well-formed suggestion pairs for presentation.
    pub fn suggestion_pairs(&self) -> Vec<Suggestion> {
        parse_suggestions(&self.turn.suggestions)
    }
}

struct SinkInner {
    messages: Vec<ConversationMessage>,
    next_id: u64,
}

pub struct MessageSink {
    inner: Mutex<SinkInner>,
    len_tx: watch::Sender<usize>,
}

impl Default for MessageSink {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageSink {
    pub fn new() -> Self {
        let (len_tx, _) = watch::channel(0);
        Self {
            inner: Mutex::new(SinkInner {
                messages: Vec::new(),
                next_id: 1,
            }),
            len_tx,
        }
    }

    fn lock(&self) -> MutexGuard<'_, SinkInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Creates a message from `turn` and appends it. Returns its zero-based position.
    ///
    /// Id and timestamp are assigned under the same lock as the push, so ids follow append
    /// order and timestamps never go backwards even if the wall clock does.
    pub fn append(&self, turn: ConversationTurn) -> usize {
        let (position, len) = {
            let mut inner = self.lock();
            let id = MessageId(inner.next_id);
            inner.next_id += 1;

            let now = Utc::now();
            let timestamp = match inner.messages.last() {
                Some(last) if last.timestamp > now => last.timestamp,
                _ => now,
            };

            inner.messages.push(ConversationMessage { id, turn, timestamp });
            (inner.messages.len() - 1, inner.messages.len())
        };

        self.len_tx.send_replace(len);
        tracing::debug!(position, "appended conversation message");
        position
    }

    /// Full ordered sequence at this instant.
    pub fn snapshot(&self) -> Vec<ConversationMessage> {
        self.lock().messages.clone()
    }

    pub fn len(&self) -> usize {
        self.lock().messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Receiver of the sink length, updated on every append.
    pub fn subscribe(&self) -> watch::Receiver<usize> {
        self.len_tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turn(n: usize) -> ConversationTurn {
        ConversationTurn {
            user_phonetic_text: format!("kem cho {n}"),
            user_english_text: "How are you?".to_string(),
            pronunciation_rating: "4/5".to_string(),
            ai_phonetic_text: "majama".to_string(),
            ai_english_text: "I'm fine".to_string(),
            suggestions: "dhanyawad (thanks)".to_string(),
        }
    }

    #[test]
    fn append_returns_position_and_keeps_order() {
        let sink = MessageSink::new();
        assert!(sink.is_empty());

        assert_eq!(sink.append(turn(0)), 0);
        assert_eq!(sink.append(turn(1)), 1);
        assert_eq!(sink.append(turn(2)), 2);

        let snapshot = sink.snapshot();
        let texts: Vec<&str> = snapshot.iter().map(|m| m.user_phonetic_text()).collect();
        assert_eq!(texts, vec!["kem cho 0", "kem cho 1", "kem cho 2"]);
    }

    #[test]
    fn ids_are_unique_and_increase_within_one_tick() {
        let sink = MessageSink::new();
        for n in 0..500 {
            sink.append(turn(n));
        }

        let snapshot = sink.snapshot();
        for pair in snapshot.windows(2) {
            assert!(pair[0].id() < pair[1].id());
            assert!(pair[0].timestamp() <= pair[1].timestamp());
        }
        assert_eq!(snapshot[0].id().to_string(), "msg-1");
    }

    #[test]
    fn snapshot_is_detached_from_later_appends() {
        let sink = MessageSink::new();
        sink.append(turn(0));
        let before = sink.snapshot();
        sink.append(turn(1));

        assert_eq!(before.len(), 1);
        assert_eq!(sink.len(), 2);
    }

    #[test]
    fn suggestion_pairs_skip_unparseable_segments() {
        let sink = MessageSink::new();
        let mut input = turn(0);
        input.suggestions = "aap kem cho (how are you), random text".to_string();
        sink.append(input);

        let message = &sink.snapshot()[0];
        assert_eq!(message.suggestions(), "aap kem cho (how are you), random text");
        assert_eq!(message.suggestion_pairs().len(), 1);
    }

    #[test]
    fn serializes_with_wire_field_names() {
        let sink = MessageSink::new();
        sink.append(turn(0));

        let json = serde_json::to_value(&sink.snapshot()[0]).unwrap();
        assert_eq!(json["userPhoneticText"], "kem cho 0");
        assert_eq!(json["pronunciationRating"], "4/5");
        assert!(json.get("timestamp").is_some());
    }

    #[tokio::test]
    async fn subscribers_see_new_length() {
        let sink = MessageSink::new();
        let mut rx = sink.subscribe();

        sink.append(turn(0));
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), 1);
    }
}
