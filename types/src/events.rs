pub mod client;
pub mod server;

use client::*;
use server::*;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type")]
pub enum ClientEvent {
    #[serde(rename = "session.update")]
    SessionUpdate(SessionUpdateEvent),
    #[serde(rename = "conversation.item.create")]
    ConversationItemCreate(ConversationItemCreateEvent),
    #[serde(rename = "response.create")]
    ResponseCreate(ResponseCreateEvent),
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    #[serde(rename = "error")]
    Error(ErrorEvent),
    #[serde(rename = "session.created")]
    SessionCreated(SessionCreatedEvent),
    #[serde(rename = "session.updated")]
    SessionUpdated(SessionUpdatedEvent),
    /// `conversation.item.added` is the newer name of the same event.
    #[serde(rename = "conversation.item.created", alias = "conversation.item.added")]
    ConversationItemCreated(ConversationItemCreatedEvent),
    #[serde(rename = "conversation.item.input_audio_transcription.completed")]
    ConversationItemInputAudioTranscriptionCompleted(
        ConversationItemInputAudioTranscriptionCompletedEvent,
    ),
    #[serde(rename = "response.output_item.done")]
    ResponseOutputItemDone(ResponseOutputItemDoneEvent),
    #[serde(rename = "response.done")]
    ResponseDone(ResponseDoneEvent),
    /// Deltas, rate limits and everything else the client does not act on.
    #[serde(other)]
    Other,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Item;

    #[test]
    fn output_item_done_carries_function_call() {
        let text = serde_json::json!({
            "type": "response.output_item.done",
            "event_id": "event_1",
            "response_id": "resp_1",
            "output_index": 0,
            "item": {
                "id": "item_1",
                "type": "function_call",
                "status": "completed",
                "name": "display_output",
                "call_id": "call_1",
                "arguments": "{\"userPhoneticText\":\"kem cho\"}"
            }
        })
        .to_string();

        let event: ServerEvent = serde_json::from_str(&text).unwrap();
        let ServerEvent::ResponseOutputItemDone(done) = event else {
            panic!("expected response.output_item.done");
        };
        let Item::FunctionCall(call) = done.item() else {
            panic!("expected a function_call item");
        };
        assert_eq!(call.name(), "display_output");
        assert_eq!(call.call_id(), "call_1");
        assert!(call.arguments().contains("kem cho"));
    }

    #[test]
    fn unhandled_event_types_decode_as_other() {
        let text = r#"{"type":"response.output_audio.delta","event_id":"e","delta":"AAAA"}"#;
        let event: ServerEvent = serde_json::from_str(text).unwrap();
        assert!(matches!(event, ServerEvent::Other));
    }

    #[test]
    fn item_added_alias_decodes_message_transcript() {
        let text = serde_json::json!({
            "type": "conversation.item.added",
            "event_id": "event_2",
            "previous_item_id": null,
            "item": {
                "id": "item_2",
                "type": "message",
                "role": "assistant",
                "content": [{ "type": "output_audio", "transcript": "Majama?" }]
            }
        })
        .to_string();

        let event: ServerEvent = serde_json::from_str(&text).unwrap();
        let ServerEvent::ConversationItemCreated(created) = event else {
            panic!("expected conversation.item.created");
        };
        let Item::Message(message) = created.item() else {
            panic!("expected a message");
        };
        assert_eq!(message.text().as_deref(), Some("Majama?"));
    }

    #[test]
    fn function_call_output_event_serializes_with_type_tags() {
        let output = crate::FunctionCallOutputItem::new("call_1", "recorded".to_string());
        let event = ClientEvent::ConversationItemCreate(ConversationItemCreateEvent::new(
            Item::FunctionCallOutput(output),
        ));

        let wire = serde_json::to_value(&event).unwrap();
        assert_eq!(wire["type"], "conversation.item.create");
        assert_eq!(wire["item"]["type"], "function_call_output");
        assert_eq!(wire["item"]["call_id"], "call_1");
        assert_eq!(wire["item"]["output"], "recorded");
    }
}
