mod display_output;

pub use display_output::{DisplayOutputTool, DISPLAY_OUTPUT};

use crate::error::ToolError;
use crate::error::ToolValidationError;
use crate::sink::MessageSink;
use crate::types::tools::{FunctionTool, Tool};
use crate::types::{FunctionCallItem, FunctionCallOutputItem};
use std::sync::Arc;

/// A callable the model may invoke. Execution is synchronous; the result goes back into
/// the model's context, not to the user.
pub trait ToolHandler: Send + Sync {
    fn definition(&self) -> FunctionTool;

    fn invoke(&self, arguments: &serde_json::Value) -> Result<String, ToolValidationError>;
}

/// The set of tools bound to one session. Build a new registry (and a new session) to change it.
#[derive(Default, Clone)]
pub struct ToolRegistry {
    handlers: Vec<Arc<dyn ToolHandler>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding only `display_output`, recording into `sink`.
    pub fn for_tutor(sink: Arc<MessageSink>, language: &str) -> Self {
        let mut registry = Self::new();
        registry.register(DisplayOutputTool::new(sink, language));
        registry
    }

    /// Adds a handler, replacing any existing one with the same name.
    pub fn register(&mut self, handler: impl ToolHandler + 'static) -> &mut Self {
        let handler: Arc<dyn ToolHandler> = Arc::new(handler);
        let name = handler.definition().name().to_string();
        self.handlers.retain(|existing| existing.definition().name() != name);
        self.handlers.push(handler);
        self
    }

    pub fn schemas(&self) -> Vec<Tool> {
        self.handlers
            .iter()
            .map(|handler| Tool::from(handler.definition()))
            .collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.handlers
            .iter()
            .map(|handler| handler.definition().name().to_string())
            .collect()
    }

    /// Runs one call with its JSON-encoded `arguments`.
    pub fn execute(&self, name: &str, arguments: &str) -> Result<String, ToolError> {
        let handler = self
            .handlers
            .iter()
            .find(|handler| handler.definition().name() == name)
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;

        let arguments: serde_json::Value = serde_json::from_str(arguments)?;
        Ok(handler.invoke(&arguments)?)
    }

    /// Executes a model function call and builds the output item to send back.
    /// A rejected call becomes an error string for the model; the session carries on.
    pub fn respond(&self, call: &FunctionCallItem) -> FunctionCallOutputItem {
        let output = match self.execute(call.name(), call.arguments()) {
            Ok(acknowledgment) => {
                tracing::info!(tool = call.name(), call_id = call.call_id(), "tool call recorded");
                acknowledgment
            }
            Err(e) => {
                tracing::warn!(tool = call.name(), call_id = call.call_id(), "tool call rejected: {}", e);
                format!("Error: {e}. Call {} again with every field filled in.", call.name())
            }
        };
        FunctionCallOutputItem::new(call.call_id(), output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid_arguments() -> serde_json::Value {
        json!({
            "userPhoneticText": "kem cho",
            "userEnglishText": "How are you?",
            "pronunciationRating": "4/5",
            "aiPhoneticText": "majama, tame?",
            "aiEnglishText": "I'm fine, and you?",
            "suggestions": "hu pan majama chu (I am fine too), dhanyawad (thanks)"
        })
    }

    fn registry() -> (ToolRegistry, Arc<MessageSink>) {
        let sink = Arc::new(MessageSink::new());
        (ToolRegistry::for_tutor(sink.clone(), "Gujarati"), sink)
    }

    #[test]
    fn valid_call_appends_exactly_one_verbatim_message() {
        let (registry, sink) = registry();
        let arguments = valid_arguments();

        let acknowledgment = registry
            .execute(DISPLAY_OUTPUT, &arguments.to_string())
            .unwrap();

        assert_eq!(sink.len(), 1);
        let message = &sink.snapshot()[0];
        assert_eq!(message.user_phonetic_text(), arguments["userPhoneticText"]);
        assert_eq!(message.user_english_text(), arguments["userEnglishText"]);
        assert_eq!(message.pronunciation_rating(), arguments["pronunciationRating"]);
        assert_eq!(message.ai_phonetic_text(), arguments["aiPhoneticText"]);
        assert_eq!(message.ai_english_text(), arguments["aiEnglishText"]);
        assert_eq!(message.suggestions(), arguments["suggestions"]);
        assert!(acknowledgment.contains("kem cho"));
    }

    #[test]
    fn missing_field_fails_only_that_call() {
        let (registry, sink) = registry();
        let mut arguments = valid_arguments();
        arguments.as_object_mut().unwrap().remove("pronunciationRating");

        let err = registry
            .execute(DISPLAY_OUTPUT, &arguments.to_string())
            .unwrap_err();
        assert!(matches!(
            err,
            ToolError::Validation(ToolValidationError::MissingField("pronunciationRating"))
        ));
        assert!(sink.is_empty());

        registry
            .execute(DISPLAY_OUTPUT, &valid_arguments().to_string())
            .unwrap();
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn non_string_field_is_rejected() {
        let (registry, sink) = registry();
        let mut arguments = valid_arguments();
        arguments["pronunciationRating"] = json!(4);

        let err = registry
            .execute(DISPLAY_OUTPUT, &arguments.to_string())
            .unwrap_err();
        assert!(matches!(
            err,
            ToolError::Validation(ToolValidationError::NotAString {
                field: "pronunciationRating",
                found: "number"
            })
        ));
        assert!(sink.is_empty());
    }

    #[test]
    fn non_object_and_malformed_arguments_are_rejected() {
        let (registry, _sink) = registry();

        assert!(matches!(
            registry.execute(DISPLAY_OUTPUT, "[1, 2]").unwrap_err(),
            ToolError::Validation(ToolValidationError::NotAnObject)
        ));
        assert!(matches!(
            registry.execute(DISPLAY_OUTPUT, "{\"userPhoneticText\":").unwrap_err(),
            ToolError::InvalidJson(_)
        ));
    }

    #[test]
    fn unknown_tool_is_an_error() {
        let (registry, _sink) = registry();
        assert!(matches!(
            registry.execute("lookup_phrase", "{}").unwrap_err(),
            ToolError::UnknownTool(name) if name == "lookup_phrase"
        ));
    }

    #[test]
    fn respond_turns_rejections_into_output_for_the_model() {
        let (registry, sink) = registry();
        let call = FunctionCallItem::new("call_9", DISPLAY_OUTPUT, "{}");

        let output = registry.respond(&call);
        assert_eq!(output.call_id(), "call_9");
        assert!(output.output().starts_with("Error:"));
        assert!(sink.is_empty());
    }

    #[test]
    fn schema_declares_six_required_strings() {
        let (registry, _sink) = registry();
        let schemas = registry.schemas();
        assert_eq!(schemas.len(), 1);

        let Tool::Function(function) = &schemas[0];
        assert_eq!(function.name(), "display_output");
        assert_eq!(
            function.required(),
            vec![
                "userPhoneticText",
                "userEnglishText",
                "pronunciationRating",
                "aiPhoneticText",
                "aiEnglishText",
                "suggestions"
            ]
        );
        assert!(function.description().contains("Gujarati"));
    }

    #[test]
    fn registering_same_name_replaces_handler() {
        let sink = Arc::new(MessageSink::new());
        let mut registry = ToolRegistry::for_tutor(sink.clone(), "Gujarati");
        registry.register(DisplayOutputTool::new(sink, "Hindi"));

        assert_eq!(registry.names(), vec!["display_output".to_string()]);
        let Tool::Function(function) = &registry.schemas()[0];
        assert!(function.description().contains("Hindi"));
    }
}
