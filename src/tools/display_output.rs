use super::ToolHandler;
use crate::error::ToolValidationError;
use crate::sink::{ConversationTurn, MessageSink};
use crate::types::tools::FunctionTool;
use std::sync::Arc;

pub const DISPLAY_OUTPUT: &str = "display_output";

const USER_PHONETIC_TEXT: &str = "userPhoneticText";
const USER_ENGLISH_TEXT: &str = "userEnglishText";
const PRONUNCIATION_RATING: &str = "pronunciationRating";
const AI_PHONETIC_TEXT: &str = "aiPhoneticText";
const AI_ENGLISH_TEXT: &str = "aiEnglishText";
const SUGGESTIONS: &str = "suggestions";

/// Records one rated, bilingual turn pair into the transcript.
pub struct DisplayOutputTool {
    sink: Arc<MessageSink>,
    language: String,
}

impl DisplayOutputTool {
    pub fn new(sink: Arc<MessageSink>, language: &str) -> Self {
        Self {
            sink,
            language: language.to_string(),
        }
    }
}

fn required_string<'a>(
    object: &'a serde_json::Map<String, serde_json::Value>,
    field: &'static str,
) -> Result<&'a str, ToolValidationError> {
    match object.get(field) {
        None => Err(ToolValidationError::MissingField(field)),
        Some(serde_json::Value::String(text)) => Ok(text),
        Some(other) => Err(ToolValidationError::NotAString {
            field,
            found: json_type(other),
        }),
    }
}

fn json_type(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

impl ToolHandler for DisplayOutputTool {
    fn definition(&self) -> FunctionTool {
        let language = &self.language;
        let description = format!(
            "Display the tutor output: phonetic {language} text and its English translation for \
             both the user's turn and your reply, a pronunciation rating and suggestions. \
             Always fill in both the phonetic and the English form for both speakers."
        );
        let user_phonetic = format!(
            "What the user said, as {language} written in English characters. For example, 'Kem cho?'"
        );
        let ai_phonetic = format!(
            "Your reply, as {language} written in English characters. For example, 'Hu saru chu'"
        );
        let suggestions = format!(
            "Suggested responses in phonetic {language} with the English translation in \
             parentheses, separated by commas. For example, \
             tamaru naam su che? (What is your name?), aap kem cho? (How are you?)"
        );

        FunctionTool::with_required_strings(
            DISPLAY_OUTPUT,
            &description,
            &[
                (USER_PHONETIC_TEXT, user_phonetic.as_str()),
                (
                    USER_ENGLISH_TEXT,
                    "What the user said, in English. For example, 'Hello, how are you?'",
                ),
                (
                    PRONUNCIATION_RATING,
                    "Rating of the user's pronunciation out of 5. For example, '4/5'",
                ),
                (AI_PHONETIC_TEXT, ai_phonetic.as_str()),
                (AI_ENGLISH_TEXT, "Your reply, in English. For example, 'I am well'"),
                (SUGGESTIONS, suggestions.as_str()),
            ],
        )
    }

    fn invoke(&self, arguments: &serde_json::Value) -> Result<String, ToolValidationError> {
        let object = arguments
            .as_object()
            .ok_or(ToolValidationError::NotAnObject)?;

        let turn = ConversationTurn {
            user_phonetic_text: required_string(object, USER_PHONETIC_TEXT)?.to_string(),
            user_english_text: required_string(object, USER_ENGLISH_TEXT)?.to_string(),
            pronunciation_rating: required_string(object, PRONUNCIATION_RATING)?.to_string(),
            ai_phonetic_text: required_string(object, AI_PHONETIC_TEXT)?.to_string(),
            ai_english_text: required_string(object, AI_ENGLISH_TEXT)?.to_string(),
            suggestions: required_string(object, SUGGESTIONS)?.to_string(),
        };

        let acknowledgment = format!(
            "Displayed to the user. User said: {} ({}), pronunciation {}. You said: {} ({}). Suggestions: {}",
            turn.user_phonetic_text,
            turn.user_english_text,
            turn.pronunciation_rating,
            turn.ai_phonetic_text,
            turn.ai_english_text,
            turn.suggestions,
        );
        self.sink.append(turn);
        Ok(acknowledgment)
    }
}
