use crate::audio::{AudioConfig, Voice};
use crate::tools::{Tool, ToolChoice};

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Session {
    /// Always "realtime" for speech-to-speech sessions.
    #[serde(rename = "type")]
    session_type: String,

    /// The default system instructions prepended to model calls.
    #[serde(skip_serializing_if = "Option::is_none")]
    instructions: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    audio: Option<AudioConfig>,

    /// Tools(Functions) available to the model.
    #[serde(default)]
    tools: Vec<Tool>,

    /// How the model chooses tools. Options are "auto", "none", "required".
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<ToolChoice>,
}

impl Session {
    pub fn new() -> SessionConfigurator {
        SessionConfigurator::new()
    }

    pub fn instructions(&self) -> Option<&str> {
        self.instructions.as_deref()
    }

    pub fn voice(&self) -> Option<&Voice> {
        self.audio.as_ref()?.output()?.voice()
    }

    pub fn tools(&self) -> &[Tool] {
        &self.tools
    }

    pub fn tool_choice(&self) -> Option<&ToolChoice> {
        self.tool_choice.as_ref()
    }
}

pub struct SessionConfigurator {
    session: Session,
}

impl Default for SessionConfigurator {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionConfigurator {
    pub fn new() -> Self {
        Self {
            session: Session {
                session_type: "realtime".to_string(),
                instructions: None,
                audio: None,
                tools: vec![],
                tool_choice: Some(ToolChoice::Auto),
            },
        }
    }

    pub fn with_instructions(mut self, instructions: &str) -> Self {
        self.session.instructions = Some(instructions.to_string());
        self
    }

    pub fn with_voice(mut self, voice: Voice) -> Self {
        self.session.audio = Some(self.session.audio.take().unwrap_or_default().with_voice(voice));
        self
    }

    pub fn with_input_transcription(mut self, model: &str) -> Self {
        self.session.audio = Some(
            self.session
                .audio
                .take()
                .unwrap_or_default()
                .with_transcription_model(model),
        );
        self
    }

    pub fn with_tools(mut self, tools: Vec<Tool>) -> Self {
        self.session.tools = tools;
        self
    }

    pub fn build(self) -> Session {
        self.session
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::FunctionTool;

    #[test]
    fn session_update_payload_nests_voice_and_transcription() {
        let session = Session::new()
            .with_instructions("Be a friendly tutor.")
            .with_voice(Voice::Marin)
            .with_input_transcription("gpt-4o-mini-transcribe")
            .with_tools(vec![Tool::from(FunctionTool::new(
                "display_output",
                "Show output",
                serde_json::json!({ "type": "object" }),
            ))])
            .build();

        let wire = serde_json::to_value(&session).unwrap();
        assert_eq!(wire["type"], "realtime");
        assert_eq!(wire["audio"]["output"]["voice"], "marin");
        assert_eq!(wire["audio"]["input"]["transcription"]["model"], "gpt-4o-mini-transcribe");
        assert_eq!(wire["tools"][0]["name"], "display_output");
        assert_eq!(wire["tool_choice"], "auto");
        assert_eq!(session.voice(), Some(&Voice::Marin));
    }
}
