use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::str::FromStr;

/// Voices the hosted model can speak with.
#[derive(Debug, Clone, PartialEq)]
pub enum Voice {
    Alloy,
    Ash,
    Ballad,
    Coral,
    Echo,
    Sage,
    Shimmer,
    Verse,
    Cedar,
    Marin,
}

impl Voice {
    pub fn as_str(&self) -> &'static str {
        match self {
            Voice::Alloy => "alloy",
            Voice::Ash => "ash",
            Voice::Ballad => "ballad",
            Voice::Coral => "coral",
            Voice::Echo => "echo",
            Voice::Sage => "sage",
            Voice::Shimmer => "shimmer",
            Voice::Verse => "verse",
            Voice::Cedar => "cedar",
            Voice::Marin => "marin",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnknownVoice(pub String);

impl std::fmt::Display for UnknownVoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown voice: {}", self.0)
    }
}

impl std::error::Error for UnknownVoice {}

impl FromStr for Voice {
    type Err = UnknownVoice;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_lowercase().as_str() {
            "alloy" => Voice::Alloy,
            "ash" => Voice::Ash,
            "ballad" => Voice::Ballad,
            "coral" => Voice::Coral,
            "echo" => Voice::Echo,
            "sage" => Voice::Sage,
            "shimmer" => Voice::Shimmer,
            "verse" => Voice::Verse,
            "cedar" => Voice::Cedar,
            "marin" => Voice::Marin,
            _ => return Err(UnknownVoice(s.to_string())),
        })
    }
}

impl Serialize for Voice {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Voice {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Voice::from_str(&s).map_err(serde::de::Error::custom)
    }
}

/// Audio section of a realtime session: what the model hears and how it speaks.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AudioConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    input: Option<AudioInput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    output: Option<AudioOutput>,
}

impl AudioConfig {
    pub fn input(&self) -> Option<&AudioInput> {
        self.input.as_ref()
    }

    pub fn output(&self) -> Option<&AudioOutput> {
        self.output.as_ref()
    }

    pub fn with_voice(mut self, voice: Voice) -> Self {
        self.output = Some(AudioOutput { voice: Some(voice) });
        self
    }

    pub fn with_transcription_model(mut self, model: &str) -> Self {
        self.input = Some(AudioInput {
            transcription: Some(InputAudioTranscription {
                model: model.to_string(),
            }),
        });
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioInput {
    /// Configuration for input audio transcription. Omit to turn it off.
    #[serde(skip_serializing_if = "Option::is_none")]
    transcription: Option<InputAudioTranscription>,
}

impl AudioInput {
    pub fn transcription(&self) -> Option<&InputAudioTranscription> {
        self.transcription.as_ref()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioOutput {
    /// Cannot be changed once the model has responded with audio.
    #[serde(skip_serializing_if = "Option::is_none")]
    voice: Option<Voice>,
}

impl AudioOutput {
    pub fn voice(&self) -> Option<&Voice> {
        self.voice.as_ref()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputAudioTranscription {
    /// ex: "gpt-4o-mini-transcribe"
    model: String,
}

impl InputAudioTranscription {
    pub fn model(&self) -> &str {
        &self.model
    }
}
