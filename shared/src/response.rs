//! Outbound Alexa response envelope and builder.

use serde::{Deserialize, Serialize};

/// Envelope returned to the Alexa service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseEnvelope {
    pub version: String,
    pub response: Response,
}

impl ResponseEnvelope {
    pub fn new(response: Response) -> Self {
        Self {
            version: "1.0".to_string(),
            response,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_speech: Option<OutputSpeech>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reprompt: Option<Reprompt>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card: Option<Card>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub should_end_session: Option<bool>,
}

impl Response {
    /// Raw text of the output speech, markup included.
    pub fn speech_text(&self) -> Option<&str> {
        self.output_speech.as_ref().map(OutputSpeech::text)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum OutputSpeech {
    PlainText { text: String },
    #[serde(rename = "SSML")]
    Ssml { ssml: String },
}

impl OutputSpeech {
    pub fn text(&self) -> &str {
        match self {
            OutputSpeech::PlainText { text } => text,
            OutputSpeech::Ssml { ssml } => ssml,
        }
    }

    fn ssml(text: &str) -> Self {
        let trimmed = text.trim();
        let ssml = if trimmed.starts_with("<speak>") && trimmed.ends_with("</speak>") {
            trimmed.to_string()
        } else {
            format!("<speak>{}</speak>", text)
        };
        OutputSpeech::Ssml { ssml }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reprompt {
    pub output_speech: OutputSpeech,
}

/// Visual card shown in the companion app or on screen devices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Card {
    Simple { title: String, content: String },
}

impl Card {
    pub fn simple(title: impl Into<String>, content: impl Into<String>) -> Self {
        Card::Simple {
            title: title.into(),
            content: content.into(),
        }
    }
}

/// Builds a [`Response`] one piece at a time.
#[derive(Debug, Default)]
pub struct ResponseBuilder {
    response: Response,
}

impl ResponseBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the spoken output. Text is wrapped in `<speak>` unless it already is.
    pub fn speak(&mut self, text: &str) -> &mut Self {
        self.response.output_speech = Some(OutputSpeech::ssml(text));
        self
    }

    /// Set the reprompt and keep the session open.
    pub fn ask(&mut self, text: &str) -> &mut Self {
        self.response.reprompt = Some(Reprompt {
            output_speech: OutputSpeech::ssml(text),
        });
        self.response.should_end_session = Some(false);
        self
    }

    pub fn set_card(&mut self, card: Card) -> &mut Self {
        self.response.card = Some(card);
        self
    }

    pub fn set_should_end_session(&mut self, end: bool) -> &mut Self {
        self.response.should_end_session = Some(end);
        self
    }

    /// Take the response built so far, leaving the builder empty.
    pub fn build(&mut self) -> Response {
        std::mem::take(&mut self.response)
    }
}
