//! Global request and response interceptors.

use shared::{
    convert_speech_to_text, Card, Catalogs, HandlerInput, RequestInterceptor, Response,
    ResponseInterceptor, Result, Translator,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Attaches a translator for the request locale.
pub struct LocalizationInterceptor {
    catalogs: Arc<Catalogs>,
}

impl LocalizationInterceptor {
    pub fn new(catalogs: Arc<Catalogs>) -> Self {
        Self { catalogs }
    }
}

impl RequestInterceptor for LocalizationInterceptor {
    fn process(&self, input: &mut HandlerInput) -> Result<()> {
        let locale = input.request_envelope.locale().map(str::to_string);
        debug!(locale = ?locale, "Resolving translator");
        input.set_translator(Translator::new(self.catalogs.clone(), locale.as_deref()));
        Ok(())
    }
}

/// Logs every inbound request envelope.
pub struct RequestLogger;

impl RequestInterceptor for RequestLogger {
    fn process(&self, input: &mut HandlerInput) -> Result<()> {
        let request = serde_json::to_string(&input.request_envelope)?;
        info!(request = %request, "Alexa request");
        Ok(())
    }
}

/// Logs every outbound response.
pub struct ResponseLogger;

impl ResponseInterceptor for ResponseLogger {
    fn process(&self, _input: &HandlerInput, response: &mut Response) -> Result<()> {
        let body = serde_json::to_string(response)?;
        info!(response = %body, "Alexa response");
        Ok(())
    }
}

/// Adds a card to every response by turning the speech into plain text.
/// Cards set by a handler are kept, but their markup is stripped too.
pub struct AddCardInterceptor;

impl ResponseInterceptor for AddCardInterceptor {
    fn process(&self, input: &HandlerInput, response: &mut Response) -> Result<()> {
        match response.card.take() {
            Some(Card::Simple { title, content }) => {
                response.card = Some(Card::simple(strip(&title), strip(&content)));
            }
            None => {
                if let Some(content) = response.speech_text().map(strip) {
                    let title = strip(&input.translate("SKILL_NAME"));
                    response.card = Some(Card::simple(title, content));
                }
            }
        }
        Ok(())
    }
}

fn strip(text: &str) -> String {
    convert_speech_to_text(text).unwrap_or_else(|e| {
        warn!(error = %e, "Could not strip markup for card");
        text.to_string()
    })
}
