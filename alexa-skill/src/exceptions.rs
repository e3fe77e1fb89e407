//! Exception handlers.

use shared::{Card, Error, ExceptionHandler, HandlerInput, Response, Result};
use tracing::error;

/// Catches every error, logs it and apologizes to the user.
pub struct CatchAllExceptionHandler;

impl ExceptionHandler for CatchAllExceptionHandler {
    fn can_handle(&self, _input: &HandlerInput, _error: &Error) -> bool {
        true
    }

    fn handle(&self, input: &mut HandlerInput, error: &Error) -> Result<Response> {
        error!(
            request_id = ?input.request_envelope.request_id(),
            error = %error,
            details = ?error,
            persistence = error.is_persistence(),
            "Unhandled error while processing request"
        );

        let speech = input.translate("ERROR");
        let title = input.translate("ERROR_CARD_TITLE");
        input
            .response_builder
            .speak(&speech)
            .set_card(Card::simple(title, speech.clone()));

        Ok(input.response_builder.build())
    }
}
