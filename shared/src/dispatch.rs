//! Request dispatch: interceptors, handlers and exception handlers.
//!
//! A [`Skill`] runs one request through an ordered pipeline:
//!
//! 1. global request interceptors, in registration order
//! 2. the first request handler whose `can_handle` accepts the request
//! 3. global response interceptors, in registration order
//!
//! Any error raised along the way is given to the first exception handler
//! that accepts it. Its response is returned as-is, without running the
//! response interceptors.

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::envelope::RequestEnvelope;
use crate::i18n::Translator;
use crate::response::{Response, ResponseBuilder, ResponseEnvelope};
use crate::{Error, Result};

/// Attributes scoped to a single request.
#[derive(Debug, Default)]
pub struct RequestAttributes {
    translator: Option<Translator>,
    values: Map<String, Value>,
}

impl RequestAttributes {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.values.insert(key.into(), value);
    }
}

/// Everything a handler sees for one request.
#[derive(Debug)]
pub struct HandlerInput {
    pub request_envelope: RequestEnvelope,
    pub request_attributes: RequestAttributes,
    pub response_builder: ResponseBuilder,
}

impl HandlerInput {
    pub fn new(request_envelope: RequestEnvelope) -> Self {
        Self {
            request_envelope,
            request_attributes: RequestAttributes::default(),
            response_builder: ResponseBuilder::new(),
        }
    }

    pub fn set_translator(&mut self, translator: Translator) {
        self.request_attributes.translator = Some(translator);
    }

    pub fn translator(&self) -> Option<&Translator> {
        self.request_attributes.translator.as_ref()
    }

    /// Translate a message id for the request locale. Without a translator
    /// the id is returned unchanged.
    pub fn translate(&self, message_id: &str) -> String {
        match self.translator() {
            Some(t) => t.translate(message_id),
            None => message_id.to_string(),
        }
    }
}

/// Handles one kind of request.
#[async_trait]
pub trait RequestHandler: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    fn can_handle(&self, input: &HandlerInput) -> bool;

    async fn handle(&self, input: &mut HandlerInput) -> Result<Response>;
}

/// Runs before the request handler.
pub trait RequestInterceptor: Send + Sync {
    fn process(&self, input: &mut HandlerInput) -> Result<()>;
}

/// Runs after the request handler, and may rewrite the response.
pub trait ResponseInterceptor: Send + Sync {
    fn process(&self, input: &HandlerInput, response: &mut Response) -> Result<()>;
}

/// Turns a pipeline error into a response.
pub trait ExceptionHandler: Send + Sync {
    fn can_handle(&self, input: &HandlerInput, error: &Error) -> bool;

    fn handle(&self, input: &mut HandlerInput, error: &Error) -> Result<Response>;
}

/// Collects pipeline components in registration order.
#[derive(Default)]
pub struct SkillBuilder {
    request_interceptors: Vec<Box<dyn RequestInterceptor>>,
    request_handlers: Vec<Box<dyn RequestHandler>>,
    response_interceptors: Vec<Box<dyn ResponseInterceptor>>,
    exception_handlers: Vec<Box<dyn ExceptionHandler>>,
}

impl SkillBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_global_request_interceptor(
        mut self,
        interceptor: impl RequestInterceptor + 'static,
    ) -> Self {
        self.request_interceptors.push(Box::new(interceptor));
        self
    }

    pub fn add_request_handler(mut self, handler: impl RequestHandler + 'static) -> Self {
        self.request_handlers.push(Box::new(handler));
        self
    }

    pub fn add_global_response_interceptor(
        mut self,
        interceptor: impl ResponseInterceptor + 'static,
    ) -> Self {
        self.response_interceptors.push(Box::new(interceptor));
        self
    }

    pub fn add_exception_handler(mut self, handler: impl ExceptionHandler + 'static) -> Self {
        self.exception_handlers.push(Box::new(handler));
        self
    }

    pub fn build(self) -> Skill {
        Skill {
            request_interceptors: self.request_interceptors,
            request_handlers: self.request_handlers,
            response_interceptors: self.response_interceptors,
            exception_handlers: self.exception_handlers,
        }
    }
}

/// A fully wired skill.
pub struct Skill {
    request_interceptors: Vec<Box<dyn RequestInterceptor>>,
    request_handlers: Vec<Box<dyn RequestHandler>>,
    response_interceptors: Vec<Box<dyn ResponseInterceptor>>,
    exception_handlers: Vec<Box<dyn ExceptionHandler>>,
}

impl Skill {
    /// Process one request envelope end to end.
    pub async fn invoke(&self, request_envelope: RequestEnvelope) -> Result<ResponseEnvelope> {
        let mut input = HandlerInput::new(request_envelope);

        let response = match self.dispatch(&mut input).await {
            Ok(response) => response,
            Err(error) => self.handle_error(&mut input, error)?,
        };

        Ok(ResponseEnvelope::new(response))
    }

    async fn dispatch(&self, input: &mut HandlerInput) -> Result<Response> {
        for interceptor in &self.request_interceptors {
            interceptor.process(input)?;
        }

        let handler = self
            .request_handlers
            .iter()
            .find(|h| h.can_handle(input))
            .ok_or_else(|| {
                Error::Dispatch(format!(
                    "Unable to find a suitable request handler for {} {}",
                    input.request_envelope.request_type().as_str(),
                    input.request_envelope.intent_name().unwrap_or_default()
                ))
            })?;

        debug!(handler = handler.name(), "Dispatching request");
        let mut response = handler.handle(input).await?;

        for interceptor in &self.response_interceptors {
            interceptor.process(input, &mut response)?;
        }

        Ok(response)
    }

    fn handle_error(&self, input: &mut HandlerInput, error: Error) -> Result<Response> {
        // Partial output from the failed handler must not leak into the reply.
        input.response_builder = ResponseBuilder::new();

        match self
            .exception_handlers
            .iter()
            .find(|h| h.can_handle(input, &error))
        {
            Some(handler) => handler.handle(input, &error),
            None => {
                warn!(error = %error, "No exception handler accepted the error");
                Err(error)
            }
        }
    }
}
