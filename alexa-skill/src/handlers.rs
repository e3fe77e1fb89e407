//! Request handlers for the built-in Alexa requests and intents.

use async_trait::async_trait;
use serde_json::{json, Value};
use shared::{
    normalize_slots, Attributes, AttributesStore, HandlerInput, RequestHandler, RequestType,
    Response, Result, SlotValues,
};
use std::sync::Arc;
use tracing::debug;

use crate::analytics::AnalyticsInterceptor;

/// Flag added to a freshly created user bag. Never persisted.
pub const FIRST_USE: &str = "first_use";

const LAUNCH_COUNT: &str = "launch_count";

const HELP_INTENTS: &[&str] = &["AMAZON.HelpIntent", "HelpIntent"];
const EXIT_INTENTS: &[&str] = &[
    "AMAZON.CancelIntent",
    "AMAZON.StopIntent",
    "AMAZON.PauseIntent",
    "CancelIntent",
    "StopIntent",
    "PauseIntent",
];
const FALLBACK_INTENTS: &[&str] = &["AMAZON.FallbackIntent"];

/// Attribute bag stored for a new user.
pub fn default_attributes() -> Attributes {
    let mut attributes = Attributes::new();
    attributes.insert(LAUNCH_COUNT.to_string(), json!(0));
    attributes
}

/// Facilities every concrete handler shares: user attributes, slot
/// normalization and analytics.
#[derive(Clone)]
pub struct BaseHandler {
    user_store: Arc<dyn AttributesStore>,
    analytics: Arc<AnalyticsInterceptor>,
    slots: &'static [&'static str],
}

impl BaseHandler {
    pub fn new(user_store: Arc<dyn AttributesStore>, analytics: Arc<AnalyticsInterceptor>) -> Self {
        Self {
            user_store,
            analytics,
            slots: &[],
        }
    }

    /// Declare the slots this handler expects, so they are always reported.
    pub fn with_slots(mut self, slots: &'static [&'static str]) -> Self {
        self.slots = slots;
        self
    }

    /// Record analytics for the request. Call before the handler's own logic.
    pub async fn record(&self, input: &HandlerInput) -> Result<()> {
        let slots = self.get_slot_values(input);
        self.analytics.process(input, &slots).await
    }

    /// The user's attribute bag, created with defaults on first use.
    pub async fn get_attributes(&self, input: &HandlerInput) -> Result<Attributes> {
        let attributes = self
            .user_store
            .get_attributes(&input.request_envelope)
            .await?;

        if attributes.is_empty() {
            let mut defaults = self.set_default_attributes(input).await?;
            defaults.insert(FIRST_USE.to_string(), Value::Bool(true));
            return Ok(defaults);
        }

        Ok(attributes)
    }

    /// Persist and return the default attribute bag.
    pub async fn set_default_attributes(&self, input: &HandlerInput) -> Result<Attributes> {
        let attributes = default_attributes();
        self.user_store
            .save_attributes(&input.request_envelope, attributes.clone())
            .await?;
        Ok(attributes)
    }

    /// Merge `changes` over the stored bag and save it. Keys not in
    /// `changes` are kept.
    pub async fn set_attributes(
        &self,
        input: &HandlerInput,
        changes: Attributes,
    ) -> Result<Attributes> {
        let mut attributes = self
            .user_store
            .get_attributes(&input.request_envelope)
            .await?;
        attributes.extend(changes);

        self.user_store
            .save_attributes(&input.request_envelope, attributes.clone())
            .await?;
        Ok(attributes)
    }

    /// Normalized slots of the request's intent.
    pub fn get_slot_values(&self, input: &HandlerInput) -> SlotValues {
        let filled = input
            .request_envelope
            .request
            .intent
            .as_ref()
            .and_then(|i| i.slots.as_ref());
        debug!(filled = ?filled, "Filled slots");

        normalize_slots(self.slots, filled)
    }
}

/// Handler for skill launch.
pub struct LaunchRequestHandler {
    base: BaseHandler,
}

impl LaunchRequestHandler {
    pub fn new(base: BaseHandler) -> Self {
        Self { base }
    }
}

#[async_trait]
impl RequestHandler for LaunchRequestHandler {
    fn name(&self) -> &'static str {
        "LaunchRequest"
    }

    fn can_handle(&self, input: &HandlerInput) -> bool {
        input.request_envelope.request_type() == RequestType::LaunchRequest
    }

    async fn handle(&self, input: &mut HandlerInput) -> Result<Response> {
        debug!("Request called: LaunchRequest");
        self.base.record(input).await?;

        let attributes = self.base.get_attributes(input).await?;
        let first_use = attributes
            .get(FIRST_USE)
            .and_then(Value::as_bool)
            .unwrap_or(false);

        let speech = if first_use {
            debug!("User not present in store");
            input.translate("WELCOME")
        } else {
            debug!("User already present in store");
            input.translate("WELCOME_BACK")
        };

        let launch_count = attributes
            .get(LAUNCH_COUNT)
            .and_then(Value::as_u64)
            .unwrap_or(0);
        let mut changes = Attributes::new();
        changes.insert(LAUNCH_COUNT.to_string(), json!(launch_count + 1));
        self.base.set_attributes(input, changes).await?;

        input.response_builder.speak(&speech).ask(&speech);
        Ok(input.response_builder.build())
    }
}

/// Handler for the help intent.
pub struct HelpIntentHandler {
    base: BaseHandler,
}

impl HelpIntentHandler {
    pub fn new(base: BaseHandler) -> Self {
        Self { base }
    }
}

#[async_trait]
impl RequestHandler for HelpIntentHandler {
    fn name(&self) -> &'static str {
        "HelpIntent"
    }

    fn can_handle(&self, input: &HandlerInput) -> bool {
        input.request_envelope.is_intent(HELP_INTENTS)
    }

    async fn handle(&self, input: &mut HandlerInput) -> Result<Response> {
        debug!("Intent called: HelpIntent");
        self.base.record(input).await?;

        let speech = input.translate("HELP");
        input.response_builder.speak(&speech).ask(&speech);
        Ok(input.response_builder.build())
    }
}

/// Single handler for session end and the cancel, stop and pause intents.
pub struct ExitIntentHandler {
    base: BaseHandler,
}

impl ExitIntentHandler {
    pub fn new(base: BaseHandler) -> Self {
        Self { base }
    }
}

#[async_trait]
impl RequestHandler for ExitIntentHandler {
    fn name(&self) -> &'static str {
        "ExitIntent"
    }

    fn can_handle(&self, input: &HandlerInput) -> bool {
        input.request_envelope.request_type() == RequestType::SessionEndedRequest
            || input.request_envelope.is_intent(EXIT_INTENTS)
    }

    async fn handle(&self, input: &mut HandlerInput) -> Result<Response> {
        match input.request_envelope.request.reason.as_deref() {
            Some(reason) => debug!(reason = %reason, "Intent called: ExitIntent"),
            None => debug!("Intent called: ExitIntent, no reason specified"),
        }
        self.base.record(input).await?;

        let speech = input.translate("STOP");
        input.response_builder.speak(&speech);
        Ok(input.response_builder.build())
    }
}

/// Handler for requests outside the skill's scope.
pub struct FallbackIntentHandler {
    base: BaseHandler,
}

impl FallbackIntentHandler {
    pub fn new(base: BaseHandler) -> Self {
        Self { base }
    }
}

#[async_trait]
impl RequestHandler for FallbackIntentHandler {
    fn name(&self) -> &'static str {
        "FallbackIntent"
    }

    fn can_handle(&self, input: &HandlerInput) -> bool {
        input.request_envelope.is_intent(FALLBACK_INTENTS)
    }

    async fn handle(&self, input: &mut HandlerInput) -> Result<Response> {
        debug!("Intent called: FallbackIntent");
        self.base.record(input).await?;

        let speech = input.translate("FALLBACK");
        input.response_builder.speak(&speech);
        Ok(input.response_builder.build())
    }
}
