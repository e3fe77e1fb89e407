//! Inbound Alexa request envelope.
//!
//! Only the fields the skill reads are modelled. Unknown fields are ignored
//! so that platform additions never break deserialization.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// The full request envelope delivered to the Lambda.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestEnvelope {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub session: Option<Session>,
    #[serde(default)]
    pub context: Option<Context>,
    pub request: Request,
}

/// Alexa session block.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    #[serde(default)]
    pub new: Option<bool>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub attributes: Option<serde_json::Map<String, Value>>,
}

/// Alexa user identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub user_id: String,
}

/// Context block, carrying device state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Context {
    #[serde(rename = "System", default)]
    pub system: Option<SystemState>,
    #[serde(rename = "Display", default, skip_serializing_if = "Option::is_none")]
    pub display: Option<Value>,
}

/// `context.System`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemState {
    #[serde(default)]
    pub device: Option<Device>,
    #[serde(default)]
    pub user: Option<User>,
}

/// Device the request originated from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub device_id: String,
    #[serde(default)]
    pub supported_interfaces: HashMap<String, Value>,
}

/// Request type discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestType {
    LaunchRequest,
    IntentRequest,
    SessionEndedRequest,
    #[serde(other)]
    Other,
}

impl RequestType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestType::LaunchRequest => "LaunchRequest",
            RequestType::IntentRequest => "IntentRequest",
            RequestType::SessionEndedRequest => "SessionEndedRequest",
            RequestType::Other => "Other",
        }
    }
}

/// The `request` block.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    #[serde(rename = "type")]
    pub request_type: RequestType,
    #[serde(default)]
    pub request_id: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub locale: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<Intent>,
    /// Session end reason, only on `SessionEndedRequest`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// A recognized intent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Intent {
    pub name: String,
    #[serde(default)]
    pub confirmation_status: Option<String>,
    #[serde(default)]
    pub slots: Option<HashMap<String, Slot>>,
}

/// A recognized slot value.
///
/// `resolutions` is kept as raw JSON: it is inspected leniently by
/// [`crate::slots`] so that unexpected shapes degrade instead of failing
/// the whole envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Slot {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub confirmation_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolutions: Option<Value>,
}

impl RequestEnvelope {
    pub fn request_type(&self) -> RequestType {
        self.request.request_type
    }

    /// Intent name, when the request carries an intent.
    pub fn intent_name(&self) -> Option<&str> {
        self.request.intent.as_ref().map(|i| i.name.as_str())
    }

    /// True for an `IntentRequest` whose intent is one of `names`.
    pub fn is_intent(&self, names: &[&str]) -> bool {
        self.request_type() == RequestType::IntentRequest
            && self.intent_name().is_some_and(|name| names.contains(&name))
    }

    pub fn request_id(&self) -> Option<&str> {
        self.request.request_id.as_deref()
    }

    pub fn locale(&self) -> Option<&str> {
        self.request.locale.as_deref()
    }

    /// User id from the session, falling back to `context.System.user`.
    pub fn user_id(&self) -> Option<&str> {
        self.session
            .as_ref()
            .and_then(|s| s.user.as_ref())
            .or_else(|| self.system().and_then(|s| s.user.as_ref()))
            .map(|u| u.user_id.as_str())
    }

    pub fn device_id(&self) -> Option<&str> {
        self.system()
            .and_then(|s| s.device.as_ref())
            .map(|d| d.device_id.as_str())
    }

    /// Whether the device advertises the Display interface.
    pub fn supports_display(&self) -> bool {
        self.system()
            .and_then(|s| s.device.as_ref())
            .is_some_and(|d| d.supported_interfaces.contains_key("Display"))
    }

    fn system(&self) -> Option<&SystemState> {
        self.context.as_ref().and_then(|c| c.system.as_ref())
    }
}
