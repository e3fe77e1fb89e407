//! Slot normalization.
//!
//! Turns the raw slots of an intent into one [`SlotValue`] per slot, using
//! the first entity-resolution authority when it is usable and falling back
//! to the raw recognized text otherwise.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use crate::envelope::Slot;

/// Sentinel value the platform uses for an unfilled built-in slot.
const NONE_SENTINEL: &str = "NONE";

/// Normalized view of one slot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlotValue {
    /// Raw recognized text
    pub synonym: Option<String>,
    /// Canonical value object on a match, otherwise the raw text
    pub resolved: Option<Value>,
    /// True on an authority match, or for a filled built-in slot
    pub is_validated: bool,
}

impl SlotValue {
    /// Placeholder for a declared slot the request did not fill.
    pub fn unfilled() -> Self {
        Self {
            synonym: None,
            resolved: None,
            is_validated: false,
        }
    }

    fn raw(value: Option<&str>, is_validated: bool) -> Self {
        Self {
            synonym: value.map(str::to_string),
            resolved: value.map(|v| Value::String(v.to_string())),
            is_validated,
        }
    }

    /// Identifier for analytics: the `id` of a matched value object, else the
    /// resolved value itself.
    pub fn resolved_id(&self) -> Value {
        match &self.resolved {
            Some(Value::Object(obj)) => obj
                .get("id")
                .cloned()
                .unwrap_or_else(|| Value::Object(obj.clone())),
            Some(other) => other.clone(),
            None => Value::Null,
        }
    }
}

/// Slot name to normalized value.
pub type SlotValues = BTreeMap<String, SlotValue>;

/// Entity resolution status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum StatusCode {
    #[serde(rename = "ER_SUCCESS_MATCH")]
    SuccessMatch,
    #[serde(rename = "ER_SUCCESS_NO_MATCH")]
    SuccessNoMatch,
    #[serde(rename = "ER_ERROR_TIMEOUT")]
    ErrorTimeout,
    #[serde(rename = "ER_ERROR_EXCEPTION")]
    ErrorException,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Resolutions {
    resolutions_per_authority: Vec<Authority>,
}

#[derive(Debug, Deserialize)]
struct Authority {
    status: Status,
    #[serde(default)]
    values: Vec<ValueWrapper>,
}

#[derive(Debug, Deserialize)]
struct Status {
    code: StatusCode,
}

#[derive(Debug, Deserialize)]
struct ValueWrapper {
    value: Map<String, Value>,
}

enum Outcome {
    Matched(Map<String, Value>),
    NoMatch,
    Fallback,
}

fn first_authority_outcome(slot: &Slot) -> Outcome {
    let Some(raw) = slot.resolutions.as_ref() else {
        return Outcome::Fallback;
    };

    let resolutions: Resolutions = match serde_json::from_value(raw.clone()) {
        Ok(r) => r,
        Err(e) => {
            debug!(slot = %slot.name, error = %e, "Unexpected resolutions shape");
            return Outcome::Fallback;
        }
    };

    let Some(authority) = resolutions.resolutions_per_authority.into_iter().next() else {
        return Outcome::Fallback;
    };

    match authority.status.code {
        StatusCode::SuccessMatch => match authority.values.into_iter().next() {
            Some(candidate) => Outcome::Matched(candidate.value),
            None => Outcome::Fallback,
        },
        StatusCode::SuccessNoMatch => Outcome::NoMatch,
        _ => Outcome::Fallback,
    }
}

/// Normalize a single slot.
pub fn resolve_slot(slot: &Slot) -> SlotValue {
    let raw = slot.value.as_deref();

    match first_authority_outcome(slot) {
        Outcome::Matched(value) => SlotValue {
            synonym: raw.map(str::to_string),
            resolved: Some(Value::Object(value)),
            is_validated: true,
        },
        Outcome::NoMatch => SlotValue::raw(raw, false),
        Outcome::Fallback => {
            let filled = raw.is_some_and(|v| v != NONE_SENTINEL);
            if !filled {
                debug!(slot = %slot.name, "Slot unresolved");
            }
            SlotValue::raw(raw, filled)
        }
    }
}

/// Normalize every slot of an intent.
///
/// `declared` seeds the result with [`SlotValue::unfilled`] entries, so
/// slots a handler expects are always present even when not spoken.
pub fn normalize_slots(declared: &[&str], slots: Option<&HashMap<String, Slot>>) -> SlotValues {
    let mut values: SlotValues = declared
        .iter()
        .map(|name| (name.to_string(), SlotValue::unfilled()))
        .collect();

    for (key, slot) in slots.into_iter().flatten() {
        let name = if slot.name.is_empty() { key } else { &slot.name };
        values.insert(name.clone(), resolve_slot(slot));
    }

    values
}
