//! Per-request analytics records.

use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use shared::{Attributes, AttributesStore, Error, HandlerInput, RequestEnvelope, Result, SlotValues};
use std::sync::Arc;
use tracing::{debug, error};

/// Writes one flat analytics record per intent request, keyed by request id.
///
/// Saving is best-effort: failures are logged and swallowed, unless `debug`
/// is set, in which case they are returned to the caller.
pub struct AnalyticsInterceptor {
    store: Arc<dyn AttributesStore>,
    debug: bool,
}

impl AnalyticsInterceptor {
    pub fn new(store: Arc<dyn AttributesStore>, debug: bool) -> Self {
        Self { store, debug }
    }

    pub async fn process(&self, input: &HandlerInput, slots: &SlotValues) -> Result<()> {
        let envelope = &input.request_envelope;
        let Some(intent_name) = envelope.intent_name() else {
            return Ok(());
        };

        let outcome = match build_record(envelope, intent_name, slots, Utc::now()) {
            Ok(record) => self.store.save_attributes(envelope, record).await,
            Err(e) => Err(e),
        };

        match outcome {
            Ok(()) => {
                debug!(
                    request_id = ?envelope.request_id(),
                    intent = %intent_name,
                    "Analytics saved"
                );
                Ok(())
            }
            Err(e) => {
                error!(
                    request_id = ?envelope.request_id(),
                    intent = %intent_name,
                    error = %e,
                    "Failed to save analytics"
                );
                if self.debug {
                    Err(e)
                } else {
                    Ok(())
                }
            }
        }
    }
}

/// Flatten a request and its slots into an analytics record.
pub fn build_record(
    envelope: &RequestEnvelope,
    intent_name: &str,
    slots: &SlotValues,
    now: DateTime<Utc>,
) -> Result<Attributes> {
    let user_id = envelope
        .user_id()
        .ok_or_else(|| Error::Validation("request has no user id".to_string()))?;
    let device_id = envelope
        .device_id()
        .ok_or_else(|| Error::Validation("request has no device id".to_string()))?;

    let mut record = Attributes::new();
    record.insert("request_id".to_string(), json!(envelope.request_id()));
    record.insert("user_id".to_string(), json!(user_id));
    record.insert("device_id".to_string(), json!(device_id));
    record.insert(
        "datetime".to_string(),
        json!(format!("{}.{:06}", now.timestamp(), now.timestamp_subsec_micros())),
    );
    record.insert("display".to_string(), json!(envelope.supports_display()));
    record.insert("locale".to_string(), json!(envelope.locale()));
    record.insert("request".to_string(), json!(envelope.request_type().as_str()));
    record.insert("intent".to_string(), json!(intent_name));

    for (name, slot) in slots {
        record.insert(format!("slot_{}_resolved_id", name), slot.resolved_id());
        record.insert(
            format!("slot_{}_synonym", name),
            slot.synonym.clone().map(Value::String).unwrap_or(Value::Null),
        );
        record.insert(format!("slot_{}_is_validated", name), json!(slot.is_validated));
    }

    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use shared::{normalize_slots, request_id_partition_keygen, InMemoryAdapter};

    struct FailingStore;

    #[async_trait]
    impl AttributesStore for FailingStore {
        async fn get_attributes(&self, _envelope: &RequestEnvelope) -> Result<Attributes> {
            Err(Error::Aws("table unavailable".to_string()))
        }

        async fn save_attributes(
            &self,
            _envelope: &RequestEnvelope,
            _attributes: Attributes,
        ) -> Result<()> {
            Err(Error::Aws("table unavailable".to_string()))
        }
    }

    fn intent_envelope() -> RequestEnvelope {
        serde_json::from_value(json!({
            "session": {"user": {"userId": "u-1"}},
            "context": {"System": {"device": {"deviceId": "d-1", "supportedInterfaces": {}}}},
            "request": {
                "type": "IntentRequest",
                "requestId": "r-1",
                "locale": "en-US",
                "intent": {
                    "name": "PlanTripIntent",
                    "slots": {
                        "city": {
                            "name": "city",
                            "value": "big apple",
                            "resolutions": {"resolutionsPerAuthority": [{
                                "status": {"code": "ER_SUCCESS_MATCH"},
                                "values": [{"value": {"name": "New York", "id": "NYC"}}]
                            }]}
                        },
                        "date": {"name": "date", "value": "2026-10-16"}
                    }
                }
            }
        }))
        .unwrap()
    }

    fn slots_of(envelope: &RequestEnvelope) -> SlotValues {
        normalize_slots(&[], envelope.request.intent.as_ref().and_then(|i| i.slots.as_ref()))
    }

    #[test]
    fn test_record_shape() {
        let envelope = intent_envelope();
        let now = Utc.timestamp_opt(1_700_000_000, 250_000_000).unwrap();
        let record = build_record(&envelope, "PlanTripIntent", &slots_of(&envelope), now).unwrap();

        let slot_keys = record.keys().filter(|k| k.starts_with("slot_")).count();
        assert_eq!(slot_keys, 6);
        assert_eq!(record.len(), 8 + 6);

        assert_eq!(record["request_id"], json!("r-1"));
        assert_eq!(record["datetime"], json!("1700000000.250000"));
        assert_eq!(record["display"], json!(false));
        assert_eq!(record["request"], json!("IntentRequest"));
        assert_eq!(record["slot_city_resolved_id"], json!("NYC"));
        assert_eq!(record["slot_city_synonym"], json!("big apple"));
        assert_eq!(record["slot_city_is_validated"], json!(true));
        assert_eq!(record["slot_date_resolved_id"], json!("2026-10-16"));
    }

    #[test]
    fn test_record_requires_user() {
        let mut envelope = intent_envelope();
        envelope.session = None;
        let err = build_record(&envelope, "PlanTripIntent", &SlotValues::new(), Utc::now())
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn test_saves_once_under_request_id() {
        let store = Arc::new(InMemoryAdapter::new(request_id_partition_keygen));
        let analytics = AnalyticsInterceptor::new(store.clone(), false);
        let input = HandlerInput::new(intent_envelope());

        analytics.process(&input, &slots_of(&input.request_envelope)).await.unwrap();

        assert_eq!(store.save_count(), 1);
        let saved = store.item("r-1").await.unwrap();
        assert_eq!(saved["intent"], json!("PlanTripIntent"));
    }

    #[tokio::test]
    async fn test_skips_requests_without_intent() {
        let store = Arc::new(InMemoryAdapter::new(request_id_partition_keygen));
        let analytics = AnalyticsInterceptor::new(store.clone(), true);
        let envelope: RequestEnvelope = serde_json::from_value(json!({
            "request": {
                "type": "SessionEndedRequest",
                "requestId": "r-2",
                "reason": "USER_INITIATED"
            }
        }))
        .unwrap();

        analytics
            .process(&HandlerInput::new(envelope), &SlotValues::new())
            .await
            .unwrap();
        assert_eq!(store.save_count(), 0);
    }

    #[tokio::test]
    async fn test_failures_swallowed_unless_debug() {
        let input = HandlerInput::new(intent_envelope());
        let slots = slots_of(&input.request_envelope);

        let production = AnalyticsInterceptor::new(Arc::new(FailingStore), false);
        assert!(production.process(&input, &slots).await.is_ok());

        let debug = AnalyticsInterceptor::new(Arc::new(FailingStore), true);
        let err = debug.process(&input, &slots).await.unwrap_err();
        assert!(matches!(err, Error::Aws(_)));
    }

    #[tokio::test]
    async fn test_missing_request_id_is_swallowed() {
        let store = Arc::new(InMemoryAdapter::new(request_id_partition_keygen));
        let analytics = AnalyticsInterceptor::new(store.clone(), false);
        let mut envelope = intent_envelope();
        envelope.request.request_id = None;

        analytics
            .process(&HandlerInput::new(envelope), &SlotValues::new())
            .await
            .unwrap();
        assert_eq!(store.save_count(), 0);
    }
}
