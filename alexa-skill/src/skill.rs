//! Skill wiring: which interceptors and handlers run, and in what order.

use shared::{AttributesStore, Catalogs, Config, Result, Skill, SkillBuilder};
use std::sync::Arc;

use crate::analytics::AnalyticsInterceptor;
use crate::exceptions::CatchAllExceptionHandler;
use crate::handlers::{
    BaseHandler, ExitIntentHandler, FallbackIntentHandler, HelpIntentHandler, LaunchRequestHandler,
};
use crate::interceptors::{
    AddCardInterceptor, LocalizationInterceptor, RequestLogger, ResponseLogger,
};

/// Message catalogs bundled with the skill.
pub fn catalogs(default_locale: &str) -> Result<Catalogs> {
    Catalogs::new(default_locale)
        .with_json("en-US", include_str!("../locales/en-US.json"))?
        .with_json("it-IT", include_str!("../locales/it-IT.json"))
}

/// Build the skill pipeline.
pub fn build_skill(
    config: &Config,
    user_store: Arc<dyn AttributesStore>,
    analytics_store: Arc<dyn AttributesStore>,
) -> Result<Skill> {
    let catalogs = Arc::new(catalogs(&config.default_locale)?);
    let analytics = Arc::new(AnalyticsInterceptor::new(analytics_store, config.debug));
    let base = BaseHandler::new(user_store, analytics);

    Ok(SkillBuilder::new()
        .add_global_request_interceptor(LocalizationInterceptor::new(catalogs))
        .add_global_request_interceptor(RequestLogger)
        .add_request_handler(LaunchRequestHandler::new(base.clone()))
        .add_request_handler(HelpIntentHandler::new(base.clone()))
        .add_request_handler(ExitIntentHandler::new(base.clone()))
        .add_request_handler(FallbackIntentHandler::new(base))
        .add_exception_handler(CatchAllExceptionHandler)
        .add_global_response_interceptor(AddCardInterceptor)
        .add_global_response_interceptor(ResponseLogger)
        .build())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use shared::{
        request_id_partition_keygen, user_id_partition_keygen, Attributes, Card, Error,
        InMemoryAdapter, RequestEnvelope,
    };

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

    fn config(debug: bool) -> Config {
        Config {
            user_table: "users".to_string(),
            analytics_table: "requests".to_string(),
            aws_region: "eu-west-1".to_string(),
            default_locale: "it-IT".to_string(),
            debug,
        }
    }

    fn envelope(request: Value) -> RequestEnvelope {
        serde_json::from_value(json!({
            "version": "1.0",
            "session": {"new": true, "sessionId": "s-1", "user": {"userId": "u-1"}},
            "context": {"System": {"device": {
                "deviceId": "d-1",
                "supportedInterfaces": {"Display": {}}
            }}},
            "request": request
        }))
        .unwrap()
    }

    fn translate(locale: &str, id: &str) -> String {
        shared::Translator::new(Arc::new(catalogs("it-IT").unwrap()), Some(locale)).translate(id)
    }

    #[test]
    fn test_bundled_catalogs_are_complete() {
        let ids = [
            "SKILL_NAME",
            "INVOCATION_NAME",
            "WELCOME",
            "WELCOME_BACK",
            "HELP",
            "STOP",
            "FALLBACK",
            "ERROR",
            "ERROR_CARD_TITLE",
        ];
        for locale in ["en-US", "it-IT"] {
            for id in ids {
                assert_ne!(translate(locale, id), id, "{} missing in {}", id, locale);
            }
        }
    }

    #[tokio::test]
    async fn test_launch_first_use_with_card() {
        let users = Arc::new(InMemoryAdapter::new(user_id_partition_keygen));
        let analytics = Arc::new(InMemoryAdapter::new(request_id_partition_keygen));
        let skill = build_skill(&config(false), users.clone(), analytics.clone()).unwrap();

        let response = skill
            .invoke(envelope(json!({
                "type": "LaunchRequest",
                "requestId": "r-1",
                "locale": "en-US"
            })))
            .await
            .unwrap()
            .response;

        let welcome = translate("en-US", "WELCOME");
        assert_eq!(
            response.speech_text(),
            Some(format!("<speak>{}</speak>", welcome).as_str())
        );
        assert_eq!(
            response.card,
            Some(Card::simple(translate("en-US", "SKILL_NAME"), welcome))
        );
        assert!(users.item("u-1").await.is_some());
        assert_eq!(analytics.save_count(), 0);
    }

    #[tokio::test]
    async fn test_intent_with_slots_records_analytics() {
        let users = Arc::new(InMemoryAdapter::new(user_id_partition_keygen));
        let analytics = Arc::new(InMemoryAdapter::new(request_id_partition_keygen));
        let skill = build_skill(&config(false), users, analytics.clone()).unwrap();

        let request = json!({
            "type": "IntentRequest",
            "requestId": "r-7",
            "locale": "it-IT",
            "intent": {
                "name": "AMAZON.HelpIntent",
                "slots": {
                    "topic": {
                        "name": "topic",
                        "value": "meteo",
                        "resolutions": {"resolutionsPerAuthority": [{
                            "status": {"code": "ER_SUCCESS_NO_MATCH"}
                        }]}
                    },
                    "day": {"name": "day", "value": "NONE"}
                }
            }
        });
        let response = skill.invoke(envelope(request)).await.unwrap().response;
        assert_eq!(
            response.speech_text(),
            Some(format!("<speak>{}</speak>", translate("it-IT", "HELP")).as_str())
        );

        let record = analytics.item("r-7").await.unwrap();
        assert_eq!(record.keys().filter(|k| k.starts_with("slot_")).count(), 6);
        assert_eq!(record["slot_topic_is_validated"], json!(false));
        assert_eq!(record["slot_topic_resolved_id"], json!("meteo"));
        assert_eq!(record["slot_day_is_validated"], json!(false));
        assert_eq!(record["display"], json!(true));
        assert_eq!(record["locale"], json!("it-IT"));
    }

    #[tokio::test]
    async fn test_session_end_writes_no_analytics() {
        let users = Arc::new(InMemoryAdapter::new(user_id_partition_keygen));
        let analytics = Arc::new(InMemoryAdapter::new(request_id_partition_keygen));
        let skill = build_skill(&config(true), users, analytics.clone()).unwrap();

        let response = skill
            .invoke(envelope(json!({
                "type": "SessionEndedRequest",
                "requestId": "r-9",
                "reason": "USER_INITIATED"
            })))
            .await
            .unwrap()
            .response;

        assert_eq!(
            response.speech_text(),
            Some(format!("<speak>{}</speak>", translate("it-IT", "STOP")).as_str())
        );
        assert_eq!(analytics.save_count(), 0);
    }

    #[tokio::test]
    async fn test_store_failure_becomes_apology() {
        let analytics = Arc::new(InMemoryAdapter::new(request_id_partition_keygen));
        let skill = build_skill(&config(false), Arc::new(FailingStore), analytics).unwrap();

        let response = skill
            .invoke(envelope(json!({
                "type": "LaunchRequest",
                "requestId": "r-1",
                "locale": "en-US"
            })))
            .await
            .unwrap()
            .response;

        let error = translate("en-US", "ERROR");
        assert_eq!(response.speech_text(), Some(format!("<speak>{}</speak>", error).as_str()));
        assert_eq!(
            response.card,
            Some(Card::simple(translate("en-US", "ERROR_CARD_TITLE"), error))
        );
        assert!(response.reprompt.is_none());
    }

    #[tokio::test]
    async fn test_missing_user_id_becomes_apology() {
        let users = Arc::new(InMemoryAdapter::new(user_id_partition_keygen));
        let analytics = Arc::new(InMemoryAdapter::new(request_id_partition_keygen));
        let skill = build_skill(&config(false), users.clone(), analytics.clone()).unwrap();

        let anonymous: RequestEnvelope = serde_json::from_value(json!({
            "session": {"new": true, "sessionId": "s-1"},
            "context": {"System": {"device": {"deviceId": "d-1"}}},
            "request": {"type": "LaunchRequest", "requestId": "r-5", "locale": "en-US"}
        }))
        .unwrap();
        let response = skill.invoke(anonymous).await.unwrap().response;

        let error = translate("en-US", "ERROR");
        assert_eq!(
            response.speech_text(),
            Some(format!("<speak>{}</speak>", error).as_str())
        );
        assert_eq!(
            response.card,
            Some(Card::simple(translate("en-US", "ERROR_CARD_TITLE"), error))
        );
        assert_eq!(users.save_count(), 0);
        assert_eq!(analytics.save_count(), 0);
    }

    #[tokio::test]
    async fn test_analytics_failure_depends_on_debug() {
        let help = json!({
            "type": "IntentRequest",
            "requestId": "r-3",
            "locale": "en-US",
            "intent": {"name": "HelpIntent"}
        });

        let users = Arc::new(InMemoryAdapter::new(user_id_partition_keygen));
        let production =
            build_skill(&config(false), users.clone(), Arc::new(FailingStore)).unwrap();
        let response = production.invoke(envelope(help.clone())).await.unwrap().response;
        assert_eq!(
            response.speech_text(),
            Some(format!("<speak>{}</speak>", translate("en-US", "HELP")).as_str())
        );

        let debug = build_skill(&config(true), users, Arc::new(FailingStore)).unwrap();
        let response = debug.invoke(envelope(help)).await.unwrap().response;
        assert_eq!(
            response.speech_text(),
            Some(format!("<speak>{}</speak>", translate("en-US", "ERROR")).as_str())
        );
    }

    #[tokio::test]
    async fn test_unhandled_intent_gets_apology() {
        let users = Arc::new(InMemoryAdapter::new(user_id_partition_keygen));
        let analytics = Arc::new(InMemoryAdapter::new(request_id_partition_keygen));
        let skill = build_skill(&config(false), users, analytics).unwrap();

        let response = skill
            .invoke(envelope(json!({
                "type": "IntentRequest",
                "requestId": "r-4",
                "locale": "fr-FR",
                "intent": {"name": "OrderPizzaIntent"}
            })))
            .await
            .unwrap()
            .response;

        assert_eq!(
            response.speech_text(),
            Some(format!("<speak>{}</speak>", translate("it-IT", "ERROR")).as_str())
        );
    }
}
