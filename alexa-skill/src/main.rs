//! Alexa Skill Lambda - Handles Alexa voice interactions.
//!
//! Each invocation runs one request envelope through the skill pipeline:
//! localization, request logging, the first matching handler, card
//! auto-fill and response logging. User attributes and per-request
//! analytics are stored in DynamoDB.

mod analytics;
mod exceptions;
mod handlers;
mod interceptors;
mod skill;

use aws_sdk_dynamodb::config::Region;
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use shared::{
    request_id_partition_keygen, user_id_partition_keygen, Config, DynamoDbAdapter,
    RequestEnvelope, ResponseEnvelope, Skill,
};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

async fn handler(
    skill: Arc<Skill>,
    event: LambdaEvent<RequestEnvelope>,
) -> Result<ResponseEnvelope, Error> {
    let envelope = event.payload;
    info!(
        request_id = ?envelope.request_id(),
        request_type = envelope.request_type().as_str(),
        intent = ?envelope.intent_name(),
        "Processing Alexa request"
    );

    Ok(skill.invoke(envelope).await?)
}

/// Tracing directive used when `RUST_LOG` is unset. Falls back to `info` so
/// a configuration error can still be logged.
fn default_directive(config: &shared::Result<Config>) -> &'static str {
    config.as_ref().map(Config::log_directive).unwrap_or("info")
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let config = Config::from_env();
    let directive = default_directive(&config);

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive)),
        )
        .json()
        .init();

    let config = config.map_err(|e| {
        error!(error = %e, "Invalid configuration");
        e
    })?;

    let aws_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new(config.aws_region.clone()))
        .load()
        .await;
    let dynamo = aws_sdk_dynamodb::Client::new(&aws_config);

    let user_store = Arc::new(DynamoDbAdapter::new(
        dynamo.clone(),
        &config.user_table,
        "user_id",
        user_id_partition_keygen,
    ));
    let analytics_store = Arc::new(DynamoDbAdapter::new(
        dynamo,
        &config.analytics_table,
        "request_id",
        request_id_partition_keygen,
    ));

    let skill = Arc::new(skill::build_skill(&config, user_store, analytics_store)?);
    info!(
        user_table = %config.user_table,
        analytics_table = %config.analytics_table,
        default_locale = %config.default_locale,
        debug = config.debug,
        "Skill ready"
    );

    run(service_fn(move |event| {
        let skill = skill.clone();
        async move { handler(skill, event).await }
    }))
    .await
}
