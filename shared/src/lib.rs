//! Shared library for the voice skill Lambda.
//!
//! This crate provides the request/response model, persistence adapters,
//! localization and the dispatch pipeline used by the skill binary.

pub mod config;
pub mod dispatch;
pub mod envelope;
pub mod error;
pub mod i18n;
pub mod persistence;
pub mod response;
pub mod slots;
pub mod ssml;

pub use config::Config;
pub use dispatch::{
    ExceptionHandler, HandlerInput, RequestHandler, RequestInterceptor, ResponseInterceptor, Skill,
    SkillBuilder,
};
pub use envelope::{RequestEnvelope, RequestType};
pub use error::{Error, Result};
pub use i18n::{Catalogs, Translator};
pub use persistence::{
    device_id_partition_keygen, request_id_partition_keygen, user_id_partition_keygen, Attributes,
    AttributesStore, DynamoDbAdapter, InMemoryAdapter, PartitionKeygen,
};
pub use response::{Card, OutputSpeech, Response, ResponseBuilder, ResponseEnvelope};
pub use slots::{normalize_slots, SlotValue, SlotValues};
pub use ssml::convert_speech_to_text;
