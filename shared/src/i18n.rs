//! Locale message catalogs.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::{Error, Result};

type Catalog = HashMap<String, String>;

/// Message catalogs for every supported locale.
#[derive(Debug, Clone)]
pub struct Catalogs {
    default_locale: String,
    catalogs: HashMap<String, Catalog>,
}

impl Catalogs {
    pub fn new(default_locale: impl Into<String>) -> Self {
        Self {
            default_locale: default_locale.into(),
            catalogs: HashMap::new(),
        }
    }

    /// Register a catalog from a flat JSON object of message id to text.
    pub fn with_json(mut self, locale: &str, json: &str) -> Result<Self> {
        let parsed: HashMap<String, Value> = serde_json::from_str(json)?;
        let mut catalog = Catalog::with_capacity(parsed.len());
        for (id, text) in parsed {
            match text {
                Value::String(s) => {
                    catalog.insert(id, s);
                }
                other => {
                    return Err(Error::Validation(format!(
                        "message {} in {} is not a string: {}",
                        id, locale, other
                    )))
                }
            }
        }
        self.catalogs.insert(locale.to_string(), catalog);
        Ok(self)
    }

    pub fn default_locale(&self) -> &str {
        &self.default_locale
    }

    fn lookup(&self, locale: &str, message_id: &str) -> Option<&str> {
        self.catalogs
            .get(locale)
            .and_then(|c| c.get(message_id))
            .map(String::as_str)
    }
}

/// Translation function bound to one request locale.
#[derive(Debug, Clone)]
pub struct Translator {
    locale: String,
    catalogs: Arc<Catalogs>,
}

impl Translator {
    pub fn new(catalogs: Arc<Catalogs>, locale: Option<&str>) -> Self {
        let locale = locale
            .map(str::to_string)
            .unwrap_or_else(|| catalogs.default_locale().to_string());
        Self { locale, catalogs }
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }

    /// Look up a message: exact locale, then language only, then the default
    /// locale. Unknown ids translate to themselves.
    pub fn translate(&self, message_id: &str) -> String {
        let language = self.locale.split(&['-', '_'][..]).next().unwrap_or_default();

        self.catalogs
            .lookup(&self.locale, message_id)
            .or_else(|| self.catalogs.lookup(language, message_id))
            .or_else(|| {
                self.catalogs
                    .lookup(self.catalogs.default_locale(), message_id)
            })
            .unwrap_or(message_id)
            .to_string()
    }
}
