//! Configuration management for the skill Lambda.

use std::env;

use crate::{Error, Result};

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// DynamoDB table holding per-user attribute bags
    pub user_table: String,
    /// DynamoDB table receiving one analytics record per request
    pub analytics_table: String,
    /// AWS region
    pub aws_region: String,
    /// Locale used when a request carries none, or has no catalog
    pub default_locale: String,
    /// Verbose logging, and analytics failures are re-raised instead of swallowed
    pub debug: bool,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            user_table: required("USER_TABLE_NAME")?,
            analytics_table: required("ANALYTICS_TABLE_NAME")?,
            aws_region: env::var("AWS_REGION").unwrap_or_else(|_| "eu-west-1".to_string()),
            default_locale: env::var("ASK_DEFAULT_DEVICE_LOCALE")
                .unwrap_or_else(|_| "it-IT".to_string()),
            debug: env::var("DEBUG").map(|v| parse_flag(&v)).unwrap_or(false),
        })
    }

    /// Default tracing directive when `RUST_LOG` is not set.
    pub fn log_directive(&self) -> &'static str {
        if self.debug {
            "debug"
        } else {
            "info"
        }
    }
}

fn required(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("{} not set", name)))
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim(), "True" | "true" | "TRUE" | "1" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("True"));
        assert!(parse_flag("1"));
        assert!(!parse_flag("False"));
        assert!(!parse_flag(""));
    }

    #[test]
    fn test_log_directive() {
        let mut config = Config {
            user_table: "users".to_string(),
            analytics_table: "requests".to_string(),
            aws_region: "eu-west-1".to_string(),
            default_locale: "it-IT".to_string(),
            debug: false,
        };
        assert_eq!(config.log_directive(), "info");
        config.debug = true;
        assert_eq!(config.log_directive(), "debug");
    }
}
