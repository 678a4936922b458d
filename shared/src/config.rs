//! Configuration management for Lambda functions.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::prompt::{SINGLE_CARD_TEMPERATURE, SPREAD_TEMPERATURE};
use crate::{Error, Result};

const DEFAULT_API_URL: &str = "https://api.deepseek.com/chat/completions";
const DEFAULT_MODEL: &str = "deepseek-chat";
const DEFAULT_TIMEOUT_SECS: u64 = 25;

/// Application configuration loaded from environment variables.
///
/// The API credential is not part of this; it is resolved separately at cold
/// start (see [`crate::secrets::resolve_api_key`]).
#[derive(Debug, Clone)]
pub struct Config {
    /// Chat completions endpoint
    pub api_url: String,
    /// Model identifier sent with every request
    pub model: String,
    /// Upper bound on one generation call
    pub request_timeout: Duration,
    pub single_card_temperature: f64,
    pub spread_temperature: f64,
    /// Attach raw generator output to responses
    pub include_diagnostics: bool,
    /// Optional JSON file replacing the built-in prompt templates
    pub prompt_templates_path: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            single_card_temperature: SINGLE_CARD_TEMPERATURE,
            spread_temperature: SPREAD_TEMPERATURE,
            include_diagnostics: true,
            prompt_templates_path: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        Ok(Self {
            api_url: lookup("DEEPSEEK_API_URL").unwrap_or(defaults.api_url),
            model: lookup("DEEPSEEK_MODEL").unwrap_or(defaults.model),
            request_timeout: parse_var(&lookup, "GENERATION_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
            single_card_temperature: parse_var(&lookup, "SINGLE_CARD_TEMPERATURE")?
                .unwrap_or(defaults.single_card_temperature),
            spread_temperature: parse_var(&lookup, "SPREAD_TEMPERATURE")?
                .unwrap_or(defaults.spread_temperature),
            include_diagnostics: parse_var(&lookup, "INCLUDE_DIAGNOSTICS")?
                .unwrap_or(defaults.include_diagnostics),
            prompt_templates_path: lookup("PROMPT_TEMPLATES_PATH").filter(|p| !p.is_empty()),
        })
    }
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>> {
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| Error::Config(format!("{} has an invalid value: {}", key, raw))),
    }
}
