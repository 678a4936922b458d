//! API credential lookup, from the environment or AWS Secrets Manager.

use aws_sdk_secretsmanager::Client as SecretsClient;
use serde_json::Value;
use std::env;
use tracing::info;

use crate::{Error, Result};

const API_KEY_VAR: &str = "DEEPSEEK_API_KEY";
const API_KEY_SECRET_VAR: &str = "DEEPSEEK_API_KEY_SECRET_ARN";

/// Get a secret string from Secrets Manager.
pub async fn get_secret(client: &SecretsClient, secret_arn: &str) -> Result<String> {
    let response = client
        .get_secret_value()
        .secret_id(secret_arn)
        .send()
        .await
        .map_err(|e| Error::Aws(format!("Failed to get secret: {}", e)))?;

    response
        .secret_string()
        .map(String::from)
        .ok_or_else(|| Error::Aws("Secret has no string value".to_string()))
}

/// Extract the API key from a secret that is either the bare key or a JSON object.
pub fn parse_api_key_secret(secret: &str) -> Result<String> {
    let secret = secret.trim();

    let key = if secret.starts_with('{') {
        let value: Value = serde_json::from_str(secret)?;
        ["api_key", "apiKey", API_KEY_VAR]
            .iter()
            .find_map(|field| value.get(*field).and_then(Value::as_str))
            .map(str::trim)
            .unwrap_or_default()
            .to_string()
    } else {
        secret.to_string()
    };

    if key.is_empty() {
        return Err(Error::MissingApiKey);
    }
    Ok(key)
}

/// Resolve the API key once at cold start.
///
/// `DEEPSEEK_API_KEY` wins; otherwise the secret named by
/// `DEEPSEEK_API_KEY_SECRET_ARN` is fetched. Neither being set is a
/// configuration error.
pub async fn resolve_api_key() -> Result<String> {
    if let Some(key) = env::var(API_KEY_VAR).ok().filter(|k| !k.trim().is_empty()) {
        return Ok(key.trim().to_string());
    }

    let secret_arn = env::var(API_KEY_SECRET_VAR)
        .map_err(|_| Error::MissingApiKey)?;

    info!(secret_arn = %secret_arn, "Loading API key from Secrets Manager");
    let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    let client = SecretsClient::new(&config);

    parse_api_key_secret(&get_secret(&client, &secret_arn).await?)
}
