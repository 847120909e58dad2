//! Effective-configuration inspection with source attribution. Secrets
//! are redacted before printing.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::ExposeSecret;
use toml::Value;

use tably_core::config::{AppConfig, LoadOptions};

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let source = |key: &str, env_var: &str| {
        field_source(key, env_var, config_file_doc.as_ref(), config_file_path.as_deref())
    };

    let redacted_key = config
        .llm
        .api_key
        .as_ref()
        .map(|key| redact(key.expose_secret()))
        .unwrap_or_else(|| "<unset>".to_string());

    let lines = vec![
        "effective config (source precedence: env > file > default):".to_string(),
        render("database.url", &config.database.url, source("database.url", "TABLY_DATABASE_URL")),
        render(
            "database.max_connections",
            &config.database.max_connections.to_string(),
            source("database.max_connections", "TABLY_DATABASE_MAX_CONNECTIONS"),
        ),
        render(
            "llm.provider",
            &format!("{:?}", config.llm.provider),
            source("llm.provider", "TABLY_LLM_PROVIDER"),
        ),
        render("llm.model", &config.llm.model, source("llm.model", "TABLY_LLM_MODEL")),
        render("llm.api_key", &redacted_key, source("llm.api_key", "TABLY_LLM_API_KEY")),
        render(
            "server.bind_address",
            &config.server.bind_address,
            source("server.bind_address", "TABLY_SERVER_BIND_ADDRESS"),
        ),
        render(
            "server.port",
            &config.server.port.to_string(),
            source("server.port", "TABLY_SERVER_PORT"),
        ),
        render(
            "resolver.high_threshold",
            &config.resolver.high_threshold.to_string(),
            source("resolver.high_threshold", "TABLY_RESOLVER_HIGH_THRESHOLD"),
        ),
        render(
            "resolver.ambiguous_threshold",
            &config.resolver.ambiguous_threshold.to_string(),
            source("resolver.ambiguous_threshold", "TABLY_RESOLVER_AMBIGUOUS_THRESHOLD"),
        ),
        render(
            "session.idle_timeout_secs",
            &config.session.idle_timeout_secs.to_string(),
            source("session.idle_timeout_secs", "TABLY_SESSION_IDLE_TIMEOUT_SECS"),
        ),
        render(
            "catalog.refresh_secs",
            &config.catalog.refresh_secs.to_string(),
            source("catalog.refresh_secs", "TABLY_CATALOG_REFRESH_SECS"),
        ),
        render("logging.level", &config.logging.level, source("logging.level", "TABLY_LOG_LEVEL")),
    ];

    lines.join("\n")
}

fn render(key: &str, value: &str, source: String) -> String {
    format!("  {key} = {value}  ({source})")
}

fn field_source(
    key: &str,
    env_var: &str,
    file_doc: Option<&Value>,
    file_path: Option<&Path>,
) -> String {
    if env::var(env_var).map(|value| !value.trim().is_empty()).unwrap_or(false) {
        return format!("env {env_var}");
    }
    if let (Some(doc), Some(path)) = (file_doc, file_path) {
        if file_contains(doc, key) {
            return format!("file {}", path.display());
        }
    }
    "default".to_string()
}

fn file_contains(doc: &Value, dotted_key: &str) -> bool {
    let mut current = doc;
    for part in dotted_key.split('.') {
        match current.get(part) {
            Some(next) => current = next,
            None => return false,
        }
    }
    true
}

fn detect_config_path() -> Option<PathBuf> {
    ["tably.toml", "config/tably.toml"]
        .iter()
        .map(PathBuf::from)
        .find(|candidate| candidate.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let contents = fs::read_to_string(path?).ok()?;
    contents.parse::<Value>().ok()
}

fn redact(secret: &str) -> String {
    if secret.len() <= 4 {
        return "****".to_string();
    }
    format!("{}****", &secret[..4])
}
