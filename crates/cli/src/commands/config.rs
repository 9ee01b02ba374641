use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use leadquote_core::config::{AppConfig, LoadOptions};
use secrecy::ExposeSecret;
use serde_json::json;
use toml::Value;

use crate::commands::CommandResult;

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "config",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let enum_schema_path = config
        .schema
        .enum_schema_path
        .as_deref()
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| "<bundled>".to_string());

    let fields: [(&str, String, &[&str]); 14] = [
        ("database.url", config.database.url.clone(), &["LEADQUOTE_DATABASE_URL"]),
        (
            "database.max_connections",
            config.database.max_connections.to_string(),
            &["LEADQUOTE_DATABASE_MAX_CONNECTIONS"],
        ),
        (
            "database.timeout_secs",
            config.database.timeout_secs.to_string(),
            &["LEADQUOTE_DATABASE_TIMEOUT_SECS"],
        ),
        (
            "server.bind_address",
            config.server.bind_address.clone(),
            &["LEADQUOTE_SERVER_BIND_ADDRESS"],
        ),
        ("server.port", config.server.port.to_string(), &["LEADQUOTE_SERVER_PORT"]),
        (
            "server.graceful_shutdown_secs",
            config.server.graceful_shutdown_secs.to_string(),
            &["LEADQUOTE_SERVER_GRACEFUL_SHUTDOWN_SECS"],
        ),
        (
            "crm.hubspot_access_token",
            redact_token(config.crm.hubspot_access_token.expose_secret()),
            &["LEADQUOTE_CRM_HUBSPOT_ACCESS_TOKEN", "HUBSPOT_ACCESS_TOKEN"],
        ),
        ("crm.base_url", config.crm.base_url.clone(), &["LEADQUOTE_CRM_BASE_URL"]),
        ("crm.timeout_secs", config.crm.timeout_secs.to_string(), &["LEADQUOTE_CRM_TIMEOUT_SECS"]),
        ("schema.version", config.schema.version.clone(), &["LEADQUOTE_SCHEMA_VERSION"]),
        ("schema.enum_schema_path", enum_schema_path, &["LEADQUOTE_SCHEMA_ENUM_SCHEMA_PATH"]),
        (
            "logging.level",
            config.logging.level.clone(),
            &["LEADQUOTE_LOGGING_LEVEL", "LEADQUOTE_LOG_LEVEL"],
        ),
        (
            "logging.format",
            config.logging.format.as_str().to_string(),
            &["LEADQUOTE_LOGGING_FORMAT", "LEADQUOTE_LOG_FORMAT"],
        ),
        ("config.file", config_file_label(config_file_path.as_deref()), &[]),
    ];

    let entries: Vec<serde_json::Value> = fields
        .into_iter()
        .map(|(key, value, env_keys)| {
            let source =
                field_source(key, env_keys, config_file_doc.as_ref(), config_file_path.as_deref());
            json!({ "key": key, "value": value, "source": source })
        })
        .collect();

    CommandResult::success_with_data(
        "config",
        "effective config (source precedence: env > file > default)",
        Some(json!(entries)),
    )
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("leadquote.toml"), PathBuf::from("config/leadquote.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn config_file_label(path: Option<&Path>) -> String {
    path.map(|path| path.display().to_string()).unwrap_or_else(|| "<none>".to_string())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

/// HubSpot private-app tokens look like `pat-na1-<uuid>`; only the region prefix is kept.
pub(crate) fn redact_token(token: &str) -> String {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    let mut segments = trimmed.split('-');
    match (segments.next(), segments.next(), segments.next()) {
        (Some(kind), Some(region), Some(_)) => format!("{kind}-{region}-***"),
        _ => "<redacted>".to_string(),
    }
}
