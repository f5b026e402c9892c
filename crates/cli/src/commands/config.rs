use std::fs;
use std::path::Path;

use bootcamp_core::config::{read_env, resolve_config_path, AppConfig, LoadOptions};
use secrecy::ExposeSecret;
use toml::Value;

struct ConfigField {
    key_path: &'static str,
    env_keys: &'static [&'static str],
    value: String,
}

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = resolve_config_path(None);
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let fields = [
        ConfigField {
            key_path: "slack.bot_token",
            env_keys: &["BOOTCAMP_SLACK_BOT_TOKEN", "SLACK_BOT_TOKEN"],
            value: redact_token(config.slack.bot_token.expose_secret()),
        },
        ConfigField {
            key_path: "slack.signing_secret",
            env_keys: &["BOOTCAMP_SLACK_SIGNING_SECRET", "SLACK_SIGNING_SECRET"],
            value: "<redacted>".to_string(),
        },
        ConfigField {
            key_path: "slack.api_base_url",
            env_keys: &["BOOTCAMP_SLACK_API_BASE_URL"],
            value: config.slack.api_base_url.clone(),
        },
        ConfigField {
            key_path: "server.bind_address",
            env_keys: &["BOOTCAMP_SERVER_BIND_ADDRESS"],
            value: config.server.bind_address.clone(),
        },
        ConfigField {
            key_path: "server.port",
            env_keys: &["BOOTCAMP_SERVER_PORT", "PORT"],
            value: config.server.port.to_string(),
        },
        ConfigField {
            key_path: "github.repository",
            env_keys: &["BOOTCAMP_GITHUB_REPOSITORY"],
            value: config.github.repository.clone(),
        },
        ConfigField {
            key_path: "github.api_base_url",
            env_keys: &["BOOTCAMP_GITHUB_API_BASE_URL"],
            value: config.github.api_base_url.clone(),
        },
        ConfigField {
            key_path: "github.notify_channel",
            env_keys: &["BOOTCAMP_GITHUB_NOTIFY_CHANNEL"],
            value: config.github.notify_channel.clone(),
        },
        ConfigField {
            key_path: "github.webhook_secret",
            env_keys: &["BOOTCAMP_GITHUB_WEBHOOK_SECRET"],
            value: if config.github.webhook_secret.is_some() { "<redacted>" } else { "<unset>" }
                .to_string(),
        },
        ConfigField {
            key_path: "logging.level",
            env_keys: &["BOOTCAMP_LOGGING_LEVEL", "BOOTCAMP_LOG_LEVEL"],
            value: config.logging.level.clone(),
        },
        ConfigField {
            key_path: "logging.format",
            env_keys: &["BOOTCAMP_LOGGING_FORMAT", "BOOTCAMP_LOG_FORMAT"],
            value: format!("{:?}", config.logging.format),
        },
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for field in &fields {
        lines.push(render_line(
            field.key_path,
            &field.value,
            field_source(
                field.key_path,
                field.env_keys,
                config_file_doc.as_ref(),
                config_file_path.as_deref(),
            ),
        ));
    }

    lines.join("\n")
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
    if let Some(env_key) = env_keys.iter().find(|key| read_env(key).is_some()) {
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

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

fn redact_token(token: &str) -> String {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    if let Some((prefix, _)) = trimmed.split_once('-') {
        return format!("{prefix}-***");
    }

    "<redacted>".to_string()
}
