use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use boardwatch_core::config::{AppConfig, LoadOptions};
use toml::Value;

struct ConfigField {
    key_path: &'static str,
    env_keys: &'static [&'static str],
    value: String,
}

pub fn run(options: LoadOptions) -> String {
    let config_file_path = detect_config_path(options.config_path.as_deref());
    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for field in fields(&config) {
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

fn fields(config: &AppConfig) -> Vec<ConfigField> {
    vec![
        ConfigField {
            key_path: "database.url",
            env_keys: &["BOARDWATCH_DATABASE_URL"],
            value: config.database.url.clone(),
        },
        ConfigField {
            key_path: "database.max_connections",
            env_keys: &["BOARDWATCH_DATABASE_MAX_CONNECTIONS"],
            value: config.database.max_connections.to_string(),
        },
        ConfigField {
            key_path: "database.timeout_secs",
            env_keys: &["BOARDWATCH_DATABASE_TIMEOUT_SECS"],
            value: config.database.timeout_secs.to_string(),
        },
        ConfigField {
            key_path: "analysis.lookback_years",
            env_keys: &["BOARDWATCH_ANALYSIS_LOOKBACK_YEARS"],
            value: config.analysis.lookback_years.to_string(),
        },
        ConfigField {
            key_path: "analysis.board_majority_threshold",
            env_keys: &["BOARDWATCH_ANALYSIS_BOARD_MAJORITY_THRESHOLD"],
            value: config.analysis.board_majority_threshold.to_string(),
        },
        ConfigField {
            key_path: "analysis.independence_threshold",
            env_keys: &["BOARDWATCH_ANALYSIS_INDEPENDENCE_THRESHOLD"],
            value: config.analysis.independence_threshold.to_string(),
        },
        ConfigField {
            key_path: "analysis.max_organizations",
            env_keys: &["BOARDWATCH_ANALYSIS_MAX_ORGANIZATIONS"],
            value: config.analysis.max_organizations.to_string(),
        },
        ConfigField {
            key_path: "logging.level",
            env_keys: &["BOARDWATCH_LOGGING_LEVEL", "BOARDWATCH_LOG_LEVEL"],
            value: config.logging.level.clone(),
        },
        ConfigField {
            key_path: "logging.format",
            env_keys: &["BOARDWATCH_LOGGING_FORMAT", "BOARDWATCH_LOG_FORMAT"],
            value: format!("{:?}", config.logging.format),
        },
    ]
}

fn detect_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return path.exists().then(|| path.to_path_buf());
    }

    let root = PathBuf::from("boardwatch.toml");
    if root.exists() {
        return Some(root);
    }

    let nested = PathBuf::from("config/boardwatch.toml");
    if nested.exists() {
        return Some(nested);
    }

    None
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

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}
