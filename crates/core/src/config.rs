use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::governance::classifier::ClassifierSettings;
use crate::governance::AnalysisSettings;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub analysis: AnalysisConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AnalysisConfig {
    pub lookback_years: u32,
    pub board_majority_threshold: f64,
    pub independence_threshold: f64,
    pub max_organizations: usize,
}

impl AnalysisConfig {
    pub fn settings(&self) -> AnalysisSettings {
        AnalysisSettings {
            classifier: ClassifierSettings {
                lookback_years: self.lookback_years,
                board_majority_threshold: self.board_majority_threshold,
                independence_threshold: self.independence_threshold,
            },
            max_organizations: self.max_organizations,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub lookback_years: Option<u32>,
    pub max_organizations: Option<usize>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        let analysis = AnalysisSettings::default();
        Self {
            database: DatabaseConfig {
                url: "sqlite://boardwatch.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            analysis: AnalysisConfig {
                lookback_years: analysis.classifier.lookback_years,
                board_majority_threshold: analysis.classifier.board_majority_threshold,
                independence_threshold: analysis.classifier.independence_threshold,
                max_organizations: analysis.max_organizations,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("boardwatch.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(analysis) = patch.analysis {
            if let Some(lookback_years) = analysis.lookback_years {
                self.analysis.lookback_years = lookback_years;
            }
            if let Some(threshold) = analysis.board_majority_threshold {
                self.analysis.board_majority_threshold = threshold;
            }
            if let Some(threshold) = analysis.independence_threshold {
                self.analysis.independence_threshold = threshold;
            }
            if let Some(max_organizations) = analysis.max_organizations {
                self.analysis.max_organizations = max_organizations;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("BOARDWATCH_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("BOARDWATCH_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections =
                parse_u32("BOARDWATCH_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("BOARDWATCH_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("BOARDWATCH_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("BOARDWATCH_ANALYSIS_LOOKBACK_YEARS") {
            self.analysis.lookback_years = parse_u32("BOARDWATCH_ANALYSIS_LOOKBACK_YEARS", &value)?;
        }
        if let Some(value) = read_env("BOARDWATCH_ANALYSIS_BOARD_MAJORITY_THRESHOLD") {
            self.analysis.board_majority_threshold =
                parse_f64("BOARDWATCH_ANALYSIS_BOARD_MAJORITY_THRESHOLD", &value)?;
        }
        if let Some(value) = read_env("BOARDWATCH_ANALYSIS_INDEPENDENCE_THRESHOLD") {
            self.analysis.independence_threshold =
                parse_f64("BOARDWATCH_ANALYSIS_INDEPENDENCE_THRESHOLD", &value)?;
        }
        if let Some(value) = read_env("BOARDWATCH_ANALYSIS_MAX_ORGANIZATIONS") {
            self.analysis.max_organizations =
                parse_usize("BOARDWATCH_ANALYSIS_MAX_ORGANIZATIONS", &value)?;
        }

        let log_level =
            read_env("BOARDWATCH_LOGGING_LEVEL").or_else(|| read_env("BOARDWATCH_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("BOARDWATCH_LOGGING_FORMAT").or_else(|| read_env("BOARDWATCH_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(lookback_years) = overrides.lookback_years {
            self.analysis.lookback_years = lookback_years;
        }
        if let Some(max_organizations) = overrides.max_organizations {
            self.analysis.max_organizations = max_organizations;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_analysis(&self.analysis)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("boardwatch.toml"), PathBuf::from("config/boardwatch.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_analysis(analysis: &AnalysisConfig) -> Result<(), ConfigError> {
    if analysis.lookback_years == 0 || analysis.lookback_years > 50 {
        return Err(ConfigError::Validation(
            "analysis.lookback_years must be in range 1..=50".to_string(),
        ));
    }

    for (key, value) in [
        ("analysis.board_majority_threshold", analysis.board_majority_threshold),
        ("analysis.independence_threshold", analysis.independence_threshold),
    ] {
        if !value.is_finite() || !(0.0..1.0).contains(&value) {
            return Err(ConfigError::Validation(format!("{key} must be a ratio in range 0.0..1.0")));
        }
    }

    if analysis.max_organizations == 0 {
        return Err(ConfigError::Validation(
            "analysis.max_organizations must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn invalid_override(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidEnvOverride { key: key.to_string(), value: value.to_string() }
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.trim().parse::<u32>().map_err(|_| invalid_override(key, value))
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.trim().parse::<u64>().map_err(|_| invalid_override(key, value))
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.trim().parse::<usize>().map_err(|_| invalid_override(key, value))
}

fn parse_f64(key: &str, value: &str) -> Result<f64, ConfigError> {
    value.trim().parse::<f64>().map_err(|_| invalid_override(key, value))
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    analysis: Option<AnalysisPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct AnalysisPatch {
    lookback_years: Option<u32>,
    board_majority_threshold: Option<f64>,
    independence_threshold: Option<f64>,
    max_organizations: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::sync::{Mutex, OnceLock};

    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn defaults_match_governance_rule_constants() -> Result<(), String> {
        let config = AppConfig::default();
        let settings = config.analysis.settings();

        ensure(settings.classifier.lookback_years == 5, "lookback should default to five years")?;
        ensure(
            settings.classifier.board_majority_threshold == 0.5,
            "board majority threshold should default to one half",
        )?;
        ensure(
            settings.classifier.independence_threshold == 0.49,
            "independence threshold should default to 0.49",
        )?;
        ensure(
            settings.max_organizations == 2000,
            "organization guardrail should default to 2000",
        )?;
        ensure(config.validate().is_ok(), "defaults should validate")
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_BOARDWATCH_DB", "sqlite://interpolated.db");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("boardwatch.toml");
            fs::write(
                &path,
                r#"
[database]
url = "${TEST_BOARDWATCH_DB}"

[analysis]
lookback_years = 3
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.database.url == "sqlite://interpolated.db",
                "database url should be interpolated from environment",
            )?;
            ensure(config.analysis.lookback_years == 3, "lookback should be read from file")?;
            Ok(())
        })();

        clear_vars(&["TEST_BOARDWATCH_DB"]);
        result
    }

    #[test]
    fn missing_interpolation_variable_is_reported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(&["TEST_BOARDWATCH_UNSET"]);

        let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
        let path = dir.path().join("boardwatch.toml");
        fs::write(&path, "[database]\nurl = \"${TEST_BOARDWATCH_UNSET}\"\n")
            .map_err(|err| err.to_string())?;

        let outcome =
            AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() });
        ensure(
            matches!(
                outcome,
                Err(ConfigError::MissingEnvInterpolation { ref var })
                    if var == "TEST_BOARDWATCH_UNSET"
            ),
            "missing interpolation variable should be named in the error",
        )
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("BOARDWATCH_LOG_LEVEL", "warn");
        env::set_var("BOARDWATCH_LOG_FORMAT", "json");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "warn", "warning log level should be set from env var")?;
            ensure(
                matches!(config.logging.format, LogFormat::Json),
                "json logging format should be set from env var",
            )?;
            Ok(())
        })();

        clear_vars(&["BOARDWATCH_LOG_LEVEL", "BOARDWATCH_LOG_FORMAT"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("BOARDWATCH_DATABASE_URL", "sqlite://from-env.db");
        env::set_var("BOARDWATCH_ANALYSIS_INDEPENDENCE_THRESHOLD", "0.4");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("boardwatch.toml");
            fs::write(
                &path,
                r#"
[database]
url = "sqlite://from-file.db"

[analysis]
independence_threshold = 0.3
max_organizations = 50

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    database_url: Some("sqlite://from-override.db".to_string()),
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.database.url == "sqlite://from-override.db",
                "override database url should win",
            )?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")?;
            ensure(
                config.analysis.independence_threshold == 0.4,
                "env threshold should win over file and defaults",
            )?;
            ensure(
                config.analysis.max_organizations == 50,
                "file guardrail should win over default",
            )?;
            Ok(())
        })();

        clear_vars(&["BOARDWATCH_DATABASE_URL", "BOARDWATCH_ANALYSIS_INDEPENDENCE_THRESHOLD"]);
        result
    }

    #[test]
    fn validation_fails_fast_with_actionable_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("BOARDWATCH_ANALYSIS_BOARD_MAJORITY_THRESHOLD", "1.5");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message)
                    if message.contains("analysis.board_majority_threshold")
            );
            ensure(has_message, "validation failure should name the threshold key")
        })();

        clear_vars(&["BOARDWATCH_ANALYSIS_BOARD_MAJORITY_THRESHOLD"]);
        result
    }

    #[test]
    fn malformed_numeric_env_override_is_rejected() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("BOARDWATCH_ANALYSIS_MAX_ORGANIZATIONS", "many");

        let result = (|| -> Result<(), String> {
            let outcome = AppConfig::load(LoadOptions::default());
            ensure(
                matches!(
                    outcome,
                    Err(ConfigError::InvalidEnvOverride { ref key, .. })
                        if key == "BOARDWATCH_ANALYSIS_MAX_ORGANIZATIONS"
                ),
                "malformed guardrail should be rejected with its key",
            )
        })();

        clear_vars(&["BOARDWATCH_ANALYSIS_MAX_ORGANIZATIONS"]);
        result
    }

    #[test]
    fn required_file_must_exist() -> Result<(), String> {
        let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
        let path = dir.path().join("absent.toml");

        let outcome = AppConfig::load(LoadOptions {
            config_path: Some(path.clone()),
            require_file: true,
            ..LoadOptions::default()
        });
        ensure(
            matches!(outcome, Err(ConfigError::MissingConfigFile(ref missing)) if *missing == path),
            "missing required file should be reported",
        )
    }
}
