use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub store: StoreConfig,
    pub llm: LlmConfig,
    pub sms: SmsConfig,
    pub catalog: CatalogConfig,
    pub server: ServerConfig,
    pub sessions: SessionsConfig,
    pub dialogue: DialogueConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct StoreConfig {
    pub name: String,
}

/// Remote text-extraction service (OpenAI-compatible chat completions).
#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub base_url: String,
    pub api_key: Option<SecretString>,
    pub model: String,
    pub timeout_secs: u64,
}

/// Outbound SMS transport and the two fixed recipient roles. Disabled by
/// default so a development instance runs without credentials.
#[derive(Clone, Debug)]
pub struct SmsConfig {
    pub enabled: bool,
    pub api_base_url: String,
    pub account_sid: String,
    pub auth_token: Option<SecretString>,
    pub from_number: String,
    pub customer_number: String,
    pub owner_number: String,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct CatalogConfig {
    pub path: PathBuf,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
}

#[derive(Clone, Debug)]
pub struct SessionsConfig {
    pub ttl_secs: u64,
    pub sweep_interval_secs: u64,
}

#[derive(Clone, Debug)]
pub struct DialogueConfig {
    pub max_reasks: u8,
}

#[derive(Clone, Debug)]
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
    pub store_name: Option<String>,
    pub llm_base_url: Option<String>,
    pub llm_api_key: Option<String>,
    pub llm_model: Option<String>,
    pub sms_enabled: Option<bool>,
    pub sms_auth_token: Option<String>,
    pub catalog_path: Option<PathBuf>,
    pub server_port: Option<u16>,
    pub session_ttl_secs: Option<u64>,
    pub log_level: Option<String>,
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
        Self {
            store: StoreConfig { name: "Parag General Store".to_string() },
            llm: LlmConfig {
                base_url: "http://localhost:11434/v1".to_string(),
                api_key: None,
                model: "llama3.1".to_string(),
                timeout_secs: 30,
            },
            sms: SmsConfig {
                enabled: false,
                api_base_url: "https://api.twilio.com".to_string(),
                account_sid: String::new(),
                auth_token: None,
                from_number: String::new(),
                customer_number: String::new(),
                owner_number: String::new(),
                timeout_secs: 15,
            },
            catalog: CatalogConfig { path: PathBuf::from("catalog.toml") },
            server: ServerConfig { bind_address: "127.0.0.1".to_string(), port: 8080 },
            sessions: SessionsConfig { ttl_secs: 900, sweep_interval_secs: 60 },
            dialogue: DialogueConfig { max_reasks: 3 },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
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
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("storeline.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(store) = patch.store {
            if let Some(name) = store.name {
                self.store.name = name;
            }
        }

        if let Some(llm) = patch.llm {
            if let Some(base_url) = llm.base_url {
                self.llm.base_url = base_url;
            }
            if let Some(llm_api_key_value) = llm.api_key {
                self.llm.api_key = Some(secret_value(llm_api_key_value));
            }
            if let Some(model) = llm.model {
                self.llm.model = model;
            }
            if let Some(timeout_secs) = llm.timeout_secs {
                self.llm.timeout_secs = timeout_secs;
            }
        }

        if let Some(sms) = patch.sms {
            if let Some(enabled) = sms.enabled {
                self.sms.enabled = enabled;
            }
            if let Some(api_base_url) = sms.api_base_url {
                self.sms.api_base_url = api_base_url;
            }
            if let Some(account_sid) = sms.account_sid {
                self.sms.account_sid = account_sid;
            }
            if let Some(sms_auth_token_value) = sms.auth_token {
                self.sms.auth_token = Some(secret_value(sms_auth_token_value));
            }
            if let Some(from_number) = sms.from_number {
                self.sms.from_number = from_number;
            }
            if let Some(customer_number) = sms.customer_number {
                self.sms.customer_number = customer_number;
            }
            if let Some(owner_number) = sms.owner_number {
                self.sms.owner_number = owner_number;
            }
            if let Some(timeout_secs) = sms.timeout_secs {
                self.sms.timeout_secs = timeout_secs;
            }
        }

        if let Some(catalog) = patch.catalog {
            if let Some(path) = catalog.path {
                self.catalog.path = path;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
        }

        if let Some(sessions) = patch.sessions {
            if let Some(ttl_secs) = sessions.ttl_secs {
                self.sessions.ttl_secs = ttl_secs;
            }
            if let Some(sweep_interval_secs) = sessions.sweep_interval_secs {
                self.sessions.sweep_interval_secs = sweep_interval_secs;
            }
        }

        if let Some(dialogue) = patch.dialogue {
            if let Some(max_reasks) = dialogue.max_reasks {
                self.dialogue.max_reasks = max_reasks;
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
        if let Some(value) = read_env("STORELINE_STORE_NAME") {
            self.store.name = value;
        }

        if let Some(value) = read_env("STORELINE_LLM_BASE_URL") {
            self.llm.base_url = value;
        }
        if let Some(value) = read_env("STORELINE_LLM_API_KEY") {
            self.llm.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("STORELINE_LLM_MODEL") {
            self.llm.model = value;
        }
        if let Some(value) = read_env("STORELINE_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_u64("STORELINE_LLM_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("STORELINE_SMS_ENABLED") {
            self.sms.enabled = parse_bool("STORELINE_SMS_ENABLED", &value)?;
        }
        if let Some(value) = read_env("STORELINE_SMS_API_BASE_URL") {
            self.sms.api_base_url = value;
        }
        if let Some(value) = read_env("STORELINE_SMS_ACCOUNT_SID") {
            self.sms.account_sid = value;
        }
        if let Some(value) = read_env("STORELINE_SMS_AUTH_TOKEN") {
            self.sms.auth_token = Some(secret_value(value));
        }
        if let Some(value) = read_env("STORELINE_SMS_FROM_NUMBER") {
            self.sms.from_number = value;
        }
        if let Some(value) = read_env("STORELINE_SMS_CUSTOMER_NUMBER") {
            self.sms.customer_number = value;
        }
        if let Some(value) = read_env("STORELINE_SMS_OWNER_NUMBER") {
            self.sms.owner_number = value;
        }
        if let Some(value) = read_env("STORELINE_SMS_TIMEOUT_SECS") {
            self.sms.timeout_secs = parse_u64("STORELINE_SMS_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("STORELINE_CATALOG_PATH") {
            self.catalog.path = PathBuf::from(value);
        }

        if let Some(value) = read_env("STORELINE_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("STORELINE_SERVER_PORT") {
            self.server.port = parse_u16("STORELINE_SERVER_PORT", &value)?;
        }

        if let Some(value) = read_env("STORELINE_SESSIONS_TTL_SECS") {
            self.sessions.ttl_secs = parse_u64("STORELINE_SESSIONS_TTL_SECS", &value)?;
        }
        if let Some(value) = read_env("STORELINE_SESSIONS_SWEEP_INTERVAL_SECS") {
            self.sessions.sweep_interval_secs =
                parse_u64("STORELINE_SESSIONS_SWEEP_INTERVAL_SECS", &value)?;
        }

        if let Some(value) = read_env("STORELINE_DIALOGUE_MAX_REASKS") {
            self.dialogue.max_reasks = parse_u8("STORELINE_DIALOGUE_MAX_REASKS", &value)?;
        }

        let log_level =
            read_env("STORELINE_LOGGING_LEVEL").or_else(|| read_env("STORELINE_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("STORELINE_LOGGING_FORMAT").or_else(|| read_env("STORELINE_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(store_name) = overrides.store_name {
            self.store.name = store_name;
        }
        if let Some(llm_base_url) = overrides.llm_base_url {
            self.llm.base_url = llm_base_url;
        }
        if let Some(llm_api_key) = overrides.llm_api_key {
            self.llm.api_key = Some(secret_value(llm_api_key));
        }
        if let Some(llm_model) = overrides.llm_model {
            self.llm.model = llm_model;
        }
        if let Some(sms_enabled) = overrides.sms_enabled {
            self.sms.enabled = sms_enabled;
        }
        if let Some(sms_auth_token) = overrides.sms_auth_token {
            self.sms.auth_token = Some(secret_value(sms_auth_token));
        }
        if let Some(catalog_path) = overrides.catalog_path {
            self.catalog.path = catalog_path;
        }
        if let Some(server_port) = overrides.server_port {
            self.server.port = server_port;
        }
        if let Some(session_ttl_secs) = overrides.session_ttl_secs {
            self.sessions.ttl_secs = session_ttl_secs;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_store(&self.store)?;
        validate_llm(&self.llm)?;
        validate_sms(&self.sms)?;
        validate_server(&self.server)?;
        validate_sessions(&self.sessions)?;
        validate_dialogue(&self.dialogue)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("storeline.toml"), PathBuf::from("config/storeline.toml")]
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

fn validate_store(store: &StoreConfig) -> Result<(), ConfigError> {
    if store.name.trim().is_empty() {
        return Err(ConfigError::Validation("store.name must not be empty".to_string()));
    }
    Ok(())
}

fn validate_llm(llm: &LlmConfig) -> Result<(), ConfigError> {
    if !llm.base_url.starts_with("http://") && !llm.base_url.starts_with("https://") {
        return Err(ConfigError::Validation(
            "llm.base_url must start with http:// or https://".to_string(),
        ));
    }

    if llm.timeout_secs == 0 || llm.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "llm.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    if llm.model.trim().is_empty() {
        return Err(ConfigError::Validation("llm.model must not be empty".to_string()));
    }

    Ok(())
}

fn validate_sms(sms: &SmsConfig) -> Result<(), ConfigError> {
    if sms.timeout_secs == 0 || sms.timeout_secs > 120 {
        return Err(ConfigError::Validation(
            "sms.timeout_secs must be in range 1..=120".to_string(),
        ));
    }

    if !sms.enabled {
        return Ok(());
    }

    if sms.account_sid.trim().is_empty() {
        return Err(ConfigError::Validation(
            "sms.account_sid is required when sms.enabled is true".to_string(),
        ));
    }
    let token_missing = sms
        .auth_token
        .as_ref()
        .map(|value| value.expose_secret().trim().is_empty())
        .unwrap_or(true);
    if token_missing {
        return Err(ConfigError::Validation(
            "sms.auth_token is required when sms.enabled is true".to_string(),
        ));
    }

    for (key, number) in [
        ("sms.from_number", &sms.from_number),
        ("sms.customer_number", &sms.customer_number),
        ("sms.owner_number", &sms.owner_number),
    ] {
        if !number.starts_with('+') || number.len() < 8 {
            return Err(ConfigError::Validation(format!(
                "{key} must be an E.164 phone number (e.g. +14155550100)"
            )));
        }
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.bind_address.trim().is_empty() {
        return Err(ConfigError::Validation("server.bind_address must not be empty".to_string()));
    }
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }
    Ok(())
}

fn validate_sessions(sessions: &SessionsConfig) -> Result<(), ConfigError> {
    if sessions.ttl_secs == 0 {
        return Err(ConfigError::Validation(
            "sessions.ttl_secs must be greater than zero".to_string(),
        ));
    }
    if sessions.sweep_interval_secs == 0 {
        return Err(ConfigError::Validation(
            "sessions.sweep_interval_secs must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

fn validate_dialogue(dialogue: &DialogueConfig) -> Result<(), ConfigError> {
    if dialogue.max_reasks == 0 {
        return Err(ConfigError::Validation(
            "dialogue.max_reasks must be greater than zero".to_string(),
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

fn parse_u8(key: &str, value: &str) -> Result<u8, ConfigError> {
    value.parse::<u8>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.parse::<bool>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    store: Option<StorePatch>,
    llm: Option<LlmPatch>,
    sms: Option<SmsPatch>,
    catalog: Option<CatalogPatch>,
    server: Option<ServerPatch>,
    sessions: Option<SessionsPatch>,
    dialogue: Option<DialoguePatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct StorePatch {
    name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    base_url: Option<String>,
    api_key: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct SmsPatch {
    enabled: Option<bool>,
    api_base_url: Option<String>,
    account_sid: Option<String>,
    auth_token: Option<String>,
    from_number: Option<String>,
    customer_number: Option<String>,
    owner_number: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct CatalogPatch {
    path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Default, Deserialize)]
struct SessionsPatch {
    ttl_secs: Option<u64>,
    sweep_interval_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct DialoguePatch {
    max_reasks: Option<u8>,
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

    use secrecy::ExposeSecret;
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
    fn defaults_validate_without_any_configuration() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let config = AppConfig::load(LoadOptions::default())
            .map_err(|err| format!("config load failed: {err}"))?;

        ensure(!config.sms.enabled, "sms should default to disabled")?;
        ensure(config.sessions.ttl_secs == 900, "session ttl should default to 15 minutes")?;
        ensure(config.dialogue.max_reasks == 3, "reask cap should default to 3")?;
        Ok(())
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_STORELINE_LLM_KEY", "sk-from-env");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("storeline.toml");
            fs::write(
                &path,
                r#"
[llm]
api_key = "${TEST_STORELINE_LLM_KEY}"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.llm.api_key.as_ref().map(|key| key.expose_secret() == "sk-from-env")
                    == Some(true),
                "api key should be loaded from environment",
            )?;
            Ok(())
        })();

        clear_vars(&["TEST_STORELINE_LLM_KEY"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("STORELINE_LLM_MODEL", "model-from-env");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("storeline.toml");
            fs::write(
                &path,
                r#"
[store]
name = "Store From File"

[llm]
model = "model-from-file"

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.store.name == "Store From File", "file store name should apply")?;
            ensure(config.llm.model == "model-from-env", "env model should win over file")?;
            ensure(config.logging.level == "debug", "programmatic log level should win")?;
            Ok(())
        })();

        clear_vars(&["STORELINE_LLM_MODEL"]);
        result
    }

    #[test]
    fn enabled_sms_without_credentials_fails_validation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("STORELINE_SMS_ENABLED", "true");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("sms.account_sid")
            );
            ensure(has_message, "validation failure should mention sms.account_sid")
        })();

        clear_vars(&["STORELINE_SMS_ENABLED"]);
        result
    }

    #[test]
    fn recipient_numbers_must_be_e164() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("STORELINE_SMS_ENABLED", "true");
        env::set_var("STORELINE_SMS_ACCOUNT_SID", "AC-test");
        env::set_var("STORELINE_SMS_AUTH_TOKEN", "token-test");
        env::set_var("STORELINE_SMS_FROM_NUMBER", "5550100");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => return Err("expected validation failure".to_string()),
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("sms.from_number")
            );
            ensure(has_message, "validation failure should mention sms.from_number")
        })();

        clear_vars(&[
            "STORELINE_SMS_ENABLED",
            "STORELINE_SMS_ACCOUNT_SID",
            "STORELINE_SMS_AUTH_TOKEN",
            "STORELINE_SMS_FROM_NUMBER",
        ]);
        result
    }

    #[test]
    fn secret_values_are_not_leaked_by_debug() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("STORELINE_LLM_API_KEY", "sk-secret-value");
        env::set_var("STORELINE_SMS_AUTH_TOKEN", "tok-secret-value");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;
            let debug = format!("{config:?}");

            ensure(!debug.contains("sk-secret-value"), "debug output should not contain api key")?;
            ensure(
                !debug.contains("tok-secret-value"),
                "debug output should not contain auth token",
            )?;
            ensure(
                matches!(config.logging.format, LogFormat::Compact),
                "default logging format should be compact",
            )?;
            Ok(())
        })();

        clear_vars(&["STORELINE_LLM_API_KEY", "STORELINE_SMS_AUTH_TOKEN"]);
        result
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("STORELINE_LOG_LEVEL", "warn");
        env::set_var("STORELINE_LOG_FORMAT", "pretty");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "warn", "log level should come from alias var")?;
            ensure(
                matches!(config.logging.format, LogFormat::Pretty),
                "log format should come from alias var",
            )?;
            Ok(())
        })();

        clear_vars(&["STORELINE_LOG_LEVEL", "STORELINE_LOG_FORMAT"]);
        result
    }

    #[test]
    fn invalid_numeric_env_override_is_rejected() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("STORELINE_SERVER_PORT", "not-a-port");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => return Err("expected invalid override failure".to_string()),
                Err(error) => error,
            };
            ensure(
                matches!(error, ConfigError::InvalidEnvOverride { ref key, .. } if key == "STORELINE_SERVER_PORT"),
                "error should name the offending variable",
            )
        })();

        clear_vars(&["STORELINE_SERVER_PORT"]);
        result
    }
}
