//! Server configuration loading from file and environment variables.

use holdline_call::CallSettings;
use serde::Deserialize;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;
use thiserror::Error;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Webhook listener settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Telephony provider credentials and numbers.
    #[serde(default)]
    pub telephony: TelephonyConfig,

    /// Public ingress settings.
    #[serde(default)]
    pub ingress: IngressConfig,

    /// Speech recognition and navigation settings.
    #[serde(default)]
    pub speech: SpeechConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Network configuration for the webhook listener.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Port to listen on; 0 picks a free port.
    #[serde(default)]
    pub port: u16,
}

/// Twilio credentials and the numbers involved in the call.
#[derive(Clone, Deserialize)]
pub struct TelephonyConfig {
    #[serde(default)]
    pub account_sid: String,

    #[serde(default)]
    pub auth_token: String,

    /// REST API base; override for tests or regional endpoints.
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Number calls originate from.
    #[serde(default)]
    pub from_number: String,

    /// The phone tree being navigated.
    #[serde(default)]
    pub target_number: String,

    /// Human operator the call is handed to.
    #[serde(default)]
    pub transfer_number: String,
}

impl fmt::Debug for TelephonyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelephonyConfig")
            .field("account_sid", &self.account_sid)
            .field("auth_token", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .field("from_number", &self.from_number)
            .field("target_number", &self.target_number)
            .field("transfer_number", &self.transfer_number)
            .finish()
    }
}

/// How the local listener becomes publicly reachable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IngressMode {
    /// A fixed public URL (reverse proxy, port forward).
    Static,
    /// A locally running ngrok agent.
    Ngrok,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IngressConfig {
    #[serde(default = "default_ingress_mode")]
    pub mode: IngressMode,

    /// Public base URL, required in static mode.
    #[serde(default)]
    pub public_url: String,

    /// ngrok agent API address.
    #[serde(default = "default_agent_api")]
    pub agent_api: String,
}

/// Recognition tuning and navigation vocabulary.
#[derive(Debug, Clone, Deserialize)]
pub struct SpeechConfig {
    #[serde(default = "default_language")]
    pub language: String,

    #[serde(default)]
    pub profanity_filter: bool,

    /// Phrase that signals the hold queue has been reached.
    #[serde(default = "default_keyword")]
    pub keyword: String,

    /// Phrases that trigger an immediate redial.
    #[serde(default = "default_redial_phrases")]
    pub redial_phrases: Vec<String>,

    /// Digits pressed when the phone-tree menu is reached.
    #[serde(default = "default_menu_digits")]
    pub menu_digits: String,

    /// Seconds to wait for the keyword before hanging up and redialing.
    #[serde(default = "default_keyword_timeout_secs")]
    pub keyword_timeout_secs: u64,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "holdline_call=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
}

fn default_api_base() -> String {
    "https://api.twilio.com".to_string()
}

fn default_ingress_mode() -> IngressMode {
    IngressMode::Static
}

fn default_agent_api() -> String {
    "http://127.0.0.1:4040".to_string()
}

fn default_language() -> String {
    "en-US".to_string()
}

fn default_keyword() -> String {
    "banana".to_string()
}

fn default_redial_phrases() -> Vec<String> {
    vec!["goodbye".to_string(), "please call again".to_string()]
}

fn default_menu_digits() -> String {
    "3 1 0".to_string()
}

fn default_keyword_timeout_secs() -> u64 {
    120
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: 0,
        }
    }
}

impl Default for TelephonyConfig {
    fn default() -> Self {
        Self {
            account_sid: String::new(),
            auth_token: String::new(),
            api_base: default_api_base(),
            from_number: String::new(),
            target_number: String::new(),
            transfer_number: String::new(),
        }
    }
}

impl Default for IngressConfig {
    fn default() -> Self {
        Self {
            mode: default_ingress_mode(),
            public_url: String::new(),
            agent_api: default_agent_api(),
        }
    }
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            language: default_language(),
            profanity_filter: false,
            keyword: default_keyword(),
            redial_phrases: default_redial_phrases(),
            menu_digits: default_menu_digits(),
            keyword_timeout_secs: default_keyword_timeout_secs(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Config {
    /// Maps the file-level configuration onto the call manager's settings.
    pub fn call_settings(&self) -> CallSettings {
        CallSettings {
            caller: "holdline".to_string(),
            bind_addr: (self.server.host, self.server.port).into(),
            from_number: self.telephony.from_number.clone(),
            target_number: self.telephony.target_number.clone(),
            transfer_number: self.telephony.transfer_number.clone(),
            keyword: self.speech.keyword.to_lowercase(),
            redial_phrases: self
                .speech
                .redial_phrases
                .iter()
                .map(|p| p.to_lowercase())
                .collect(),
            menu_digits: self.speech.menu_digits.clone(),
            keyword_timeout: Duration::from_secs(self.speech.keyword_timeout_secs),
            language: self.speech.language.clone(),
            profanity_filter: self.speech.profanity_filter,
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Loads configuration from a TOML file, falling back to defaults.
///
/// Environment variable overrides:
/// - `HOLDLINE_HOST` / `HOLDLINE_PORT` override `server.host` / `server.port`
/// - `HOLDLINE_ACCOUNT_SID` / `HOLDLINE_AUTH_TOKEN` override the credentials
/// - `HOLDLINE_FROM_NUMBER` / `HOLDLINE_TARGET_NUMBER` /
///   `HOLDLINE_TRANSFER_NUMBER` override the numbers
/// - `HOLDLINE_PUBLIC_URL` overrides `ingress.public_url`
/// - `HOLDLINE_KEYWORD_TIMEOUT` overrides `speech.keyword_timeout_secs`
/// - `HOLDLINE_LOG_LEVEL` / `HOLDLINE_LOG_JSON` override logging
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                Config::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => Config::default(),
    };

    // Environment variable overrides
    if let Ok(host) = std::env::var("HOLDLINE_HOST") {
        if let Ok(parsed) = host.parse() {
            config.server.host = parsed;
        }
    }
    if let Ok(port) = std::env::var("HOLDLINE_PORT") {
        if let Ok(parsed) = port.parse() {
            config.server.port = parsed;
        }
    }
    if let Ok(sid) = std::env::var("HOLDLINE_ACCOUNT_SID") {
        config.telephony.account_sid = sid;
    }
    if let Ok(token) = std::env::var("HOLDLINE_AUTH_TOKEN") {
        config.telephony.auth_token = token;
    }
    if let Ok(number) = std::env::var("HOLDLINE_FROM_NUMBER") {
        config.telephony.from_number = number;
    }
    if let Ok(number) = std::env::var("HOLDLINE_TARGET_NUMBER") {
        config.telephony.target_number = number;
    }
    if let Ok(number) = std::env::var("HOLDLINE_TRANSFER_NUMBER") {
        config.telephony.transfer_number = number;
    }
    if let Ok(url) = std::env::var("HOLDLINE_PUBLIC_URL") {
        config.ingress.public_url = url;
    }
    if let Ok(timeout) = std::env::var("HOLDLINE_KEYWORD_TIMEOUT") {
        if let Ok(parsed) = timeout.parse() {
            config.speech.keyword_timeout_secs = parsed;
        }
    }
    if let Ok(level) = std::env::var("HOLDLINE_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Ok(json) = std::env::var("HOLDLINE_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }

    Ok(config)
}
