//! Configuration types for the titlecast bridge.
//!
//! The daemon reads `titlecast.toml` into [`BridgeConfig`], applies
//! environment overrides, and validates it once at startup. The validated
//! struct is immutable afterwards and handed to each component's constructor.

use serde::{Deserialize, Serialize};

/// Canonical config file name.
pub const CONFIG_FILE_NAME: &str = "titlecast.toml";

/// Env var overriding `presence.client_id`.
pub const ENV_CLIENT_ID: &str = "TITLECAST_CLIENT_ID";
/// Env var overriding `console.ip`.
pub const ENV_CONSOLE_IP: &str = "TITLECAST_CONSOLE_IP";

/// Port the console's status service listens on.
pub const DEFAULT_CONSOLE_PORT: u16 = 8000;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config not found at {0}; run with --setup to create it")]
    Missing(String),

    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Top-level bridge configuration (persisted as `titlecast.toml`).
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct BridgeConfig {
    #[serde(default)]
    pub presence: PresenceSettings,
    #[serde(default)]
    pub console: ConsoleSettings,
    #[serde(default)]
    pub feed: FeedSettings,
    #[serde(default)]
    pub lookup: LookupSettings,
    #[serde(default)]
    pub cache: CacheSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PresenceSettings {
    /// Discord application id.
    #[serde(default)]
    pub client_id: String,
    #[serde(default = "default_false")]
    pub buttons_enabled: bool,
    #[serde(default = "default_retry_delay")]
    pub retry_delay_secs: u64,
    #[serde(default = "default_handshake_timeout")]
    pub handshake_timeout_secs: u64,
}

impl Default for PresenceSettings {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            buttons_enabled: false,
            retry_delay_secs: default_retry_delay(),
            handshake_timeout_secs: default_handshake_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConsoleSettings {
    #[serde(default)]
    pub ip: String,
    #[serde(default = "default_console_port")]
    pub port: u16,
}

impl Default for ConsoleSettings {
    fn default() -> Self {
        Self {
            ip: String::new(),
            port: DEFAULT_CONSOLE_PORT,
        }
    }
}

impl ConsoleSettings {
    pub fn address(&self) -> String {
        format!("{}:{}", self.ip, self.port)
    }
}

/// Status feed timing. Staleness window = `poll_interval_secs * max_empty_polls`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeedSettings {
    #[serde(default = "default_retry_delay")]
    pub retry_delay_secs: u64,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_max_empty_polls")]
    pub max_empty_polls: u32,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            retry_delay_secs: default_retry_delay(),
            poll_interval_secs: default_poll_interval(),
            max_empty_polls: default_max_empty_polls(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LookupSettings {
    #[serde(default = "default_orbis_url")]
    pub orbis_url: String,
    #[serde(default = "default_orbis_site")]
    pub orbis_site: String,
    #[serde(default = "default_prospero_url")]
    pub prospero_url: String,
    #[serde(default = "default_prospero_site")]
    pub prospero_site: String,
    #[serde(default = "default_homebrew_url")]
    pub homebrew_url: String,
    #[serde(default = "default_image_proxy")]
    pub image_proxy: String,
    /// Remote snapshot used to seed an empty title cache. Empty disables seeding.
    #[serde(default = "default_seed_url")]
    pub seed_url: String,
    #[serde(default = "default_lookup_timeout")]
    pub timeout_secs: u64,
}

impl Default for LookupSettings {
    fn default() -> Self {
        Self {
            orbis_url: default_orbis_url(),
            orbis_site: default_orbis_site(),
            prospero_url: default_prospero_url(),
            prospero_site: default_prospero_site(),
            homebrew_url: default_homebrew_url(),
            image_proxy: default_image_proxy(),
            seed_url: default_seed_url(),
            timeout_secs: default_lookup_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct CacheSettings {
    /// Explicit cache document path; empty means the platform data dir.
    #[serde(default)]
    pub path: String,
}

// ── Serde default functions ─────────────────────────────────────────────

fn default_false() -> bool {
    false
}
fn default_retry_delay() -> u64 {
    5
}
fn default_handshake_timeout() -> u64 {
    10
}
fn default_console_port() -> u16 {
    DEFAULT_CONSOLE_PORT
}
fn default_poll_interval() -> u64 {
    5
}
fn default_max_empty_polls() -> u32 {
    6
}
fn default_connect_timeout() -> u64 {
    5
}
fn default_orbis_url() -> String {
    "https://orbispatches.com/api/lookup".to_string()
}
fn default_orbis_site() -> String {
    "https://orbispatches.com".to_string()
}
fn default_prospero_url() -> String {
    "https://prosperopatches.com/api/lookup".to_string()
}
fn default_prospero_site() -> String {
    "https://prosperopatches.com".to_string()
}
fn default_homebrew_url() -> String {
    "https://api.pkg-zone.com/search".to_string()
}
fn default_image_proxy() -> String {
    "https://images.weserv.nl/".to_string()
}
fn default_seed_url() -> String {
    "https://raw.githubusercontent.com/jeroendev-one/ps5-rpc-client/main/game_info.json"
        .to_string()
}
fn default_lookup_timeout() -> u64 {
    10
}

impl BridgeConfig {
    /// Parse TOML text. Does not validate.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Apply environment overrides using `get` as the variable source.
    /// Returns true when any field was updated.
    pub fn apply_env_overrides(&mut self, get: impl Fn(&str) -> Option<String>) -> bool {
        let mut changed = false;
        if let Some(id) = get(ENV_CLIENT_ID).filter(|v| !v.trim().is_empty()) {
            self.presence.client_id = id.trim().to_string();
            changed = true;
        }
        if let Some(ip) = get(ENV_CONSOLE_IP).filter(|v| !v.trim().is_empty()) {
            self.console.ip = ip.trim().to_string();
            changed = true;
        }
        changed
    }

    /// Discord application id as the numeric form the IPC layer expects.
    pub fn application_id(&self) -> Result<i64, ConfigError> {
        let raw = self.presence.client_id.trim();
        if raw.is_empty() {
            return Err(ConfigError::Invalid("presence.client_id is empty".into()));
        }
        raw.parse::<i64>()
            .ok()
            .filter(|id| *id > 0)
            .ok_or_else(|| {
                ConfigError::Invalid(format!("presence.client_id is not a numeric id: {raw}"))
            })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.application_id()?;
        if self.console.ip.trim().is_empty() {
            return Err(ConfigError::Invalid("console.ip is empty".into()));
        }
        if self.console.port == 0 {
            return Err(ConfigError::Invalid("console.port must be non-zero".into()));
        }
        let intervals = [
            ("feed.retry_delay_secs", self.feed.retry_delay_secs),
            ("feed.poll_interval_secs", self.feed.poll_interval_secs),
            ("feed.connect_timeout_secs", self.feed.connect_timeout_secs),
            ("presence.retry_delay_secs", self.presence.retry_delay_secs),
            (
                "presence.handshake_timeout_secs",
                self.presence.handshake_timeout_secs,
            ),
            ("lookup.timeout_secs", self.lookup.timeout_secs),
        ];
        if let Some((name, _)) = intervals.iter().find(|(_, value)| *value == 0) {
            return Err(ConfigError::Invalid(format!("{name} must be non-zero")));
        }
        if self.feed.max_empty_polls == 0 {
            return Err(ConfigError::Invalid(
                "feed.max_empty_polls must be non-zero".into(),
            ));
        }
        Ok(())
    }
}
