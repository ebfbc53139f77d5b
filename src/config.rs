//! Configuration types for qualtrics-client

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Environment variable holding the account identifier
pub const USER_ENV: &str = "QUALTRICS_USER";
/// Environment variable holding the API token
pub const TOKEN_ENV: &str = "QUALTRICS_TOKEN";

/// Account credentials
///
/// The legacy API takes both values as request parameters; the export API
/// sends the token in the `X-API-TOKEN` header.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct Credentials {
    /// Account identifier (legacy `User` parameter)
    #[serde(default)]
    pub user: String,

    /// Secret API token
    #[serde(default)]
    pub token: String,
}

impl Credentials {
    /// Create credentials from explicit values
    pub fn new(user: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            token: token.into(),
        }
    }

    /// Read credentials from `QUALTRICS_USER` and `QUALTRICS_TOKEN`
    pub fn from_env() -> Result<Self> {
        let user = std::env::var(USER_ENV).map_err(|_| {
            Error::config(
                format!("user should be passed explicitly or {} should be set", USER_ENV),
                USER_ENV,
            )
        })?;
        let token = std::env::var(TOKEN_ENV).map_err(|_| {
            Error::config(
                format!("token should be passed explicitly or {} should be set", TOKEN_ENV),
                TOKEN_ENV,
            )
        })?;
        Ok(Self { user, token })
    }
}

// Token is secret; keep it out of logs and panic messages.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Base URLs of the two API families
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// Legacy control panel API (`Product=RS`)
    #[serde(default = "default_control_panel_url")]
    pub control_panel_url: String,

    /// Legacy contacts API (`Product=TA`)
    #[serde(default = "default_contacts_url")]
    pub contacts_url: String,

    /// Job-based response export API
    #[serde(default = "default_exports_url")]
    pub exports_url: String,

    /// Forces every legacy request to this URL regardless of product
    #[serde(default)]
    pub override_url: Option<String>,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            control_panel_url: default_control_panel_url(),
            contacts_url: default_contacts_url(),
            exports_url: default_exports_url(),
            override_url: None,
        }
    }
}

/// HTTP transport settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Per-request timeout (default: 60 seconds)
    #[serde(default = "default_timeout", with = "duration_serde")]
    pub timeout: Duration,

    /// Skip TLS certificate validation (default: false)
    #[serde(default)]
    pub accept_invalid_certs: bool,

    /// Custom User-Agent header
    #[serde(default)]
    pub user_agent: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            accept_invalid_certs: false,
            user_agent: None,
        }
    }
}

/// Retry behavior for transient transport failures
///
/// Only connect and timeout failures are retried; anything the server
/// answered is returned as-is.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (default: 0, a single try)
    #[serde(default)]
    pub max_attempts: u32,

    /// Initial delay before first retry (default: 1 second)
    #[serde(default = "default_initial_delay", with = "duration_serde")]
    pub initial_delay: Duration,

    /// Maximum delay between retries (default: 60 seconds)
    #[serde(default = "default_max_delay", with = "duration_serde")]
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: true)
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 0,
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: true,
        }
    }
}

/// Caller-owned polling policy for [`Qualtrics::wait_for_export`](crate::Qualtrics::wait_for_export)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PollPolicy {
    /// Delay between two progress checks (default: 1 second)
    #[serde(default = "default_poll_interval", with = "duration_serde")]
    pub interval: Duration,

    /// Give up after this many progress checks (None = poll until terminal)
    #[serde(default)]
    pub max_attempts: Option<u32>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: default_poll_interval(),
            max_attempts: None,
        }
    }
}

/// Main configuration for a [`Qualtrics`](crate::Qualtrics) session
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Account credentials
    #[serde(default)]
    pub credentials: Credentials,

    /// Legacy API version sent as the `Version` parameter (default: "2.5")
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// API base URLs
    #[serde(default)]
    pub endpoints: EndpointConfig,

    /// HTTP transport settings
    #[serde(default)]
    pub http: HttpConfig,

    /// Transport retry settings
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            credentials: Credentials::default(),
            api_version: default_api_version(),
            endpoints: EndpointConfig::default(),
            http: HttpConfig::default(),
            retry: RetryConfig::default(),
        }
    }
}

impl Config {
    /// Default configuration with the given credentials
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            ..Default::default()
        }
    }

    /// Default configuration with credentials taken from the environment
    pub fn from_env() -> Result<Self> {
        Ok(Self::new(Credentials::from_env()?))
    }

    /// Check that the configuration can produce a working session
    pub fn validate(&self) -> Result<()> {
        if self.credentials.user.is_empty() {
            return Err(Error::config("user must not be empty", "credentials.user"));
        }
        if self.credentials.token.is_empty() {
            return Err(Error::config("token must not be empty", "credentials.token"));
        }
        if self.api_version.trim().is_empty() {
            return Err(Error::config("API version must not be empty", "api_version"));
        }
        for (key, value) in [
            ("endpoints.control_panel_url", &self.endpoints.control_panel_url),
            ("endpoints.contacts_url", &self.endpoints.contacts_url),
            ("endpoints.exports_url", &self.endpoints.exports_url),
        ] {
            url::Url::parse(value)
                .map_err(|e| Error::config(format!("invalid URL '{}': {}", value, e), key))?;
        }
        if let Some(url) = &self.endpoints.override_url {
            url::Url::parse(url).map_err(|e| {
                Error::config(
                    format!("invalid URL '{}': {}", url, e),
                    "endpoints.override_url",
                )
            })?;
        }
        Ok(())
    }
}

fn default_api_version() -> String {
    "2.5".to_string()
}

fn default_control_panel_url() -> String {
    "https://survey.qualtrics.com/WRAPI/ControlPanel/api.php".to_string()
}

fn default_contacts_url() -> String {
    "https://survey.qualtrics.com/WRAPI/Contacts/api.php".to_string()
}

fn default_exports_url() -> String {
    "https://survey.qualtrics.com/API/v3/responseexports".to_string()
}

fn default_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_initial_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(60)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(1)
}

fn default_true() -> bool {
    true
}

// Duration serialization helper (whole seconds)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
