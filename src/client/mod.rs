//! Client session split into focused submodules.
//!
//! The `Qualtrics` struct and its methods are organized by domain:
//! - [`export`] - Response export jobs (submit, poll, wait)
//! - [`download`] - Export archive retrieval
//! - [`surveys`] - Legacy read operations

mod download;
mod export;
mod surveys;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;

pub use export::{ExportJob, ExportOptions, TerminalRepeat};
pub use surveys::LegacyResponseQuery;

use crate::config::{Config, Credentials};
use crate::dispatch::{Dispatcher, JobRequest, RequestDescriptor};
use crate::error::Result;
use crate::params::LegacyArgs;
use crate::types::{Diagnostics, Outcome};

/// Session against the survey platform
///
/// A session owns its diagnostic state, which every call overwrites. Calls
/// take `&mut self`; share a session across tasks only behind a lock such as
/// `tokio::sync::Mutex`, or give each independent operation sequence its own
/// session.
#[derive(Debug)]
pub struct Qualtrics {
    pub(crate) dispatcher: Dispatcher,
}

impl Qualtrics {
    /// Create a session from a validated configuration
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        tracing::debug!(
            user = %config.credentials.user,
            api_version = %config.api_version,
            "creating Qualtrics session"
        );
        Ok(Self {
            dispatcher: Dispatcher::new(config)?,
        })
    }

    /// Create a session with default endpoints for the given account
    pub fn with_credentials(user: impl Into<String>, token: impl Into<String>) -> Result<Self> {
        Self::new(Config::new(Credentials::new(user, token)))
    }

    /// Create a session from `QUALTRICS_USER` and `QUALTRICS_TOKEN`
    pub fn from_env() -> Result<Self> {
        Self::new(Config::from_env()?)
    }

    /// Session configuration
    pub fn config(&self) -> &Config {
        self.dispatcher.config()
    }

    /// Diagnostic state recorded by the last call
    pub fn diagnostics(&self) -> &Diagnostics {
        self.dispatcher.diagnostics()
    }

    /// Error message of the last call, `None` if it succeeded
    pub fn last_error_message(&self) -> Option<&str> {
        self.diagnostics().last_error.as_deref()
    }

    /// HTTP status of the last call, `None` if the server was never reached
    pub fn last_status_code(&self) -> Option<u16> {
        self.diagnostics().last_status_code
    }

    /// Final URL of the last call
    pub fn last_url(&self) -> Option<&str> {
        self.diagnostics().last_url.as_deref()
    }

    /// Raw response body of the last call
    pub fn last_response(&self) -> Option<&str> {
        self.diagnostics().last_response.as_deref()
    }

    /// Decoded JSON body of the last call
    pub fn last_json(&self) -> Option<&serde_json::Value> {
        self.diagnostics().last_json.as_ref()
    }

    /// Send a GET call to the control panel API
    pub async fn request(&mut self, request: &str, args: LegacyArgs) -> Outcome {
        self.request_with(&RequestDescriptor::new(request).args(args))
            .await
    }

    /// Send a fully described legacy call
    pub async fn request_with(&mut self, descriptor: &RequestDescriptor) -> Outcome {
        self.dispatcher.send(descriptor).await
    }

    /// Send an export API call
    pub async fn request_job(&mut self, request: &JobRequest) -> Outcome {
        self.dispatcher.send_job(request).await
    }
}

impl std::fmt::Display for Qualtrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Qualtrics session for {}", self.config().credentials.user)
    }
}
