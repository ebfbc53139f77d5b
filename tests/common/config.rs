//! Test configuration helpers for loading .env credentials and creating sessions

use qualtrics_client::{Config, Credentials, Qualtrics};

/// Error type for test configuration
#[derive(Debug)]
pub struct ConfigError(pub String);

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Config error: {}", self.0)
    }
}

impl std::error::Error for ConfigError {}

/// Credentials and fixtures of a live account
pub struct LiveAccount {
    /// Account credentials
    pub credentials: Credentials,
    /// Survey with at least one recorded response
    pub survey_id: String,
}

/// Load the live account from environment variables
///
/// Required environment variables:
/// - `QUALTRICS_USER` - Account identifier
/// - `QUALTRICS_TOKEN` - API token
/// - `QUALTRICS_SURVEY_ID` - Survey with recorded responses
pub fn load_live_account() -> Result<LiveAccount, ConfigError> {
    dotenvy::dotenv().ok();

    let credentials = Credentials::from_env().map_err(|e| ConfigError(e.to_string()))?;
    let survey_id = std::env::var("QUALTRICS_SURVEY_ID")
        .map_err(|_| ConfigError("QUALTRICS_SURVEY_ID not set in environment".to_string()))?;

    Ok(LiveAccount {
        credentials,
        survey_id,
    })
}

/// Check if live credentials are available
pub fn has_live_credentials() -> bool {
    load_live_account().is_ok()
}

/// Create a session against the real service
pub fn create_live_session() -> Result<(Qualtrics, LiveAccount), Box<dyn std::error::Error>> {
    let account = load_live_account()?;
    let session = Qualtrics::new(Config::new(account.credentials.clone()))?;
    Ok((session, account))
}

/// Create a session against the real service with a token the server will reject
pub fn create_session_bad_token() -> Result<Qualtrics, Box<dyn std::error::Error>> {
    let account = load_live_account()?;
    let credentials = Credentials::new(account.credentials.user, "invalid_token_12345");
    Ok(Qualtrics::new(Config::new(credentials))?)
}
