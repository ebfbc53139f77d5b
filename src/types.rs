//! Core types for qualtrics-client

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Legacy API product family, selecting the base endpoint
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Product {
    /// Research suite control panel (`RS`)
    #[default]
    ControlPanel,
    /// Target audience contacts (`TA`)
    Contacts,
}

impl Product {
    /// Short product code used by the API documentation
    pub fn code(&self) -> &'static str {
        match self {
            Product::ControlPanel => "RS",
            Product::Contacts => "TA",
        }
    }
}

impl std::str::FromStr for Product {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "RS" => Ok(Product::ControlPanel),
            "TA" => Ok(Product::Contacts),
            other => Err(Error::NotSupported(format!(
                "unknown product '{}', expected RS or TA",
                other
            ))),
        }
    }
}

/// Server-issued identifier of a response export job
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Create a new JobId
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw identifier
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for JobId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for JobId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// File format of a response export
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Comma-separated values
    Csv,
    /// Legacy 2013 CSV layout
    Csv2013,
    /// JSON document with a `responses` array
    Json,
    /// XML document
    Xml,
    /// SPSS data file
    Spss,
}

impl ExportFormat {
    /// Wire name of the format
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Csv2013 => "csv2013",
            ExportFormat::Json => "json",
            ExportFormat::Xml => "xml",
            ExportFormat::Spss => "spss",
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "csv2013" => Ok(ExportFormat::Csv2013),
            "json" => Ok(ExportFormat::Json),
            "xml" => Ok(ExportFormat::Xml),
            "spss" => Ok(ExportFormat::Spss),
            other => Err(Error::NotSupported(format!(
                "unknown export format '{}'",
                other
            ))),
        }
    }
}

/// Result of one progress check on an export job
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExportProgress {
    /// Job is still running
    InProgress {
        /// Server-reported completion percentage (not guaranteed monotonic)
        percent_complete: f64,
    },
    /// Job finished; the archive can be fetched from `file_url`
    Complete {
        /// Download URL of the export archive
        file_url: String,
    },
    /// Job failed, is unknown, or the status check itself failed
    ServFail {
        /// Human-readable failure description
        reason: String,
    },
}

impl ExportProgress {
    /// Status label (`"in progress"`, `"complete"` or `"servfail"`)
    pub fn status_str(&self) -> &'static str {
        match self {
            ExportProgress::InProgress { .. } => "in progress",
            ExportProgress::Complete { .. } => "complete",
            ExportProgress::ServFail { .. } => "servfail",
        }
    }

    /// Whether no further transitions can follow
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ExportProgress::InProgress { .. })
    }

    /// Download URL when the job is complete
    pub fn file_url(&self) -> Option<&str> {
        match self {
            ExportProgress::Complete { file_url } => Some(file_url),
            _ => None,
        }
    }
}

/// Where an export archive comes from
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExportSource {
    /// Direct download URL
    Url(String),
    /// Job id, resolved to a URL through a fresh progress check
    JobId(JobId),
}

impl From<&str> for ExportSource {
    fn from(value: &str) -> Self {
        if value.starts_with("https://") || value.starts_with("http://") {
            ExportSource::Url(value.to_string())
        } else {
            ExportSource::JobId(JobId::from(value))
        }
    }
}

impl From<String> for ExportSource {
    fn from(value: String) -> Self {
        ExportSource::from(value.as_str())
    }
}

impl From<JobId> for ExportSource {
    fn from(id: JobId) -> Self {
        ExportSource::JobId(id)
    }
}

impl From<&JobId> for ExportSource {
    fn from(id: &JobId) -> Self {
        ExportSource::JobId(id.clone())
    }
}

/// Outcome of one dispatched request
///
/// Exactly one of payload, raw text or error is present.
#[derive(Debug)]
pub enum Outcome {
    /// Decoded JSON document that passed classification
    Success(Value),
    /// Non-JSON body returned verbatim because the caller asked for a foreign format
    RawPassthrough(String),
    /// Classified failure
    Error(Error),
}

impl Outcome {
    /// Whether the call succeeded (JSON or raw)
    pub fn is_success(&self) -> bool {
        !matches!(self, Outcome::Error(_))
    }

    /// Borrow the error, if any
    pub fn error(&self) -> Option<&Error> {
        match self {
            Outcome::Error(e) => Some(e),
            _ => None,
        }
    }

    /// Convert into a `Result`, keeping both success shapes
    pub fn into_result(self) -> Result<Payload> {
        match self {
            Outcome::Success(value) => Ok(Payload::Json(value)),
            Outcome::RawPassthrough(text) => Ok(Payload::Raw(text)),
            Outcome::Error(e) => Err(e),
        }
    }

    /// Convert into the decoded JSON document
    pub fn into_json(self) -> Result<Value> {
        match self.into_result()? {
            Payload::Json(value) => Ok(value),
            Payload::Raw(_) => Err(Error::Protocol(
                "Unexpected response from Qualtrics: not a JSON document".to_string(),
            )),
        }
    }

    /// Convert into text; JSON documents are re-serialized
    pub fn into_text(self) -> Result<String> {
        match self.into_result()? {
            Payload::Json(value) => Ok(value.to_string()),
            Payload::Raw(text) => Ok(text),
        }
    }
}

/// Successful payload of an [`Outcome`]
#[derive(Clone, Debug, PartialEq)]
pub enum Payload {
    /// Decoded JSON
    Json(Value),
    /// Raw text of a foreign document format
    Raw(String),
}

/// Diagnostic state recorded by the last dispatched request
///
/// Overwritten by every call; read it before issuing the next one.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Diagnostics {
    /// Error message of the last call, `None` after a success
    pub last_error: Option<String>,
    /// HTTP status code, `None` when the server was never reached
    pub last_status_code: Option<u16>,
    /// Final resolved URL (empty after a transport failure)
    pub last_url: Option<String>,
    /// Raw response body
    pub last_response: Option<String>,
    /// Decoded JSON body, cleared whenever the call failed
    pub last_json: Option<Value>,
}
