//! # qualtrics-client
//!
//! Client library for the Qualtrics survey platform.
//!
//! Two API families are covered:
//! - the legacy query-string API (`Request=getSurveys&Format=JSON&...`), whose
//!   answers carry a `Meta` envelope
//! - the job-based response export API, which runs exports asynchronously and
//!   hands back a single-entry zip archive
//!
//! Every call returns its failure as a value and also records it in the
//! session's [`Diagnostics`], overwritten by the next call.
//!
//! ## Quick Start
//!
//! ```no_run
//! use qualtrics_client::{ExportFormat, ExportOptions, PollPolicy, Qualtrics};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut session = Qualtrics::from_env()?;
//!
//!     let job = session
//!         .create_export(ExportFormat::Csv, "SV_0123456789", &ExportOptions::default())
//!         .await?;
//!
//!     let progress = session
//!         .wait_for_export(&job, &PollPolicy::default(), None)
//!         .await;
//!     let Some(url) = progress.file_url() else {
//!         eprintln!("export failed: {:?}", session.last_error_message());
//!         return Ok(());
//!     };
//!
//!     for line in session.open_export(url).await?.lines()? {
//!         println!("{}", line);
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Export archive validation and reading
pub mod archive;
/// Response classification for both JSON dialects
pub mod classify;
/// Client session
pub mod client;
/// Named command registry
pub mod commands;
/// Configuration types
pub mod config;
/// HTTP request dispatch
pub mod dispatch;
/// Error types
pub mod error;
/// In-memory response source for tests
pub mod mock;
/// Legacy request parameter encoding
pub mod params;
/// Retry logic with exponential backoff
pub mod retry;
/// Core types
pub mod types;

// Re-export commonly used types
pub use archive::{ExportArchive, ExportLines};
pub use client::{ExportJob, ExportOptions, LegacyResponseQuery, Qualtrics, TerminalRepeat};
pub use commands::{Command, CommandArgs};
pub use config::{
    Config, Credentials, EndpointConfig, HttpConfig, PollPolicy, RetryConfig,
};
pub use dispatch::{FilePart, JobRequest, RequestDescriptor};
pub use error::{Error, ErrorKind, Result};
pub use mock::{MockQualtrics, ResponseSource};
pub use params::{EmbeddedData, LegacyArgs, ResponseFormat};
pub use types::{
    Diagnostics, ExportFormat, ExportProgress, ExportSource, JobId, Outcome, Payload, Product,
};
pub use tokio_util::sync::CancellationToken;
