//! Response export jobs
//!
//! An export runs asynchronously on the server. [`Qualtrics::create_export`]
//! submits it, [`Qualtrics::get_progress`] performs one side-effect-free status
//! check, and [`Qualtrics::wait_for_export`] is a convenience loop whose
//! interval, attempt budget and cancellation all come from the caller.

use super::Qualtrics;
use crate::config::PollPolicy;
use crate::dispatch::JobRequest;
use crate::error::{Error, Result};
use crate::types::{ExportFormat, ExportProgress, JobId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Filters and output options of a response export
///
/// Every field left at `None` is omitted from the request so the server
/// applies its default.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportOptions {
    /// Export only responses recorded after this response id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_response_id: Option<String>,

    /// Export only responses recorded at or after this instant
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<DateTime<Utc>>,

    /// Export only responses recorded before this instant
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,

    /// Maximum number of responses
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,

    /// Question ids (`QID1`, not the display label `Q1`) to include
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub included_question_ids: Option<Vec<String>>,

    /// Export choice labels instead of recode values
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_labels: Option<bool>,

    /// Decimal separator for numeric values
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decimal_separator: Option<String>,

    /// Recode value for questions that were seen but not answered
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seen_unanswered_recode: Option<String>,

    /// Report timestamps in the account's local time zone
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_local_time: Option<bool>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateExportBody<'a> {
    format: ExportFormat,
    survey_id: &'a str,
    #[serde(flatten)]
    options: &'a ExportOptions,
}

#[derive(Deserialize)]
struct CreatedExport {
    id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProgressResult {
    status: String,
    #[serde(default)]
    percent_complete: Option<f64>,
    #[serde(default)]
    file: Option<String>,
}

/// What [`ExportJob::poll`] reports once a terminal state has been observed
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalRepeat {
    /// Keep asking the server; expiry shows up as a not-found failure
    #[default]
    Server,
    /// Repeat the first terminal observation without contacting the server
    Sticky,
}

/// Caller-side tracker for one export job
///
/// Holds the job id together with what has been observed so far. A job with
/// no observation yet is in the submitted state.
#[derive(Clone, Debug)]
pub struct ExportJob {
    id: JobId,
    repeat: TerminalRepeat,
    polls: u32,
    last: Option<ExportProgress>,
    terminal: Option<ExportProgress>,
}

impl ExportJob {
    /// Track an already submitted job
    pub fn new(id: JobId, repeat: TerminalRepeat) -> Self {
        Self {
            id,
            repeat,
            polls: 0,
            last: None,
            terminal: None,
        }
    }

    /// Server-issued job id
    pub fn id(&self) -> &JobId {
        &self.id
    }

    /// Number of progress checks sent to the server
    pub fn polls(&self) -> u32 {
        self.polls
    }

    /// Most recent observation
    pub fn last(&self) -> Option<&ExportProgress> {
        self.last.as_ref()
    }

    /// First terminal observation, if any
    pub fn terminal(&self) -> Option<&ExportProgress> {
        self.terminal.as_ref()
    }

    /// Whether a terminal state has been observed
    pub fn is_finished(&self) -> bool {
        self.terminal.is_some()
    }

    /// Check the job's progress once
    pub async fn poll(&mut self, client: &mut Qualtrics) -> ExportProgress {
        if self.repeat == TerminalRepeat::Sticky
            && let Some(terminal) = &self.terminal
        {
            return terminal.clone();
        }

        let progress = client.get_progress(&self.id).await;
        self.polls += 1;
        if progress.is_terminal() && self.terminal.is_none() {
            self.terminal = Some(progress.clone());
        }
        self.last = Some(progress.clone());
        progress
    }
}

impl Qualtrics {
    /// Submit a response export job
    ///
    /// Returns the job id. An invalid survey id or a rejected option comes back
    /// as an application error carrying the server's message.
    pub async fn create_export(
        &mut self,
        format: ExportFormat,
        survey_id: &str,
        options: &ExportOptions,
    ) -> Result<JobId> {
        let body = serde_json::to_value(CreateExportBody {
            format,
            survey_id,
            options,
        })
        .map_err(|e| Error::Protocol(format!("failed to encode export request: {}", e)))?;

        let result = self
            .request_job(&JobRequest::post("", body))
            .await
            .into_json()?;

        match serde_json::from_value::<CreatedExport>(result) {
            Ok(created) => {
                info!(job_id = %created.id, survey_id, %format, "export job submitted");
                Ok(JobId::new(created.id))
            }
            Err(e) => {
                let error = Error::Protocol(format!("Malformed server response: {}", e));
                self.dispatcher.record_failure(&error);
                Err(error)
            }
        }
    }

    /// Submit a response export job and start tracking it
    pub async fn start_export(
        &mut self,
        format: ExportFormat,
        survey_id: &str,
        options: &ExportOptions,
        repeat: TerminalRepeat,
    ) -> Result<ExportJob> {
        let id = self.create_export(format, survey_id, options).await?;
        Ok(ExportJob::new(id, repeat))
    }

    /// Check an export job's progress once
    ///
    /// Never fails: a failed check (unknown job, bad token, malformed answer,
    /// transport failure) is reported as [`ExportProgress::ServFail`] with the
    /// same message stored as the session's last error.
    pub async fn get_progress(&mut self, job: &JobId) -> ExportProgress {
        match self.check_progress(job).await {
            Ok(progress) => progress,
            Err(e) => ExportProgress::ServFail {
                reason: e.to_string(),
            },
        }
    }

    /// One progress check with the failure kept as a typed error
    pub(crate) async fn check_progress(&mut self, job: &JobId) -> Result<ExportProgress> {
        let result = self
            .request_job(&JobRequest::get(job.as_str()))
            .await
            .into_json()?;

        let progress = serde_json::from_value::<ProgressResult>(result).map_err(|e| {
            self.progress_failure(Error::Protocol(format!("Malformed server response: {}", e)))
        })?;

        match progress.status.as_str() {
            "in progress" => {
                let percent_complete = progress.percent_complete.unwrap_or(0.0);
                debug!(job_id = %job, percent_complete, "export in progress");
                Ok(ExportProgress::InProgress { percent_complete })
            }
            "complete" => match progress.file {
                Some(file_url) => {
                    debug!(job_id = %job, %file_url, "export complete");
                    Ok(ExportProgress::Complete { file_url })
                }
                None => Err(self.progress_failure(Error::Protocol(
                    "Malformed server response: complete export has no file URL".to_string(),
                ))),
            },
            other => Err(self.progress_failure(Error::Application(format!(
                "Export job status: {}",
                other
            )))),
        }
    }

    /// Poll until the job reaches a terminal state
    ///
    /// Sleeps `policy.interval` between checks. Gives up with a `ServFail`
    /// once `policy.max_attempts` checks have been made or `cancel` fires.
    pub async fn wait_for_export(
        &mut self,
        job: &JobId,
        policy: &PollPolicy,
        cancel: Option<&CancellationToken>,
    ) -> ExportProgress {
        let mut polls: u32 = 0;
        loop {
            if let Some(token) = cancel
                && token.is_cancelled()
            {
                return cancelled(job);
            }

            let progress = self.get_progress(job).await;
            polls += 1;
            if progress.is_terminal() {
                return progress;
            }

            if let Some(max_attempts) = policy.max_attempts
                && polls >= max_attempts
            {
                info!(job_id = %job, polls, "giving up on export job");
                return ExportProgress::ServFail {
                    reason: format!("gave up after {} polls", polls),
                };
            }

            match cancel {
                Some(token) => {
                    tokio::select! {
                        _ = token.cancelled() => return cancelled(job),
                        _ = tokio::time::sleep(policy.interval) => {}
                    }
                }
                None => tokio::time::sleep(policy.interval).await,
            }
        }
    }

    fn progress_failure(&mut self, error: Error) -> Error {
        self.dispatcher.record_failure(&error);
        error
    }
}

fn cancelled(job: &JobId) -> ExportProgress {
    info!(job_id = %job, "export wait cancelled");
    ExportProgress::ServFail {
        reason: "cancelled".to_string(),
    }
}
