//! Named command registry
//!
//! Maps a closed set of operation names to typed calls on a [`Qualtrics`]
//! session, for front ends that receive the operation as text:
//!
//! ```no_run
//! use qualtrics_client::{Command, CommandArgs, Qualtrics};
//!
//! # async fn example() -> qualtrics_client::Result<()> {
//! let mut session = Qualtrics::from_env()?;
//! let command: Command = "getResponseExportProgress".parse()?;
//! let args = CommandArgs::parse(["responseExportId=ES_abc"]);
//! let result = command.run(&mut session, &args).await?;
//! println!("{}", result);
//! # Ok(())
//! # }
//! ```

use crate::client::{ExportOptions, LegacyResponseQuery, Qualtrics};
use crate::error::{Error, Result};
use crate::types::{ExportFormat, ExportProgress, ExportSource, JobId};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::str::FromStr;

/// Operations reachable by name
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Command {
    /// List the account's surveys
    GetSurveys,
    /// Fetch one survey definition (XML)
    GetSurvey,
    /// Fetch legacy response data of a survey
    GetLegacyResponseData,
    /// Fetch one legacy response record
    GetResponse,
    /// Submit a response export job
    CreateResponseExport,
    /// Check an export job once
    GetResponseExportProgress,
    /// Read the lines of a finished export
    GetResponseExportFile,
    /// Save a finished export to disk
    DownloadResponseExportFile,
}

impl Command {
    /// Every registered command
    pub const ALL: &'static [Command] = &[
        Command::GetSurveys,
        Command::GetSurvey,
        Command::GetLegacyResponseData,
        Command::GetResponse,
        Command::CreateResponseExport,
        Command::GetResponseExportProgress,
        Command::GetResponseExportFile,
        Command::DownloadResponseExportFile,
    ];

    /// Registered name
    pub fn name(&self) -> &'static str {
        match self {
            Command::GetSurveys => "getSurveys",
            Command::GetSurvey => "getSurvey",
            Command::GetLegacyResponseData => "getLegacyResponseData",
            Command::GetResponse => "getResponse",
            Command::CreateResponseExport => "createResponseExport",
            Command::GetResponseExportProgress => "getResponseExportProgress",
            Command::GetResponseExportFile => "getResponseExportFile",
            Command::DownloadResponseExportFile => "downloadResponseExportFile",
        }
    }

    /// Run the command against `client`
    ///
    /// A missing required argument or an unparsable value is reported as a
    /// configuration error naming the argument.
    pub async fn run(&self, client: &mut Qualtrics, args: &CommandArgs) -> Result<Value> {
        tracing::debug!(command = self.name(), "running command");
        match self {
            Command::GetSurveys => Ok(Value::Object(client.get_surveys().await?)),
            Command::GetSurvey => {
                let xml = client.get_survey(args.require("SurveyID")?).await?;
                Ok(Value::String(xml))
            }
            Command::GetLegacyResponseData => {
                let query = args.legacy_query()?;
                let responses = client
                    .get_legacy_response_data(args.require("SurveyID")?, &query)
                    .await?;
                Ok(Value::Object(responses))
            }
            Command::GetResponse => {
                let query = args.legacy_query()?;
                client
                    .get_response(
                        args.require("SurveyID")?,
                        args.require("ResponseID")?,
                        &query,
                    )
                    .await
            }
            Command::CreateResponseExport => {
                let format: ExportFormat = args.parse_required("format")?;
                let options = ExportOptions {
                    last_response_id: args.get("lastResponseId").map(str::to_string),
                    limit: args.parse_optional("limit")?,
                    included_question_ids: args.get("includedQuestionIds").map(|ids| {
                        ids.split(',')
                            .map(|id| id.trim().to_string())
                            .filter(|id| !id.is_empty())
                            .collect()
                    }),
                    use_labels: args.flag("useLabels")?,
                    decimal_separator: args.get("decimalSeparator").map(str::to_string),
                    seen_unanswered_recode: args.get("seenUnansweredRecode").map(str::to_string),
                    use_local_time: args.flag("useLocalTime")?,
                    ..Default::default()
                };
                let job = client
                    .create_export(format, args.require("surveyId")?, &options)
                    .await?;
                Ok(json!({ "id": job }))
            }
            Command::GetResponseExportProgress => {
                let job = JobId::new(args.require("responseExportId")?);
                let progress = client.get_progress(&job).await;
                Ok(json!({
                    "status": progress.status_str(),
                    "detail": progress_detail(&progress),
                }))
            }
            Command::GetResponseExportFile => {
                let source = ExportSource::from(args.require("responseExportId")?);
                let lines = client
                    .open_export(source)
                    .await?
                    .lines()?
                    .collect::<Vec<String>>();
                Ok(json!(lines))
            }
            Command::DownloadResponseExportFile => {
                let source = ExportSource::from(args.require("responseExportId")?);
                let path = args.require("path")?;
                let bytes = client.download_to_path(source, path).await?;
                Ok(json!({ "path": path, "bytes": bytes }))
            }
        }
    }
}

fn progress_detail(progress: &ExportProgress) -> Value {
    match progress {
        ExportProgress::InProgress { percent_complete } => json!(percent_complete),
        ExportProgress::Complete { file_url } => json!(file_url),
        ExportProgress::ServFail { reason } => json!(reason),
    }
}

impl FromStr for Command {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Command::ALL
            .iter()
            .copied()
            .find(|command| command.name() == s)
            .ok_or_else(|| Error::NotSupported(format!("unsupported operation: {}", s)))
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Named arguments of a command
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommandArgs {
    values: BTreeMap<String, String>,
}

impl CommandArgs {
    /// Collect `key=value` tokens
    ///
    /// Tokens without `=` are skipped; the value is everything after the
    /// first `=`.
    pub fn parse<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut values = BTreeMap::new();
        for token in tokens {
            match token.as_ref().split_once('=') {
                Some((key, value)) => {
                    values.insert(key.to_string(), value.to_string());
                }
                None => tracing::debug!(token = token.as_ref(), "ignoring argument without '='"),
            }
        }
        Self { values }
    }

    /// Set an argument
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    /// Value of an argument
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Value of a required argument
    pub fn require(&self, key: &str) -> Result<&str> {
        self.get(key)
            .ok_or_else(|| Error::config(format!("missing required argument {}", key), key))
    }

    fn parse_optional<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.get(key)
            .map(|raw| {
                raw.parse::<T>()
                    .map_err(|e| Error::config(format!("invalid value '{}': {}", raw, e), key))
            })
            .transpose()
    }

    fn parse_required<T>(&self, key: &str) -> Result<T>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        let raw = self.require(key)?;
        raw.parse::<T>()
            .map_err(|e| Error::config(format!("invalid value '{}': {}", raw, e), key))
    }

    fn flag(&self, key: &str) -> Result<Option<bool>> {
        match self.get(key) {
            None => Ok(None),
            Some("1") | Some("true") | Some("True") => Ok(Some(true)),
            Some("0") | Some("false") | Some("False") => Ok(Some(false)),
            Some(other) => Err(Error::config(
                format!("invalid flag '{}', expected 1 or 0", other),
                key,
            )),
        }
    }

    fn legacy_query(&self) -> Result<LegacyResponseQuery> {
        Ok(LegacyResponseQuery {
            last_response_id: self.get("LastResponseID").map(str::to_string),
            limit: self.parse_optional("Limit")?,
            response_set_id: self.get("ResponseSetID").map(str::to_string),
            subgroup_id: self.get("SubgroupID").map(str::to_string),
            start_date: self.get("StartDate").map(str::to_string),
            end_date: self.get("EndDate").map(str::to_string),
            questions: self.get("Questions").map(str::to_string),
            labels: self.flag("Labels")?,
            export_tags: self.flag("ExportTags")?,
            export_question_ids: self.flag("ExportQuestionIDs")?,
            local_time: self.flag("LocalTime")?,
            unanswered_recode: self.get("UnansweredRecode").map(str::to_string),
            panel_id: self.get("PanelID").map(str::to_string),
            responses_in_progress: self.flag("ResponsesInProgress")?,
            location_data: self.flag("LocationData")?,
            ..Default::default()
        })
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for CommandArgs {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
