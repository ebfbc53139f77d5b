//! In-memory stand-in for code that consumes legacy response data
//!
//! Code written against [`ResponseSource`] runs unchanged on a live
//! [`Qualtrics`] session or on a [`MockQualtrics`] filled with fixtures.

use crate::client::{LegacyResponseQuery, Qualtrics};
use crate::error::{Error, Result};
use serde_json::{Map, Value};
use std::future::Future;

/// Anything that serves legacy response records
pub trait ResponseSource {
    /// Response records of a survey keyed by response id
    fn legacy_response_data(
        &mut self,
        survey_id: &str,
        query: &LegacyResponseQuery,
    ) -> impl Future<Output = Result<Map<String, Value>>>;

    /// One response record
    fn response(
        &mut self,
        survey_id: &str,
        response_id: &str,
        query: &LegacyResponseQuery,
    ) -> impl Future<Output = Result<Value>>;
}

impl ResponseSource for Qualtrics {
    async fn legacy_response_data(
        &mut self,
        survey_id: &str,
        query: &LegacyResponseQuery,
    ) -> Result<Map<String, Value>> {
        self.get_legacy_response_data(survey_id, query).await
    }

    async fn response(
        &mut self,
        survey_id: &str,
        response_id: &str,
        query: &LegacyResponseQuery,
    ) -> Result<Value> {
        self.get_response(survey_id, response_id, query).await
    }
}

/// Fixture-backed response source
///
/// Every record is stored twice: with recode values and with choice labels.
/// Queries with `labels: Some(true)` read the labelled copy. The survey id is
/// not checked.
#[derive(Clone, Debug, Default)]
pub struct MockQualtrics {
    responses: Map<String, Value>,
    responses_labels: Map<String, Value>,
    last_error: Option<String>,
}

impl MockQualtrics {
    /// Create an empty mock
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a response fixture; `labels` defaults to `record`
    pub fn insert_response(
        &mut self,
        response_id: impl Into<String>,
        record: Value,
        labels: Option<Value>,
    ) {
        let response_id = response_id.into();
        let labels = labels.unwrap_or_else(|| record.clone());
        self.responses.insert(response_id.clone(), record);
        self.responses_labels.insert(response_id, labels);
    }

    /// Number of stored responses
    pub fn len(&self) -> usize {
        self.responses.len()
    }

    /// Whether no response is stored
    pub fn is_empty(&self) -> bool {
        self.responses.is_empty()
    }

    /// Error message of the last lookup
    pub fn last_error_message(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    fn fixtures(&self, query: &LegacyResponseQuery) -> &Map<String, Value> {
        if query.labels == Some(true) {
            &self.responses_labels
        } else {
            &self.responses
        }
    }
}

impl ResponseSource for MockQualtrics {
    async fn legacy_response_data(
        &mut self,
        _survey_id: &str,
        query: &LegacyResponseQuery,
    ) -> Result<Map<String, Value>> {
        self.last_error = None;
        Ok(self.fixtures(query).clone())
    }

    async fn response(
        &mut self,
        _survey_id: &str,
        response_id: &str,
        query: &LegacyResponseQuery,
    ) -> Result<Value> {
        match self.fixtures(query).get(response_id).cloned() {
            Some(record) => {
                self.last_error = None;
                Ok(record)
            }
            None => {
                let error = Error::Application(format!(
                    "Qualtrics error: ResponseID {} not in response (probably deleted)",
                    response_id
                ));
                self.last_error = Some(error.to_string());
                Err(error)
            }
        }
    }
}
