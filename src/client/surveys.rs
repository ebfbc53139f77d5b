//! Legacy read operations

use super::Qualtrics;
use crate::error::{Error, Result};
use crate::params::{LegacyArgs, ResponseFormat};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Filters of a legacy response data request
///
/// `None` fields are left out of the request.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyResponseQuery {
    /// Return responses recorded after this response id
    pub last_response_id: Option<String>,
    /// Maximum number of responses
    pub limit: Option<u32>,
    /// Return one specific response
    pub response_id: Option<String>,
    /// Response set to read from
    pub response_set_id: Option<String>,
    /// Subgroup filter
    pub subgroup_id: Option<String>,
    /// Earliest start date (`YYYY-MM-DD HH:MM:SS`)
    pub start_date: Option<String>,
    /// Latest end date (`YYYY-MM-DD HH:MM:SS`)
    pub end_date: Option<String>,
    /// Comma-separated question ids to include
    pub questions: Option<String>,
    /// Return choice labels instead of recode values
    pub labels: Option<bool>,
    /// Key answers by export tag
    pub export_tags: Option<bool>,
    /// Key answers by question id
    pub export_question_ids: Option<bool>,
    /// Report dates in the account's local time zone
    pub local_time: Option<bool>,
    /// Value used for unanswered questions
    pub unanswered_recode: Option<String>,
    /// Restrict to members of this panel
    pub panel_id: Option<String>,
    /// Include responses that are still in progress
    pub responses_in_progress: Option<bool>,
    /// Include location data
    pub location_data: Option<bool>,
}

impl LegacyResponseQuery {
    fn to_args(&self, survey_id: &str) -> LegacyArgs {
        LegacyArgs::new()
            .arg("SurveyID", survey_id)
            .opt("LastResponseID", self.last_response_id.as_deref())
            .opt("Limit", self.limit)
            .opt("ResponseID", self.response_id.as_deref())
            .opt("ResponseSetID", self.response_set_id.as_deref())
            .opt("SubgroupID", self.subgroup_id.as_deref())
            .opt("StartDate", self.start_date.as_deref())
            .opt("EndDate", self.end_date.as_deref())
            .opt("Questions", self.questions.as_deref())
            .opt("Labels", flag(self.labels))
            .opt("ExportTags", flag(self.export_tags))
            .opt("ExportQuestionIDs", flag(self.export_question_ids))
            .opt("LocalTime", flag(self.local_time))
            .opt("UnansweredRecode", self.unanswered_recode.as_deref())
            .opt("PanelID", self.panel_id.as_deref())
            .opt("ResponsesInProgress", flag(self.responses_in_progress))
            .opt("LocationData", flag(self.location_data))
    }
}

fn flag(value: Option<bool>) -> Option<&'static str> {
    value.map(|v| if v { "1" } else { "0" })
}

impl Qualtrics {
    /// All surveys of the account, keyed by survey id in server order
    pub async fn get_surveys(&mut self) -> Result<Map<String, Value>> {
        let document = self.request("getSurveys", LegacyArgs::new()).await.into_json()?;

        let surveys = document
            .get("Result")
            .and_then(|r| r.get("Surveys"))
            .and_then(Value::as_array)
            .ok_or_else(|| {
                self.read_failure(Error::Protocol(
                    "Unexpected response from Qualtrics: no Result.Surveys list".to_string(),
                ))
            })?;

        Ok(surveys
            .iter()
            .filter_map(|survey| {
                let id = survey.get("SurveyID")?.as_str()?;
                Some((id.to_string(), survey.clone()))
            })
            .collect())
    }

    /// Survey definition in the server's native document format (XML)
    pub async fn get_survey(&mut self, survey_id: &str) -> Result<String> {
        let args = LegacyArgs::new()
            .arg("SurveyID", survey_id)
            .format(ResponseFormat::Requested(None));
        self.request("getSurvey", args).await.into_text()
    }

    /// Response records keyed by response id
    pub async fn get_legacy_response_data(
        &mut self,
        survey_id: &str,
        query: &LegacyResponseQuery,
    ) -> Result<Map<String, Value>> {
        let document = self
            .request("getLegacyResponseData", query.to_args(survey_id))
            .await
            .into_json()?;

        match document {
            Value::Object(responses) => Ok(responses),
            _ => Err(self.read_failure(Error::Protocol(
                "Unexpected response from Qualtrics: response data is not a JSON object"
                    .to_string(),
            ))),
        }
    }

    /// One response record
    ///
    /// `query.response_id` is overwritten with `response_id`.
    pub async fn get_response(
        &mut self,
        survey_id: &str,
        response_id: &str,
        query: &LegacyResponseQuery,
    ) -> Result<Value> {
        let query = LegacyResponseQuery {
            response_id: Some(response_id.to_string()),
            ..query.clone()
        };
        let mut responses = self.get_legacy_response_data(survey_id, &query).await?;

        responses.remove(response_id).ok_or_else(|| {
            self.read_failure(Error::Application(format!(
                "Qualtrics error: ResponseID {} not in response (probably deleted)",
                response_id
            )))
        })
    }

    fn read_failure(&mut self, error: Error) -> Error {
        self.dispatcher.record_failure(&error);
        error
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::test_helpers::{LEGACY_PATH, session_for};
    use crate::error::ErrorKind;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_query_drops_unset_filters() {
        let query = LegacyResponseQuery {
            limit: Some(10),
            labels: Some(true),
            local_time: Some(false),
            ..Default::default()
        };
        let params = crate::params::encode_legacy(
            &crate::Credentials::new("u", "t"),
            "2.5",
            "getLegacyResponseData",
            &query.to_args("SV_1"),
        );
        assert_eq!(params.get("SurveyID"), Some("SV_1"));
        assert_eq!(params.get("Limit"), Some("10"));
        assert_eq!(params.get("Labels"), Some("1"));
        assert_eq!(params.get("LocalTime"), Some("0"));
        assert!(!params.contains("LastResponseID"));
        assert!(!params.contains("PanelID"));
        assert_eq!(params.len(), 9);
    }

    #[tokio::test]
    async fn test_get_surveys_keys_by_id_in_order() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(LEGACY_PATH))
            .and(query_param("Request", "getSurveys"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"Meta": {"Status": "Success", "Debug": ""},
                    "Result": {"Surveys": [
                        {"SurveyID": "SV_b", "SurveyName": "Second"},
                        {"SurveyID": "SV_a", "SurveyName": "First"}
                    ]}}"#,
            ))
            .mount(&server)
            .await;

        let mut session = session_for(&server);
        let surveys = session.get_surveys().await.unwrap();
        let ids: Vec<&str> = surveys.keys().map(String::as_str).collect();
        assert_eq!(ids, vec!["SV_b", "SV_a"]);
        assert_eq!(surveys["SV_a"]["SurveyName"], "First");
    }

    #[tokio::test]
    async fn test_get_survey_returns_raw_xml() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("Request", "getSurvey"))
            .and(query_param("SurveyID", "SV_1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("<?xml version=\"1.0\"?><SurveyDefinition/>"),
            )
            .mount(&server)
            .await;

        let mut session = session_for(&server);
        let xml = session.get_survey("SV_1").await.unwrap();
        assert!(xml.contains("<SurveyDefinition/>"));
        assert_eq!(session.last_error_message(), None);
    }

    #[tokio::test]
    async fn test_get_legacy_response_data_without_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("Request", "getLegacyResponseData"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"R_1": {"Finished": "1", "Q1": 2}, "R_2": {"Finished": "0", "Q1": 1}}"#,
            ))
            .mount(&server)
            .await;

        let mut session = session_for(&server);
        let responses = session
            .get_legacy_response_data("SV_1", &LegacyResponseQuery::default())
            .await
            .unwrap();
        assert_eq!(responses.len(), 2);
        assert_eq!(responses["R_2"]["Q1"], 1);
    }

    #[tokio::test]
    async fn test_get_response_single_record() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("Request", "getLegacyResponseData"))
            .and(query_param("ResponseID", "R_1"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(r#"{"R_1": {"Finished": "1"}}"#),
            )
            .mount(&server)
            .await;

        let mut session = session_for(&server);
        let response = session
            .get_response("SV_1", "R_1", &LegacyResponseQuery::default())
            .await
            .unwrap();
        assert_eq!(response["Finished"], "1");
    }

    #[tokio::test]
    async fn test_get_response_missing_record() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
            .mount(&server)
            .await;

        let mut session = session_for(&server);
        let err = session
            .get_response("SV_1", "R_gone", &LegacyResponseQuery::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Application);
        assert_eq!(
            session.last_error_message(),
            Some("Qualtrics error: ResponseID R_gone not in response (probably deleted)")
        );
    }

    #[tokio::test]
    async fn test_get_surveys_application_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"Meta": {"Status": "Error", "ErrorMessage": "Invalid token."}}"#,
            ))
            .mount(&server)
            .await;

        let mut session = session_for(&server);
        let err = session.get_surveys().await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid token.");
        assert_eq!(session.last_json(), None);
    }
}
