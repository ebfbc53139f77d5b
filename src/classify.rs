//! Response classification for the two JSON dialects
//!
//! The legacy API wraps every answer in a `Meta` envelope:
//!
//! ```json
//! {"Meta": {"Status": "Success", "Debug": ""}, "Result": {...}}
//! {"Meta": {"Status": "Error", "ErrorMessage": "Invalid request..."}}
//! ```
//!
//! The export API uses a lowercase envelope and real HTTP status codes:
//!
//! ```json
//! {"meta": {"httpStatus": "200 - OK"}, "result": {"id": "ES_..."}}
//! {"meta": {"httpStatus": "400 - Bad Request", "error": {"errorMessage": "..."}}}
//! ```

use crate::error::Error;
use crate::types::Outcome;
use serde::Deserialize;
use serde_json::{Map, Value};

/// Legacy calls whose success answer is a bare result map without `Meta`
pub const ENVELOPE_EXEMPT: &[&str] = &["getLegacyResponseData", "getPanel", "getListContacts"];

/// Message for a 2xx body that is not JSON
pub const NOT_JSON_MESSAGE: &str = "Unexpected response from Qualtrics: not a JSON document";

/// Classify a decoded legacy document
pub fn classify_legacy(request: &str, document: Value) -> Outcome {
    let Some(meta) = document.get("Meta") else {
        if ENVELOPE_EXEMPT.contains(&request) {
            return Outcome::Success(document);
        }
        return Outcome::Error(Error::Protocol(
            "Unexpected response from Qualtrics: no Meta key in JSON response".to_string(),
        ));
    };

    let Some(status) = meta.get("Status") else {
        return Outcome::Error(Error::Protocol(
            "Unexpected response from Qualtrics: no Status key in JSON response".to_string(),
        ));
    };

    if status.as_str() == Some("Success") {
        return Outcome::Success(document);
    }

    let message = meta
        .get("ErrorMessage")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| format!("Request failed with status {}", status));
    Outcome::Error(Error::Application(message))
}

/// Classify a legacy response whose body is not JSON
///
/// Non-2xx statuses are HTTP errors; a 2xx body is passed through when the
/// caller asked for a foreign format and is a protocol error otherwise.
pub fn classify_legacy_raw(status: u16, body: String, allows_raw: bool) -> Outcome {
    if !(200..300).contains(&status) {
        let reason = reqwest::StatusCode::from_u16(status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("Unknown");
        return Outcome::Error(Error::Http {
            code: status,
            message: format!("API Error: HTTP Code {} ({})", status, reason),
        });
    }
    if allows_raw {
        Outcome::RawPassthrough(body)
    } else {
        Outcome::Error(Error::Protocol(NOT_JSON_MESSAGE.to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct JobEnvelope {
    #[serde(default)]
    meta: Option<JobMeta>,
    result: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct JobMeta {
    #[serde(default)]
    error: Option<JobError>,
}

#[derive(Debug, Deserialize)]
struct JobError {
    #[serde(default, rename = "errorMessage")]
    error_message: Option<String>,
}

/// Server-supplied error text of an export API document, if any
fn job_error_message(document: &Value) -> Option<String> {
    let meta = document.get("meta")?;
    let meta: JobMeta = serde_json::from_value(meta.clone()).ok()?;
    meta.error?.error_message
}

/// Classify an export API response
///
/// Returns the decoded document (when the body was JSON) alongside the outcome.
pub fn classify_job(status: u16, body: &str) -> (Option<Value>, Outcome) {
    let parsed: serde_json::Result<Value> = serde_json::from_str(body);

    if !(200..300).contains(&status) {
        let decoded = parsed.ok();
        let error = match decoded.as_ref().and_then(job_error_message) {
            Some(message) => Error::http_message(status, message),
            None if status == 403 => Error::Forbidden,
            None => Error::http(status),
        };
        return (decoded, Outcome::Error(error));
    }

    let document = match parsed {
        Ok(document) => document,
        Err(e) => {
            return (
                None,
                Outcome::Error(Error::Protocol(format!("Malformed server response: {}", e))),
            );
        }
    };

    match serde_json::from_value::<JobEnvelope>(document.clone()) {
        Ok(envelope) => {
            if let Some(message) = envelope.meta.and_then(|m| m.error).and_then(|e| e.error_message)
            {
                return (Some(document), Outcome::Error(Error::Application(message)));
            }
            (Some(document), Outcome::Success(Value::Object(envelope.result)))
        }
        Err(e) => (
            Some(document),
            Outcome::Error(Error::Protocol(format!("Malformed server response: {}", e))),
        ),
    }
}

/// `meta.httpStatus` of an export API document, for logging
pub fn job_http_status(document: &Value) -> Option<&str> {
    document.get("meta")?.get("httpStatus")?.as_str()
}
