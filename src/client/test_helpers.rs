//! Shared test helpers for creating Qualtrics sessions against a mock server.

use crate::client::Qualtrics;
use crate::config::{Config, Credentials};
use std::io::Write;
use wiremock::MockServer;

/// Token every test session sends
pub(crate) const TEST_TOKEN: &str = "test-token";

/// Path of the export API on the mock server
pub(crate) const EXPORTS_PATH: &str = "/API/v3/responseexports";

/// Path of the legacy control panel API on the mock server
pub(crate) const LEGACY_PATH: &str = "/WRAPI/ControlPanel/api.php";

/// Helper to create a session whose endpoints all point at `server`.
pub(crate) fn session_for(server: &MockServer) -> Qualtrics {
    let mut config = Config::new(Credentials::new("user@example.com", TEST_TOKEN));
    config.endpoints.control_panel_url = format!("{}{}", server.uri(), LEGACY_PATH);
    config.endpoints.contacts_url = format!("{}/WRAPI/Contacts/api.php", server.uri());
    config.endpoints.exports_url = format!("{}{}", server.uri(), EXPORTS_PATH);
    Qualtrics::new(config).unwrap()
}

/// Build an in-memory zip archive holding the given members.
pub(crate) fn zip_bytes(members: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    let options = zip::write::FileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated);
    for (name, content) in members {
        writer.start_file(*name, options).unwrap();
        writer.write_all(content).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// Progress document for a job that is still running.
pub(crate) fn in_progress_body(percent: f64) -> String {
    serde_json::json!({
        "meta": {"httpStatus": "200 - OK"},
        "result": {"status": "in progress", "percentComplete": percent}
    })
    .to_string()
}

/// Progress document for a finished job.
pub(crate) fn complete_body(file_url: &str) -> String {
    serde_json::json!({
        "meta": {"httpStatus": "200 - OK"},
        "result": {"status": "complete", "percentComplete": 100.0, "file": file_url}
    })
    .to_string()
}

/// Error document of the export API.
pub(crate) fn job_error_body(http_status: &str, message: &str) -> String {
    serde_json::json!({
        "meta": {
            "httpStatus": http_status,
            "error": {"errorMessage": message}
        }
    })
    .to_string()
}
