//! Mock server fixtures shared by the integration tests

use qualtrics_client::{Config, Credentials, Qualtrics};
use std::io::Write;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Path of the export API on the mock server
pub const EXPORTS_PATH: &str = "/API/v3/responseexports";

/// Path of the legacy control panel API on the mock server
pub const LEGACY_PATH: &str = "/WRAPI/ControlPanel/api.php";

/// Header line of a legacy CSV export
pub const CSV_HEADER: &str = "ResponseID,ResponseSet,IPAddress,StartDate,EndDate,RecipientLastName,RecipientFirstName,RecipientEmail,ExternalDataReference,Finished,Status,Q1,LocationLatitude,LocationLongitude,LocationAccuracy";

/// Create a session whose endpoints all point at `server`
pub fn mock_session(server: &MockServer) -> Qualtrics {
    let mut config = Config::new(Credentials::new("user@example.com", "test-token"));
    config.endpoints.control_panel_url = format!("{}{}", server.uri(), LEGACY_PATH);
    config.endpoints.contacts_url = format!("{}/WRAPI/Contacts/api.php", server.uri());
    config.endpoints.exports_url = format!("{}{}", server.uri(), EXPORTS_PATH);
    Qualtrics::new(config).unwrap()
}

/// Build an in-memory zip archive with one member
pub fn single_member_zip(name: &str, content: &[u8]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    writer
        .start_file(name, zip::write::FileOptions::default())
        .unwrap();
    writer.write_all(content).unwrap();
    writer.finish().unwrap().into_inner()
}

/// Legacy CSV export with a header and `rows` data rows
pub fn legacy_csv(rows: usize) -> String {
    let mut csv = format!("{}\r\n", CSV_HEADER);
    for i in 0..rows {
        csv.push_str(&format!(
            "R_{:04},Default Response Set,10.0.0.{},2016-04-19 23:19:41,2016-04-19 23:19:54,,,,,1,0,1,41.64,-86.07,-1\r\n",
            i, i
        ));
    }
    csv
}

/// Mount a progress answer for `job`, optionally limited to `times` matches
pub async fn mount_progress(
    server: &MockServer,
    job: &str,
    status: u16,
    body: serde_json::Value,
    times: Option<u64>,
) {
    let mock = Mock::given(method("GET"))
        .and(path(format!("{}/{}", EXPORTS_PATH, job)))
        .respond_with(ResponseTemplate::new(status).set_body_json(body));
    let mock = match times {
        Some(n) => mock.up_to_n_times(n),
        None => mock,
    };
    mock.mount(server).await;
}
