//! Export archive validation and reading
//!
//! A finished export is a zip container with exactly one member (the CSV,
//! JSON or XML document). The container is validated and the member
//! decompressed when the archive is opened, so a broken download fails before
//! the caller sees a single line. Text access checks the whole member for
//! UTF-8 up front for the same reason; binary exports (SPSS) are read through
//! [`ExportArchive::into_reader`].

use crate::error::{Error, Result};
use std::io::{BufRead, Cursor, Read};
use std::string::FromUtf8Error;

/// Message for content that is not a usable zip container
pub const NOT_A_ZIP_MESSAGE: &str = "File is not a zip file";

const UTF8_BOM: char = '\u{feff}';

/// Validated export archive holding its single decompressed member
#[derive(Clone, Debug)]
pub struct ExportArchive {
    member_name: String,
    content: Vec<u8>,
}

impl ExportArchive {
    /// Validate `bytes` as a single-entry zip container and decompress its member
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| {
            tracing::debug!(error = %e, size = bytes.len(), "export is not a zip container");
            Error::Format(NOT_A_ZIP_MESSAGE.to_string())
        })?;

        if archive.len() != 1 {
            return Err(Error::Format(format!(
                "Expected exactly one file in export archive, found {}",
                archive.len()
            )));
        }

        let mut member = archive
            .by_index(0)
            .map_err(|e| Error::Format(format!("Corrupt export archive: {}", e)))?;
        let member_name = member.name().to_string();
        let mut content = Vec::new();
        member
            .read_to_end(&mut content)
            .map_err(|e| Error::Format(format!("Corrupt export archive: {}", e)))?;

        tracing::info!(member = %member_name, size = content.len(), "export archive opened");
        Ok(Self {
            member_name,
            content,
        })
    }

    /// File name of the member inside the container
    pub fn member_name(&self) -> &str {
        &self.member_name
    }

    /// Decompressed member content
    pub fn content(&self) -> &[u8] {
        &self.content
    }

    /// Consume the archive as a forward-only sequence of lines
    ///
    /// Line terminators are stripped, as is a leading byte order mark. A member
    /// that is not UTF-8 text fails here, before any line is produced.
    pub fn lines(self) -> Result<ExportLines> {
        let text = self.read_to_string()?;
        let pos = if text.starts_with(UTF8_BOM) {
            UTF8_BOM.len_utf8()
        } else {
            0
        };
        Ok(ExportLines { text, pos })
    }

    /// Consume the archive as a raw byte stream
    pub fn into_reader(self) -> impl BufRead {
        Cursor::new(self.content)
    }

    /// Consume the archive as one string
    pub fn read_to_string(self) -> Result<String> {
        String::from_utf8(self.content).map_err(not_utf8)
    }
}

fn not_utf8(e: FromUtf8Error) -> Error {
    let err = e.utf8_error();
    tracing::debug!(valid_up_to = err.valid_up_to(), "export member is not UTF-8");
    Error::Format(format!("Export is not valid UTF-8: {}", err))
}

/// Lines of an opened export
///
/// Single pass; reading again requires opening the export again.
#[derive(Debug)]
pub struct ExportLines {
    text: String,
    pos: usize,
}

impl Iterator for ExportLines {
    type Item = String;

    fn next(&mut self) -> Option<Self::Item> {
        let rest = self.text.get(self.pos..).filter(|r| !r.is_empty())?;
        let (line, consumed) = match rest.find('\n') {
            Some(end) => (&rest[..end], end + 1),
            None => (rest, rest.len()),
        };
        self.pos += consumed;
        Some(line.strip_suffix('\r').unwrap_or(line).to_string())
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::io::Write;

    fn zip_of(members: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for (name, content) in members {
            writer
                .start_file(*name, zip::write::FileOptions::default())
                .unwrap();
            writer.write_all(content).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    const CSV: &[u8] = b"ResponseID,ResponseSet,IPAddress\r\nR_1,Default Response Set,10.0.0.1\r\nR_2,Default Response Set,10.0.0.2\r\n";

    #[test]
    fn test_empty_content_is_not_a_zip() {
        let err = ExportArchive::from_bytes(b"").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
        assert_eq!(err.to_string(), "File is not a zip file");
    }

    #[test]
    fn test_html_content_is_not_a_zip() {
        let err = ExportArchive::from_bytes(b"<html><body>Error</body></html>").unwrap_err();
        assert_eq!(err.to_string(), NOT_A_ZIP_MESSAGE);
    }

    #[test]
    fn test_multiple_members_rejected() {
        let bytes = zip_of(&[("a.csv", b"x".as_slice()), ("b.csv", b"y".as_slice())]);
        let err = ExportArchive::from_bytes(&bytes).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
        assert!(err.to_string().contains("found 2"));
    }

    #[test]
    fn test_empty_container_rejected() {
        let bytes = zip_of(&[]);
        assert_eq!(
            ExportArchive::from_bytes(&bytes).unwrap_err().kind(),
            ErrorKind::Format
        );
    }

    #[test]
    fn test_lines_strip_terminators() {
        let bytes = zip_of(&[("survey.csv", CSV)]);
        let archive = ExportArchive::from_bytes(&bytes).unwrap();
        assert_eq!(archive.member_name(), "survey.csv");

        let lines: Vec<String> = archive.lines().unwrap().collect();
        assert_eq!(
            lines,
            vec![
                "ResponseID,ResponseSet,IPAddress",
                "R_1,Default Response Set,10.0.0.1",
                "R_2,Default Response Set,10.0.0.2",
            ]
        );
    }

    #[test]
    fn test_lines_strip_leading_bom_only() {
        let bytes = zip_of(&[("survey.csv", "\u{feff}ResponseID\n\u{feff}R_1\n".as_bytes())]);
        let lines: Vec<String> = ExportArchive::from_bytes(&bytes)
            .unwrap()
            .lines()
            .unwrap()
            .collect();
        assert_eq!(lines, vec!["ResponseID".to_string(), "\u{feff}R_1".to_string()]);
    }

    #[test]
    fn test_last_line_without_terminator() {
        let bytes = zip_of(&[("survey.csv", b"ResponseID\nR_1".as_slice())]);
        let lines: Vec<String> = ExportArchive::from_bytes(&bytes)
            .unwrap()
            .lines()
            .unwrap()
            .collect();
        assert_eq!(lines, vec!["ResponseID".to_string(), "R_1".to_string()]);
    }

    #[test]
    fn test_non_utf8_member_fails_before_first_line() {
        let latin1 = b"ResponseID,ResponseSet\nR_1,Caf\xe9\n".as_slice();
        let bytes = zip_of(&[("survey.csv", latin1)]);

        let err = ExportArchive::from_bytes(&bytes).unwrap().lines().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
        assert!(err.to_string().starts_with("Export is not valid UTF-8"));

        // Raw access still hands back the member untouched
        let mut raw = Vec::new();
        ExportArchive::from_bytes(&bytes)
            .unwrap()
            .into_reader()
            .read_to_end(&mut raw)
            .unwrap();
        assert_eq!(raw, latin1);
    }

    #[test]
    fn test_raw_reader_returns_member_bytes() {
        let bytes = zip_of(&[("survey.json", br#"{"responses": []}"#.as_slice())]);
        let mut reader = ExportArchive::from_bytes(&bytes).unwrap().into_reader();
        let mut raw = Vec::new();
        reader.read_to_end(&mut raw).unwrap();
        assert_eq!(raw, br#"{"responses": []}"#);
    }

    #[test]
    fn test_read_to_string() {
        let bytes = zip_of(&[("survey.xml", b"<Responses/>".as_slice())]);
        let text = ExportArchive::from_bytes(&bytes)
            .unwrap()
            .read_to_string()
            .unwrap();
        assert_eq!(text, "<Responses/>");
    }
}
