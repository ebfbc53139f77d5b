//! Export archive retrieval

use super::Qualtrics;
use crate::archive::ExportArchive;
use crate::error::{Error, Result};
use crate::types::{ExportProgress, ExportSource};
use std::path::Path;

impl Qualtrics {
    /// Resolve an export source to its download URL
    ///
    /// A job id costs one fresh progress check; the job must be complete.
    pub async fn resolve_export_url(&mut self, source: &ExportSource) -> Result<String> {
        let job = match source {
            ExportSource::Url(url) => return Ok(url.clone()),
            ExportSource::JobId(job) => job,
        };

        match self.check_progress(job).await? {
            ExportProgress::Complete { file_url } => Ok(file_url),
            ExportProgress::InProgress { percent_complete } => {
                let error = Error::Application(format!(
                    "Export {} is not complete yet ({}%)",
                    job, percent_complete
                ));
                self.dispatcher.record_failure(&error);
                Err(error)
            }
            ExportProgress::ServFail { reason } => Err(Error::Application(reason)),
        }
    }

    /// Fetch and validate an export, ready to be read
    pub async fn open_export(&mut self, source: impl Into<ExportSource>) -> Result<ExportArchive> {
        let (_, archive) = self.fetch_export(&source.into()).await?;
        Ok(archive)
    }

    /// Fetch and validate an export, then store the container verbatim at `path`
    ///
    /// Returns the number of bytes written.
    pub async fn download_to_path(
        &mut self,
        source: impl Into<ExportSource>,
        path: impl AsRef<Path>,
    ) -> Result<u64> {
        let path = path.as_ref();
        let (bytes, archive) = self.fetch_export(&source.into()).await?;

        if let Err(e) = tokio::fs::write(path, &bytes).await {
            let error = Error::Io(e);
            self.dispatcher.record_failure(&error);
            return Err(error);
        }

        tracing::info!(
            path = %path.display(),
            member = archive.member_name(),
            size = bytes.len(),
            "export saved"
        );
        Ok(bytes.len() as u64)
    }

    async fn fetch_export(&mut self, source: &ExportSource) -> Result<(Vec<u8>, ExportArchive)> {
        let url = self.resolve_export_url(source).await?;
        let bytes = self.dispatcher.fetch(&url).await?;
        match ExportArchive::from_bytes(&bytes) {
            Ok(archive) => Ok((bytes, archive)),
            Err(e) => {
                self.dispatcher.record_failure(&e);
                Err(e)
            }
        }
    }
}
