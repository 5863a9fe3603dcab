//! Downloaded destination content.
//!
//! Non-HTML destinations are streamed to disk, then their real type is
//! detected from magic bytes and the file is renamed to carry the matching
//! extension. Failures are recorded on the [`Attachment`], never returned.

use std::fmt::Display;
use std::path::{Path, PathBuf};

use futures_util::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, warn};
use url::Url;

use crate::constants::{SNIFF_HEADER_LEN, TEMP_ATTACHMENT_PREFIX};
use crate::error::AttachmentError;
use crate::policy::AttachmentTarget;

pub mod sniff;

pub use sniff::{detect, DetectedType};

/// A destination payload materialized on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub url: Url,
    /// Current location of the file; changes when the type is detected.
    #[serde(rename = "destPath")]
    pub dest_path: PathBuf,
    #[serde(rename = "fileType", default)]
    pub detected_type: Option<DetectedType>,
    #[serde(rename = "downloadError", default, skip_serializing_if = "Option::is_none")]
    pub download_error: Option<AttachmentError>,
    #[serde(rename = "fileTypeError", default, skip_serializing_if = "Option::is_none")]
    pub type_sniff_error: Option<AttachmentError>,
}

impl Attachment {
    fn new(url: &Url, dest_path: PathBuf) -> Self {
        Self {
            url: url.clone(),
            dest_path,
            detected_type: None,
            download_error: None,
            type_sniff_error: None,
        }
    }

    /// True when both the download and the type detection succeeded.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.download_error.is_none() && self.type_sniff_error.is_none()
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.dest_path
    }

    #[must_use]
    pub fn detected_type(&self) -> Option<&DetectedType> {
        self.detected_type.as_ref()
    }

    /// Remove the downloaded file. The record itself is kept as history.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be removed.
    pub async fn delete(&self) -> std::io::Result<()> {
        tokio::fs::remove_file(&self.dest_path).await
    }
}

/// Download a response body to `target` and detect its file type.
pub async fn download(url: &Url, response: reqwest::Response, target: &AttachmentTarget) -> Attachment {
    download_stream(url, response.bytes_stream(), target).await
}

/// Write a byte stream to `target` without buffering it whole, then sniff it.
pub async fn download_stream<S, B, E>(url: &Url, stream: S, target: &AttachmentTarget) -> Attachment
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: Display,
{
    let (file, dest_path) = match create_file(target).await {
        Ok(created) => created,
        Err((path, error)) => {
            warn!(url = %url, error = %error, "Failed to create attachment file");
            let mut result = Attachment::new(url, path);
            result.download_error = Some(error);
            return result;
        }
    };

    let mut result = Attachment::new(url, dest_path);
    if let Err(error) = write_stream(file, stream).await {
        warn!(url = %url, path = %result.dest_path.display(), error = %error, "Attachment download failed");
        result.download_error = Some(error);
        return result;
    }

    match sniff_file(&result.dest_path).await {
        Ok(Some(detected)) => {
            let renamed = result.dest_path.with_extension(&detected.extension);
            if renamed != result.dest_path {
                if let Err(e) = tokio::fs::rename(&result.dest_path, &renamed).await {
                    result.type_sniff_error = Some(AttachmentError::Rename(e.to_string()));
                } else {
                    result.dest_path = renamed;
                }
            }
            debug!(url = %url, mime = %detected.mime, path = %result.dest_path.display(), "Attachment type detected");
            result.detected_type = Some(detected);
        }
        Ok(None) => {
            debug!(url = %url, path = %result.dest_path.display(), "Attachment type not recognized");
        }
        Err(error) => {
            warn!(url = %url, error = %error, "Attachment type detection failed");
            result.type_sniff_error = Some(error);
        }
    }

    result
}

async fn create_file(target: &AttachmentTarget) -> Result<(File, PathBuf), (PathBuf, AttachmentError)> {
    match target {
        AttachmentTarget::Path(path) => File::create(path)
            .await
            .map(|file| (file, path.clone()))
            .map_err(|e| (path.clone(), AttachmentError::Create(e.to_string()))),
        AttachmentTarget::TempFile => {
            let temp = tempfile::Builder::new()
                .prefix(TEMP_ATTACHMENT_PREFIX)
                .tempfile()
                .map_err(|e| (std::env::temp_dir(), AttachmentError::Create(e.to_string())))?;
            let (file, path) = temp.keep().map_err(|e| {
                (
                    e.file.path().to_path_buf(),
                    AttachmentError::Create(e.error.to_string()),
                )
            })?;
            Ok((File::from_std(file), path))
        }
    }
}

async fn write_stream<S, B, E>(mut file: File, stream: S) -> Result<(), AttachmentError>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: Display,
{
    let mut stream = std::pin::pin!(stream);
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| AttachmentError::Stream(e.to_string()))?;
        file.write_all(chunk.as_ref())
            .await
            .map_err(|e| AttachmentError::Stream(e.to_string()))?;
    }
    file.flush()
        .await
        .map_err(|e| AttachmentError::Stream(e.to_string()))?;
    Ok(())
}

/// Read the file header back from disk and match it against known signatures.
async fn sniff_file(path: &Path) -> Result<Option<DetectedType>, AttachmentError> {
    let file = File::open(path)
        .await
        .map_err(|e| AttachmentError::Open(e.to_string()))?;

    let mut header = Vec::with_capacity(SNIFF_HEADER_LEN);
    file.take(SNIFF_HEADER_LEN as u64)
        .read_to_end(&mut header)
        .await
        .map_err(|e| AttachmentError::Read(e.to_string()))?;

    if header.is_empty() {
        return Err(AttachmentError::EmptyFile);
    }
    Ok(detect(&header))
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;
    use tempfile::TempDir;

    const PDF: &[u8] = b"%PDF-1.4\n1 0 obj\n<< /Type /Catalog >>\nendobj\ntrailer\n%%EOF\n";

    fn url() -> Url {
        Url::parse("https://example.com/paper").unwrap()
    }

    fn chunks(parts: &[&'static [u8]]) -> impl Stream<Item = Result<&'static [u8], std::io::Error>> {
        stream::iter(parts.iter().map(|p| Ok(*p)).collect::<Vec<_>>())
    }

    #[tokio::test]
    async fn test_pdf_is_renamed() {
        let dir = TempDir::new().unwrap();
        let target = AttachmentTarget::Path(dir.path().join("paper.bin"));

        let attachment = download_stream(&url(), chunks(&[&PDF[..10], &PDF[10..]]), &target).await;

        assert!(attachment.is_valid());
        assert_eq!(attachment.path(), dir.path().join("paper.pdf"));
        assert_eq!(attachment.detected_type().unwrap().mime, "application/pdf");
        assert!(attachment.path().exists());
        assert!(!dir.path().join("paper.bin").exists());
        assert_eq!(std::fs::read(attachment.path()).unwrap(), PDF);

        attachment.delete().await.unwrap();
        assert!(!attachment.path().exists());
    }

    #[tokio::test]
    async fn test_temp_file_target() {
        let attachment = download_stream(&url(), chunks(&[PDF]), &AttachmentTarget::TempFile).await;

        assert!(attachment.is_valid());
        let name = attachment.path().file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with(TEMP_ATTACHMENT_PREFIX));
        assert!(name.ends_with(".pdf"));
        attachment.delete().await.unwrap();
    }

    #[tokio::test]
    async fn test_unknown_type_keeps_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes");
        let attachment = download_stream(
            &url(),
            chunks(&[&b"just some plain text"[..]]),
            &AttachmentTarget::Path(path.clone()),
        )
        .await;

        assert!(attachment.is_valid());
        assert!(attachment.detected_type().is_none());
        assert_eq!(attachment.path(), path);
    }

    #[tokio::test]
    async fn test_empty_body_is_sniff_error() {
        let dir = TempDir::new().unwrap();
        let attachment = download_stream(
            &url(),
            chunks(&[]),
            &AttachmentTarget::Path(dir.path().join("empty")),
        )
        .await;

        assert!(!attachment.is_valid());
        assert!(attachment.download_error.is_none());
        assert_eq!(attachment.type_sniff_error, Some(AttachmentError::EmptyFile));
        // left in place for inspection
        assert!(attachment.path().exists());
    }

    #[tokio::test]
    async fn test_stream_error_keeps_partial_file() {
        let dir = TempDir::new().unwrap();
        let parts: Vec<Result<&[u8], std::io::Error>> = vec![
            Ok(&b"%PDF-1.4\n"[..]),
            Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset")),
        ];
        let attachment = download_stream(
            &url(),
            stream::iter(parts),
            &AttachmentTarget::Path(dir.path().join("partial")),
        )
        .await;

        assert!(!attachment.is_valid());
        assert!(matches!(attachment.download_error, Some(AttachmentError::Stream(_))));
        assert!(attachment.detected_type().is_none());
        assert_eq!(std::fs::read(attachment.path()).unwrap(), b"%PDF-1.4\n");
    }

    #[tokio::test]
    async fn test_uncreatable_path() {
        let dir = TempDir::new().unwrap();
        let target = AttachmentTarget::Path(dir.path().join("missing").join("file"));
        let attachment = download_stream(&url(), chunks(&[PDF]), &target).await;

        assert!(matches!(attachment.download_error, Some(AttachmentError::Create(_))));
        assert!(!attachment.is_valid());
    }
}
