//! Attachment ingestion
//!
//! Turns raw files into [`Attachment`]s embedded as base64 data URLs.
//! Files are handled one at a time; an oversized or unreadable file is
//! reported and skipped without stopping the rest of the batch. Accepted
//! attachments are added to the capsule only once the whole batch has
//! been scanned, and the capsule is not saved here.

use std::io;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::Utc;
use thiserror::Error;
use tracing::{debug, warn};

use crate::id::new_id;
use crate::models::{Attachment, Capsule};

/// Largest file accepted at ingestion (5 MiB)
pub const MAX_ATTACHMENT_BYTES: u64 = 5 * 1024 * 1024;

const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// A file was larger than [`MAX_ATTACHMENT_BYTES`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("File '{name}' is too large ({size} bytes). Maximum size is {limit} bytes.")]
pub struct SizeLimitError {
    pub name: String,
    pub size: u64,
    pub limit: u64,
}

/// Why a single file in a batch was skipped
#[derive(Error, Debug)]
pub enum IngestFailure {
    #[error(transparent)]
    TooLarge(#[from] SizeLimitError),

    #[error("Failed to read '{name}': {source}")]
    Read {
        name: String,
        #[source]
        source: io::Error,
    },
}

impl IngestFailure {
    /// Name of the file that was skipped
    pub fn file_name(&self) -> &str {
        match self {
            IngestFailure::TooLarge(err) => &err.name,
            IngestFailure::Read { name, .. } => name,
        }
    }
}

/// A file waiting to be ingested
#[derive(Debug, Clone)]
pub enum PendingFile {
    /// Bytes already acquired by the caller
    Bytes {
        name: String,
        mime_type: String,
        data: Vec<u8>,
    },
    /// A file on disk, read during ingestion
    Path {
        path: PathBuf,
        mime_type: Option<String>,
    },
}

impl PendingFile {
    pub fn from_bytes(
        name: impl Into<String>,
        mime_type: impl Into<String>,
        data: Vec<u8>,
    ) -> Self {
        PendingFile::Bytes {
            name: name.into(),
            mime_type: mime_type.into(),
            data,
        }
    }

    /// A file on disk whose MIME type is guessed from its extension
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        PendingFile::Path {
            path: path.into(),
            mime_type: None,
        }
    }

    pub fn name(&self) -> String {
        match self {
            PendingFile::Bytes { name, .. } => name.clone(),
            PendingFile::Path { path, .. } => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string()),
        }
    }

    pub fn mime_type(&self) -> String {
        match self {
            PendingFile::Bytes { mime_type, .. } => mime_type.clone(),
            PendingFile::Path { path, mime_type } => mime_type
                .clone()
                .unwrap_or_else(|| guess_mime_type(path).to_string()),
        }
    }

    async fn size(&self) -> io::Result<u64> {
        match self {
            PendingFile::Bytes { data, .. } => Ok(data.len() as u64),
            PendingFile::Path { path, .. } => Ok(tokio::fs::metadata(path).await?.len()),
        }
    }

    async fn read(self) -> io::Result<Vec<u8>> {
        match self {
            PendingFile::Bytes { data, .. } => Ok(data),
            PendingFile::Path { path, .. } => tokio::fs::read(path).await,
        }
    }
}

/// Outcome of [`ingest_batch`]
#[derive(Debug, Default)]
pub struct IngestReport {
    /// Ids of the attachments added to the capsule, in batch order
    pub added: Vec<String>,
    /// Files that were skipped
    pub failures: Vec<IngestFailure>,
}

impl IngestReport {
    /// Files skipped for exceeding the size limit
    pub fn size_limit_errors(&self) -> impl Iterator<Item = &SizeLimitError> {
        self.failures.iter().filter_map(|f| match f {
            IngestFailure::TooLarge(err) => Some(err),
            IngestFailure::Read { .. } => None,
        })
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Ingest a batch of files into `capsule`
pub async fn ingest_batch(capsule: &mut Capsule, files: Vec<PendingFile>) -> IngestReport {
    let mut accepted = Vec::new();
    let mut report = IngestReport::default();

    for file in files {
        match ingest_file(file).await {
            Ok(attachment) => {
                debug!("Encoded attachment {} ({} bytes)", attachment.name, attachment.size);
                accepted.push(attachment);
            }
            Err(failure) => {
                warn!("Skipping attachment: {}", failure);
                report.failures.push(failure);
            }
        }
    }

    if !accepted.is_empty() {
        report.added = accepted.iter().map(|a| a.id.clone()).collect();
        capsule.attachments.extend(accepted);
        capsule.touch();
    }
    report
}

async fn ingest_file(file: PendingFile) -> Result<Attachment, IngestFailure> {
    let name = file.name();
    let read_error = |source| IngestFailure::Read {
        name: name.clone(),
        source,
    };

    check_size(&name, file.size().await.map_err(read_error)?)?;

    let mime_type = file.mime_type();
    let data = file.read().await.map_err(read_error)?;
    // A file on disk can grow after its size was taken
    check_size(&name, data.len() as u64)?;
    // Let other tasks run between files
    tokio::task::yield_now().await;

    Ok(Attachment {
        id: new_id(),
        name: name.clone(),
        data_url: encode_data_url(&mime_type, &data),
        mime_type,
        size: data.len() as u64,
        uploaded_at: Utc::now(),
    })
}

fn check_size(name: &str, size: u64) -> Result<(), SizeLimitError> {
    if size > MAX_ATTACHMENT_BYTES {
        return Err(SizeLimitError {
            name: name.to_string(),
            size,
            limit: MAX_ATTACHMENT_BYTES,
        });
    }
    Ok(())
}

/// Build a `data:<mime>;base64,<payload>` URL
pub fn encode_data_url(mime_type: &str, data: &[u8]) -> String {
    format!("data:{};base64,{}", mime_type, STANDARD.encode(data))
}

/// Split a base64 data URL back into its MIME type and bytes
pub fn decode_data_url(url: &str) -> Option<(String, Vec<u8>)> {
    let rest = url.strip_prefix("data:")?;
    let (mime_type, payload) = rest.split_once(";base64,")?;
    let data = STANDARD.decode(payload).ok()?;
    Some((mime_type.to_string(), data))
}

/// MIME type for a path based on its extension
pub fn guess_mime_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "txt" => "text/plain",
        "md" | "markdown" => "text/markdown",
        "csv" => "text/csv",
        "html" | "htm" => "text/html",
        "json" => "application/json",
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "mp4" => "video/mp4",
        _ => DEFAULT_MIME_TYPE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_oversized_file_is_skipped_not_fatal() {
        let mut capsule = Capsule::new();
        let files = vec![
            PendingFile::from_bytes("small.txt", "text/plain", vec![b'a'; 1024]),
            PendingFile::from_bytes("big.bin", DEFAULT_MIME_TYPE, vec![0; 6 * 1024 * 1024]),
        ];

        let report = ingest_batch(&mut capsule, files).await;

        assert_eq!(capsule.attachments.len(), 1);
        assert_eq!(report.added, vec![capsule.attachments[0].id.clone()]);
        let errors: Vec<&SizeLimitError> = report.size_limit_errors().collect();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].name, "big.bin");
        assert_eq!(errors[0].size, 6 * 1024 * 1024);
        assert_eq!(errors[0].limit, MAX_ATTACHMENT_BYTES);

        let attachment = &capsule.attachments[0];
        assert_eq!(attachment.name, "small.txt");
        assert_eq!(attachment.size, 1024);
        assert!(attachment.data_url.starts_with("data:text/plain;base64,"));
    }

    #[tokio::test]
    async fn test_exactly_at_limit_is_accepted() {
        let mut capsule = Capsule::new();
        let files = vec![PendingFile::from_bytes(
            "edge.bin",
            DEFAULT_MIME_TYPE,
            vec![1; MAX_ATTACHMENT_BYTES as usize],
        )];

        let report = ingest_batch(&mut capsule, files).await;
        assert!(report.is_clean());
        assert_eq!(capsule.attachments.len(), 1);
    }

    #[test]
    fn test_check_size() {
        assert!(check_size("edge.bin", MAX_ATTACHMENT_BYTES).is_ok());
        assert_eq!(
            check_size("grown.log", MAX_ATTACHMENT_BYTES + 1),
            Err(SizeLimitError {
                name: "grown.log".to_string(),
                size: MAX_ATTACHMENT_BYTES + 1,
                limit: MAX_ATTACHMENT_BYTES,
            })
        );
    }

    #[tokio::test]
    async fn test_oversized_file_on_disk_is_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("huge.log");
        std::fs::write(&path, vec![b'x'; MAX_ATTACHMENT_BYTES as usize + 1]).unwrap();

        let mut capsule = Capsule::new();
        let report = ingest_batch(&mut capsule, vec![PendingFile::from_path(&path)]).await;

        assert!(capsule.attachments.is_empty());
        let errors: Vec<&SizeLimitError> = report.size_limit_errors().collect();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].name, "huge.log");
    }

    #[tokio::test]
    async fn test_batch_appends_after_existing_attachments() {
        let mut capsule = Capsule::new();
        ingest_batch(
            &mut capsule,
            vec![PendingFile::from_bytes("one.txt", "text/plain", b"1".to_vec())],
        )
        .await;
        ingest_batch(
            &mut capsule,
            vec![
                PendingFile::from_bytes("two.txt", "text/plain", b"2".to_vec()),
                PendingFile::from_bytes("three.txt", "text/plain", b"3".to_vec()),
            ],
        )
        .await;

        let names: Vec<&str> = capsule.attachments.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["one.txt", "two.txt", "three.txt"]);
    }

    #[tokio::test]
    async fn test_path_files_and_read_failures() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("photo.PNG");
        std::fs::write(&path, [0x89, b'P', b'N', b'G']).unwrap();
        let missing = temp_dir.path().join("missing.txt");

        let mut capsule = Capsule::new();
        let report = ingest_batch(
            &mut capsule,
            vec![PendingFile::from_path(&missing), PendingFile::from_path(&path)],
        )
        .await;

        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].file_name(), "missing.txt");
        assert!(matches!(report.failures[0], IngestFailure::Read { .. }));

        let attachment = &capsule.attachments[0];
        assert_eq!(attachment.name, "photo.PNG");
        assert_eq!(attachment.mime_type, "image/png");
        assert_eq!(
            decode_data_url(&attachment.data_url),
            Some(("image/png".to_string(), vec![0x89, b'P', b'N', b'G']))
        );
    }

    #[tokio::test]
    async fn test_empty_batch_leaves_capsule_untouched() {
        let mut capsule = Capsule::new();
        let before = capsule.clone();
        let report = ingest_batch(&mut capsule, Vec::new()).await;
        assert!(report.added.is_empty());
        assert_eq!(capsule, before);
    }

    #[test]
    fn test_guess_mime_type() {
        assert_eq!(guess_mime_type(Path::new("a/b/notes.md")), "text/markdown");
        assert_eq!(guess_mime_type(Path::new("scan.Pdf")), "application/pdf");
        assert_eq!(guess_mime_type(Path::new("no_extension")), DEFAULT_MIME_TYPE);
    }

    #[test]
    fn test_decode_rejects_non_data_urls() {
        assert!(decode_data_url("https://example.com/a.png").is_none());
        assert!(decode_data_url("data:text/plain,plain").is_none());
    }
}
