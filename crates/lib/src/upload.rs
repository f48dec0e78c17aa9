//! Uploaded file records and the sequential upload loop.
//!
//! Selected files are checked against the surface's accept policy, registered up front as
//! `pending`, then uploaded one at a time: the next upload starts only after the previous one
//! has settled. Each step is announced in the feed.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::{InFlight, Rejection};
use crate::feed::{time_label, LogEntry, LogStore};
use crate::gateway::{DocumentUpload, Gateway, RemoteDocument};

/// Upload lifecycle. Moves forward only: pending → processing → processed | failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Pending,
    Processing,
    Processed,
    Failed,
}

impl FileStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, FileStatus::Processed | FileStatus::Failed)
    }

    pub fn can_advance_to(&self, next: FileStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        matches!(
            (self, next),
            (FileStatus::Pending, FileStatus::Processing)
                | (FileStatus::Processing, FileStatus::Processed)
                | (FileStatus::Processing, FileStatus::Failed)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("unknown file {0}")]
    UnknownFile(String),
    #[error("cannot move file from {from:?} to {to:?}")]
    Backwards { from: FileStatus, to: FileStatus },
}

/// A file known to the workspace: selected locally or listed by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFile {
    pub id: String,
    pub name: String,
    pub declared_type: String,
    pub size_bytes: u64,
    pub status: FileStatus,
    /// Backend document id; set only once the file is processed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_document_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uploaded_by: Option<String>,
    pub uploaded_at: String,
}

impl UploadedFile {
    fn pending(file: &SelectedFile, uploaded_by: Option<String>) -> Self {
        Self {
            id: format!("file-{}", uuid::Uuid::new_v4()),
            name: file.name.clone(),
            declared_type: file.declared_type.clone(),
            size_bytes: file.bytes.len() as u64,
            status: FileStatus::Pending,
            remote_document_id: None,
            uploaded_by,
            uploaded_at: time_label(),
        }
    }

    /// A document the backend already holds, shown as processed.
    pub fn from_remote(doc: RemoteDocument) -> Self {
        Self {
            id: doc.id.clone(),
            name: doc.filename,
            declared_type: doc.original_type.unwrap_or_default(),
            size_bytes: 0,
            status: FileStatus::Processed,
            remote_document_id: Some(doc.id),
            uploaded_by: Some(
                doc.owner_id
                    .filter(|o| !o.trim().is_empty())
                    .unwrap_or_else(|| "Unknown".to_string()),
            ),
            uploaded_at: doc.uploaded_at.unwrap_or_default(),
        }
    }
}

/// Shared, ordered list of uploaded files. Records are never removed.
#[derive(Clone, Default)]
pub struct FileRegistry {
    inner: Arc<RwLock<Vec<UploadedFile>>>,
}

impl FileRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, files: Vec<UploadedFile>) {
        self.inner.write().await.extend(files);
    }

    /// Move a file forward in its lifecycle. `remote_document_id` is recorded only when
    /// entering `Processed`.
    pub async fn advance(
        &self,
        id: &str,
        next: FileStatus,
        remote_document_id: Option<String>,
    ) -> Result<(), TransitionError> {
        let mut g = self.inner.write().await;
        let file = g
            .iter_mut()
            .find(|f| f.id == id)
            .ok_or_else(|| TransitionError::UnknownFile(id.to_string()))?;
        if !file.status.can_advance_to(next) {
            return Err(TransitionError::Backwards {
                from: file.status,
                to: next,
            });
        }
        file.status = next;
        if next == FileStatus::Processed {
            file.remote_document_id = remote_document_id;
        }
        Ok(())
    }

    pub async fn snapshot(&self) -> Vec<UploadedFile> {
        self.inner.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

/// A file chosen by the user, with its content.
#[derive(Debug, Clone)]
pub struct SelectedFile {
    pub name: String,
    /// MIME type as declared by the picker (or guessed from the extension).
    pub declared_type: String,
    pub bytes: Vec<u8>,
}

impl SelectedFile {
    pub fn new(name: impl Into<String>, declared_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            declared_type: declared_type.into(),
            bytes,
        }
    }

    /// Read a file from disk; the declared type is guessed from its extension.
    pub async fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::new(name, mime_for_path(path), bytes))
    }

    /// Lower-case extension of the file name, without the dot.
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.name)
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
    }
}

/// MIME type guessed from the file extension; empty when unknown.
pub fn mime_for_path(path: &Path) -> String {
    mime_guess::from_path(path)
        .first()
        .map(|m| m.essence_str().to_string())
        .unwrap_or_default()
}

/// Which files a surface takes. A file is accepted when its declared type is listed or its
/// extension is listed; an empty policy accepts everything.
#[derive(Debug, Clone, Default)]
pub struct AcceptPolicy {
    mime_types: Vec<String>,
    extensions: Vec<String>,
    notice: Option<String>,
}

impl AcceptPolicy {
    pub fn any() -> Self {
        Self::default()
    }

    /// Declared type must be exactly `application/pdf`.
    pub fn pdf_only() -> Self {
        Self {
            mime_types: vec!["application/pdf".to_string()],
            extensions: Vec::new(),
            notice: Some("Please upload a valid PDF file.".to_string()),
        }
    }

    /// Office documents, spreadsheets and text, by extension.
    pub fn documents() -> Self {
        Self {
            mime_types: Vec::new(),
            extensions: ["pdf", "doc", "docx", "csv", "xlsx", "txt"]
                .into_iter()
                .map(String::from)
                .collect(),
            notice: None,
        }
    }

    pub fn accepts(&self, file: &SelectedFile) -> bool {
        if self.mime_types.is_empty() && self.extensions.is_empty() {
            return true;
        }
        let declared = file.declared_type.trim().to_ascii_lowercase();
        if self.mime_types.iter().any(|m| *m == declared) {
            return true;
        }
        file.extension()
            .map(|ext| self.extensions.iter().any(|e| *e == ext))
            .unwrap_or(false)
    }

    /// Inline feed text for a refused file.
    pub fn rejection_notice(&self, file: &SelectedFile) -> String {
        match &self.notice {
            Some(n) => n.clone(),
            None => format!("\"{}\" is not a supported file type.", file.name),
        }
    }
}

/// What happened to one selection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadReport {
    /// Registry ids of files that were processed.
    pub processed: Vec<String>,
    /// Registry ids of files that failed.
    pub failed: Vec<String>,
    /// Names of files refused by the accept policy (never registered).
    pub rejected: Vec<String>,
}

/// Uploads selections one file at a time and keeps the feed and file registry in step.
pub struct UploadSequencer {
    gateway: Arc<dyn Gateway>,
    feed: LogStore,
    files: FileRegistry,
    policy: AcceptPolicy,
    /// Set on team surfaces: messages name the uploader and carry a "System" sender.
    uploader: Option<String>,
    busy: AtomicBool,
}

impl UploadSequencer {
    pub fn new(
        gateway: Arc<dyn Gateway>,
        feed: LogStore,
        files: FileRegistry,
        policy: AcceptPolicy,
        uploader: Option<String>,
    ) -> Self {
        Self {
            gateway,
            feed,
            files,
            policy,
            uploader,
            busy: AtomicBool::new(false),
        }
    }

    pub fn files(&self) -> &FileRegistry {
        &self.files
    }

    fn notice(&self, text: String) -> LogEntry {
        let entry = LogEntry::system(text);
        if self.uploader.is_some() {
            entry.with_sender("System")
        } else {
            entry
        }
    }

    /// Upload `selected` into `workspace_id`, strictly one after another.
    pub async fn run(
        &self,
        selected: Vec<SelectedFile>,
        workspace_id: &str,
    ) -> Result<UploadReport, Rejection> {
        if selected.is_empty() {
            return Err(Rejection::EmptyInput);
        }
        let _busy = InFlight::acquire(&self.busy)?;

        let mut report = UploadReport::default();
        let mut accepted = Vec::new();
        for file in selected {
            if self.policy.accepts(&file) {
                accepted.push(file);
            } else {
                log::debug!(
                    "upload: rejecting {} (declared type {:?})",
                    file.name,
                    file.declared_type
                );
                self.feed
                    .append(self.notice(self.policy.rejection_notice(&file)))
                    .await;
                report.rejected.push(file.name);
            }
        }
        if accepted.is_empty() {
            return Err(Rejection::NoAcceptedFiles);
        }

        let records: Vec<UploadedFile> = accepted
            .iter()
            .map(|f| UploadedFile::pending(f, self.uploader.clone()))
            .collect();
        let ids: Vec<String> = records.iter().map(|r| r.id.clone()).collect();
        self.files.register(records).await;

        for (file, id) in accepted.into_iter().zip(ids) {
            if let Err(e) = self.files.advance(&id, FileStatus::Processing, None).await {
                log::warn!("upload: {}", e);
            }
            let start = match &self.uploader {
                Some(user) => format!("{} is uploading and processing \"{}\"...", user, file.name),
                None => format!("Uploading and processing \"{}\"...", file.name),
            };
            self.feed.append(self.notice(start)).await;

            let name = file.name.clone();
            let upload = DocumentUpload {
                file_name: file.name,
                mime_type: file.declared_type,
                bytes: file.bytes,
                workspace_id: workspace_id.to_string(),
            };
            match self.gateway.upload_document(upload).await {
                Ok(receipt) => {
                    if let Err(e) = self
                        .files
                        .advance(&id, FileStatus::Processed, Some(receipt.document_id))
                        .await
                    {
                        log::warn!("upload: {}", e);
                    }
                    let done = match &self.uploader {
                        Some(user) => format!(
                            "\"{}\" uploaded by {} and processed successfully!",
                            name, user
                        ),
                        None => format!("\"{}\" processed successfully!", name),
                    };
                    self.feed.append(self.notice(done)).await;
                    report.processed.push(id);
                }
                Err(e) => {
                    log::warn!("upload: {} failed: {}", name, e);
                    if let Err(e) = self.files.advance(&id, FileStatus::Failed, None).await {
                        log::warn!("upload: {}", e);
                    }
                    let failed = match &self.uploader {
                        Some(_) => format!("Error uploading \"{}\": {}", name, e),
                        None => format!("Error processing \"{}\": {}", name, e),
                    };
                    self.feed.append(self.notice(failed)).await;
                    report.failed.push(id);
                }
            }
        }
        Ok(report)
    }
}
