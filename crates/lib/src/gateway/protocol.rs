//! Backend wire types (request bodies and the response fields the workspaces use).

use serde::{Deserialize, Serialize};

use crate::feed::{Attachment, LogEntry, Role};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AskRequest<'a> {
    pub query: &'a str,
    pub workspace_id: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct RunAgentRequest<'a> {
    pub goal: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateWorkspaceRequest<'a> {
    pub workspace_name: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct KnowledgeGraphRequest<'a> {
    pub workspace_id: &'a str,
}

/// Error body of a non-2xx response. Only `message` is read.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
}

/// A file to send to the upload endpoint.
#[derive(Debug, Clone)]
pub struct DocumentUpload {
    pub file_name: String,
    /// Declared MIME type; empty means unknown.
    pub mime_type: String,
    pub bytes: Vec<u8>,
    pub workspace_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadReceipt {
    pub document_id: String,
}

/// Answer to a RAG question.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerPayload {
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default)]
    pub citations: Vec<String>,
    /// Chart description; usually text, but any JSON value is accepted and rendered as text.
    #[serde(default)]
    pub chart_data: Option<serde_json::Value>,
    #[serde(default)]
    pub next_steps: Vec<String>,
}

impl AnswerPayload {
    /// Chart description as display text, if the backend sent a non-empty one.
    pub fn chart_text(&self) -> Option<String> {
        match self.chart_data.as_ref()? {
            serde_json::Value::Null => None,
            serde_json::Value::String(s) if s.trim().is_empty() => None,
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Citations, next steps and chart description as an entry attachment.
    pub fn attachment(&self) -> Attachment {
        Attachment {
            details: None,
            sources: self.citations.clone(),
            next_steps: self.next_steps.clone(),
            chart: self.chart_text(),
        }
    }
}

/// Result of an agent run: the full log, in order.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AgentRun {
    #[serde(default)]
    pub log: Vec<AgentLogRecord>,
}

/// One line of an agent run log as sent by the backend.
#[derive(Debug, Clone, Deserialize)]
pub struct AgentLogRecord {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl AgentLogRecord {
    /// Convert to a feed entry. A fresh local id is always assigned; the backend's timestamp
    /// label is kept when present.
    pub fn into_entry(self) -> LogEntry {
        let mut entry = LogEntry::new(Role::from_wire(&self.kind), self.text).with_attachment(
            Attachment {
                details: self.details.filter(|d| !d.trim().is_empty()),
                ..Attachment::default()
            },
        );
        if let Some(ts) = self.timestamp.filter(|t| !t.trim().is_empty()) {
            entry.timestamp = ts;
        }
        entry
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedWorkspace {
    pub workspace_id: String,
    #[serde(default)]
    pub invite_link: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinedWorkspace {
    pub workspace_id: String,
    #[serde(default)]
    pub workspace_name: String,
    #[serde(default)]
    pub invite_link: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DocumentList {
    #[serde(default)]
    pub documents: Vec<RemoteDocument>,
}

/// A document already stored in a workspace.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteDocument {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub owner_id: Option<String>,
    #[serde(default)]
    pub uploaded_at: Option<String>,
    /// MIME type of the original upload (e.g. "application/pdf").
    #[serde(default)]
    pub original_type: Option<String>,
}
