//! Ordered log of entries shown in a workspace feed (chat messages or agent log lines).
//!
//! Entries are kept in insertion order; timestamps are display labels only. Placeholders
//! (`pending` entries) are resolved by id: replaced in place for single answers, or removed
//! and followed by a batch for agent runs. Clearing the feed starts a new epoch so that
//! results belonging to an earlier epoch can be recognized and dropped.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Opaque entry identifier, stable for the entry's lifetime.
pub type EntryId = String;

/// Who (or what) produced an entry. Chat surfaces use user/assistant/system;
/// the agent surface uses the remaining kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    System,
    Goal,
    Plan,
    ToolExecution,
    Status,
    Result,
    Error,
}

impl Role {
    /// Parse a wire role name (as sent in agent run logs). Unknown names map to `Status`.
    pub fn from_wire(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "user" => Role::User,
            "assistant" | "ai" => Role::Assistant,
            "system" => Role::System,
            "goal" => Role::Goal,
            "plan" => Role::Plan,
            "tool_execution" | "tool" => Role::ToolExecution,
            "result" => Role::Result,
            "error" => Role::Error,
            _ => Role::Status,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
            Role::Goal => "goal",
            Role::Plan => "plan",
            Role::ToolExecution => "tool_execution",
            Role::Status => "status",
            Role::Result => "result",
            Role::Error => "error",
        }
    }
}

/// Secondary payload attached to an entry. Any subset of the fields may be present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub next_steps: Vec<String>,
    /// Chart description text returned alongside an answer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart: Option<String>,
}

impl Attachment {
    pub fn is_empty(&self) -> bool {
        self.details.is_none()
            && self.sources.is_empty()
            && self.next_steps.is_empty()
            && self.chart.is_none()
    }
}

/// One displayed line in a feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub id: EntryId,
    pub role: Role,
    pub text: String,
    /// Wall-clock label (HH:MM:SS) taken at creation.
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment: Option<Attachment>,
    /// True while this entry is a placeholder awaiting a network result.
    #[serde(default)]
    pub pending: bool,
    /// Display name of the author (team workspaces).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<String>,
}

fn new_entry_id() -> EntryId {
    format!("msg-{}", uuid::Uuid::new_v4())
}

/// Local time label used for entries and uploaded files.
pub(crate) fn time_label() -> String {
    chrono::Local::now().format("%H:%M:%S").to_string()
}

impl LogEntry {
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            id: new_entry_id(),
            role,
            text: text.into(),
            timestamp: time_label(),
            attachment: None,
            pending: false,
            sender: None,
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, text)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, text)
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::new(Role::System, text)
    }

    /// A pending placeholder with the given role and display text.
    pub fn placeholder(role: Role, text: impl Into<String>) -> Self {
        Self {
            pending: true,
            ..Self::new(role, text)
        }
    }

    /// Attach a payload; empty attachments are dropped.
    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachment = if attachment.is_empty() {
            None
        } else {
            Some(attachment)
        };
        self
    }

    pub fn with_sender(mut self, sender: impl Into<String>) -> Self {
        self.sender = Some(sender.into());
        self
    }

    pub fn sources(&self) -> &[String] {
        self.attachment
            .as_ref()
            .map(|a| a.sources.as_slice())
            .unwrap_or(&[])
    }
}

/// How a placeholder was settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The placeholder was found and swapped for the result.
    Replaced,
    /// The placeholder was gone; the result was appended at the end instead.
    Appended,
    /// The feed was cleared after the exchange started; the result was dropped.
    Stale,
}

/// Shared, ordered feed of log entries. Cloning yields another handle to the same feed.
#[derive(Clone, Default)]
pub struct LogStore {
    inner: Arc<RwLock<Vec<LogEntry>>>,
    epoch: Arc<AtomicU64>,
}

impl LogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current epoch; bumped by every `clear`.
    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    /// Append one entry; returns its id.
    pub async fn append(&self, entry: LogEntry) -> EntryId {
        let id = entry.id.clone();
        self.inner.write().await.push(entry);
        id
    }

    /// Append several entries contiguously, preserving their order.
    pub async fn append_all(&self, entries: Vec<LogEntry>) {
        self.inner.write().await.extend(entries);
    }

    /// Replace the first entry matching `pred` with `entry`, keeping the replaced entry's id
    /// and position. Returns false when nothing matched.
    pub async fn replace_first<F>(&self, pred: F, entry: LogEntry) -> bool
    where
        F: Fn(&LogEntry) -> bool,
    {
        let mut g = self.inner.write().await;
        replace_in(&mut g, pred, entry)
    }

    /// Remove the first entry matching `pred` and return it.
    pub async fn remove_first<F>(&self, pred: F) -> Option<LogEntry>
    where
        F: Fn(&LogEntry) -> bool,
    {
        let mut g = self.inner.write().await;
        let index = g.iter().position(|e| pred(e))?;
        Some(g.remove(index))
    }

    /// Swap the placeholder `placeholder_id` for `resolved`. Falls back to appending when the
    /// placeholder is gone; drops the result when the feed was cleared since `epoch`.
    pub async fn resolve_placeholder(
        &self,
        placeholder_id: &str,
        resolved: LogEntry,
        epoch: u64,
    ) -> Resolution {
        let mut g = self.inner.write().await;
        if self.epoch() != epoch {
            log::debug!("feed: dropping result for {} from epoch {}", placeholder_id, epoch);
            return Resolution::Stale;
        }
        if replace_in(&mut g, |e| e.id == placeholder_id, resolved.clone()) {
            Resolution::Replaced
        } else {
            log::debug!("feed: placeholder {} not found, appending result", placeholder_id);
            g.push(resolved);
            Resolution::Appended
        }
    }

    /// Remove the placeholder `placeholder_id` and append `batch` in order. The batch is
    /// appended even if the placeholder is gone; dropped when the feed was cleared since `epoch`.
    pub async fn settle_with_batch(
        &self,
        placeholder_id: &str,
        batch: Vec<LogEntry>,
        epoch: u64,
    ) -> Resolution {
        let mut g = self.inner.write().await;
        if self.epoch() != epoch {
            log::debug!("feed: dropping batch for {} from epoch {}", placeholder_id, epoch);
            return Resolution::Stale;
        }
        let resolution = match g.iter().position(|e| e.id == placeholder_id) {
            Some(index) => {
                g.remove(index);
                Resolution::Replaced
            }
            None => Resolution::Appended,
        };
        g.extend(batch);
        resolution
    }

    /// Remove every entry and start a new epoch.
    pub async fn clear(&self) {
        let mut g = self.inner.write().await;
        g.clear();
        self.epoch.fetch_add(1, Ordering::SeqCst);
    }

    /// A copy of all entries in order.
    pub async fn snapshot(&self) -> Vec<LogEntry> {
        self.inner.read().await.clone()
    }

    pub async fn get(&self, id: &str) -> Option<LogEntry> {
        self.inner.read().await.iter().find(|e| e.id == id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }

    pub async fn pending_count(&self) -> usize {
        self.inner.read().await.iter().filter(|e| e.pending).count()
    }
}

fn replace_in<F>(entries: &mut [LogEntry], pred: F, mut entry: LogEntry) -> bool
where
    F: Fn(&LogEntry) -> bool,
{
    match entries.iter_mut().find(|e| pred(e)) {
        Some(slot) => {
            entry.id = slot.id.clone();
            *slot = entry;
            true
        }
        None => false,
    }
}
