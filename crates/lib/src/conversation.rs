//! Question/answer exchanges against the backend.
//!
//! An exchange appends the user's entry, then a pending placeholder, awaits the backend, and
//! settles the placeholder: replaced in place by the answer (or an error line), or, for agent
//! runs, removed and followed by the run's log. The draft is taken (cleared) as soon as the
//! input is accepted. A result whose placeholder has vanished is appended; a result from before
//! the feed was last cleared is dropped.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use crate::error::{InFlight, Rejection};
use crate::feed::{EntryId, LogEntry, LogStore, Resolution, Role};
use crate::gateway::{AnswerPayload, Gateway};

const THINKING_TEXT: &str = "...";
const PLANNING_TEXT: &str = "Agent is planning steps...";
const NO_ANSWER_TEXT: &str = "I'm sorry, I couldn't find an answer based on the provided context.";

/// Whether the backend answers with one entry or a batch of log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseMode {
    Single,
    Batch,
}

/// Per-surface presentation choices.
#[derive(Debug, Clone, Default)]
pub struct ConversationOptions {
    /// Also write citations into the answer text as "(Sources: a, b)".
    pub inline_citations: bool,
    /// Sender label for user entries; when set, assistant entries are labelled "AI".
    pub sender: Option<String>,
}

/// How an accepted exchange ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeOutcome {
    pub placeholder: EntryId,
    pub resolution: Resolution,
    /// True when the backend call failed and an error line was written instead.
    pub failed: bool,
}

pub struct ConversationController {
    gateway: Arc<dyn Gateway>,
    feed: LogStore,
    options: ConversationOptions,
    busy: AtomicBool,
}

/// Take the trimmed draft, leaving it empty. Empty or whitespace-only drafts are left as-is.
fn take_draft(draft: &mut String) -> Result<String, Rejection> {
    let text = draft.trim().to_string();
    if text.is_empty() {
        return Err(Rejection::EmptyInput);
    }
    draft.clear();
    Ok(text)
}

impl ConversationController {
    pub fn new(gateway: Arc<dyn Gateway>, feed: LogStore, options: ConversationOptions) -> Self {
        Self {
            gateway,
            feed,
            options,
            busy: AtomicBool::new(false),
        }
    }

    pub fn feed(&self) -> &LogStore {
        &self.feed
    }

    fn labelled(&self, entry: LogEntry, sender: &str) -> LogEntry {
        if self.options.sender.is_some() {
            entry.with_sender(sender)
        } else {
            entry
        }
    }

    /// Ask a question against `workspace_id`. The placeholder is always settled before return.
    pub async fn ask(
        &self,
        draft: &mut String,
        workspace_id: &str,
    ) -> Result<ExchangeOutcome, Rejection> {
        if draft.trim().is_empty() {
            return Err(Rejection::EmptyInput);
        }
        let _busy = InFlight::acquire(&self.busy)?;
        let query = take_draft(draft)?;
        let epoch = self.feed.epoch();

        let user_label = self.options.sender.as_deref().unwrap_or_default();
        self.feed
            .append(self.labelled(LogEntry::user(query.clone()), user_label))
            .await;
        let placeholder = self
            .feed
            .append(self.labelled(LogEntry::placeholder(Role::Assistant, THINKING_TEXT), "AI"))
            .await;
        log::debug!("conversation: asking in {} (placeholder {})", workspace_id, placeholder);

        let (entry, failed) = match self.gateway.ask(&query, workspace_id).await {
            Ok(payload) => (self.answer_entry(&payload), false),
            Err(e) => {
                log::warn!("conversation: ask failed: {}", e);
                (LogEntry::assistant(format!("Error: {}", e)), true)
            }
        };
        let entry = self.labelled(entry, "AI");
        let resolution = self.feed.resolve_placeholder(&placeholder, entry, epoch).await;
        Ok(ExchangeOutcome {
            placeholder,
            resolution,
            failed,
        })
    }

    fn answer_entry(&self, payload: &AnswerPayload) -> LogEntry {
        let mut text = payload
            .answer
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .unwrap_or(NO_ANSWER_TEXT)
            .to_string();
        if self.options.inline_citations && !payload.citations.is_empty() {
            text = format!("{} (Sources: {})", text, payload.citations.join(", "));
        }
        LogEntry::assistant(text).with_attachment(payload.attachment())
    }

    /// Run an agent goal. The feed is cleared first; the run's log replaces the placeholder.
    pub async fn run_goal(&self, draft: &mut String) -> Result<ExchangeOutcome, Rejection> {
        if draft.trim().is_empty() {
            return Err(Rejection::EmptyInput);
        }
        let _busy = InFlight::acquire(&self.busy)?;
        let goal = take_draft(draft)?;

        self.feed.clear().await;
        let epoch = self.feed.epoch();
        self.feed
            .append(LogEntry::new(Role::Goal, format!("Goal received: \"{}\"", goal)))
            .await;
        let placeholder = self
            .feed
            .append(LogEntry::placeholder(Role::Status, PLANNING_TEXT))
            .await;

        let (batch, failed) = match self.gateway.run_agent(&goal).await {
            Ok(run) => {
                log::info!("conversation: agent run returned {} log entries", run.log.len());
                let batch: Vec<LogEntry> = run.log.into_iter().map(|r| r.into_entry()).collect();
                (batch, false)
            }
            Err(e) => {
                log::warn!("conversation: agent run failed: {}", e);
                let entry = LogEntry::new(Role::Error, format!("Agent execution failed: {}", e));
                (vec![entry], true)
            }
        };
        let resolution = self.feed.settle_with_batch(&placeholder, batch, epoch).await;
        Ok(ExchangeOutcome {
            placeholder,
            resolution,
            failed,
        })
    }
}
