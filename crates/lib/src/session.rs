//! Team workspace session and the create/join gate in front of chat and uploads.
//!
//! The gate starts at `NoSession`. Create and join each move it to `Creating` / `Joining` for
//! the duration of the backend calls and to `Active` only once everything succeeded (join also
//! loads the workspace's documents). Any failure returns it to `NoSession` and writes an error
//! line to the feed.

use std::sync::Arc;
use reqwest::Url;
use tokio::sync::RwLock;

use crate::error::Rejection;
use crate::feed::{LogEntry, LogStore};
use crate::gateway::Gateway;
use crate::upload::{FileRegistry, UploadedFile};

/// An established workspace.
#[derive(Clone)]
pub struct WorkspaceSession {
    pub id: String,
    pub display_name: String,
    pub invite_token: String,
    /// Shareable link as returned by the backend; empty when it sent none.
    pub invite_link: String,
    pub members: Vec<String>,
    /// Shared with the surface's upload sequencer.
    pub files: FileRegistry,
}

impl std::fmt::Debug for WorkspaceSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkspaceSession")
            .field("id", &self.id)
            .field("display_name", &self.display_name)
            .field("invite_token", &self.invite_token)
            .field("invite_link", &self.invite_link)
            .field("members", &self.members)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub enum GateState {
    NoSession,
    Creating,
    Joining,
    Active(WorkspaceSession),
}

impl GateState {
    pub fn session(&self) -> Option<&WorkspaceSession> {
        match self {
            GateState::Active(s) => Some(s),
            _ => None,
        }
    }
}

/// The invite token from either a bare token or a pasted invite link (last non-empty path
/// segment). Links without a scheme are read as `http://` links.
pub fn invite_token_from(input: &str) -> Option<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }
    if !trimmed.contains('/') {
        return Some(trimmed.to_string());
    }
    let url = if trimmed.contains("://") {
        Url::parse(trimmed)
    } else {
        Url::parse(&format!("http://{}", trimmed))
    }
    .ok()?;
    url.path_segments()?
        .filter(|s| !s.is_empty())
        .last()
        .map(str::to_string)
}

pub struct WorkspaceGate {
    gateway: Arc<dyn Gateway>,
    feed: LogStore,
    files: FileRegistry,
    current_user: String,
    state: Arc<RwLock<GateState>>,
}

impl WorkspaceGate {
    pub fn new(
        gateway: Arc<dyn Gateway>,
        feed: LogStore,
        files: FileRegistry,
        current_user: impl Into<String>,
    ) -> Self {
        Self {
            gateway,
            feed,
            files,
            current_user: current_user.into(),
            state: Arc::new(RwLock::new(GateState::NoSession)),
        }
    }

    pub async fn state(&self) -> GateState {
        self.state.read().await.clone()
    }

    /// The active session, if any.
    pub async fn session(&self) -> Option<WorkspaceSession> {
        self.state.read().await.session().cloned()
    }

    /// Move from `NoSession` to `next`, or explain why not.
    async fn begin(&self, next: GateState) -> Result<(), Rejection> {
        let mut g = self.state.write().await;
        match &*g {
            GateState::NoSession => {
                *g = next;
                Ok(())
            }
            GateState::Active(s) => Err(Rejection::AlreadyInWorkspace(s.display_name.clone())),
            GateState::Creating | GateState::Joining => Err(Rejection::Busy),
        }
    }

    async fn finish(&self, outcome: Option<WorkspaceSession>) {
        let mut g = self.state.write().await;
        *g = match outcome {
            Some(session) => GateState::Active(session),
            None => GateState::NoSession,
        };
    }

    fn system(&self, text: String) -> LogEntry {
        LogEntry::system(text).with_sender("System")
    }

    /// Create a workspace named by the draft. The draft is cleared only on success.
    pub async fn create(&self, draft: &mut String) -> Result<WorkspaceSession, Rejection> {
        let name = draft.trim().to_string();
        if name.is_empty() {
            return Err(Rejection::EmptyInput);
        }
        self.begin(GateState::Creating).await?;
        self.feed
            .append(self.system(format!("Creating workspace \"{}\"...", name)))
            .await;

        match self.gateway.create_workspace(&name).await {
            Ok(created) => {
                let session = WorkspaceSession {
                    id: created.workspace_id,
                    display_name: name.clone(),
                    invite_token: invite_token_from(&created.invite_link).unwrap_or_default(),
                    invite_link: created.invite_link,
                    members: vec![self.current_user.clone()],
                    files: self.files.clone(),
                };
                log::info!("session: created workspace {} ({})", session.display_name, session.id);
                self.finish(Some(session.clone())).await;
                self.feed
                    .append(self.system(format!(
                        "Workspace \"{}\" created! Share this link to invite others: {}",
                        session.display_name, session.invite_link
                    )))
                    .await;
                draft.clear();
                Ok(session)
            }
            Err(e) => {
                log::warn!("session: create failed: {}", e);
                self.finish(None).await;
                self.feed
                    .append(self.system(format!("Error creating workspace: {}", e)))
                    .await;
                Err(Rejection::NoSession)
            }
        }
    }

    /// Join the workspace behind the invite token (or link) in the draft, then load its
    /// documents. The draft is cleared only on success.
    pub async fn join(&self, draft: &mut String) -> Result<WorkspaceSession, Rejection> {
        let token = invite_token_from(draft).ok_or(Rejection::EmptyInput)?;
        self.begin(GateState::Joining).await?;
        self.feed
            .append(self.system("Attempting to join workspace via link...".to_string()))
            .await;

        let joined = match self.gateway.join_workspace(&token).await {
            Ok(j) => j,
            Err(e) => return Err(self.join_failed(e.to_string()).await),
        };
        let documents = match self.gateway.list_documents(&joined.workspace_id).await {
            Ok(d) => d,
            Err(e) => return Err(self.join_failed(e.to_string()).await),
        };

        self.files
            .register(documents.into_iter().map(UploadedFile::from_remote).collect())
            .await;
        let session = WorkspaceSession {
            id: joined.workspace_id,
            display_name: joined.workspace_name,
            invite_token: invite_token_from(&joined.invite_link).unwrap_or(token),
            invite_link: joined.invite_link,
            members: vec![self.current_user.clone()],
            files: self.files.clone(),
        };
        let count = session.files.len().await;
        log::info!(
            "session: joined workspace {} ({}) with {} documents",
            session.display_name,
            session.id,
            count
        );
        self.finish(Some(session.clone())).await;
        self.feed
            .append(self.system(format!("Joined workspace \"{}\"!", session.display_name)))
            .await;
        draft.clear();
        Ok(session)
    }

    async fn join_failed(&self, message: String) -> Rejection {
        log::warn!("session: join failed: {}", message);
        self.finish(None).await;
        self.feed
            .append(self.system(format!("Error joining workspace: {}", message)))
            .await;
        Rejection::NoSession
    }
}
