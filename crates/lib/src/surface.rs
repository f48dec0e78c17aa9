//! Workspace surfaces: one controller set parameterized per surface kind.
//!
//! A surface owns a feed and a file registry and wires the conversation controller, upload
//! sequencer and (for team workspaces) the session gate to them. Actions that need a workspace
//! resolve its id from the surface context or the active session; without one they are refused
//! before anything is sent or written.

use std::sync::Arc;

use crate::config::Config;
use crate::conversation::{ConversationController, ConversationOptions, ExchangeOutcome, ResponseMode};
use crate::error::Rejection;
use crate::feed::LogStore;
use crate::gateway::Gateway;
use crate::graph::{GraphError, KnowledgeGraph};
use crate::session::{GateState, WorkspaceGate, WorkspaceSession};
use crate::upload::{AcceptPolicy, FileRegistry, SelectedFile, UploadReport, UploadSequencer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceKind {
    /// Single-user PDF chat.
    Solo,
    /// Shared workspace behind create/join.
    Team,
    /// Goal runner showing the agent's log.
    Agent,
    /// Multi-file reader with rich answers.
    Reader,
}

impl SurfaceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SurfaceKind::Solo => "solo",
            SurfaceKind::Team => "team",
            SurfaceKind::Agent => "agent",
            SurfaceKind::Reader => "reader",
        }
    }
}

/// What varies between surfaces.
#[derive(Debug, Clone)]
pub struct SurfaceConfig {
    pub kind: SurfaceKind,
    pub mode: ResponseMode,
    /// `None` means the surface takes no uploads.
    pub accept: Option<AcceptPolicy>,
    /// Chat and uploads require a created or joined workspace.
    pub gated: bool,
    pub inline_citations: bool,
    /// Entries and uploads are attributed to the local user.
    pub attributed: bool,
}

impl SurfaceConfig {
    pub fn for_kind(kind: SurfaceKind) -> Self {
        match kind {
            SurfaceKind::Solo => Self {
                kind,
                mode: ResponseMode::Single,
                accept: Some(AcceptPolicy::pdf_only()),
                gated: false,
                inline_citations: true,
                attributed: false,
            },
            SurfaceKind::Team => Self {
                kind,
                mode: ResponseMode::Single,
                accept: Some(AcceptPolicy::any()),
                gated: true,
                inline_citations: false,
                attributed: true,
            },
            SurfaceKind::Agent => Self {
                kind,
                mode: ResponseMode::Batch,
                accept: None,
                gated: false,
                inline_citations: false,
                attributed: false,
            },
            SurfaceKind::Reader => Self {
                kind,
                mode: ResponseMode::Single,
                accept: Some(AcceptPolicy::documents()),
                gated: false,
                inline_citations: false,
                attributed: false,
            },
        }
    }
}

/// Identity a surface runs with.
#[derive(Debug, Clone)]
pub struct SurfaceContext {
    /// Workspace for ungated surfaces. Ignored when the surface is gated.
    pub workspace_id: Option<String>,
    pub current_user: String,
}

impl SurfaceContext {
    /// Context for `kind` from config: solo and reader use their configured workspace ids.
    pub fn from_config(kind: SurfaceKind, config: &Config) -> Self {
        let workspace_id = match kind {
            SurfaceKind::Solo => Some(config.workspaces.solo.clone()),
            SurfaceKind::Reader => Some(config.workspaces.reader.clone()),
            SurfaceKind::Team | SurfaceKind::Agent => None,
        };
        Self {
            workspace_id,
            current_user: crate::config::resolve_display_name(config),
        }
    }
}

pub struct Surface {
    config: SurfaceConfig,
    context: SurfaceContext,
    gateway: Arc<dyn Gateway>,
    feed: LogStore,
    files: FileRegistry,
    conversation: ConversationController,
    uploads: Option<UploadSequencer>,
    gate: Option<WorkspaceGate>,
}

impl Surface {
    pub fn new(config: SurfaceConfig, context: SurfaceContext, gateway: Arc<dyn Gateway>) -> Self {
        let feed = LogStore::new();
        let files = FileRegistry::new();
        let sender = config.attributed.then(|| context.current_user.clone());
        let conversation = ConversationController::new(
            gateway.clone(),
            feed.clone(),
            ConversationOptions {
                inline_citations: config.inline_citations,
                sender: sender.clone(),
            },
        );
        let uploads = config.accept.clone().map(|policy| {
            UploadSequencer::new(gateway.clone(), feed.clone(), files.clone(), policy, sender)
        });
        let gate = config.gated.then(|| {
            WorkspaceGate::new(
                gateway.clone(),
                feed.clone(),
                files.clone(),
                context.current_user.clone(),
            )
        });
        Self {
            config,
            context,
            gateway,
            feed,
            files,
            conversation,
            uploads,
            gate,
        }
    }

    /// Surface of `kind` with its preset configuration.
    pub fn of_kind(kind: SurfaceKind, context: SurfaceContext, gateway: Arc<dyn Gateway>) -> Self {
        Self::new(SurfaceConfig::for_kind(kind), context, gateway)
    }

    pub fn kind(&self) -> SurfaceKind {
        self.config.kind
    }

    pub fn feed(&self) -> &LogStore {
        &self.feed
    }

    pub fn files(&self) -> &FileRegistry {
        &self.files
    }

    pub fn is_gated(&self) -> bool {
        self.gate.is_some()
    }

    /// Gate state of a gated surface; `None` for surfaces without a gate.
    pub async fn gate_state(&self) -> Option<GateState> {
        match &self.gate {
            Some(gate) => Some(gate.state().await),
            None => None,
        }
    }

    pub async fn session(&self) -> Option<WorkspaceSession> {
        match &self.gate {
            Some(gate) => gate.session().await,
            None => None,
        }
    }

    /// Workspace the next action targets: the active session for gated surfaces, the context's
    /// workspace otherwise.
    pub async fn workspace_id(&self) -> Option<String> {
        match &self.gate {
            Some(gate) => gate.session().await.map(|s| s.id),
            None => self.context.workspace_id.clone(),
        }
    }

    /// Send the draft as a question (or goal, on batch surfaces).
    pub async fn send_message(&self, draft: &mut String) -> Result<ExchangeOutcome, Rejection> {
        match self.config.mode {
            ResponseMode::Batch => self.conversation.run_goal(draft).await,
            ResponseMode::Single => {
                if draft.trim().is_empty() {
                    return Err(Rejection::EmptyInput);
                }
                let workspace_id = self.workspace_id().await.ok_or(Rejection::NoSession)?;
                self.conversation.ask(draft, &workspace_id).await
            }
        }
    }

    /// Upload a selection into the current workspace.
    pub async fn upload(&self, selected: Vec<SelectedFile>) -> Result<UploadReport, Rejection> {
        let uploads = self.uploads.as_ref().ok_or(Rejection::Unsupported("uploading"))?;
        let workspace_id = self.workspace_id().await.ok_or(Rejection::NoSession)?;
        uploads.run(selected, &workspace_id).await
    }

    pub async fn create_workspace(&self, draft: &mut String) -> Result<WorkspaceSession, Rejection> {
        let gate = self
            .gate
            .as_ref()
            .ok_or(Rejection::Unsupported("creating a workspace"))?;
        gate.create(draft).await
    }

    pub async fn join_workspace(&self, draft: &mut String) -> Result<WorkspaceSession, Rejection> {
        let gate = self
            .gate
            .as_ref()
            .ok_or(Rejection::Unsupported("joining a workspace"))?;
        gate.join(draft).await
    }

    /// Generate the knowledge graph of the current workspace.
    pub async fn knowledge_graph(&self) -> Result<KnowledgeGraph, GraphError> {
        if self.config.kind == SurfaceKind::Agent {
            return Err(Rejection::Unsupported("the knowledge graph").into());
        }
        let workspace_id = self.workspace_id().await.ok_or(Rejection::NoSession)?;
        let graph = self.gateway.generate_knowledge_graph(&workspace_id).await?;
        log::info!(
            "surface: knowledge graph for {} has {} concepts, {} relationships",
            workspace_id,
            graph.concepts.len(),
            graph.relationships.len()
        );
        Ok(graph)
    }
}
