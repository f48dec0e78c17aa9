//! HTTP client for the RAG backend (http://localhost:5000 by default).
//!
//! Each method performs exactly one request. Non-2xx responses become `GatewayError::Server`
//! carrying the backend's `message` field, or an operation-specific fallback text.

use async_trait::async_trait;
use reqwest::{Method, Response, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::gateway::protocol::{
    AgentRun, AnswerPayload, AskRequest, CreateWorkspaceRequest, CreatedWorkspace,
    DocumentList, DocumentUpload, ErrorBody, JoinedWorkspace, KnowledgeGraphRequest,
    RemoteDocument, RunAgentRequest, UploadReceipt,
};
use crate::graph::KnowledgeGraph;

const DEFAULT_BASE_URL: &str = "http://localhost:5000";

/// Why a backend call failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    /// The request could not be built or the backend was unreachable.
    #[error("{0}")]
    Transport(String),
    /// The backend answered with a non-success status.
    #[error("{message}")]
    Server { status: u16, message: String },
    /// A success response whose body did not have the expected shape.
    #[error("unexpected response from backend: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            GatewayError::Decode(e.to_string())
        } else {
            GatewayError::Transport(e.to_string())
        }
    }
}

/// Backend operations, used for routing and for the fallback failure text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    UploadDocument,
    AskQuestion,
    RunAgent,
    CreateWorkspace,
    JoinWorkspace,
    ListDocuments,
    GenerateKnowledgeGraph,
}

impl Operation {
    /// Shown when a failed response carries no readable `message`.
    pub fn fallback_message(&self) -> &'static str {
        match self {
            Operation::UploadDocument => "Failed to process file.",
            Operation::AskQuestion => "Failed to get AI response.",
            Operation::RunAgent => "Failed to start agent.",
            Operation::CreateWorkspace => "Failed to create workspace.",
            Operation::JoinWorkspace => "Invalid or expired invite link.",
            Operation::ListDocuments => "Failed to load workspace documents.",
            Operation::GenerateKnowledgeGraph => "Failed to generate knowledge graph.",
        }
    }
}

/// The backend as seen by the workspace controllers.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// POST /api/universal-upload (multipart: file, workspaceId).
    async fn upload_document(&self, upload: DocumentUpload) -> Result<UploadReceipt, GatewayError>;

    /// POST /api/universal-qa.
    async fn ask(&self, query: &str, workspace_id: &str) -> Result<AnswerPayload, GatewayError>;

    /// POST /api/agents/run.
    async fn run_agent(&self, goal: &str) -> Result<AgentRun, GatewayError>;

    /// POST /api/workspaces/create.
    async fn create_workspace(&self, name: &str) -> Result<CreatedWorkspace, GatewayError>;

    /// GET /api/workspaces/join/{token}.
    async fn join_workspace(&self, invite_token: &str) -> Result<JoinedWorkspace, GatewayError>;

    /// GET /api/workspaces/{id}/documents.
    async fn list_documents(&self, workspace_id: &str)
        -> Result<Vec<RemoteDocument>, GatewayError>;

    /// POST /api/generate-knowledge-graph.
    async fn generate_knowledge_graph(
        &self,
        workspace_id: &str,
    ) -> Result<KnowledgeGraph, GatewayError>;
}

/// reqwest-backed gateway.
#[derive(Clone)]
pub struct HttpGateway {
    base_url: String,
    client: reqwest::Client,
}

impl HttpGateway {
    pub fn new(base_url: Option<String>) -> Self {
        let base_url = base_url
            .map(|u| u.trim().trim_end_matches('/').to_string())
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        Self {
            base_url,
            client: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Base URL joined with percent-encoded path segments.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, GatewayError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| GatewayError::Transport(format!("invalid backend url {}: {}", self.base_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| {
                GatewayError::Transport(format!("backend url cannot have paths: {}", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send_json<B, T>(&self, op: Operation, url: Url, body: &B) -> Result<T, GatewayError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        log::debug!("gateway: {:?} POST {}", op, url);
        let res = self.client.post(url).json(body).send().await?;
        decode(op, res).await
    }

    async fn fetch<T>(&self, op: Operation, url: Url) -> Result<T, GatewayError>
    where
        T: DeserializeOwned,
    {
        log::debug!("gateway: {:?} GET {}", op, url);
        let res = self.client.request(Method::GET, url).send().await?;
        decode(op, res).await
    }
}

/// Turn a response into the expected payload or a typed failure.
async fn decode<T: DeserializeOwned>(op: Operation, res: Response) -> Result<T, GatewayError> {
    let status = res.status();
    if !status.is_success() {
        let body = res.text().await.unwrap_or_default();
        let message = server_message(&body).unwrap_or_else(|| op.fallback_message().to_string());
        log::warn!("gateway: {:?} failed with {}: {}", op, status, message);
        return Err(GatewayError::Server {
            status: status.as_u16(),
            message,
        });
    }
    let data: T = res.json().await?;
    Ok(data)
}

/// The `message` field of a JSON error body, if present and non-empty.
pub(crate) fn server_message(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.message)
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty())
}

#[async_trait]
impl Gateway for HttpGateway {
    async fn upload_document(&self, upload: DocumentUpload) -> Result<UploadReceipt, GatewayError> {
        let op = Operation::UploadDocument;
        let url = self.endpoint(&["api", "universal-upload"])?;
        let size = upload.bytes.len();
        let mut part = reqwest::multipart::Part::bytes(upload.bytes).file_name(upload.file_name.clone());
        if !upload.mime_type.trim().is_empty() {
            part = part.mime_str(upload.mime_type.trim())?;
        }
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("workspaceId", upload.workspace_id);
        log::debug!("gateway: {:?} POST {} ({} bytes)", op, url, size);
        let res = self.client.post(url).multipart(form).send().await?;
        let receipt: UploadReceipt = decode(op, res).await?;
        log::info!("gateway: uploaded {} as {}", upload.file_name, receipt.document_id);
        Ok(receipt)
    }

    async fn ask(&self, query: &str, workspace_id: &str) -> Result<AnswerPayload, GatewayError> {
        let url = self.endpoint(&["api", "universal-qa"])?;
        let body = AskRequest {
            query,
            workspace_id,
        };
        self.send_json(Operation::AskQuestion, url, &body).await
    }

    async fn run_agent(&self, goal: &str) -> Result<AgentRun, GatewayError> {
        let url = self.endpoint(&["api", "agents", "run"])?;
        self.send_json(Operation::RunAgent, url, &RunAgentRequest { goal })
            .await
    }

    async fn create_workspace(&self, name: &str) -> Result<CreatedWorkspace, GatewayError> {
        let url = self.endpoint(&["api", "workspaces", "create"])?;
        let body = CreateWorkspaceRequest {
            workspace_name: name,
        };
        self.send_json(Operation::CreateWorkspace, url, &body).await
    }

    async fn join_workspace(&self, invite_token: &str) -> Result<JoinedWorkspace, GatewayError> {
        let url = self.endpoint(&["api", "workspaces", "join", invite_token])?;
        self.fetch(Operation::JoinWorkspace, url).await
    }

    async fn list_documents(
        &self,
        workspace_id: &str,
    ) -> Result<Vec<RemoteDocument>, GatewayError> {
        let url = self.endpoint(&["api", "workspaces", workspace_id, "documents"])?;
        let list: DocumentList = self.fetch(Operation::ListDocuments, url).await?;
        Ok(list.documents)
    }

    async fn generate_knowledge_graph(
        &self,
        workspace_id: &str,
    ) -> Result<KnowledgeGraph, GatewayError> {
        let url = self.endpoint(&["api", "generate-knowledge-graph"])?;
        self.send_json(
            Operation::GenerateKnowledgeGraph,
            url,
            &KnowledgeGraphRequest { workspace_id },
        )
        .await
    }
}
