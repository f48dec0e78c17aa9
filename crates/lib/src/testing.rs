//! In-crate fake backend for controller tests: scripted responses, call counting and
//! in-flight tracking.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::feed::{LogEntry, LogStore};
use crate::gateway::{
    AgentRun, AnswerPayload, CreatedWorkspace, DocumentUpload, Gateway, GatewayError,
    JoinedWorkspace, RemoteDocument, UploadReceipt,
};
use crate::graph::KnowledgeGraph;

pub(crate) fn server_error(message: &str) -> GatewayError {
    GatewayError::Server {
        status: 500,
        message: message.to_string(),
    }
}

pub(crate) struct FakeGateway {
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    pub uploads: Mutex<Vec<(String, String)>>,
    pub failing_uploads: Mutex<Vec<String>>,
    pub answer: Mutex<Result<AnswerPayload, GatewayError>>,
    pub agent: Mutex<Result<AgentRun, GatewayError>>,
    pub created: Mutex<Result<CreatedWorkspace, GatewayError>>,
    pub joined: Mutex<Result<JoinedWorkspace, GatewayError>>,
    pub documents: Mutex<Result<Vec<RemoteDocument>, GatewayError>>,
    pub graph: Mutex<Result<KnowledgeGraph, GatewayError>>,
    /// When set, every call records a snapshot of this feed before answering.
    pub watch: Mutex<Option<LogStore>>,
    pub seen: Mutex<Vec<Vec<LogEntry>>>,
}

impl Default for FakeGateway {
    fn default() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            uploads: Mutex::new(Vec::new()),
            failing_uploads: Mutex::new(Vec::new()),
            answer: Mutex::new(Ok(AnswerPayload {
                answer: Some("42".to_string()),
                ..AnswerPayload::default()
            })),
            agent: Mutex::new(Ok(AgentRun::default())),
            created: Mutex::new(Ok(CreatedWorkspace {
                workspace_id: "ws-1".to_string(),
                invite_link: "invite-1".to_string(),
            })),
            joined: Mutex::new(Ok(JoinedWorkspace {
                workspace_id: "ws-2".to_string(),
                workspace_name: "Research".to_string(),
                invite_link: "invite-2".to_string(),
            })),
            documents: Mutex::new(Ok(Vec::new())),
            graph: Mutex::new(Ok(KnowledgeGraph::default())),
            watch: Mutex::new(None),
            seen: Mutex::new(Vec::new()),
        }
    }
}

impl FakeGateway {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn enter(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let watched = self.watch.lock().unwrap().clone();
        if let Some(feed) = watched {
            let snapshot = feed.snapshot().await;
            self.seen.lock().unwrap().push(snapshot);
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    fn leave(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Gateway for FakeGateway {
    async fn upload_document(&self, upload: DocumentUpload) -> Result<UploadReceipt, GatewayError> {
        self.enter().await;
        self.uploads
            .lock()
            .unwrap()
            .push((upload.file_name.clone(), upload.workspace_id.clone()));
        let fails = self
            .failing_uploads
            .lock()
            .unwrap()
            .contains(&upload.file_name);
        self.leave();
        if fails {
            Err(server_error("unreadable file"))
        } else {
            Ok(UploadReceipt {
                document_id: format!("doc-{}", upload.file_name),
            })
        }
    }

    async fn ask(&self, _query: &str, _workspace_id: &str) -> Result<AnswerPayload, GatewayError> {
        self.enter().await;
        let res = self.answer.lock().unwrap().clone();
        self.leave();
        res
    }

    async fn run_agent(&self, _goal: &str) -> Result<AgentRun, GatewayError> {
        self.enter().await;
        let res = self.agent.lock().unwrap().clone();
        self.leave();
        res
    }

    async fn create_workspace(&self, _name: &str) -> Result<CreatedWorkspace, GatewayError> {
        self.enter().await;
        let res = self.created.lock().unwrap().clone();
        self.leave();
        res
    }

    async fn join_workspace(&self, _invite_token: &str) -> Result<JoinedWorkspace, GatewayError> {
        self.enter().await;
        let res = self.joined.lock().unwrap().clone();
        self.leave();
        res
    }

    async fn list_documents(
        &self,
        _workspace_id: &str,
    ) -> Result<Vec<RemoteDocument>, GatewayError> {
        self.enter().await;
        let res = self.documents.lock().unwrap().clone();
        self.leave();
        res
    }

    async fn generate_knowledge_graph(
        &self,
        _workspace_id: &str,
    ) -> Result<KnowledgeGraph, GatewayError> {
        self.enter().await;
        let res = self.graph.lock().unwrap().clone();
        self.leave();
        res
    }
}
