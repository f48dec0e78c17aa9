//! Integration tests: run a fake backend on a free port with axum and drive `HttpGateway` and
//! full surfaces against it over real HTTP.

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use lib::feed::Role;
use lib::gateway::{DocumentUpload, Gateway, GatewayError, HttpGateway};
use lib::surface::{Surface, SurfaceContext, SurfaceKind};
use lib::upload::{FileStatus, SelectedFile};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct Backend {
    /// (file name, content type, byte count, workspaceId) per upload.
    uploads: Mutex<Vec<(String, Option<String>, usize, String)>>,
    questions: Mutex<Vec<Value>>,
}

async fn upload(State(state): State<Arc<Backend>>, mut form: Multipart) -> impl IntoResponse {
    let mut file = None;
    let mut workspace = String::new();
    while let Ok(Some(field)) = form.next_field().await {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let name = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await.map(|b| b.len()).unwrap_or(0);
                file = Some((name, content_type, bytes));
            }
            Some("workspaceId") => workspace = field.text().await.unwrap_or_default(),
            _ => {}
        }
    }
    let Some((name, content_type, bytes)) = file else {
        return (StatusCode::BAD_REQUEST, Json(json!({ "message": "No file uploaded." })));
    };
    if name.starts_with("broken") {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "message": "Could not extract text." })),
        );
    }
    let id = format!("doc-{}", name);
    state
        .uploads
        .lock()
        .unwrap()
        .push((name, content_type, bytes, workspace));
    (StatusCode::OK, Json(json!({ "documentId": id })))
}

async fn ask(State(state): State<Arc<Backend>>, Json(body): Json<Value>) -> impl IntoResponse {
    state.questions.lock().unwrap().push(body.clone());
    match body.get("query").and_then(Value::as_str) {
        Some("boom") => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "message": "boom" })),
        )
            .into_response(),
        Some("plain") => (StatusCode::BAD_GATEWAY, "upstream down").into_response(),
        _ => Json(json!({
            "answer": "X",
            "citations": ["A", "B"],
            "chartData": "bar chart of X",
            "nextSteps": ["Read chapter 2"]
        }))
        .into_response(),
    }
}

async fn run_agent(Json(body): Json<Value>) -> impl IntoResponse {
    let goal = body.get("goal").and_then(Value::as_str).unwrap_or_default();
    Json(json!({
        "log": [
            { "type": "plan", "text": format!("Plan for {}", goal), "timestamp": "10:00:00" },
            { "type": "tool_execution", "text": "search", "details": "3 hits" },
            { "type": "result", "text": "done" }
        ]
    }))
}

async fn create_workspace(Json(body): Json<Value>) -> impl IntoResponse {
    let name = body.get("workspaceName").and_then(Value::as_str).unwrap_or_default();
    if name.is_empty() {
        return (StatusCode::BAD_REQUEST, Json(json!({ "message": "Workspace name is required." })));
    }
    (
        StatusCode::CREATED,
        Json(json!({ "workspaceId": "ws-new", "inviteLink": "http://localhost:3000/join/tok-new" })),
    )
}

async fn join_workspace(Path(token): Path<String>) -> impl IntoResponse {
    if token != "tok-42" {
        return (StatusCode::NOT_FOUND, Json(json!({})));
    }
    (
        StatusCode::OK,
        Json(json!({
            "workspaceId": "ws-42",
            "workspaceName": "Reading club",
            "inviteLink": "http://localhost:3000/join/tok-42"
        })),
    )
}

async fn list_documents(Path(id): Path<String>) -> impl IntoResponse {
    Json(json!({
        "documents": [
            { "_id": format!("{}-d1", id), "filename": "notes.pdf", "ownerId": "Lee",
              "uploadedAt": "2024-05-01T10:00:00Z", "originalType": "application/pdf" },
            { "_id": format!("{}-d2", id), "filename": "data.csv" }
        ]
    }))
}

async fn knowledge_graph(Json(body): Json<Value>) -> impl IntoResponse {
    let workspace = body.get("workspaceId").and_then(Value::as_str).unwrap_or_default();
    Json(json!({
        "concepts": [
            { "id": "c1", "name": format!("{} root", workspace) },
            { "id": "c2", "name": "Leaf", "description": "child" }
        ],
        "relationships": [
            { "source": "c1", "target": "c2", "type": "contains" }
        ]
    }))
}

async fn start_backend() -> (String, Arc<Backend>) {
    let state = Arc::new(Backend::default());
    let app = Router::new()
        .route("/api/universal-upload", post(upload))
        .route("/api/universal-qa", post(ask))
        .route("/api/agents/run", post(run_agent))
        .route("/api/workspaces/create", post(create_workspace))
        .route("/api/workspaces/join/:token", get(join_workspace))
        .route("/api/workspaces/:id/documents", get(list_documents))
        .route("/api/generate-knowledge-graph", post(knowledge_graph))
        .with_state(state.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind free port");
    let addr = listener.local_addr().expect("local_addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (format!("http://{}/", addr), state)
}

fn context(workspace: Option<&str>) -> SurfaceContext {
    SurfaceContext {
        workspace_id: workspace.map(String::from),
        current_user: "Dana".to_string(),
    }
}

#[tokio::test]
async fn ask_returns_answer_with_citations() {
    let (url, backend) = start_backend().await;
    let gw = HttpGateway::new(Some(url));
    let answer = gw.ask("what is X?", "ws-9").await.expect("answer");
    assert_eq!(answer.answer.as_deref(), Some("X"));
    assert_eq!(answer.citations, ["A", "B"]);
    assert_eq!(answer.chart_text().as_deref(), Some("bar chart of X"));

    let sent = backend.questions.lock().unwrap()[0].clone();
    assert_eq!(sent, json!({ "query": "what is X?", "workspaceId": "ws-9" }));
}

#[tokio::test]
async fn server_message_and_fallback_text() {
    let (url, _backend) = start_backend().await;
    let gw = HttpGateway::new(Some(url));

    let err = gw.ask("boom", "ws").await.unwrap_err();
    assert_eq!(
        err,
        GatewayError::Server {
            status: 500,
            message: "boom".to_string()
        }
    );

    let err = gw.ask("plain", "ws").await.unwrap_err();
    assert_eq!(err.to_string(), "Failed to get AI response.");

    let err = gw.join_workspace("nope").await.unwrap_err();
    assert_eq!(err.to_string(), "Invalid or expired invite link.");
}

#[tokio::test]
async fn unreachable_backend_is_a_transport_error() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind free port");
        listener.local_addr().expect("local_addr").port()
    };
    let gw = HttpGateway::new(Some(format!("http://127.0.0.1:{}", port)));
    let err = gw.run_agent("anything").await.unwrap_err();
    assert!(matches!(err, GatewayError::Transport(_)), "got {:?}", err);
}

#[tokio::test]
async fn upload_sends_multipart_fields() {
    let (url, backend) = start_backend().await;
    let gw = HttpGateway::new(Some(url));
    let receipt = gw
        .upload_document(DocumentUpload {
            file_name: "paper.pdf".to_string(),
            mime_type: "application/pdf".to_string(),
            bytes: b"%PDF-1.4 test".to_vec(),
            workspace_id: "ws-7".to_string(),
        })
        .await
        .expect("upload");
    assert_eq!(receipt.document_id, "doc-paper.pdf");

    let uploads = backend.uploads.lock().unwrap().clone();
    assert_eq!(
        uploads,
        [(
            "paper.pdf".to_string(),
            Some("application/pdf".to_string()),
            13,
            "ws-7".to_string()
        )]
    );
}

#[tokio::test]
async fn reader_surface_uploads_in_order_and_reports_failures() {
    let (url, backend) = start_backend().await;
    let reader = Surface::of_kind(
        SurfaceKind::Reader,
        context(Some("reader-ws")),
        Arc::new(HttpGateway::new(Some(url))),
    );
    let report = reader
        .upload(vec![
            SelectedFile::new("a.pdf", "application/pdf", b"a".to_vec()),
            SelectedFile::new("broken.txt", "text/plain", b"b".to_vec()),
            SelectedFile::new("c.csv", "text/csv", b"c".to_vec()),
        ])
        .await
        .expect("upload run");
    assert_eq!(report.processed.len(), 2);
    assert_eq!(report.failed.len(), 1);

    let names: Vec<_> = backend
        .uploads
        .lock()
        .unwrap()
        .iter()
        .map(|u| u.0.clone())
        .collect();
    assert_eq!(names, ["a.pdf", "c.csv"]);

    let statuses: Vec<_> = reader
        .files()
        .snapshot()
        .await
        .into_iter()
        .map(|f| f.status)
        .collect();
    assert_eq!(
        statuses,
        [FileStatus::Processed, FileStatus::Failed, FileStatus::Processed]
    );
    let texts: Vec<_> = reader.feed().snapshot().await.into_iter().map(|e| e.text).collect();
    assert!(texts.contains(&"Error processing \"broken.txt\": Could not extract text.".to_string()));
}

#[tokio::test]
async fn solo_chat_resolves_placeholder_in_place() {
    let (url, _backend) = start_backend().await;
    let solo = Surface::of_kind(
        SurfaceKind::Solo,
        context(Some("solo-ws")),
        Arc::new(HttpGateway::new(Some(url))),
    );
    let mut draft = "what is X?".to_string();
    solo.send_message(&mut draft).await.expect("exchange");
    assert!(draft.is_empty());

    let entries = solo.feed().snapshot().await;
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].role, Role::User);
    assert_eq!(entries[1].role, Role::Assistant);
    assert!(!entries[1].pending);
    assert_eq!(entries[1].text, "X (Sources: A, B)");
    assert_eq!(entries[1].sources(), ["A", "B"]);

    let mut draft = "boom".to_string();
    solo.send_message(&mut draft).await.expect("exchange");
    let last = solo.feed().snapshot().await.pop().unwrap();
    assert_eq!(last.text, "Error: boom");
}

#[tokio::test]
async fn agent_surface_replaces_placeholder_with_log() {
    let (url, _backend) = start_backend().await;
    let agent = Surface::of_kind(
        SurfaceKind::Agent,
        context(None),
        Arc::new(HttpGateway::new(Some(url))),
    );
    agent
        .send_message(&mut "write a summary".to_string())
        .await
        .expect("run");
    let entries = agent.feed().snapshot().await;
    let roles: Vec<_> = entries.iter().map(|e| e.role).collect();
    assert_eq!(
        roles,
        [Role::Goal, Role::Plan, Role::ToolExecution, Role::Result]
    );
    assert_eq!(entries[1].text, "Plan for write a summary");
    assert_eq!(entries[1].timestamp, "10:00:00");
    assert_eq!(
        entries[2].attachment.as_ref().and_then(|a| a.details.as_deref()),
        Some("3 hits")
    );
}

#[tokio::test]
async fn team_join_hydrates_and_graph_uses_session() {
    let (url, _backend) = start_backend().await;
    let team = Surface::of_kind(
        SurfaceKind::Team,
        context(None),
        Arc::new(HttpGateway::new(Some(url))),
    );
    let mut draft = "localhost:3000/join/tok-42".to_string();
    let session = team.join_workspace(&mut draft).await.expect("join");
    assert_eq!(session.id, "ws-42");
    assert_eq!(session.invite_token, "tok-42");
    assert_eq!(session.display_name, "Reading club");

    let files = team.files().snapshot().await;
    assert_eq!(files.len(), 2);
    assert!(files.iter().all(|f| f.status == FileStatus::Processed));
    assert_eq!(files[0].uploaded_by.as_deref(), Some("Lee"));
    assert_eq!(files[1].uploaded_by.as_deref(), Some("Unknown"));

    let graph = team.knowledge_graph().await.expect("graph");
    assert_eq!(graph.concepts[0].name, "ws-42 root");
    let degrees = graph.concept_degrees();
    assert_eq!(degrees[0].count, 1);
    assert_eq!(degrees[1].count, 1);
}

#[tokio::test]
async fn team_create_then_upload_targets_new_workspace() {
    let (url, backend) = start_backend().await;
    let team = Surface::of_kind(
        SurfaceKind::Team,
        context(None),
        Arc::new(HttpGateway::new(Some(url))),
    );
    let session = team
        .create_workspace(&mut "Study group".to_string())
        .await
        .expect("create");
    assert_eq!(session.id, "ws-new");
    assert_eq!(session.invite_token, "tok-new");
    assert_eq!(session.invite_link, "http://localhost:3000/join/tok-new");

    team.upload(vec![SelectedFile::new("notes.md", "", b"# hi".to_vec())])
        .await
        .expect("upload");
    let uploads = backend.uploads.lock().unwrap().clone();
    assert_eq!(uploads[0].3, "ws-new");
    assert_eq!(uploads[0].0, "notes.md");
}
