//! Gateway: HTTP client for the document-QA backend.
//!
//! One JSON (or multipart) request per operation. Failures carry the server's `message` when the
//! error body has one, else a per-operation fallback.

mod client;
mod protocol;

pub use client::{Gateway, GatewayError, HttpGateway, Operation};
pub use protocol::{
    AgentLogRecord, AgentRun, AnswerPayload, CreatedWorkspace, DocumentUpload, JoinedWorkspace,
    RemoteDocument, UploadReceipt,
};
