//! The tool-session seam: how the agent enumerates and invokes external
//! tools. One persistent session is established per process and shared by
//! every query.

pub mod rpc;
pub mod stdio;

pub use stdio::StdioToolSession;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Result;

/// A tool advertised by the session, as declared over the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionTool {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub input_schema: Value,
}

/// One block of a tool-call result. Only text blocks are consumed; the
/// conversation loop forwards them to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolContent {
    Text { text: String },
}

#[async_trait]
pub trait ToolSession: Send + Sync {
    async fn list_tools(&self) -> Result<Vec<SessionTool>>;

    async fn call_tool(&self, name: &str, arguments: Value) -> Result<Vec<ToolContent>>;
}
