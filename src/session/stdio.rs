//! Stdio transport for the tool session: launches the server script as a
//! child process and speaks line-delimited JSON-RPC over its stdin/stdout.

use std::path::Path;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;

use super::rpc::{
    self, CallToolResult, Incoming, Notification, Request, ToolsListResult,
};
use super::{SessionTool, ToolContent, ToolSession};
use crate::{AgentError, Result};

/// A persistent tool session over a child process's stdio. One request is in
/// flight at a time; the transport mutex is held for the whole round trip,
/// which is what the conversation loop's ordering guarantees assume. The
/// child is killed when the session is dropped, so the process is released on
/// every exit path.
pub struct StdioToolSession {
    transport: Mutex<Transport>,
    next_id: AtomicU64,
}

struct Transport {
    child: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
}

impl Transport {
    async fn send_line(&mut self, line: &str) -> Result<()> {
        self.stdin.write_all(line.as_bytes()).await?;
        self.stdin.write_all(b"\n").await?;
        self.stdin.flush().await?;
        Ok(())
    }
}

impl StdioToolSession {
    /// Launch the server script and perform the initialize handshake. Only
    /// `.py` (python) and `.js` (node) scripts are accepted.
    pub async fn connect(server_script: impl AsRef<Path>) -> Result<Self> {
        let script = server_script.as_ref();
        let interpreter = interpreter_for(script)?;

        tracing::info!(script = %script.display(), interpreter, "launching tool session");
        let mut child = Command::new(interpreter)
            .arg(script)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()?;
        let stdin = child.stdin.take().ok_or_else(|| {
            AgentError::InvalidResponse("tool session child has no stdin".to_string())
        })?;
        let stdout = child.stdout.take().ok_or_else(|| {
            AgentError::InvalidResponse("tool session child has no stdout".to_string())
        })?;

        let session = Self {
            transport: Mutex::new(Transport {
                child,
                stdin,
                stdout: BufReader::new(stdout).lines(),
            }),
            next_id: AtomicU64::new(1),
        };
        session.initialize().await?;
        Ok(session)
    }

    async fn initialize(&self) -> Result<()> {
        self.request(
            rpc::METHOD_INITIALIZE,
            json!({
                "protocolVersion": rpc::MCP_PROTOCOL_VERSION,
                "capabilities": {},
                "clientInfo": {
                    "name": env!("CARGO_PKG_NAME"),
                    "version": env!("CARGO_PKG_VERSION"),
                },
            }),
        )
        .await?;
        self.notify(rpc::METHOD_INITIALIZED).await?;
        tracing::debug!("tool session initialized");
        Ok(())
    }

    async fn notify(&self, method: &str) -> Result<()> {
        let frame = Notification::new(method, None);
        let mut transport = self.transport.lock().await;
        transport.send_line(&serde_json::to_string(&frame)?).await
    }

    /// Send one request and block until its response arrives. Notifications
    /// and responses to other ids are skipped.
    async fn request(&self, method: &str, params: Value) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let frame = Request::new(id, method, Some(params));
        let line = serde_json::to_string(&frame)?;

        let mut transport = self.transport.lock().await;
        transport.send_line(&line).await?;

        loop {
            let line = transport.stdout.next_line().await?.ok_or_else(|| {
                AgentError::InvalidResponse(format!(
                    "tool session closed its stdout while waiting for {method}"
                ))
            })?;
            if line.trim().is_empty() {
                continue;
            }
            let incoming: Incoming = serde_json::from_str(&line)?;
            if incoming.method.is_some() {
                tracing::debug!(method = ?incoming.method, "skipping server-initiated frame");
                continue;
            }
            if incoming.id_u64() != Some(id) {
                tracing::debug!(id = ?incoming.id, "skipping response for another request");
                continue;
            }
            if let Some(error) = incoming.error {
                return Err(AgentError::Rpc {
                    code: error.code,
                    message: error.message,
                });
            }
            return Ok(incoming.result.unwrap_or(Value::Null));
        }
    }

    /// Terminate the child. Dropping the session kills it too; this is the
    /// orderly path that also reaps the process.
    pub async fn shutdown(self) -> Result<()> {
        let mut transport = self.transport.into_inner();
        transport.child.kill().await?;
        tracing::debug!("tool session shut down");
        Ok(())
    }
}

#[async_trait]
impl ToolSession for StdioToolSession {
    async fn list_tools(&self) -> Result<Vec<SessionTool>> {
        let result = self.request(rpc::METHOD_TOOLS_LIST, json!({})).await?;
        let parsed: ToolsListResult = serde_json::from_value(result)?;
        Ok(parsed.tools)
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> Result<Vec<ToolContent>> {
        let result = self
            .request(
                rpc::METHOD_TOOLS_CALL,
                json!({ "name": name, "arguments": arguments }),
            )
            .await?;
        let parsed: CallToolResult = serde_json::from_value(result)?;
        let texts = text_blocks(&parsed.content);
        if parsed.is_error {
            let detail = texts
                .first()
                .map(|block| match block {
                    ToolContent::Text { text } => text.clone(),
                })
                .unwrap_or_else(|| "no detail".to_string());
            return Err(AgentError::InvalidResponse(format!(
                "tool reported an error: {detail}"
            )));
        }
        Ok(texts)
    }
}

fn text_blocks(content: &[Value]) -> Vec<ToolContent> {
    content
        .iter()
        .filter(|block| block.get("type").and_then(Value::as_str) == Some("text"))
        .filter_map(|block| block.get("text").and_then(Value::as_str))
        .map(|text| ToolContent::Text {
            text: text.to_string(),
        })
        .collect()
}

fn interpreter_for(script: &Path) -> Result<&'static str> {
    match script.extension().and_then(|ext| ext.to_str()) {
        Some("py") => Ok("python"),
        Some("js") => Ok("node"),
        _ => Err(AgentError::InvalidResponse(format!(
            "server script must be a .py or .js file: {}",
            script.display()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interpreter_by_extension() {
        assert_eq!(interpreter_for(Path::new("server.py")).unwrap(), "python");
        assert_eq!(interpreter_for(Path::new("dir/server.js")).unwrap(), "node");
        assert!(interpreter_for(Path::new("server.sh")).is_err());
        assert!(interpreter_for(Path::new("server")).is_err());
    }

    #[test]
    fn text_blocks_skip_non_text_content() {
        let content = vec![
            json!({ "type": "text", "text": "hello" }),
            json!({ "type": "image", "data": "..." }),
            json!({ "type": "text", "text": "world" }),
        ];
        let blocks = text_blocks(&content);
        assert_eq!(
            blocks,
            vec![
                ToolContent::Text { text: "hello".to_string() },
                ToolContent::Text { text: "world".to_string() },
            ]
        );
    }
}
