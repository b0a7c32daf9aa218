use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    /// The tool session could not enumerate its tools.
    #[error("tool listing failed: {0}")]
    ToolListing(String),
    /// A specific tool call failed; tool name and arguments are attached so
    /// the caller can report what was attempted.
    #[error("tool {name} failed with args {arguments}: {message}")]
    ToolInvocation {
        name: String,
        arguments: serde_json::Value,
        message: String,
    },
    /// Internal contract violation: a tool returned an empty payload. This is
    /// a caller bug and must not be swallowed.
    #[error("malformed tool result: {0}")]
    MalformedToolResult(String),
    #[error("api error ({status}): {body}")]
    Api {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("failed to parse json: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AgentError>;
