//! A tool-calling conversation agent: a converse-style LLM backend plus an
//! MCP stdio tool session, driven by a bounded loop that alternates model
//! round trips with tool invocations until the model ends its turn.

pub mod agent;
mod error;
pub mod model;
pub mod providers;
pub mod roaming;
pub mod session;
pub mod types;

pub use agent::{ConversationLoop, QueryMetrics, QueryOutcome};
pub use error::{AgentError, Result};
pub use model::{ChatModel, ConverseRequest, ConverseResponse};
pub use providers::BedrockConverse;
pub use session::{SessionTool, StdioToolSession, ToolContent, ToolSession};
pub use types::{
    ContentBlock, Conversation, InferenceConfig, Message, Role, StopReason, ToolConfig,
    ToolResultBlock, ToolSpec, ToolUseBlock,
};
