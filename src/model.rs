use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;
use crate::types::{InferenceConfig, Message, StopReason, ToolConfig};

/// One converse request: the full conversation so far plus the tool schema.
/// Serializes to the converse API body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConverseRequest {
    pub system: Vec<SystemBlock>,
    pub messages: Vec<Message>,
    pub inference_config: InferenceConfig,
    pub tool_config: ToolConfig,
}

impl ConverseRequest {
    pub fn new(
        system_prompt: impl Into<String>,
        messages: Vec<Message>,
        inference_config: InferenceConfig,
        tool_config: ToolConfig,
    ) -> Self {
        Self {
            system: vec![SystemBlock {
                text: system_prompt.into(),
            }],
            messages,
            inference_config,
            tool_config,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemBlock {
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConverseResponse {
    pub stop_reason: StopReason,
    pub output: ConverseOutput,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConverseOutput {
    pub message: Message,
}

/// A backend able to answer one synchronous converse round-trip. The
/// conversation loop is generic over this seam so tests can script responses.
#[async_trait]
pub trait ChatModel: Send + Sync {
    fn model_id(&self) -> &str;

    async fn converse(&self, request: ConverseRequest) -> Result<ConverseResponse>;
}
