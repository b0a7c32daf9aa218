use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::{AgentError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

/// One conversation message. Immutable once constructed; build one through
/// the constructors below and append it to a [`Conversation`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: Vec<ContentBlock>,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: vec![ContentBlock::Text(text.into())],
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: vec![ContentBlock::Text(text.into())],
        }
    }

    /// Echo of a tool invocation requested by the model, appended before its
    /// result so the backend sees the request/result pair in order.
    pub fn tool_request(
        tool_use_id: impl Into<String>,
        name: impl Into<String>,
        input: Value,
    ) -> Self {
        Self {
            role: Role::Assistant,
            content: vec![ContentBlock::ToolUse(ToolUseBlock {
                tool_use_id: tool_use_id.into(),
                name: name.into(),
                input,
            })],
        }
    }

    /// Wrap a tool outcome for the backend. Only the leading payload block is
    /// forwarded, matching the converse `toolResult` json shape. An empty
    /// payload is a caller bug and fails with
    /// [`AgentError::MalformedToolResult`] rather than desynchronizing the
    /// toolUseId pairing.
    pub fn tool_result(tool_use_id: impl Into<String>, payload: &[String]) -> Result<Self> {
        let tool_use_id = tool_use_id.into();
        let first = payload.first().ok_or_else(|| {
            AgentError::MalformedToolResult(format!(
                "tool result for {tool_use_id} has no content"
            ))
        })?;
        Ok(Self {
            role: Role::User,
            content: vec![ContentBlock::ToolResult(ToolResultBlock {
                tool_use_id,
                content: vec![ToolResultContent::Json(json!({ "text": first }))],
            })],
        })
    }

    /// Concatenated text of all plain-text blocks.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for block in &self.content {
            if let ContentBlock::Text(text) = block {
                out.push_str(text);
            }
        }
        out
    }
}

/// Exactly one variant per block, tagged the way the converse wire format
/// tags them: `{"text": ..}`, `{"toolUse": {..}}`, `{"toolResult": {..}}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ContentBlock {
    Text(String),
    ToolUse(ToolUseBlock),
    ToolResult(ToolResultBlock),
}

/// A structured request from the model to invoke a named tool. Produced only
/// by the backend; the id correlates with a later [`ToolResultBlock`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolUseBlock {
    pub tool_use_id: String,
    pub name: String,
    pub input: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResultBlock {
    pub tool_use_id: String,
    pub content: Vec<ToolResultContent>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ToolResultContent {
    Json(Value),
    Text(String),
}

/// Why the backend stopped generating. Drives the conversation loop's state
/// machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    EndTurn,
    ToolUse,
    MaxTokens,
    StopSequence,
    ContentFiltered,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InferenceConfig {
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            max_tokens: 2048,
            temperature: 0.0,
            top_p: 1.0,
        }
    }
}

/// Tool declarations in the backend's function-calling schema.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolConfig {
    pub tools: Vec<ToolEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolEntry {
    pub tool_spec: ToolSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub input_schema: InputSchema,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputSchema {
    pub json: Value,
}

/// Append-only message sequence for one query. Messages are never mutated or
/// removed once pushed; the container is discarded when the query's response
/// is returned.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_constructor_shape() {
        let value = serde_json::to_value(Message::user("hi")).unwrap();
        assert_eq!(value, json!({ "role": "user", "content": [{ "text": "hi" }] }));
    }

    #[test]
    fn assistant_constructor_shape() {
        let value = serde_json::to_value(Message::assistant("ok")).unwrap();
        assert_eq!(
            value,
            json!({ "role": "assistant", "content": [{ "text": "ok" }] })
        );
    }

    #[test]
    fn tool_request_shape() {
        let value = serde_json::to_value(Message::tool_request(
            "tu-1",
            "list_roaming_plans",
            json!({ "country": "Japan", "duration": 5 }),
        ))
        .unwrap();
        assert_eq!(
            value,
            json!({
                "role": "assistant",
                "content": [{
                    "toolUse": {
                        "toolUseId": "tu-1",
                        "name": "list_roaming_plans",
                        "input": { "country": "Japan", "duration": 5 }
                    }
                }]
            })
        );
    }

    #[test]
    fn tool_result_shape_wraps_leading_block() {
        let message =
            Message::tool_result("tu-1", &["plan summary".to_string(), "extra".to_string()])
                .unwrap();
        let value = serde_json::to_value(message).unwrap();
        assert_eq!(
            value,
            json!({
                "role": "user",
                "content": [{
                    "toolResult": {
                        "toolUseId": "tu-1",
                        "content": [{ "json": { "text": "plan summary" } }]
                    }
                }]
            })
        );
    }

    #[test]
    fn tool_result_rejects_empty_payload() {
        let err = Message::tool_result("tu-1", &[]).unwrap_err();
        assert!(matches!(err, AgentError::MalformedToolResult(_)));
    }

    #[test]
    fn stop_reason_wire_strings() {
        for (reason, wire) in [
            (StopReason::EndTurn, "end_turn"),
            (StopReason::ToolUse, "tool_use"),
            (StopReason::MaxTokens, "max_tokens"),
            (StopReason::StopSequence, "stop_sequence"),
            (StopReason::ContentFiltered, "content_filtered"),
        ] {
            assert_eq!(serde_json::to_value(reason).unwrap(), json!(wire));
            assert_eq!(
                serde_json::from_value::<StopReason>(json!(wire)).unwrap(),
                reason
            );
        }
    }

    #[test]
    fn content_block_deserializes_tool_use() {
        let block: ContentBlock = serde_json::from_value(json!({
            "toolUse": { "toolUseId": "tu-9", "name": "get_roaming_usage", "input": {} }
        }))
        .unwrap();
        match block {
            ContentBlock::ToolUse(tool_use) => {
                assert_eq!(tool_use.tool_use_id, "tu-9");
                assert_eq!(tool_use.name, "get_roaming_usage");
            }
            other => panic!("unexpected block: {other:?}"),
        }
    }

    #[test]
    fn conversation_appends_in_order() {
        let mut conversation = Conversation::new();
        conversation.push(Message::user("first"));
        conversation.push(Message::assistant("second"));
        assert_eq!(conversation.len(), 2);
        assert_eq!(conversation.messages()[0].role, Role::User);
        assert_eq!(conversation.messages()[1].text(), "second");
    }
}
