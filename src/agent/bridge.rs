//! Tool Invocation Bridge: executes exactly one tool call against the
//! session and folds the request/result pair back into the conversation.

use std::time::Instant;

use crate::session::{ToolContent, ToolSession};
use crate::types::{Conversation, Message, ToolUseBlock};
use crate::{AgentError, Result};

use super::metrics::QueryMetrics;

/// Run the requested tool and append the echo-request and result messages,
/// in that order. The append pair is made before returning, so no other
/// invocation can interleave with it. Returns the transcript summary line.
///
/// Session failures (timeout, tool-side error, unknown tool) surface as
/// [`AgentError::ToolInvocation`] with the tool name and arguments attached;
/// the caller treats that as fatal to the current query.
pub async fn invoke(
    session: &dyn ToolSession,
    tool_use: &ToolUseBlock,
    conversation: &mut Conversation,
    metrics: &mut QueryMetrics,
) -> Result<String> {
    let started = Instant::now();
    tracing::debug!(tool = %tool_use.name, "invoking tool");

    let content = session
        .call_tool(&tool_use.name, tool_use.input.clone())
        .await
        .map_err(|err| AgentError::ToolInvocation {
            name: tool_use.name.clone(),
            arguments: tool_use.input.clone(),
            message: err.to_string(),
        })?;
    let payload: Vec<String> = content
        .into_iter()
        .map(|block| match block {
            ToolContent::Text { text } => text,
        })
        .collect();

    conversation.push(Message::tool_request(
        &tool_use.tool_use_id,
        &tool_use.name,
        tool_use.input.clone(),
    ));
    conversation.push(Message::tool_result(&tool_use.tool_use_id, &payload)?);

    let elapsed = started.elapsed();
    metrics.record_tool_call(&tool_use.name, elapsed);
    tracing::debug!(tool = %tool_use.name, ?elapsed, "tool call finished");

    Ok(format!(
        "Calling tool {} with args {}",
        tool_use.name, tool_use.input
    ))
}
