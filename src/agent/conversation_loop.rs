//! The conversation loop: drives repeated converse round trips, feeds tool
//! results back in, and stops on a terminal stop reason or the turn budget.

use std::time::Instant;

use crate::Result;
use crate::model::{ChatModel, ConverseRequest, ConverseResponse};
use crate::session::ToolSession;
use crate::types::{ContentBlock, Conversation, InferenceConfig, Message, StopReason, ToolConfig};

use super::metrics::QueryMetrics;
use super::{bridge, catalog};

/// Cap on LLM round trips per query. The sole safeguard against unbounded
/// tool-use ping-pong.
const DEFAULT_MAX_TURNS: usize = 10;

pub const DEFAULT_SYSTEM_PROMPT: &str = "As an agent in charge of roaming-related work for the \
telecommunications company, you will be responsible for handling customers' \
roaming-related requests";

const NOTICE_MAX_TOKENS: &str = "[Max tokens reached, ending conversation.]";
const NOTICE_STOP_SEQUENCE: &str = "[Stop sequence reached, ending conversation.]";
const NOTICE_CONTENT_FILTERED: &str = "[Content filtered, ending conversation.]";
const NOTICE_MAX_TURNS: &str = "[Max turns reached, ending conversation.]";

/// Transcript plus the per-query timing that produced it.
#[derive(Debug, Clone)]
pub struct QueryOutcome {
    pub transcript: String,
    pub metrics: QueryMetrics,
}

/// One query at a time: owns the conversation for the duration of `run` and
/// discards it when the outcome is returned. Generic over the model and
/// session seams so tests can script both sides.
pub struct ConversationLoop<M, S> {
    model: M,
    session: S,
    system_prompt: String,
    inference_config: InferenceConfig,
    max_turns: usize,
}

impl<M, S> ConversationLoop<M, S>
where
    M: ChatModel,
    S: ToolSession,
{
    pub fn new(model: M, session: S) -> Self {
        Self {
            model,
            session,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            inference_config: InferenceConfig::default(),
            max_turns: DEFAULT_MAX_TURNS,
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn with_inference_config(mut self, config: InferenceConfig) -> Self {
        self.inference_config = config;
        self
    }

    pub fn with_max_turns(mut self, max_turns: usize) -> Self {
        self.max_turns = max_turns.max(1);
        self
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    pub fn into_session(self) -> S {
        self.session
    }

    /// Run one query to completion. Never fails for a normal stop reason;
    /// fails only on listing, invocation, or backend errors, all of which
    /// abort just this query.
    pub async fn run(&self, query: &str) -> Result<QueryOutcome> {
        let mut metrics = QueryMetrics::start();
        let mut conversation = Conversation::new();
        conversation.push(Message::user(query));

        let listing_started = Instant::now();
        let tool_config = catalog::list_tools(&self.session).await?;
        metrics.record_tool_listing(listing_started.elapsed());

        let mut transcript: Vec<String> = Vec::new();
        let mut response = self
            .round_trip(&conversation, &tool_config, &mut metrics)
            .await?;

        loop {
            match response.stop_reason {
                StopReason::ToolUse => {
                    transcript.push("received toolUse request".to_string());
                    // All blocks of this response are processed, in order,
                    // before the next round trip: every toolUse gets its
                    // append-pair first, then one follow-up call sees the
                    // fully updated conversation.
                    for block in &response.output.message.content {
                        match block {
                            ContentBlock::Text(text) => {
                                transcript.push(format!("[Thinking: {text}]"));
                                conversation.push(Message::assistant(text.clone()));
                            }
                            ContentBlock::ToolUse(tool_use) => {
                                let line = bridge::invoke(
                                    &self.session,
                                    tool_use,
                                    &mut conversation,
                                    &mut metrics,
                                )
                                .await?;
                                transcript.push(line);
                            }
                            ContentBlock::ToolResult(_) => {
                                tracing::warn!("backend returned a toolResult block; ignored");
                            }
                        }
                    }
                    // Budget check overrides the in-progress branch.
                    if metrics.llm_requests() >= self.max_turns {
                        tracing::info!(max_turns = self.max_turns, "turn budget exhausted");
                        transcript.push(NOTICE_MAX_TURNS.to_string());
                        break;
                    }
                    response = self
                        .round_trip(&conversation, &tool_config, &mut metrics)
                        .await?;
                }
                StopReason::MaxTokens => {
                    transcript.push(NOTICE_MAX_TOKENS.to_string());
                    break;
                }
                StopReason::StopSequence => {
                    transcript.push(NOTICE_STOP_SEQUENCE.to_string());
                    break;
                }
                StopReason::ContentFiltered => {
                    transcript.push(NOTICE_CONTENT_FILTERED.to_string());
                    break;
                }
                StopReason::EndTurn => {
                    transcript.push(response.output.message.text());
                    break;
                }
            }
        }

        metrics.finish();
        Ok(QueryOutcome {
            transcript: transcript.join("\n\n"),
            metrics,
        })
    }

    async fn round_trip(
        &self,
        conversation: &Conversation,
        tool_config: &ToolConfig,
        metrics: &mut QueryMetrics,
    ) -> Result<ConverseResponse> {
        let request = ConverseRequest::new(
            self.system_prompt.clone(),
            conversation.messages().to_vec(),
            self.inference_config,
            tool_config.clone(),
        );
        let started = Instant::now();
        let response = self.model.converse(request).await?;
        metrics.record_llm_request(started.elapsed());
        tracing::debug!(
            round = metrics.llm_requests(),
            stop_reason = ?response.stop_reason,
            "LLM round trip"
        );
        Ok(response)
    }
}
