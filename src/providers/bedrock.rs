use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::model::{ChatModel, ConverseRequest, ConverseResponse};
use crate::{AgentError, Result};

/// Client for a Bedrock-style converse endpoint:
/// `POST {base_url}/model/{model_id}/converse`.
///
/// Authentication is a plain bearer token (the converse API's api-key mode);
/// transport-level signing is out of scope here and owned by the deployment.
#[derive(Clone)]
pub struct BedrockConverse {
    http: reqwest::Client,
    base_url: String,
    model_id: String,
    bearer_token: Option<String>,
    http_headers: BTreeMap<String, String>,
}

impl BedrockConverse {
    pub fn new(base_url: impl Into<String>, model_id: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(300))
            .build()
            .map_err(AgentError::Http)?;
        Ok(Self {
            http,
            base_url: base_url.into(),
            model_id: model_id.into(),
            bearer_token: None,
            http_headers: BTreeMap::new(),
        })
    }

    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    pub fn with_http_headers(mut self, headers: BTreeMap<String, String>) -> Self {
        self.http_headers = headers;
        self
    }

    pub fn with_model(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = model_id.into();
        self
    }

    fn converse_url(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        format!("{base}/model/{model}/converse", model = self.model_id)
    }
}

#[async_trait]
impl ChatModel for BedrockConverse {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    async fn converse(&self, request: ConverseRequest) -> Result<ConverseResponse> {
        let url = self.converse_url();
        tracing::debug!(%url, messages = request.messages.len(), "converse request");

        let mut req = self.http.post(&url).json(&request);
        for (name, value) in &self.http_headers {
            req = req.header(name, value);
        }
        if let Some(token) = &self.bearer_token {
            req = req.bearer_auth(token);
        }

        let response = req.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AgentError::Api { status, body });
        }
        let parsed = response.json::<ConverseResponse>().await?;
        tracing::debug!(stop_reason = ?parsed.stop_reason, "converse response");
        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;
    use serde_json::json;

    use super::*;
    use crate::types::{
        ContentBlock, InferenceConfig, InputSchema, Message, StopReason, ToolConfig, ToolEntry,
        ToolSpec,
    };

    fn sample_tool_config() -> ToolConfig {
        ToolConfig {
            tools: vec![ToolEntry {
                tool_spec: ToolSpec {
                    name: "list_roaming_plans".to_string(),
                    description: Some("List roaming plans for a country.".to_string()),
                    input_schema: InputSchema {
                        json: json!({
                            "type": "object",
                            "properties": { "country": { "type": "string" } },
                            "required": ["country"]
                        }),
                    },
                },
            }],
        }
    }

    #[tokio::test]
    async fn converse_sends_wire_body_and_parses_tool_use() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/model/test-model/converse")
                    .json_body(json!({
                        "system": [{ "text": "roaming agent" }],
                        "messages": [
                            { "role": "user", "content": [{ "text": "list plans for Japan, 5 days" }] }
                        ],
                        "inferenceConfig": { "maxTokens": 2048, "temperature": 0.0, "topP": 1.0 },
                        "toolConfig": { "tools": [{ "toolSpec": {
                            "name": "list_roaming_plans",
                            "description": "List roaming plans for a country.",
                            "inputSchema": { "json": {
                                "type": "object",
                                "properties": { "country": { "type": "string" } },
                                "required": ["country"]
                            } }
                        } }] }
                    }));
                then.status(200).json_body(json!({
                    "stopReason": "tool_use",
                    "output": { "message": { "role": "assistant", "content": [
                        { "toolUse": { "toolUseId": "tu-1", "name": "list_roaming_plans",
                                       "input": { "country": "Japan", "duration": 5 } } }
                    ] } }
                }));
            })
            .await;

        let model = BedrockConverse::new(server.base_url(), "test-model").unwrap();
        let request = ConverseRequest::new(
            "roaming agent",
            vec![Message::user("list plans for Japan, 5 days")],
            InferenceConfig::default(),
            sample_tool_config(),
        );
        let response = model.converse(request).await.unwrap();

        mock.assert_async().await;
        assert_eq!(response.stop_reason, StopReason::ToolUse);
        match &response.output.message.content[0] {
            ContentBlock::ToolUse(tool_use) => {
                assert_eq!(tool_use.name, "list_roaming_plans");
                assert_eq!(tool_use.input["country"], json!("Japan"));
            }
            other => panic!("unexpected block: {other:?}"),
        }
    }

    #[tokio::test]
    async fn converse_surfaces_api_errors() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/model/test-model/converse");
                then.status(429).body("throttled");
            })
            .await;

        let model = BedrockConverse::new(server.base_url(), "test-model").unwrap();
        let request = ConverseRequest::new(
            "roaming agent",
            vec![Message::user("hi")],
            InferenceConfig::default(),
            ToolConfig::default(),
        );
        let err = model.converse(request).await.unwrap_err();
        match err {
            AgentError::Api { status, body } => {
                assert_eq!(status.as_u16(), 429);
                assert_eq!(body, "throttled");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
