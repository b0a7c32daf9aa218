//! Tool Catalog Adapter: turns the session's advertised tools into the
//! backend's function-calling schema. Pure translation; re-fetched once per
//! query since tool lists are not assumed stable across queries.

use serde_json::{Value, json};

use crate::session::{SessionTool, ToolSession};
use crate::types::{InputSchema, ToolConfig, ToolEntry, ToolSpec};
use crate::{AgentError, Result};

/// Fetch the session's current tool list and convert it. Failures to
/// enumerate surface as [`AgentError::ToolListing`] and abort the query.
pub async fn list_tools(session: &dyn ToolSession) -> Result<ToolConfig> {
    let tools = session
        .list_tools()
        .await
        .map_err(|err| AgentError::ToolListing(err.to_string()))?;
    tracing::debug!(count = tools.len(), "tool catalog fetched");
    Ok(to_tool_config(&tools))
}

/// Convert advertised tools into converse `toolSpec` entries. The declared
/// input schema is reshaped into `{type, properties, required}`; a tool that
/// declares neither gets an empty object schema.
pub fn to_tool_config(tools: &[SessionTool]) -> ToolConfig {
    ToolConfig {
        tools: tools
            .iter()
            .map(|tool| ToolEntry {
                tool_spec: ToolSpec {
                    name: tool.name.clone(),
                    description: tool.description.clone(),
                    input_schema: InputSchema {
                        json: json!({
                            "type": "object",
                            "properties": tool
                                .input_schema
                                .get("properties")
                                .cloned()
                                .unwrap_or_else(|| json!({})),
                            "required": tool
                                .input_schema
                                .get("required")
                                .cloned()
                                .unwrap_or_else(|| Value::Array(Vec::new())),
                        }),
                    },
                },
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_declared_schema() {
        let tools = vec![SessionTool {
            name: "list_roaming_plans".to_string(),
            description: Some("Recommend plans for a trip.".to_string()),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "country": { "type": "string" },
                    "duration": { "type": "integer" }
                },
                "required": ["country", "duration"]
            }),
        }];

        let config = to_tool_config(&tools);
        let value = serde_json::to_value(&config).unwrap();
        assert_eq!(
            value,
            json!({
                "tools": [{
                    "toolSpec": {
                        "name": "list_roaming_plans",
                        "description": "Recommend plans for a trip.",
                        "inputSchema": { "json": {
                            "type": "object",
                            "properties": {
                                "country": { "type": "string" },
                                "duration": { "type": "integer" }
                            },
                            "required": ["country", "duration"]
                        } }
                    }
                }]
            })
        );
    }

    #[test]
    fn missing_schema_fields_default_to_empty() {
        let tools = vec![SessionTool {
            name: "ping".to_string(),
            description: None,
            input_schema: json!({}),
        }];

        let config = to_tool_config(&tools);
        let schema = &config.tools[0].tool_spec.input_schema.json;
        assert_eq!(schema["properties"], json!({}));
        assert_eq!(schema["required"], json!([]));
    }
}
