//! Bundled MCP stdio tool server exposing the roaming catalog tools. Speaks
//! line-delimited JSON-RPC on stdin/stdout; logs go to stderr so the protocol
//! channel stays clean.

use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use roam_agent::roaming::{self, RoamingApi, SubscribeRequest};
use roam_agent::session::SessionTool;
use roam_agent::session::rpc::{self, CallToolResult, Incoming, Response, ToolsListResult};

const DEFAULT_API_BASE: &str = "https://eippdmnpvr.us-west-2.awsapprunner.com";
const USAGE: &str = "usage: roaming-tools [--api-base URL]";

const TOOL_LIST_PLANS: &str = "list_roaming_plans";
const TOOL_GET_USAGE: &str = "get_roaming_usage";
const TOOL_SUBSCRIBE: &str = "subscribe_roaming_plan";

fn tool_catalog() -> Vec<SessionTool> {
    vec![
        SessionTool {
            name: TOOL_LIST_PLANS.to_string(),
            description: Some(
                "List the roaming plans available for a country and trip length, with the \
                 most economical plan recommended first."
                    .to_string(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "country": { "type": "string", "description": "Destination country." },
                    "duration": { "type": "integer", "description": "Trip length in days." }
                },
                "required": ["country", "duration"]
            }),
        },
        SessionTool {
            name: TOOL_GET_USAGE.to_string(),
            description: Some("Look up a customer's roaming usage history.".to_string()),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "phone_number": { "type": "string", "description": "Customer phone number." }
                },
                "required": ["phone_number"]
            }),
        },
        SessionTool {
            name: TOOL_SUBSCRIBE.to_string(),
            description: Some(
                "Subscribe a customer to a roaming plan. Requires the phone number, plan \
                 code, destination country, and start date/time."
                    .to_string(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "phone_number": { "type": "string", "description": "Subscriber phone number, e.g. 01012345678." },
                    "plan_code": { "type": "string", "description": "Plan code, e.g. ZERO_PREMIUM_001." },
                    "roaming_country": { "type": "string", "description": "Country the plan will be used in." },
                    "start_date": { "type": "string", "description": "Start date, YYYY-MM-DDT00:00:00." },
                    "start_time": { "type": "string", "description": "Start time, HH:mm." }
                },
                "required": ["phone_number", "plan_code", "roaming_country", "start_date", "start_time"]
            }),
        },
    ]
}

fn text_result(text: impl Into<String>) -> CallToolResult {
    CallToolResult {
        content: vec![json!({ "type": "text", "text": text.into() })],
        is_error: false,
    }
}

fn error_result(text: impl Into<String>) -> CallToolResult {
    CallToolResult {
        content: vec![json!({ "type": "text", "text": text.into() })],
        is_error: true,
    }
}

fn required_str(arguments: &Value, key: &str) -> Result<String, String> {
    arguments
        .get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| format!("missing required argument: {key}"))
}

async fn list_plans(api: &RoamingApi, arguments: &Value) -> Result<CallToolResult, String> {
    let country = required_str(arguments, "country")?;
    let duration = arguments
        .get("duration")
        .and_then(Value::as_i64)
        .ok_or("missing required argument: duration")?;
    if duration < 1 {
        return Ok(text_result("The trip must be at least one day long."));
    }

    let plans = match api.plans().await {
        Ok(plans) => plans,
        Err(err) => return Ok(error_result(format!("failed to fetch roaming plans: {err}"))),
    };
    let available: Vec<_> = plans
        .into_iter()
        .filter(|plan| plan.supported_countries.iter().any(|c| c == &country))
        .collect();
    if available.is_empty() {
        return Ok(text_result(format!(
            "Sorry, {country} is not currently supported."
        )));
    }

    let ranked = roaming::rank_plans(available, duration as u64);
    Ok(text_result(roaming::format_recommendation(
        &ranked,
        &country,
        duration as u64,
    )))
}

async fn get_usage(api: &RoamingApi, arguments: &Value) -> Result<CallToolResult, String> {
    let phone_number = required_str(arguments, "phone_number")?;
    match api.usage(&phone_number).await {
        Ok(usages) => Ok(text_result(roaming::format_usage_history(
            &phone_number,
            &usages,
        ))),
        Err(err) => Ok(error_result(format!(
            "failed to fetch roaming usage: {err}"
        ))),
    }
}

async fn subscribe(api: &RoamingApi, arguments: &Value) -> Result<CallToolResult, String> {
    let request = SubscribeRequest {
        phone_number: required_str(arguments, "phone_number")?,
        plan_code: required_str(arguments, "plan_code")?,
        roaming_country: required_str(arguments, "roaming_country")?,
        start_date: required_str(arguments, "start_date")?,
        start_time: required_str(arguments, "start_time")?,
        time_standard: "LOCAL".to_string(),
    };
    match api.subscribe(&request).await {
        Ok(response) => Ok(text_result(roaming::format_subscription(
            &request, &response,
        ))),
        Err(err) => Ok(error_result(format!("subscription failed: {err}"))),
    }
}

/// Handle one request frame and produce the response to write back.
async fn handle_request(api: &RoamingApi, frame: &Incoming) -> Option<Response> {
    let method = frame.method.as_deref()?;
    let id = frame.id.clone()?;

    let response = match method {
        rpc::METHOD_INITIALIZE => Response::result(
            id,
            json!({
                "protocolVersion": rpc::MCP_PROTOCOL_VERSION,
                "capabilities": { "tools": {} },
                "serverInfo": {
                    "name": "roaming-tools",
                    "version": env!("CARGO_PKG_VERSION"),
                },
            }),
        ),
        rpc::METHOD_TOOLS_LIST => {
            let result = ToolsListResult {
                tools: tool_catalog(),
            };
            match serde_json::to_value(&result) {
                Ok(value) => Response::result(id, value),
                Err(err) => Response::error(id, rpc::CODE_INVALID_PARAMS, err.to_string()),
            }
        }
        rpc::METHOD_TOOLS_CALL => {
            let params = frame.params.clone().unwrap_or(Value::Null);
            let name = params.get("name").and_then(Value::as_str).unwrap_or("");
            let arguments = params.get("arguments").cloned().unwrap_or(json!({}));
            tracing::info!(tool = name, "tool call");

            let outcome = match name {
                TOOL_LIST_PLANS => list_plans(api, &arguments).await,
                TOOL_GET_USAGE => get_usage(api, &arguments).await,
                TOOL_SUBSCRIBE => subscribe(api, &arguments).await,
                other => Ok(error_result(format!("unknown tool: {other}"))),
            };
            match outcome {
                Ok(result) => match serde_json::to_value(&result) {
                    Ok(value) => Response::result(id, value),
                    Err(err) => Response::error(id, rpc::CODE_INVALID_PARAMS, err.to_string()),
                },
                Err(message) => Response::error(id, rpc::CODE_INVALID_PARAMS, message),
            }
        }
        other => Response::error(
            id,
            rpc::CODE_METHOD_NOT_FOUND,
            format!("unknown method: {other}"),
        ),
    };
    Some(response)
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "roaming_tools=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut api_base = std::env::var("ROAMING_API_BASE").unwrap_or_else(|_| {
        DEFAULT_API_BASE.to_string()
    });
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--api-base" => {
                api_base = args.next().unwrap_or_else(|| {
                    eprintln!("missing value for --api-base");
                    std::process::exit(1);
                });
            }
            "--help" | "-h" => {
                println!("{USAGE}");
                std::process::exit(0);
            }
            other => {
                eprintln!("unknown argument: {other}");
                eprintln!("{USAGE}");
                std::process::exit(1);
            }
        }
    }

    let api = match RoamingApi::new(api_base) {
        Ok(api) => api,
        Err(err) => {
            eprintln!("Error: {err}");
            std::process::exit(1);
        }
    };

    if let Err(err) = serve(api).await {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

async fn serve(api: RoamingApi) -> roam_agent::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let frame: Incoming = match serde_json::from_str(&line) {
            Ok(frame) => frame,
            Err(err) => {
                tracing::warn!(%err, "skipping malformed frame");
                continue;
            }
        };
        // Notifications carry no id and get no response.
        if let Some(response) = handle_request(&api, &frame).await {
            let payload = serde_json::to_string(&response)?;
            stdout.write_all(payload.as_bytes()).await?;
            stdout.write_all(b"\n").await?;
            stdout.flush().await?;
        }
    }
    Ok(())
}
