//! Interactive driver: connects the tool session, then answers queries from
//! stdin until `quit`.

use std::io::Write as _;

use tokio::io::{AsyncBufReadExt, BufReader};

use roam_agent::session::ToolSession;
use roam_agent::{BedrockConverse, ConversationLoop, StdioToolSession};

const DEFAULT_BASE_URL: &str = "https://bedrock-runtime.us-west-2.amazonaws.com";
const DEFAULT_MODEL: &str = "anthropic.claude-3-5-sonnet-20241022-v2:0";
const USAGE: &str =
    "usage: roam-agent <server-script(.py|.js)> [--model ID] [--base-url URL] [--max-turns N]";

struct Options {
    server_script: String,
    model_id: String,
    base_url: String,
    max_turns: usize,
}

fn next_value(args: &mut impl Iterator<Item = String>, flag: &str) -> String {
    args.next().unwrap_or_else(|| {
        eprintln!("missing value for {flag}");
        eprintln!("{USAGE}");
        std::process::exit(1);
    })
}

fn parse_args() -> Options {
    let mut server_script: Option<String> = None;
    let mut model_id = DEFAULT_MODEL.to_string();
    let mut base_url = DEFAULT_BASE_URL.to_string();
    let mut max_turns: usize = 10;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--model" => model_id = next_value(&mut args, "--model"),
            "--base-url" => base_url = next_value(&mut args, "--base-url"),
            "--max-turns" => {
                let raw = next_value(&mut args, "--max-turns");
                max_turns = raw.parse().unwrap_or_else(|_| {
                    eprintln!("invalid --max-turns: {raw}");
                    std::process::exit(1);
                });
            }
            "--help" | "-h" => {
                println!("{USAGE}");
                std::process::exit(0);
            }
            other if other.starts_with("--") => {
                eprintln!("unknown flag: {other}");
                eprintln!("{USAGE}");
                std::process::exit(1);
            }
            _ => {
                if server_script.is_some() {
                    eprintln!("unexpected argument: {arg}");
                    eprintln!("{USAGE}");
                    std::process::exit(1);
                }
                server_script = Some(arg);
            }
        }
    }

    let Some(server_script) = server_script else {
        eprintln!("{USAGE}");
        std::process::exit(1);
    };
    Options {
        server_script,
        model_id,
        base_url,
        max_turns,
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "roam_agent=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let options = parse_args();
    if let Err(err) = run(options).await {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

async fn run(options: Options) -> roam_agent::Result<()> {
    // The session lives for the whole process; it is killed on drop even on
    // the error paths below.
    let session = StdioToolSession::connect(&options.server_script).await?;
    let tools = session.list_tools().await?;
    let names: Vec<&str> = tools.iter().map(|tool| tool.name.as_str()).collect();
    println!("\nConnected to server with tools: {names:?}");

    let mut model = BedrockConverse::new(options.base_url, options.model_id)?;
    if let Ok(token) = std::env::var("AWS_BEARER_TOKEN_BEDROCK") {
        model = model.with_bearer_token(token);
    }
    let agent = ConversationLoop::new(model, session).with_max_turns(options.max_turns);

    println!("Agent started. Type your queries or 'quit' to exit.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("\nQuery: ");
        let _ = std::io::stdout().flush();
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let query = line.trim();
        if query.is_empty() {
            continue;
        }
        if query.eq_ignore_ascii_case("quit") {
            break;
        }

        // One bad query never kills the prompt loop.
        match agent.run(query).await {
            Ok(outcome) => {
                println!("\n{}\n\n{}", outcome.transcript, outcome.metrics.summary());
            }
            Err(err) => {
                println!("\nError: {err}");
            }
        }
    }

    agent.into_session().shutdown().await
}
