use anyhow::{Context, Result};
use clap::Parser;
use console::style;
use std::env;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use tandem::agent::Agent;
use tandem::providers::base::Sampling;
use tandem::providers::configs::OpenAiProviderConfig;
use tandem::providers::openai::OpenAiProvider;
use tandem::tools::AgentTool;

mod session;
use session::Session;

const PRIMARY_INSTRUCTIONS: &str = "Your only job is to recursively search through every file for errors and to enact fixes for these errors in a way that is the least destructive to the code.";
const HELPER_INSTRUCTIONS: &str = "Your job is to recursively check the project scripts for ways to improve on the existing code.";

// The helper endpoint is gated behind a pinned API version
const HELPER_API_VERSION: &str = "2024-08-01-preview";

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Inference endpoint base URL
    #[arg(long, default_value = "https://models.github.ai/inference")]
    host: String,

    /// API key (can also be set via GITHUB_TOKEN environment variable)
    #[arg(long)]
    api_key: Option<String>,

    /// Model for the primary agent
    #[arg(long, default_value = "ai21-labs/AI21-Jamba-1.5-Mini")]
    primary_model: String,

    /// Model for the optimization helper agent
    #[arg(long, default_value = "openai/gpt-4.1-mini")]
    helper_model: String,

    /// User messages to run through the primary agent
    #[arg(short, long, default_value = "Hello")]
    message: Vec<String>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    tokio::select! {
        result = run(cli) => {
            if let Err(e) = result {
                tracing::error!(error = ?e, "run failed");
                println!("An unexpected error occurred: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            println!("\nProgram interrupted by user");
        }
    }

    // Both select arms have dropped the agents by now, releasing their
    // provider sessions, and the process exits 0 either way.
    println!("{}", style("Program finished.").dim());
}

async fn run(cli: Cli) -> Result<()> {
    let api_key = cli
        .api_key
        .clone()
        .or_else(|| env::var("GITHUB_TOKEN").ok())
        .context("API key must be provided via --api-key or GITHUB_TOKEN environment variable")?;

    let helper_provider = OpenAiProvider::new(
        OpenAiProviderConfig::new(cli.host.clone(), api_key.clone(), cli.helper_model.clone())
            .with_api_version(HELPER_API_VERSION),
    )?;
    let helper = Arc::new(
        Agent::new("optimizer", HELPER_INSTRUCTIONS, Box::new(helper_provider))
            .with_sampling(Sampling::new(1.0, 1.0))
            .with_tool(AgentTool::remote(
                "AmplitudeMCPServer",
                "MCP server for AmplitudeMCPServer",
                "https://mcp.amplitude.com/mcp",
            )),
    );

    let primary_provider = OpenAiProvider::new(OpenAiProviderConfig::new(
        cli.host,
        api_key,
        cli.primary_model,
    ))?;
    let agent = Arc::new(
        Agent::new("ai-agent", PRIMARY_INSTRUCTIONS, Box::new(primary_provider))
            .with_sampling(Sampling::new(0.8, 0.1))
            .with_tool(helper.as_tool("Optimization", "Always active")),
    );

    let mut session = Session::new(agent, std::io::stdout());
    session.run(&cli.message).await
}
