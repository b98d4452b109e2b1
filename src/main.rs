use anyhow::{Context, Result};
use clap::Parser;
use lorekeeper_lib::engine::{
    core::parse_input,
    retrieval::{db::IndexRetriever, ws::TavilySearcher},
    types::{AgentResponse, Command, Task},
    Orchestrator,
};
use lorekeeper_lib::AgentConfig;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "lorekeeper", version, about = "Ask questions about video games")]
struct Args {
    /// TOML config file; defaults are used when it does not exist.
    #[arg(short, long, default_value = "lorekeeper.toml")]
    config: PathBuf,

    /// Print each response as JSON.
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("lorekeeper=info,lorekeeper_lib=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = AgentConfig::load(Some(&args.config)).context("loading configuration")?;

    let retriever = IndexRetriever::new(&config.retrieval).context("building index client")?;
    let web = TavilySearcher::new(&config.web).context("building web search client")?;
    let mut agent = Orchestrator::from_config(&config, Arc::new(retriever), Arc::new(web))?;

    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    stdout
        .write_all(b"Ask about a game (/summary, /context, /reset, /quit).\n> ")
        .await?;
    stdout.flush().await?;

    while let Some(line) = lines.next_line().await? {
        let output = match parse_input(&line) {
            None => String::new(),
            Some(Task::Query(query)) => match agent.process_query(&query).await {
                Ok(response) if args.json => {
                    format!("{}\n", serde_json::to_string_pretty(&response)?)
                }
                Ok(response) => render(&response),
                Err(e) => format!("error: {e}\n"),
            },
            Some(Task::Command(Command::Summary)) => {
                format!("{}\n", serde_json::to_string_pretty(&agent.session_summary())?)
            }
            Some(Task::Command(Command::Context)) => format!("{}\n", agent.context()),
            Some(Task::Command(Command::Reset)) => {
                agent.reset_session();
                format!("new session {}\n", agent.session().session_id())
            }
            Some(Task::Command(Command::Quit)) => break,
            Some(Task::Command(Command::Unknown(cmd))) => format!("unknown command /{cmd}\n"),
        };
        stdout.write_all(output.as_bytes()).await?;
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;
    }

    Ok(())
}

fn render(response: &AgentResponse) -> String {
    let rule = "=".repeat(80);
    format!(
        "{rule}\nTURN {}: {}\n{rule}\n\n{}\n\nANSWER:\n{}\n\nconfidence: {} | source: {} | web search: {} | candidates: {}\n",
        response.turn_id,
        response.query,
        response.reasoning,
        response.answer,
        response.confidence,
        response.source,
        response.web_search_used,
        response.retrieval_details.num_candidates_found,
    )
}
