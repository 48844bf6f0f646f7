use std::io::Write as _;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use weaver_cli::client::{
    QueryOutcome, QueryRequest, QueryResult, QuerySession, SnapshotCallback,
};
use weaver_cli::Config;

#[derive(Parser)]
#[command(name = "weaver")]
#[command(author, version, about = "Weaver - query client for your hosted bot", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one query against a tenant's bot
    Query {
        /// Question to send
        text: String,

        /// Tenant whose bot to query
        #[arg(short, long)]
        tenant: String,

        /// Bearer credential (API key or session token); falls back to the
        /// WEAVER_API_KEY environment variable
        #[arg(short = 'k', long)]
        api_key: Option<String>,

        /// Force the streaming SSE transport
        #[arg(long, conflicts_with = "no_stream")]
        stream: bool,

        /// Force the single-shot JSON transport
        #[arg(long)]
        no_stream: bool,

        /// Override the configured API base URL
        #[arg(long)]
        base_url: Option<String>,
    },

    /// Print the resolved configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "weaver_cli=debug,weaver=debug"
    } else {
        "weaver_cli=info,weaver=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Query {
            text,
            tenant,
            api_key,
            stream,
            no_stream,
            base_url,
        } => {
            let config = Config::load();
            let credential = api_key
                .or_else(|| std::env::var("WEAVER_API_KEY").ok())
                .context("no credential given: pass --api-key or set WEAVER_API_KEY")?;
            let streaming = if stream {
                true
            } else if no_stream {
                false
            } else {
                config.query.streaming
            };
            let base_url = base_url.unwrap_or(config.api.base_url);
            let connect_timeout = Duration::from_secs(config.api.connect_timeout_secs);

            let request = QueryRequest {
                tenant_id: tenant,
                credential,
                query_text: text,
                streaming,
            };
            run_query_command(&base_url, connect_timeout, request).await?;
        }
        Commands::Config => {
            let config = Config::load();
            if let Some(path) = Config::path() {
                println!("# {}", path.display());
            }
            print!("{}", toml::to_string_pretty(&config)?);
        }
    }

    Ok(())
}

async fn run_query_command(
    base_url: &str,
    connect_timeout: Duration,
    request: QueryRequest,
) -> Result<()> {
    let session = Arc::new(QuerySession::new(base_url, connect_timeout)?);

    let ctrlc_session = session.clone();
    ctrlc::set_handler(move || ctrlc_session.stop())
        .context("failed to install Ctrl+C handler")?;

    // Snapshots carry the full accumulated text; print only the unseen tail
    // so streamed output appears as it arrives.
    let shown = Arc::new(Mutex::new(0usize));
    let cb_shown = shown.clone();
    let on_update: SnapshotCallback = Box::new(move |snapshot: &QueryResult| {
        let mut shown = cb_shown.lock().unwrap();
        if snapshot.text.len() > *shown {
            print!("{}", &snapshot.text[*shown..]);
            let _ = std::io::stdout().flush();
            *shown = snapshot.text.len();
        }
    });

    let result = session.run(request, on_update).await;
    println!();

    match result.outcome {
        QueryOutcome::Completed => {
            let confidence = result
                .confidence
                .map(|c| format!("{c:.2}"))
                .unwrap_or_else(|| "n/a".to_string());
            let sources = result
                .source_count
                .map(|n| n.to_string())
                .unwrap_or_else(|| "n/a".to_string());
            let latency = result
                .latency_ms
                .map(|ms| format!("{ms} ms"))
                .unwrap_or_else(|| "n/a".to_string());
            println!("confidence: {confidence}  sources: {sources}  latency: {latency}");
            Ok(())
        }
        QueryOutcome::Cancelled => {
            println!("(cancelled - partial answer above)");
            Ok(())
        }
        QueryOutcome::Failed => {
            anyhow::bail!(
                "query failed: {}",
                result.error_detail.unwrap_or_else(|| "unknown error".to_string())
            )
        }
        QueryOutcome::Pending => anyhow::bail!("query ended without a terminal outcome"),
    }
}
