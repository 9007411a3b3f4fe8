//! Chirp CLI binary.
//!
//! Streaming and cursor-pagination client for the social API.
//!
//! # Commands
//!
//! - `stream` - Open a streaming endpoint and print messages as JSON lines
//! - `replay` - Decode a recorded stream file through a session
//! - `get` - Single REST GET
//! - `cursor` - Fetch every page of a cursored collection
//! - `search` - Query the search API
//! - `config` - Print the effective configuration

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use chirp::{
    params::Params,
    transport::{ChannelTransport, StreamRequest},
    Config, RestClient, StreamClient, StreamEvent, StreamSession, VERSION,
};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "chirp")]
#[command(version = VERSION)]
#[command(about = "Chirp - streaming and cursor pagination client", long_about = None)]
struct Cli {
    /// Config file (default: <config dir>/chirp/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Open a streaming endpoint and print each message as a JSON line
    Stream {
        /// Stream name (filter, sample, firehose, user, site)
        name: String,

        /// Request parameter, repeatable
        #[arg(short, long = "param", value_parser = parse_param)]
        params: Vec<(String, String)>,

        /// Destroy the session after this many messages
        #[arg(short = 'n', long)]
        limit: Option<u64>,

        /// Print session statistics to stderr on exit
        #[arg(short, long)]
        stats: bool,
    },

    /// Decode a recorded newline-delimited stream
    Replay {
        /// Recording to read
        file: PathBuf,

        /// Bytes per simulated network chunk
        #[arg(long, default_value = "512")]
        chunk_size: usize,

        /// Print session statistics to stderr on exit
        #[arg(short, long)]
        stats: bool,
    },

    /// Single REST GET
    Get {
        /// URL, or a path starting with `/` relative to the REST base
        url: String,

        /// Request parameter, repeatable
        #[arg(short, long = "param", value_parser = parse_param)]
        params: Vec<(String, String)>,

        /// Output as pretty-printed JSON
        #[arg(long)]
        pretty: bool,
    },

    /// Fetch every page of a cursored collection
    Cursor {
        /// URL, or a path starting with `/` relative to the REST base
        url: String,

        /// Collection field in each page (ids, users, lists, ...)
        #[arg(short, long)]
        key: String,

        /// Request parameter, repeatable
        #[arg(short, long = "param", value_parser = parse_param)]
        params: Vec<(String, String)>,

        /// Fail after this many pages
        #[arg(long)]
        max_pages: Option<u32>,
    },

    /// Query the search API
    Search {
        /// Search query
        query: String,

        /// Request parameter, repeatable
        #[arg(short, long = "param", value_parser = parse_param)]
        params: Vec<(String, String)>,

        /// Output as pretty-printed JSON
        #[arg(long)]
        pretty: bool,
    },

    /// Print the effective configuration as TOML
    Config,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging; stdout is reserved for data
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = Config::load(cli.config.as_deref())
        .context("Failed to load configuration")?;

    match cli.command {
        Commands::Stream {
            name,
            params,
            limit,
            stats,
        } => cmd_stream(config, &name, params, limit, stats),
        Commands::Replay {
            file,
            chunk_size,
            stats,
        } => cmd_replay(config, file, chunk_size, stats),
        Commands::Get { url, params, pretty } => cmd_get(config, &url, params, pretty),
        Commands::Cursor {
            url,
            key,
            params,
            max_pages,
        } => cmd_cursor(config, &url, &key, params, max_pages),
        Commands::Search {
            query,
            params,
            pretty,
        } => cmd_search(config, &query, params, pretty),
        Commands::Config => cmd_config(&config),
    }
}

/// Parse `key=value`
fn parse_param(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected key=value, got '{s}'"))
}

fn write_json(out: &mut impl Write, value: &Value, pretty: bool) -> anyhow::Result<()> {
    if pretty {
        serde_json::to_writer_pretty(&mut *out, value)?;
    } else {
        serde_json::to_writer(&mut *out, value)?;
    }
    writeln!(out)?;
    Ok(())
}

fn print_json(value: &Value, pretty: bool) -> anyhow::Result<()> {
    write_json(&mut io::stdout().lock(), value, pretty)
}

/// Write session messages to `out` until the terminal event; returns
/// whether the session failed
async fn drain(
    mut session: StreamSession,
    limit: Option<u64>,
    stats: bool,
    out: &mut impl Write,
) -> anyhow::Result<bool> {
    let mut seen = 0u64;
    let mut failed = false;

    while let Some(event) = session.next_event().await {
        match event {
            StreamEvent::Message(message) => {
                if limit.is_some_and(|max| seen >= max) {
                    continue;
                }
                write_json(out, &message, false)?;
                seen += 1;
                if limit.is_some_and(|max| seen >= max) {
                    session.destroy();
                }
            },
            StreamEvent::Error { class, error } => {
                eprintln!("{class:?}: {error}");
                failed |= class == chirp::ErrorClass::Fatal;
            },
            StreamEvent::End => {},
        }
    }

    if stats {
        eprintln!("{}", serde_json::to_string_pretty(&session.stats())?);
    }
    Ok(failed)
}

fn cmd_stream(
    config: Config,
    name: &str,
    params: Vec<(String, String)>,
    limit: Option<u64>,
    stats: bool,
) -> anyhow::Result<()> {
    let runtime = tokio::runtime::Runtime::new()?;
    let failed = runtime.block_on(async {
        let client = StreamClient::new(config)?;
        let session = client.stream(name, params.into_iter().collect())?;
        tracing::info!(session = session.id(), stream = name, "Session started");
        drain(session, limit, stats, &mut io::stdout()).await
    })?;

    if failed {
        anyhow::bail!("stream '{name}' failed");
    }
    Ok(())
}

fn cmd_replay(config: Config, file: PathBuf, chunk_size: usize, stats: bool) -> anyhow::Result<()> {
    let data = std::fs::read(&file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let chunk_size = chunk_size.max(1);

    let runtime = tokio::runtime::Runtime::new()?;
    let failed = runtime.block_on(async {
        let (transport, sender) = ChannelTransport::new();
        let client = StreamClient::with_transport(config, Arc::new(transport));
        let session = client.start(StreamRequest::get(format!("file://{}", file.display())));

        for chunk in data.chunks(chunk_size) {
            sender.send(chunk.to_vec());
        }
        sender.end();

        drain(session, None, stats, &mut io::stdout()).await
    })?;

    if failed {
        anyhow::bail!("replay of {} failed", file.display());
    }
    Ok(())
}

fn cmd_get(
    config: Config,
    url: &str,
    params: Vec<(String, String)>,
    pretty: bool,
) -> anyhow::Result<()> {
    let rest = RestClient::new(&config)?;
    let params: Params = params.into_iter().collect();

    let runtime = tokio::runtime::Runtime::new()?;
    let value = runtime.block_on(rest.get(url, &params))?;
    print_json(&value, pretty)
}

fn cmd_cursor(
    mut config: Config,
    url: &str,
    key: &str,
    params: Vec<(String, String)>,
    max_pages: Option<u32>,
) -> anyhow::Result<()> {
    if max_pages.is_some() {
        config.pagination.max_pages = max_pages;
    }
    let rest = RestClient::new(&config)?;
    let params: Params = params.into_iter().collect();

    let runtime = tokio::runtime::Runtime::new()?;
    let items = runtime.block_on(rest.get_using_cursor(url, key, &params))?;

    tracing::info!(url, key, count = items.len(), "Collection fetched");
    for item in &items {
        print_json(item, false)?;
    }
    Ok(())
}

fn cmd_search(
    config: Config,
    query: &str,
    params: Vec<(String, String)>,
    pretty: bool,
) -> anyhow::Result<()> {
    let rest = RestClient::new(&config)?;
    let params: Params = params.into_iter().collect();

    let runtime = tokio::runtime::Runtime::new()?;
    let value = runtime.block_on(rest.search(query, &params))?;
    print_json(&value, pretty)
}

fn cmd_config(config: &Config) -> anyhow::Result<()> {
    print!("{}", toml::to_string_pretty(config)?);
    Ok(())
}
