//! Confab terminal front-end.
//!
//! Binary name: `confab`
//!
//! Wires the engine to the real HTTP and WebSocket collaborators, reads
//! questions from stdin, and renders snapshots as they change. This is the
//! "owning view": it relays input, consumes view effects, and shuts the
//! controller down on exit.

mod render;

use anyhow::Context;
use clap::Parser;
use confab_client::{FileVisitorStore, HttpChatApi, WsConnector};
use confab_core::controller;
use confab_types::chat::Rating;
use confab_types::ids::{ChatId, ItemId};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use std::path::PathBuf;

use render::Renderer;

#[derive(Debug, Parser)]
#[command(name = "confab", about = "Chat with the assistant from the terminal")]
struct Cli {
    /// Chat API base URL.
    #[arg(long, env = "CONFAB_API_URL", default_value = "http://localhost:4000/api")]
    api_url: String,

    /// Realtime WebSocket endpoint.
    #[arg(long, env = "CONFAB_WS_URL", default_value = "ws://localhost:4000")]
    ws_url: String,

    /// Resume an existing conversation instead of starting fresh.
    #[arg(long)]
    chat: Option<String>,

    /// Override the visitor identity file location.
    #[arg(long, env = "CONFAB_VISITOR_FILE")]
    visitor_file: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors.
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info,confab=debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();

    let api = HttpChatApi::new(&cli.api_url);
    let connector = WsConnector::new(&cli.ws_url).context("invalid realtime url")?;
    let visitor = match &cli.visitor_file {
        Some(path) => FileVisitorStore::new(path),
        None => FileVisitorStore::default_location().context("no visitor store location")?,
    };

    let (handle, mut view_events, task) = controller::spawn(
        api,
        connector,
        visitor,
        cli.chat.as_deref().map(ChatId::new),
    );

    // Render snapshots and view effects until the controller stops.
    let mut snapshots = handle.watch();
    let render_task = tokio::spawn(async move {
        let mut renderer = Renderer::default();
        loop {
            tokio::select! {
                changed = snapshots.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let snap = snapshots.borrow_and_update().clone();
                    renderer.on_snapshot(&snap);
                }
                event = view_events.recv() => {
                    match event {
                        Some(event) => renderer.on_view_event(event),
                        None => break,
                    }
                }
            }
        }
    });

    println!("Type a question and press Enter. /feedback <id> <1-5> [comment], /quit to exit.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("failed to read stdin")? else {
                    break;
                };
                if !handle_line(&handle, line.trim()).await? {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    let _ = handle.shutdown().await;
    task.await.context("controller task panicked")?;
    render_task.abort();
    Ok(())
}

/// Dispatch one input line. Returns `false` when the user asked to quit.
async fn handle_line(
    handle: &controller::SessionHandle,
    line: &str,
) -> anyhow::Result<bool> {
    if line.is_empty() {
        return Ok(true);
    }
    if line == "/quit" {
        return Ok(false);
    }
    if let Some(rest) = line.strip_prefix("/feedback ") {
        match parse_feedback(rest) {
            Some((item_id, rating, comment)) => {
                let _ = handle.submit_feedback(item_id, rating, comment, None).await;
            }
            None => println!("usage: /feedback <historyId> <1-5> [comment]"),
        }
        return Ok(true);
    }
    if line.starts_with('/') {
        println!("unknown command; /feedback <id> <1-5> [comment], /quit");
        return Ok(true);
    }

    // Mirror the input-box rule: one outstanding exchange at a time.
    if handle.snapshot().typing {
        println!("(the assistant is still answering, please wait)");
        return Ok(true);
    }
    let _ = handle.send(line).await;
    Ok(true)
}

fn parse_feedback(rest: &str) -> Option<(ItemId, Rating, String)> {
    let mut parts = rest.splitn(3, ' ');
    let item_id = ItemId::new(parts.next()?);
    let rating = Rating::new(parts.next()?.parse().ok()?).ok()?;
    let comment = parts.next().unwrap_or("").to_string();
    Some((item_id, rating, comment))
}
