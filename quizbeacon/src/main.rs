//! quizbeacon - headless driver for the quiz telemetry tracker
//!
//! Stands in for the browser page that hosts the tracker: bootstraps it,
//! then maps stdin commands to lifecycle signals and quiz interactions.
//! Ctrl-C or `quit` performs the final pageUnload flush.
//!
//! Commands:
//! ```text
//! hide | show | focus | blur      lifecycle signals
//! nav <path>                      reload-free navigation
//! answer <id> <choice> <correct>  quizAnswer
//! search <term...>                quizSearch
//! view <id>                       questionView
//! quit                            flush and exit
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};

use quizbeacon_core::{Config, LifecycleSignal, SessionStore, Tracker};

#[derive(Parser)]
#[command(name = "quizbeacon")]
#[command(about = "Headless driver for the quizbeacon telemetry tracker")]
#[command(version)]
struct Args {
    /// Config file path (defaults to the XDG config location)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Initial URL path for the tracked page
    #[arg(short, long, default_value = "/")]
    path: String,

    /// Override the configured user-agent string
    #[arg(short, long)]
    user_agent: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::load_from(path).context("failed to load configuration")?,
        None => Config::load().context("failed to load configuration")?,
    };
    if let Some(ua) = args.user_agent {
        config.tracker.user_agent = ua;
    }

    let _log_guard = quizbeacon_core::logging::init(&config.logging)
        .context("failed to initialize logging")?;

    tracing::info!("quizbeacon starting up");

    let mut session = SessionStore::open(config.session_path(), config.session.ttl_days);
    let tracker = Tracker::init(&config.tracker, &mut session, &args.path)
        .await
        .context("failed to bootstrap tracker")?;

    println!("quizbeacon tracking as {}", tracker.session_id());
    println!("commands: hide show focus blur | nav <path> | answer <id> <choice> <correct> | search <term> | view <id> | quit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line.context("failed to read stdin")? {
                    Some(line) => {
                        if !dispatch(&tracker, line.trim()) {
                            break;
                        }
                    }
                    None => break,
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted, flushing");
                break;
            }
        }
    }

    tracker.shutdown().await;
    tracing::info!("quizbeacon shut down");
    Ok(())
}

/// Handle one command line; returns false when the loop should exit
fn dispatch(tracker: &Tracker, line: &str) -> bool {
    let mut parts = line.split_whitespace();
    let Some(command) = parts.next() else {
        return true;
    };

    match command {
        "hide" => tracker.observe(LifecycleSignal::Hidden),
        "show" => tracker.observe(LifecycleSignal::Visible),
        "focus" => tracker.observe(LifecycleSignal::Focus),
        "blur" => tracker.observe(LifecycleSignal::Blur),
        "nav" => match parts.next() {
            Some(path) => {
                let from = tracker.current_page();
                tracker.navigate(path);
                let to = tracker.current_page();
                tracker.track_quiz_page_navigation(&from, &to);
                tracker.track_page_view();
            }
            None => eprintln!("usage: nav <path>"),
        },
        "answer" => {
            let question_id = parts.next().and_then(|s| s.parse::<i64>().ok());
            let choice = parts.next();
            let correct = parts.next().and_then(|s| s.parse::<bool>().ok());
            match (question_id, choice, correct) {
                (Some(id), Some(choice), Some(correct)) => {
                    tracker.track_quiz_answer(id, choice, correct, None);
                }
                _ => eprintln!("usage: answer <id> <choice> <true|false>"),
            }
        }
        "search" => {
            let term = parts.collect::<Vec<_>>().join(" ");
            if term.is_empty() {
                eprintln!("usage: search <term>");
            } else {
                tracker.track_quiz_search(&term, None);
            }
        }
        "view" => match parts.next().and_then(|s| s.parse::<i64>().ok()) {
            Some(id) => tracker.track_quiz_question_view(id, None),
            None => eprintln!("usage: view <id>"),
        },
        "quit" | "exit" => return false,
        other => eprintln!("unknown command: {}", other),
    }
    true
}
