mod session;

use std::io::{self, ErrorKind, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use curator_contracts::events::{payload, EventWriter};
use curator_contracts::gallery::SnapshotFile;
use curator_engine::{CritiqueRequest, CuratorEngine, EngineConfig, ThemeSuggestionRequest};
use serde_json::json;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use crate::session::{Flow, Session};

#[derive(Debug, Parser)]
#[command(name = "curator", version, about = "Gallery critique engine")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Interactive gallery session driven by slash commands.
    Session(SessionArgs),
    /// Critique one image and print the result as JSON.
    Critique(CritiqueArgs),
    /// List usable backend identifiers.
    Models(ModelsArgs),
    /// Suggest gallery themes from a posting history.
    Suggest(SuggestArgs),
}

#[derive(Debug, Args)]
struct EngineArgs {
    #[arg(long)]
    events: Option<PathBuf>,
    #[arg(long)]
    ollama_host: Option<String>,
    #[arg(long)]
    hosted_model: Option<String>,
    /// Per-request timeout in seconds.
    #[arg(long)]
    timeout: Option<f64>,
}

#[derive(Debug, Parser)]
struct SessionArgs {
    #[command(flatten)]
    engine: EngineArgs,
    #[arg(long, default_value = "curator-state.json")]
    state: PathBuf,
    #[arg(long)]
    feed: Option<PathBuf>,
}

#[derive(Debug, Parser)]
struct CritiqueArgs {
    #[command(flatten)]
    engine: EngineArgs,
    #[arg(long)]
    image_url: String,
    #[arg(long, default_value = "image-1")]
    image_id: String,
    #[arg(long)]
    intention: String,
    #[arg(long, default_value = "")]
    theme: String,
    #[arg(long, default_value = "Default AI")]
    critic: String,
    #[arg(long)]
    backend: Option<String>,
}

#[derive(Debug, Parser)]
struct ModelsArgs {
    #[command(flatten)]
    engine: EngineArgs,
}

#[derive(Debug, Parser)]
struct SuggestArgs {
    #[command(flatten)]
    engine: EngineArgs,
    #[arg(long)]
    history: String,
    #[arg(long)]
    count: Option<usize>,
    #[arg(long)]
    backend: Option<String>,
}

fn main() {
    init_tracing();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("curator error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Session(args) => {
            run_session(args)?;
            Ok(0)
        }
        Command::Critique(args) => run_critique(args),
        Command::Models(args) => run_models(args),
        Command::Suggest(args) => run_suggest(args),
    }
}

fn build_engine(args: &EngineArgs) -> Result<CuratorEngine> {
    let mut config = EngineConfig::from_env();
    if let Some(host) = args.ollama_host.as_deref() {
        config = config.with_local_host(host);
    }
    if let Some(model) = args.hosted_model.as_deref() {
        config.hosted_model = model.trim().to_string();
    }
    if let Some(seconds) = args.timeout {
        config = config.with_timeout_seconds(seconds);
    }
    let session_id = Uuid::new_v4().to_string();
    let events = match args.events.as_ref() {
        Some(path) => EventWriter::new(path, session_id),
        None => EventWriter::disabled(session_id),
    };
    CuratorEngine::new(config, events).context("failed to build critique engine")
}

fn run_session(args: SessionArgs) -> Result<()> {
    let engine = Arc::new(build_engine(&args.engine)?);
    let events = engine.events().clone();
    events.emit(
        "session_started",
        payload(json!({
            "hosted_available": engine.selector().hosted_available(),
            "local_host": engine.config().local_host,
            "state_path": args.state.to_string_lossy(),
        })),
    )?;

    let mut session = Session::new(Arc::clone(&engine), Some(SnapshotFile::new(&args.state)));
    if let Some(feed) = args.feed.as_ref() {
        let count = session.load_feed(feed)?;
        println!("Loaded {count} images from {}", feed.display());
    }

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut line = String::new();
    println!("Curator session started. Type /help for commands.");

    loop {
        session.drain(&mut stdout)?;
        print!("> ");
        stdout.flush()?;

        line.clear();
        let read = match stdin.read_line(&mut line) {
            Ok(read) => read,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(err.into()),
        };
        if read == 0 {
            break;
        }

        let input = line.trim_end_matches(['\n', '\r']);
        if session.handle_line(input, &mut stdout)? == Flow::Quit {
            break;
        }
    }

    session.wait(&mut stdout)?;
    session.persist()?;
    events.emit(
        "session_finished",
        payload(json!({
            "saved_galleries": session.store().saved_galleries().len(),
        })),
    )?;
    Ok(())
}

fn run_critique(args: CritiqueArgs) -> Result<i32> {
    let engine = build_engine(&args.engine)?;
    let request = CritiqueRequest {
        image_id: args.image_id,
        image_url: args.image_url,
        artistic_intention: args.intention,
        theme: args.theme,
        critic: args.critic,
        backend: args.backend,
    };
    match engine.critique_image(&request) {
        Ok(critique) => {
            println!("{}", serde_json::to_string_pretty(&critique)?);
            Ok(0)
        }
        Err(err) => {
            eprintln!("Failed to generate critique: {err}");
            Ok(2)
        }
    }
}

fn run_models(args: ModelsArgs) -> Result<i32> {
    let engine = build_engine(&args.engine)?;
    for backend in engine.available_backends() {
        println!("{backend}");
    }
    Ok(0)
}

fn run_suggest(args: SuggestArgs) -> Result<i32> {
    let engine = build_engine(&args.engine)?;
    let request = ThemeSuggestionRequest {
        posting_history: args.history,
        count: args.count,
        backend: args.backend,
    };
    match engine.suggest_themes(&request) {
        Ok(themes) => {
            let names = themes
                .iter()
                .map(|theme| theme.name.as_str())
                .collect::<Vec<&str>>();
            println!("{}", serde_json::to_string_pretty(&json!({"themes": names}))?);
            Ok(0)
        }
        Err(err) => {
            eprintln!("Failed to suggest themes: {err}");
            Ok(2)
        }
    }
}
