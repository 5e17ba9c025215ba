mod attachment;
mod error;
mod llm;
mod routes;
mod sequencer;
mod services;
mod state;
mod transcript;
mod view;

use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::attachment::RawFile;
use crate::error::ErrorCode;
use crate::llm::{LlmChat, LlmClient};
use crate::sequencer::player::{Pacing, Player};
use crate::sequencer::script::{DEMO_SCRIPT, TYPE_INTERVAL};
use crate::services::session::{IgnoreReason, SessionHandle, TurnOutcome};
use crate::view::demo::TerminalSurface;
use crate::view::feed::ChatFeed;
use crate::view::render::{Palette, Renderer};

const DEFAULT_WIDTH: usize = 100;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("failed to bind {addr}: {source}")]
    Bind { addr: String, source: io::Error },
    #[error("cannot read attachment {path}: {source}")]
    Attachment { path: PathBuf, source: io::Error },
}

#[derive(Parser, Debug)]
#[command(name = "siliconbom", about = "PCB/PCBA quotation assistant")]
struct Cli {
    /// Disable ANSI styling.
    #[arg(long, global = true, default_value_t = false)]
    plain: bool,

    /// Terminal width used for wrapping and alignment.
    #[arg(long, global = true, env = "COLUMNS", default_value_t = DEFAULT_WIDTH)]
    width: usize,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the HTTP API.
    Serve {
        #[arg(long, env = "PORT", default_value_t = 3000)]
        port: u16,
    },
    /// Interactive terminal session.
    Chat,
    /// Run a single turn and print the transcript.
    Ask {
        prompt: String,
        #[arg(long = "file")]
        files: Vec<PathBuf>,
    },
    /// Play the scripted offline demo.
    Demo {
        #[arg(long, env = "DEMO_INSTANT", default_value_t = false)]
        instant: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let level = match cli.command {
        Command::Serve { .. } => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };
    tracing_subscriber::fmt().with_writer(io::stderr).with_max_level(level).init();

    let palette = if cli.plain || !io::stdout().is_terminal() { Palette::Plain } else { Palette::Ansi };
    let renderer = Renderer::new(cli.width, palette);

    match cli.command {
        Command::Serve { port } => run_serve(port).await,
        Command::Chat => run_chat(renderer).await,
        Command::Ask { prompt, files } => run_ask(renderer, &prompt, &files).await,
        Command::Demo { instant } => run_demo(renderer, instant).await,
    }
}

/// Build the LLM client from the environment. A missing or invalid config
/// is not fatal; every turn then resolves to the fallback report.
fn load_llm() -> Option<Arc<dyn LlmChat>> {
    match LlmClient::from_env() {
        Ok(client) => {
            info!(model = client.model(), "llm: configured");
            Some(Arc::new(client))
        }
        Err(e) => {
            warn!(code = e.error_code(), error = %e, "llm: not configured, turns will use the fallback report");
            None
        }
    }
}

async fn run_serve(port: u16) -> Result<(), CliError> {
    let state = state::AppState::new(load_llm());
    let app = routes::app(state);

    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|source| CliError::Bind { addr: addr.clone(), source })?;

    info!(%port, "siliconbom listening");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn run_ask(renderer: Renderer, prompt: &str, files: &[PathBuf]) -> Result<(), CliError> {
    let session = SessionHandle::new(load_llm());
    let mut raw = Vec::with_capacity(files.len());
    for path in files {
        raw.push(raw_file(path).await?);
    }
    session.attach(&raw).await;

    if let TurnOutcome::Ignored { reason } = session.send(prompt).await {
        eprintln!("{}", ignore_notice(reason));
    }
    let snap = session.snapshot().await;
    print!("{}", renderer.transcript(&snap.messages, snap.busy));
    io::stdout().flush()?;
    Ok(())
}

async fn run_demo(renderer: Renderer, instant: bool) -> Result<(), CliError> {
    let pacing = if instant { Pacing::Instant } else { Pacing::Realtime };
    let mut surface = TerminalSurface::new(io::stdout(), renderer);
    surface.welcome()?;
    Player::new(pacing, TYPE_INTERVAL).play(DEMO_SCRIPT, &mut surface).await?;
    Ok(())
}

// =============================================================================
// INTERACTIVE CHAT
// =============================================================================

const CHAT_HELP: &str = "命令: /attach <路径>...  /files  /remove <序号>  /clear  /quit";

async fn run_chat(renderer: Renderer) -> Result<(), CliError> {
    let session = SessionHandle::new(load_llm());

    let mut snapshots = session.subscribe();
    let printer = tokio::spawn(async move {
        let mut feed = ChatFeed::new(renderer);
        loop {
            let out = feed.update(&snapshots.borrow_and_update());
            if !out.is_empty() {
                print!("{out}");
                let _ = io::stdout().flush();
            }
            if snapshots.changed().await.is_err() {
                break;
            }
        }
    });

    println!("{CHAT_HELP}");
    let mut turns = JoinSet::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        while turns.try_join_next().is_some() {}
        match ChatInput::parse(&line) {
            ChatInput::Quit => break,
            ChatInput::Help => println!("{CHAT_HELP}"),
            ChatInput::Unknown(command) => println!("未知命令 {command}\n{CHAT_HELP}"),
            ChatInput::Files => print_pending(&renderer, &session).await,
            ChatInput::Clear => {
                session.clear_attachments().await;
                println!("已清空待发送文件");
            }
            ChatInput::Remove(Some(n)) => {
                session.remove_attachment(n - 1).await;
                print_pending(&renderer, &session).await;
            }
            ChatInput::Remove(None) => println!("用法: /remove <序号>"),
            ChatInput::Attach(paths) => {
                let mut raw = Vec::new();
                for path in paths {
                    match raw_file(Path::new(path)).await {
                        Ok(file) => raw.push(file),
                        Err(e) => eprintln!("{e}"),
                    }
                }
                session.attach(&raw).await;
                print_pending(&renderer, &session).await;
            }
            ChatInput::Prompt(prompt) => {
                let session = session.clone();
                let prompt = prompt.to_owned();
                turns.spawn(async move {
                    if let TurnOutcome::Ignored { reason } = session.send(&prompt).await {
                        println!("{}", ignore_notice(reason));
                    }
                });
            }
        }
    }

    if session.snapshot().await.busy {
        println!("正在等待当前分析完成...");
    }
    while turns.join_next().await.is_some() {}

    // The printer ends once the last handle is gone and the final snapshot
    // has been printed.
    drop(session);
    let _ = printer.await;
    Ok(())
}

/// One line of chat input.
#[derive(Debug, PartialEq, Eq)]
enum ChatInput<'a> {
    Quit,
    Help,
    Files,
    Clear,
    /// 1-based index; `None` when missing or not a positive number.
    Remove(Option<usize>),
    Attach(Vec<&'a str>),
    Unknown(&'a str),
    Prompt(&'a str),
}

impl<'a> ChatInput<'a> {
    fn parse(line: &'a str) -> Self {
        let line = line.trim();
        if !line.starts_with('/') {
            return Self::Prompt(line);
        }
        let (command, args) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        match command {
            "/quit" | "/exit" => Self::Quit,
            "/help" => Self::Help,
            "/files" => Self::Files,
            "/clear" => Self::Clear,
            "/remove" => Self::Remove(args.trim().parse::<usize>().ok().filter(|n| *n > 0)),
            "/attach" => Self::Attach(args.split_whitespace().collect()),
            _ => Self::Unknown(command),
        }
    }
}

async fn print_pending(renderer: &Renderer, session: &SessionHandle) {
    let pending = session.snapshot().await.pending;
    if pending.is_empty() {
        println!("(无待发送文件)");
        return;
    }
    for (i, file) in pending.iter().enumerate() {
        println!("{}. {}", i + 1, renderer.chips(std::slice::from_ref(file)));
    }
}

fn ignore_notice(reason: IgnoreReason) -> &'static str {
    match reason {
        IgnoreReason::Busy => "上一轮分析仍在进行，请稍候",
        IgnoreReason::EmptyInput => "请输入需求或添加文件",
    }
}

async fn raw_file(path: &Path) -> Result<RawFile, CliError> {
    let meta = tokio::fs::metadata(path)
        .await
        .map_err(|source| CliError::Attachment { path: path.to_path_buf(), source })?;
    let name = path
        .file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
    Ok(RawFile::new(name, meta.len()))
}
