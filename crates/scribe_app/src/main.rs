use std::io::Write as _;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use scribe_core::{ChatMsg, Msg, StageState};
use scribe_app::logging::{initialize, LogDestination};
use scribe_app::{Session, SessionConfig};

#[derive(Parser)]
#[command(name = "scribe", about = "Import character records and chat with the campaign assistant")]
struct Cli {
    /// Backend host, e.g. localhost:8000
    #[arg(long, env = "SCRIBE_HOST", default_value = "localhost:8000")]
    host: String,
    /// Campaign identifier sent on chat traffic
    #[arg(long, default_value = "default")]
    campaign: String,
    /// Directory for the persisted draft slot (default: ./.scribe)
    #[arg(long)]
    data_dir: Option<PathBuf>,
    /// Also write logs to ./session.log
    #[arg(long)]
    log_file: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Import a character record and watch per-stage progress
    Import {
        /// Source URL of the character record
        url: Option<String>,
        /// Read raw character JSON from a file instead of a URL
        #[arg(long, conflicts_with = "url")]
        json: Option<PathBuf>,
        /// Restore the saved draft before importing
        #[arg(long)]
        resume: bool,
    },
    /// Send a chat message and stream the reply
    Chat {
        message: String,
        /// Character name to address; defaults to the imported one
        #[arg(long)]
        character: Option<String>,
    },
    /// Show the saved draft, if any
    Draft,
    /// Remove the saved draft
    ClearDraft,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    initialize(if cli.log_file {
        LogDestination::Both
    } else {
        LogDestination::Terminal
    });

    let mut config = SessionConfig {
        host: cli.host,
        campaign_id: cli.campaign,
        ..SessionConfig::default()
    };
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }

    match cli.command {
        Command::Import { url, json, resume } => run_import(config, url, json, resume),
        Command::Chat { message, character } => run_chat(config, message, character),
        Command::Draft => show_draft(config),
        Command::ClearDraft => {
            let mut session = Session::new(config);
            session.dispatch(Msg::ClearDraftRequested);
            session.shutdown();
            println!("Draft removed.");
            Ok(())
        }
    }
}

fn run_import(
    config: SessionConfig,
    url: Option<String>,
    json: Option<PathBuf>,
    resume: bool,
) -> anyhow::Result<()> {
    let mut session = Session::new(config);
    if resume && session.resume_from_draft() {
        println!("Resumed draft at step {}.", session.view().step_number);
    }

    match (url, json) {
        (Some(url), None) => session.dispatch(Msg::SourceUrlChanged(url)),
        (None, Some(path)) => {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("reading {}", path.display()))?;
            session.dispatch(Msg::RawJsonChanged(raw));
        }
        _ => bail!("pass a source URL or --json <file>"),
    }
    session.dispatch(Msg::ImportSubmitted);

    if let Some(error) = session.view().last_error {
        session.shutdown();
        bail!("{error}");
    }

    let mut shown = vec![StageState::Idle; session.view().stage_rows.len()];
    let deadline = Instant::now() + Duration::from_secs(180);
    loop {
        if session.pump() {
            let view = session.view();
            for (index, row) in view.stage_rows.iter().enumerate() {
                if row.state != shown[index] {
                    shown[index] = row.state;
                    println!("{:>4} {}", stage_marker(row.state), row.label);
                    if let Some(message) = &row.message {
                        println!("     {message}");
                    }
                }
            }
        }

        let view = session.view();
        if let Some(error) = &view.last_error {
            session.shutdown();
            bail!("import failed: {error}");
        }
        // Done once the post-import advance has moved the wizard on.
        if !view.is_running && view.import_summary.is_some() && view.step_number >= 3 {
            println!(
                "Imported {} ({}/{} stages): {}",
                view.character_name.as_deref().unwrap_or("character"),
                view.completed_stage_count,
                view.stage_total,
                view.import_summary.as_deref().unwrap_or_default()
            );
            break;
        }
        if Instant::now() > deadline {
            session.shutdown();
            bail!("import timed out");
        }
        std::thread::sleep(Duration::from_millis(50));
    }

    session.shutdown();
    Ok(())
}

fn run_chat(
    config: SessionConfig,
    message: String,
    character: Option<String>,
) -> anyhow::Result<()> {
    let mut session = Session::new(config);
    if let Some(name) = character {
        session.dispatch(Msg::Job(scribe_core::JobMsg::FetchComplete { name }));
    }
    let sent = session.view().messages.len();
    session.dispatch(Msg::Chat(ChatMsg::UserMessage {
        text: message,
        timestamp_ms: scribe_app::effects::now_ms(),
    }));

    let mut printed = 0usize;
    let deadline = Instant::now() + Duration::from_secs(120);
    loop {
        session.pump();
        let view = session.view();

        if let Some(preview) = &view.streaming_preview {
            if preview.len() > printed {
                print!("{}", &preview[printed..]);
                std::io::stdout().flush().ok();
                printed = preview.len();
            }
        }
        // The reply is finalized once a new assistant message lands.
        if view.messages.len() > sent + 1 {
            let reply = &view.messages[view.messages.len() - 1];
            if printed < reply.content.len() {
                print!("{}", &reply.content[printed..]);
            }
            println!();
            break;
        }
        if let Some(error) = &view.chat_error {
            session.shutdown();
            bail!("chat failed: {error}");
        }
        if Instant::now() > deadline {
            session.shutdown();
            bail!("chat timed out");
        }
        std::thread::sleep(Duration::from_millis(30));
    }

    session.shutdown();
    Ok(())
}

fn show_draft(config: SessionConfig) -> anyhow::Result<()> {
    let session = Session::new(config);
    match session.draft() {
        Some(draft) => {
            println!(
                "Draft: step {} of 7, {} completed, source {}",
                draft.current_step,
                draft.completed_steps.len(),
                if draft.source_url.is_empty() {
                    "(none)"
                } else {
                    draft.source_url.as_str()
                }
            );
        }
        None => println!("No saved draft."),
    }
    session.shutdown();
    Ok(())
}

fn stage_marker(state: StageState) -> &'static str {
    match state {
        StageState::Idle => "[ ]",
        StageState::Started => "[.]",
        StageState::InProgress => "[~]",
        StageState::Complete => "[x]",
        StageState::Error => "[!]",
    }
}
