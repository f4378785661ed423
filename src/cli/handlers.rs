use std::env;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::io::BufReader;

use crate::app::NotesApp;
use crate::autosave::FlushOutcome;
use crate::config::{self, Config, DATA_DIR};
use crate::entity::{Note, NoteDraft};
use crate::error::{NotesError, Result};
use crate::search::SearchFilter;
use crate::session::run_session;
use crate::storage::{NoteGateway, SqliteGateway};

/// An opened data directory.
struct Workspace {
    config: Config,
    gateway: Arc<SqliteGateway>,
}

fn open_workspace(data_dir: Option<&Path>) -> Result<Workspace> {
    let data_dir = config::resolve_data_dir(data_dir)?;
    let config = Config::load(&data_dir)?;
    let gateway = Arc::new(SqliteGateway::open(config.database_path(&data_dir)));
    tracing::debug!(data_dir = %data_dir.display(), "opened workspace");
    Ok(Workspace { config, gateway })
}

fn read_stdin() -> Result<String> {
    let mut content = String::new();
    io::stdin().read_to_string(&mut content)?;
    Ok(content)
}

async fn find_note(gateway: &SqliteGateway, id: i64) -> Result<Note> {
    gateway
        .get_note(id)
        .await?
        .ok_or(NotesError::NoteNotFound(id))
}

fn print_row(note: &Note) {
    println!(
        "  {:>4} [{:>3}] {}  ({})",
        note.id,
        note.order_index,
        note.display_title(),
        note.updated_at.format("%Y-%m-%d %H:%M")
    );
    let preview = note.preview();
    if !preview.is_empty() {
        println!("         {}", preview);
    }
}

pub async fn handle_init(data_dir: Option<PathBuf>) -> Result<()> {
    let data_dir = match data_dir {
        Some(dir) => dir,
        None => env::current_dir()?.join(DATA_DIR),
    };
    config::init_data_dir(&data_dir)?;

    // Create the database file and schema now rather than on first use.
    let config = Config::read(&data_dir)?;
    let gateway = SqliteGateway::open(config.database_path(&data_dir));
    gateway.database().session().await?;

    println!("Initialized mdnotes in {}", data_dir.display());
    Ok(())
}

pub async fn handle_add(
    data_dir: Option<PathBuf>,
    title: String,
    content: Option<String>,
    stdin: bool,
    json: bool,
) -> Result<()> {
    let ws = open_workspace(data_dir.as_deref())?;

    let content = if stdin {
        read_stdin()?
    } else {
        content.unwrap_or_default()
    };

    let id = ws.gateway.create_note(&title, &content).await?;
    let note = find_note(&ws.gateway, id).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&note)?);
    } else {
        println!("Created note {} - {}", note.id, note.display_title());
    }
    Ok(())
}

pub async fn handle_list(data_dir: Option<PathBuf>, filter: Option<String>, json: bool) -> Result<()> {
    let ws = open_workspace(data_dir.as_deref())?;
    let notes = ws.gateway.list_notes().await?;
    let filter = SearchFilter::new(filter.as_deref().unwrap_or_default());
    let shown = filter.apply(&notes);

    if json {
        println!("{}", serde_json::to_string_pretty(&shown)?);
    } else if shown.is_empty() {
        println!("No notes found.");
    } else {
        println!("Notes:\n");
        for note in shown {
            print_row(note);
        }
    }
    Ok(())
}

pub async fn handle_get(data_dir: Option<PathBuf>, id: i64, json: bool) -> Result<()> {
    let ws = open_workspace(data_dir.as_deref())?;
    let note = find_note(&ws.gateway, id).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&note)?);
    } else {
        println!("Note {}", note.id);
        println!("Title: {}", note.display_title());
        println!("Order: {}", note.order_index);
        println!("Created: {}", note.created_at.format("%Y-%m-%d %H:%M"));
        println!("Updated: {}", note.updated_at.format("%Y-%m-%d %H:%M"));
        if !note.content.is_empty() {
            println!("\n{}", note.content);
        }
    }
    Ok(())
}

/// Edits go through the autosave coordinator and are flushed before exit,
/// so an edit that changes nothing does not touch `updated_at`.
pub async fn handle_edit(
    data_dir: Option<PathBuf>,
    id: i64,
    title: Option<String>,
    content: Option<String>,
    stdin: bool,
) -> Result<()> {
    let ws = open_workspace(data_dir.as_deref())?;
    let app = NotesApp::new(Arc::clone(&ws.gateway), ws.config.autosave());
    app.load().await?;
    app.select(Some(id)).await?;

    let current = app
        .editor_text(id)
        .await
        .ok_or(NotesError::NoteNotFound(id))?;
    let content = if stdin { Some(read_stdin()?) } else { content };
    let draft = NoteDraft::new(
        title.unwrap_or(current.title),
        content.unwrap_or(current.content),
    );

    app.edit(&draft.title, &draft.content).await?;
    match app.autosave().flush(id).await? {
        FlushOutcome::Written => println!("Updated note {}", id),
        FlushOutcome::Clean => println!("Note {} unchanged", id),
    }
    Ok(())
}

pub async fn handle_delete(data_dir: Option<PathBuf>, id: i64, force: bool) -> Result<()> {
    let ws = open_workspace(data_dir.as_deref())?;
    let note = find_note(&ws.gateway, id).await?;

    if !force {
        eprintln!("Delete note {} - {}? [y/N] ", note.id, note.display_title());

        if atty::is(atty::Stream::Stdin) {
            let mut input = String::new();
            io::stdin().read_line(&mut input)?;
            if !input.trim().eq_ignore_ascii_case("y") {
                println!("Cancelled.");
                return Ok(());
            }
        } else {
            return Err(NotesError::ConfirmationRequired("delete"));
        }
    }

    ws.gateway.delete_note(id).await?;
    println!("Deleted note {} - {}", note.id, note.display_title());
    Ok(())
}

pub async fn handle_search(data_dir: Option<PathBuf>, query: String, json: bool) -> Result<()> {
    let ws = open_workspace(data_dir.as_deref())?;
    let notes = ws.gateway.list_notes().await?;
    let results = SearchFilter::new(&query).apply(&notes);

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else if results.is_empty() {
        println!("No results found for '{}'.", query);
    } else {
        println!("Search results for '{}':\n", query);
        for note in results {
            print_row(note);
        }
    }
    Ok(())
}

pub async fn handle_move(data_dir: Option<PathBuf>, id: i64, order_index: i64) -> Result<()> {
    let ws = open_workspace(data_dir.as_deref())?;
    find_note(&ws.gateway, id).await?;
    ws.gateway.set_order(id, order_index).await?;
    println!("Moved note {} to position {}", id, order_index);
    Ok(())
}

pub async fn handle_compact(data_dir: Option<PathBuf>) -> Result<()> {
    let ws = open_workspace(data_dir.as_deref())?;
    let moved = ws.gateway.compact_order().await?;
    println!("Compacted display order ({} notes renumbered)", moved);
    Ok(())
}

pub async fn handle_session(data_dir: Option<PathBuf>) -> Result<()> {
    let ws = open_workspace(data_dir.as_deref())?;
    let (app, events) = NotesApp::with_events(Arc::clone(&ws.gateway), ws.config.autosave());
    app.load().await?;

    tracing::info!("session started");
    run_session(
        &app,
        events,
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
    )
    .await
}
