//! Line-delimited JSON protocol between a UI process and [`NotesApp`].
//!
//! Each input line is one [`SessionEvent`]. Each handled event answers with
//! one [`SessionOutput`] line, and autosave outcomes are written as they
//! happen. At end of input every pending edit is flushed.

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

use crate::app::{NotesApp, ViewState, DEFAULT_TITLE};
use crate::autosave::AutosaveEvent;
use crate::error::{NotesError, Result};
use crate::storage::NoteGateway;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    Create {
        #[serde(default = "default_title")]
        title: String,
        #[serde(default)]
        content: String,
    },
    Select {
        #[serde(default)]
        id: Option<i64>,
    },
    Edit {
        title: String,
        content: String,
    },
    Search {
        #[serde(default)]
        query: String,
    },
    Delete {
        id: i64,
    },
    Reorder {
        id: i64,
        order_index: i64,
    },
    Compact,
    Flush,
    View,
}

fn default_title() -> String {
    DEFAULT_TITLE.to_string()
}

impl SessionEvent {
    pub fn parse(line: &str) -> Result<Self> {
        serde_json::from_str(line).map_err(|e| NotesError::InvalidEvent(e.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionOutput {
    View(ViewState),
    Error { message: String },
    Autosave(AutosaveEvent),
}

/// Apply one event and return the view it leaves behind.
pub async fn handle_event<G: NoteGateway + 'static>(
    app: &NotesApp<G>,
    event: SessionEvent,
) -> Result<ViewState> {
    match event {
        SessionEvent::Create { title, content } => {
            app.create(&title, &content).await?;
        }
        SessionEvent::Select { id } => app.select(id).await?,
        SessionEvent::Edit { title, content } => app.edit(&title, &content).await?,
        SessionEvent::Search { query } => app.search(&query).await,
        SessionEvent::Delete { id } => app.delete(id).await?,
        SessionEvent::Reorder { id, order_index } => app.reorder(id, order_index).await?,
        SessionEvent::Compact => {
            app.compact().await?;
        }
        SessionEvent::Flush => {
            app.flush().await?;
        }
        SessionEvent::View => {}
    }
    Ok(app.view().await)
}

/// Drive a session until `reader` reaches end of input.
pub async fn run_session<G, R, W>(
    app: &NotesApp<G>,
    mut events: mpsc::UnboundedReceiver<AutosaveEvent>,
    reader: R,
    mut writer: W,
) -> Result<()>
where
    G: NoteGateway + 'static,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                let output = match SessionEvent::parse(&line) {
                    Ok(event) => {
                        tracing::debug!(?event, "session event");
                        match handle_event(app, event).await {
                            Ok(view) => SessionOutput::View(view),
                            Err(e) => SessionOutput::Error { message: e.to_string() },
                        }
                    }
                    Err(e) => SessionOutput::Error { message: e.to_string() },
                };
                write_output(&mut writer, &output).await?;
            }
            Some(event) = events.recv() => {
                write_output(&mut writer, &SessionOutput::Autosave(event)).await?;
            }
        }
    }

    if let Err(e) = app.flush().await {
        write_output(&mut writer, &SessionOutput::Error { message: e.to_string() }).await?;
    }
    while let Ok(event) = events.try_recv() {
        write_output(&mut writer, &SessionOutput::Autosave(event)).await?;
    }
    writer.flush().await?;
    Ok(())
}

async fn write_output<W: AsyncWrite + Unpin>(writer: &mut W, output: &SessionOutput) -> Result<()> {
    let mut line = serde_json::to_string(output)?;
    line.push('\n');
    writer.write_all(line.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}
