use thiserror::Error;

#[derive(Error, Debug)]
pub enum NotesError {
    #[error("Not in an mdnotes directory. Run 'mdnotes init' first.")]
    NotInitialized,

    #[error("Already initialized. Remove .mdnotes/ to reinitialize.")]
    AlreadyInitialized,

    #[error("Note not found: {0}")]
    NoteNotFound(i64),

    #[error("Storage failure: {0}")]
    StorageFailure(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid session event: {0}")]
    InvalidEvent(String),

    #[error("Use --force to {0} in non-interactive mode")]
    ConfirmationRequired(&'static str),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl NotesError {
    /// Insert succeeded but the store did not report a generated identity.
    pub fn missing_insert_id() -> Self {
        NotesError::StorageFailure("insert did not yield a generated id".to_string())
    }
}

impl From<rusqlite::Error> for NotesError {
    fn from(e: rusqlite::Error) -> Self {
        NotesError::StorageFailure(format!("SQLite error: {}", e))
    }
}

pub type Result<T> = std::result::Result<T, NotesError>;
