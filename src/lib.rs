pub mod app;
pub mod autosave;
pub mod cli;
pub mod config;
pub mod entity;
pub mod error;
pub mod search;
pub mod session;
pub mod storage;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

pub use app::NotesApp;
pub use autosave::{AutosaveConfig, AutosaveCoordinator};
pub use error::{NotesError, Result};
pub use storage::{NoteGateway, SqliteGateway};
