mod database;
mod gateway;
pub mod migrations;

pub use database::{Database, Executed, FromRow, Session};
pub use gateway::{NoteGateway, SqliteGateway};
