// Storage layer for the board editor: Postgres repositories and the
// append-only event log

pub mod event_log;
pub mod models;
mod repositories;

pub use repositories::Database;
