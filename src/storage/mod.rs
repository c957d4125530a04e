//! SQLite persistence for runners, races, and results.

pub mod repository;
pub mod schema;

pub use repository::{IngestSummary, MeetResults, MeetRow, MeetStore};
pub use schema::create_tables;
