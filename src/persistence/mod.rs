//! Local persistence for per-source checkpoints.
//!
//! Checkpoints live in a local `SQLite` database so incremental runs survive
//! process restarts. The schema is managed with Diesel migrations so the
//! database can be created and upgraded consistently across machines.

mod checkpoint_store;
mod error;
mod migrator;

pub use checkpoint_store::SqliteCheckpointStore;
pub use error::PersistenceError;
pub use migrator::{INITIAL_SCHEMA_VERSION, SchemaVersion, migrate_database};
