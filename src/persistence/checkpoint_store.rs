//! `SQLite`-backed checkpoint store.
//!
//! Cursors are stored one row per source, upserted atomically, with the
//! cursor payload serialised as JSON. The store opens a fresh connection per
//! operation; checkpoint traffic is two reads and at most two writes per run,
//! so connection pooling would buy nothing.

use diesel::Connection;
use diesel::OptionalExtension;
use diesel::QueryableByName;
use diesel::RunQueryDsl;
use diesel::sql_query;
use diesel::sql_types::Text;
use diesel::sqlite::SqliteConnection;

use crate::comment::{AggregationError, Origin};
use crate::pipeline::{Checkpoint, CheckpointStore};

use super::PersistenceError;

/// Checkpoint store persisting cursors in the local `SQLite` database.
#[derive(Debug, Clone)]
pub struct SqliteCheckpointStore {
    database_url: String,
}

impl SqliteCheckpointStore {
    /// Creates a store targeting the configured `database_url`.
    ///
    /// The schema must already exist; run
    /// [`super::migrate_database`] first.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError::BlankDatabaseUrl`] when the URL is blank.
    pub fn new(database_url: impl Into<String>) -> Result<Self, PersistenceError> {
        let database_url_string = database_url.into();
        if database_url_string.trim().is_empty() {
            return Err(PersistenceError::BlankDatabaseUrl);
        }
        Ok(Self {
            database_url: database_url_string,
        })
    }

    fn establish_connection(&self) -> Result<SqliteConnection, PersistenceError> {
        SqliteConnection::establish(&self.database_url).map_err(|error| {
            PersistenceError::ConnectionFailed {
                message: error.to_string(),
            }
        })
    }

    fn read_cursor(&self, origin: Origin) -> Result<Checkpoint, PersistenceError> {
        #[derive(Debug, QueryableByName)]
        struct Row {
            #[diesel(sql_type = Text)]
            cursor: String,
        }

        let mut connection = self.establish_connection()?;

        let result: Option<Row> =
            sql_query("SELECT cursor FROM source_checkpoints WHERE source = ? LIMIT 1;")
                .bind::<Text, _>(origin.as_str())
                .get_result(&mut connection)
                .optional()
                .map_err(|error| PersistenceError::ReadFailed {
                    message: error.to_string(),
                })?;

        result.map_or(Ok(Checkpoint::Start), |row| {
            serde_json::from_str(&row.cursor).map_err(|error| {
                PersistenceError::CorruptCheckpoint {
                    message: format!("{source}: {error}", source = origin.as_str()),
                }
            })
        })
    }

    fn write_cursor(&self, origin: Origin, checkpoint: &Checkpoint) -> Result<(), PersistenceError> {
        let cursor = serde_json::to_string(checkpoint).map_err(|error| {
            PersistenceError::WriteFailed {
                message: error.to_string(),
            }
        })?;

        let mut connection = self.establish_connection()?;

        sql_query(
            "INSERT INTO source_checkpoints (source, cursor) VALUES (?, ?) \
             ON CONFLICT(source) DO UPDATE SET \
               cursor = excluded.cursor, \
               updated_at = CURRENT_TIMESTAMP;",
        )
        .bind::<Text, _>(origin.as_str())
        .bind::<Text, _>(&cursor)
        .execute(&mut connection)
        .map(drop)
        .map_err(|error| PersistenceError::WriteFailed {
            message: error.to_string(),
        })
    }
}

impl CheckpointStore for SqliteCheckpointStore {
    fn read(&self, origin: Origin) -> Result<Checkpoint, AggregationError> {
        self.read_cursor(origin)
            .map_err(|error| AggregationError::Io {
                message: error.to_string(),
            })
    }

    fn write(&self, origin: Origin, checkpoint: &Checkpoint) -> Result<(), AggregationError> {
        self.write_cursor(origin, checkpoint)
            .map_err(|error| AggregationError::Io {
                message: error.to_string(),
            })
    }
}
