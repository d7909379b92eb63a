//! Error types for local persistence operations.

use thiserror::Error;

/// Errors returned while initialising or using the checkpoint database.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PersistenceError {
    /// The database URL/path was present but blank.
    #[error("database URL must not be blank")]
    BlankDatabaseUrl,

    /// Establishing a `SQLite` connection failed.
    #[error("failed to connect to SQLite database: {message}")]
    ConnectionFailed {
        /// Error detail from Diesel.
        message: String,
    },

    /// Running pending migrations failed.
    #[error("failed to run database migrations: {message}")]
    MigrationFailed {
        /// Error detail from Diesel migrations.
        message: String,
    },

    /// Reading the schema version from the migration table failed.
    #[error("failed to read schema version after migrations: {message}")]
    SchemaVersionQueryFailed {
        /// Error detail from Diesel query execution.
        message: String,
    },

    /// The migrations completed but no schema version could be found.
    #[error("no schema version recorded after migrations ran")]
    MissingSchemaVersion,

    /// Reading a checkpoint row failed.
    #[error("failed to read checkpoint: {message}")]
    ReadFailed {
        /// Error detail from Diesel query execution.
        message: String,
    },

    /// Writing a checkpoint row failed.
    #[error("failed to write checkpoint: {message}")]
    WriteFailed {
        /// Error detail from Diesel query execution.
        message: String,
    },

    /// A stored cursor could not be decoded.
    #[error("stored checkpoint is corrupt: {message}")]
    CorruptCheckpoint {
        /// Error detail from the cursor decoder.
        message: String,
    },
}
