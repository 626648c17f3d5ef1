use deadpool::managed::PoolError;
use thiserror::Error;

// DATABASE ERRORS
// =================================================================================================

#[derive(Debug, Error)]
pub enum DatabaseError {
    // ERRORS WITH AUTOMATIC CONVERSIONS FROM NESTED ERROR TYPES
    // ---------------------------------------------------------------------------------------------
    #[error("I/O error")]
    IoError(#[from] std::io::Error),
    #[error("migration failed")]
    MigrationError(#[from] rusqlite_migration::Error),
    #[error("missing database connection")]
    MissingDbConnection(#[from] PoolError<rusqlite::Error>),
    #[error("SQLite error")]
    SqliteError(#[from] rusqlite::Error),

    // OTHER ERRORS
    // ---------------------------------------------------------------------------------------------
    #[error("batch {0} not found")]
    BatchNotFound(i64),
    #[error("item {0} not found")]
    ItemNotFound(i64),
    #[error("stored amount {0:?} is not a valid non-negative integer")]
    CorruptAmount(String),
    #[error("SQLite pool interaction failed: {0}")]
    InteractError(String),
}

// INITIALIZATION ERRORS
// =================================================================================================

#[derive(Debug, Error)]
pub enum DatabaseSetupError {
    #[error("I/O error")]
    Io(#[from] std::io::Error),
    #[error("database error")]
    Database(#[from] DatabaseError),
    #[error("pool build error")]
    PoolBuild(#[from] deadpool::managed::BuildError),
    #[error("SQLite migration error")]
    SqliteMigration(#[from] rusqlite_migration::Error),
}
