use std::path::PathBuf;

use deadpool::Runtime;

use crate::errors::DatabaseError;

deadpool::managed_reexports!(
    "orchestrator-store",
    SqlitePoolManager,
    deadpool::managed::Object<SqlitePoolManager>,
    rusqlite::Error,
    DatabaseError
);

use crate::SQL_STATEMENT_CACHE_CAPACITY;

const RUNTIME: Runtime = Runtime::Tokio1;

enum Target {
    File(PathBuf),
    Memory,
}

pub struct SqlitePoolManager {
    target: Target,
}

impl SqlitePoolManager {
    pub fn new(database_path: PathBuf) -> Self {
        Self { target: Target::File(database_path) }
    }

    /// A manager whose connections all point at the same process-local in-memory database.
    /// Only useful paired with a pool capped at one connection: separate `:memory:` handles
    /// never share data.
    pub fn new_in_memory() -> Self {
        Self { target: Target::Memory }
    }

    pub fn new_connection(&self) -> rusqlite::Result<Connection> {
        let conn = match &self.target {
            Target::File(path) => Connection::open(path)?,
            Target::Memory => Connection::open_in_memory()?,
        };
        let inner = conn.inner();

        // Increase the statement cache size.
        inner.set_prepared_statement_cache_capacity(SQL_STATEMENT_CACHE_CAPACITY);

        // Enable the WAL mode so readers (peek, inspect) are never blocked behind a writer
        // holding an attach-batch or recover transaction.
        inner.execute("PRAGMA journal_mode = WAL;", ())?;

        // Enable foreign key checks.
        inner.execute("PRAGMA foreign_keys = ON;", ())?;

        Ok(conn)
    }
}

use deadpool::managed::{Manager, Metrics, RecycleResult};

use crate::db::connection::Connection;

impl Manager for SqlitePoolManager {
    type Type = deadpool_sync::SyncWrapper<Connection>;
    type Error = rusqlite::Error;

    async fn create(&self) -> Result<Self::Type, Self::Error> {
        let conn = self.new_connection();
        deadpool_sync::SyncWrapper::new(RUNTIME, move || conn).await
    }

    async fn recycle(&self, _: &mut Self::Type, _: &Metrics) -> RecycleResult<Self::Error> {
        Ok(())
    }
}
