use once_cell::sync::Lazy;
use rusqlite_migration::{Migrations, M};
use tracing::{info, instrument};

use crate::{db::connection::Connection, errors::DatabaseError, COMPONENT};

const MIGRATION_SCRIPTS: [&str; 1] = [include_str!("migrations/001_init.sql")];
static MIGRATIONS: Lazy<Migrations> = Lazy::new(prepare_migrations);

fn up(s: &'static str) -> M<'static> {
    M::up(s).foreign_key_check()
}

fn prepare_migrations() -> Migrations<'static> {
    Migrations::new(MIGRATION_SCRIPTS.map(up).to_vec())
}

#[instrument(target = COMPONENT, skip_all, err)]
pub fn apply_migrations(conn: &mut Connection) -> super::Result<()> {
    let conn = conn.inner_mut();
    let version_before = MIGRATIONS.current_version(conn)?;
    info!(target: COMPONENT, version_before = ?version_before, "running database migrations");

    MIGRATIONS.to_latest(conn).map_err(DatabaseError::MigrationError)?;

    Ok(())
}

#[test]
fn migrations_validate() {
    assert_eq!(MIGRATIONS.validate(), Ok(()));
}
