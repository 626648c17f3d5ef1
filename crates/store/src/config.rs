use std::{
    fmt::{Display, Formatter},
    path::PathBuf,
};

use serde::{Deserialize, Serialize};

// Store config
// ================================================================================================

#[derive(Clone, Eq, PartialEq, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// `SQLite` database file holding the Items and Batches relations.
    pub database_filepath: PathBuf,
}

impl Display for StoreConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!(
            "{{ database_filepath: {:?} }}",
            self.database_filepath
        ))
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_filepath: PathBuf::from("./orchestrator-store.sqlite3"),
        }
    }
}
