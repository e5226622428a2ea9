use std::path::PathBuf;

use tracing::debug;

use crate::infra::sqlite::queries::{get_value, remove_value, set_value};
use crate::infra::sqlite::schema::init_db;
use crate::usecase::ports::session::{SessionStorage, StorageError};

/// Session keys persisted in a SQLite file so a login survives restarts.
pub struct SqliteSessionStore {
    pub db_path: PathBuf,
}

impl SqliteSessionStore {
    pub fn open(db_path: PathBuf) -> Result<Self, StorageError> {
        let store = Self { db_path };
        store.init()?;
        Ok(store)
    }

    pub fn init(&self) -> Result<(), StorageError> {
        debug!(path = %self.db_path.display(), "initializing session db");
        init_db(&self.db_path).map_err(|err| StorageError(format!("{err:#}")))
    }
}

impl SessionStorage for SqliteSessionStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        get_value(&self.db_path, key).map_err(|err| StorageError(format!("{err:#}")))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        set_value(&self.db_path, key, value).map_err(|err| StorageError(format!("{err:#}")))
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        remove_value(&self.db_path, key).map_err(|err| StorageError(format!("{err:#}")))
    }
}
