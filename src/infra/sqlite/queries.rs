use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::{params, OptionalExtension};

use crate::infra::sqlite::schema::open_connection;

pub fn get_value(db_path: &Path, key: &str) -> Result<Option<String>> {
    let conn = open_connection(db_path)?;
    conn.query_row(
        "SELECT value FROM session_kv WHERE key = ?1",
        [key],
        |row| row.get::<_, String>(0),
    )
    .optional()
    .with_context(|| format!("failed to read session key: {key}"))
}

pub fn set_value(db_path: &Path, key: &str, value: &str) -> Result<()> {
    let conn = open_connection(db_path)?;
    conn.execute(
        "INSERT INTO session_kv(key, value)
         VALUES (?1, ?2)
         ON CONFLICT(key) DO UPDATE SET
             value = excluded.value,
             updated_at = CURRENT_TIMESTAMP",
        params![key, value],
    )
    .with_context(|| format!("failed to write session key: {key}"))?;
    Ok(())
}

pub fn remove_value(db_path: &Path, key: &str) -> Result<()> {
    let conn = open_connection(db_path)?;
    conn.execute("DELETE FROM session_kv WHERE key = ?1", [key])
        .with_context(|| format!("failed to delete session key: {key}"))?;
    Ok(())
}
