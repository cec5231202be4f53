//! Persisted store trait and SQLite implementation.

use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

/// Durable key-value byte storage: one serialized blob per named slot.
pub trait PersistStorage: Send + Sync {
  /// Store a blob under a slot name, replacing any previous value.
  fn set_item(&self, name: &str, value: &[u8]) -> Result<()>;

  /// Fetch the blob for a slot name, if one was ever written.
  fn get_item(&self, name: &str) -> Result<Option<Vec<u8>>>;

  /// Drop a slot entirely.
  fn remove_item(&self, name: &str) -> Result<()>;
}

impl<S: PersistStorage + ?Sized> PersistStorage for std::sync::Arc<S> {
  fn set_item(&self, name: &str, value: &[u8]) -> Result<()> {
    (**self).set_item(name, value)
  }

  fn get_item(&self, name: &str) -> Result<Option<Vec<u8>>> {
    (**self).get_item(name)
  }

  fn remove_item(&self, name: &str) -> Result<()> {
    (**self).remove_item(name)
  }
}

/// SQLite-backed storage: a single table mapping slot names to blobs.
pub struct SqliteStorage {
  conn: Mutex<Connection>,
}

/// Schema for the slot table.
const SLOT_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS kv_slots (
    name TEXT PRIMARY KEY,
    data BLOB NOT NULL,
    written_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;

impl SqliteStorage {
  /// Open (or create) the storage at the default location.
  pub fn open() -> Result<Self> {
    let path = Self::default_path()?;
    Self::open_at(&path)
  }

  /// Open (or create) the storage at an explicit path.
  pub fn open_at(path: &Path) -> Result<Self> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create storage directory: {}", e))?;
    }

    let conn = Connection::open(path)
      .map_err(|e| eyre!("Failed to open storage at {}: {}", path.display(), e))?;

    let storage = Self {
      conn: Mutex::new(conn),
    };
    storage.run_migrations()?;

    Ok(storage)
  }

  /// Get the default database path.
  fn default_path() -> Result<std::path::PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("quillbox").join("store.db"))
  }

  fn run_migrations(&self) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute_batch(SLOT_SCHEMA)
      .map_err(|e| eyre!("Failed to run storage migrations: {}", e))?;

    Ok(())
  }
}

impl PersistStorage for SqliteStorage {
  fn set_item(&self, name: &str, value: &[u8]) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute(
        "INSERT OR REPLACE INTO kv_slots (name, data, written_at)
         VALUES (?, ?, datetime('now'))",
        params![name, value],
      )
      .map_err(|e| eyre!("Failed to write slot {}: {}", name, e))?;

    Ok(())
  }

  fn get_item(&self, name: &str) -> Result<Option<Vec<u8>>> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .query_row(
        "SELECT data FROM kv_slots WHERE name = ?",
        params![name],
        |row| row.get(0),
      )
      .optional()
      .map_err(|e| eyre!("Failed to read slot {}: {}", name, e))
  }

  fn remove_item(&self, name: &str) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute("DELETE FROM kv_slots WHERE name = ?", params![name])
      .map_err(|e| eyre!("Failed to delete slot {}: {}", name, e))?;

    Ok(())
  }
}

/// In-memory storage. Used by tests and for ephemeral runs; nothing survives
/// the process.
#[derive(Default)]
pub struct MemoryStorage {
  slots: Mutex<HashMap<String, Vec<u8>>>,
}

impl PersistStorage for MemoryStorage {
  fn set_item(&self, name: &str, value: &[u8]) -> Result<()> {
    let mut slots = self
      .slots
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    slots.insert(name.to_string(), value.to_vec());
    Ok(())
  }

  fn get_item(&self, name: &str) -> Result<Option<Vec<u8>>> {
    let slots = self
      .slots
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    Ok(slots.get(name).cloned())
  }

  fn remove_item(&self, name: &str) -> Result<()> {
    let mut slots = self
      .slots
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    slots.remove(name);
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn sqlite_slot_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let storage = SqliteStorage::open_at(&dir.path().join("store.db")).unwrap();

    assert_eq!(storage.get_item("writings").unwrap(), None);

    storage.set_item("writings", b"blob-1").unwrap();
    assert_eq!(storage.get_item("writings").unwrap().as_deref(), Some(&b"blob-1"[..]));

    // Overwrite replaces the whole blob
    storage.set_item("writings", b"blob-2").unwrap();
    assert_eq!(storage.get_item("writings").unwrap().as_deref(), Some(&b"blob-2"[..]));

    storage.remove_item("writings").unwrap();
    assert_eq!(storage.get_item("writings").unwrap(), None);
  }

  #[test]
  fn sqlite_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.db");

    {
      let storage = SqliteStorage::open_at(&path).unwrap();
      storage.set_item("writings", b"persisted").unwrap();
    }

    let storage = SqliteStorage::open_at(&path).unwrap();
    assert_eq!(
      storage.get_item("writings").unwrap().as_deref(),
      Some(&b"persisted"[..])
    );
  }

  #[test]
  fn memory_slots_are_independent() {
    let storage = MemoryStorage::default();
    storage.set_item("a", b"1").unwrap();
    storage.set_item("b", b"2").unwrap();

    storage.remove_item("a").unwrap();
    assert_eq!(storage.get_item("a").unwrap(), None);
    assert_eq!(storage.get_item("b").unwrap().as_deref(), Some(&b"2"[..]));
  }
}
