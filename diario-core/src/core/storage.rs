//! Durable `id -> bytes` store backed by a single SQLite file.
//!
//! The store knows nothing about entries; it keeps whatever payload the codec
//! produced. Every write is committed before the call returns.

use crate::{JournalError, Result};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension};
use std::path::Path;

pub struct Storage {
    conn: Connection,
}

impl Storage {
    /// Opens the store at `path`, creating the file and schema if needed.
    ///
    /// Existing records are preserved.
    ///
    /// # Errors
    ///
    /// Returns [`JournalError::Storage`] if the file cannot be opened or is not
    /// a SQLite database, or [`JournalError::InvalidDataDir`] if the schema
    /// could not be established.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "synchronous", "FULL")?;
        conn.execute_batch(include_str!("schema.sql"))?;

        let table_count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='entries'",
            [],
            |row| row.get(0),
        )?;
        if table_count != 1 {
            return Err(JournalError::InvalidDataDir(
                "Not a valid Diario entry store".to_string(),
            ));
        }

        Ok(Self { conn })
    }

    /// Inserts or replaces the payload stored under `id`.
    pub fn put(&self, id: &str, payload: &[u8]) -> Result<()> {
        self.conn.execute(
            "INSERT INTO entries (id, payload) VALUES (?1, ?2)
             ON CONFLICT(id) DO UPDATE SET payload = excluded.payload",
            rusqlite::params![id, payload],
        )?;
        Ok(())
    }

    /// Writes every record in one transaction: either all land or none do.
    pub fn put_all(&mut self, records: &[(String, Vec<u8>)]) -> Result<()> {
        let tx = self.conn.transaction()?;
        for (id, payload) in records {
            tx.execute(
                "INSERT INTO entries (id, payload) VALUES (?1, ?2)
                 ON CONFLICT(id) DO UPDATE SET payload = excluded.payload",
                rusqlite::params![id, payload],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Returns the payload stored under `id`, if any.
    ///
    /// Rows written as TEXT by older tools are returned as their UTF-8 bytes.
    pub fn get(&self, id: &str) -> Result<Option<Vec<u8>>> {
        let payload = self
            .conn
            .query_row("SELECT payload FROM entries WHERE id = ?1", [id], |row| {
                row.get_ref(0)?
                    .as_bytes()
                    .map(<[u8]>::to_vec)
                    .map_err(|e| {
                        rusqlite::Error::FromSqlConversionFailure(0, Type::Blob, Box::new(e))
                    })
            })
            .optional()?;
        Ok(payload)
    }

    /// Removes `id`. Returns `true` if a record existed.
    pub fn delete(&self, id: &str) -> Result<bool> {
        let removed = self.conn.execute("DELETE FROM entries WHERE id = ?1", [id])?;
        Ok(removed > 0)
    }

    /// All stored ids, in no particular order.
    pub fn keys(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare("SELECT id FROM entries")?;
        let ids = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(ids)
    }

    pub fn contains(&self, id: &str) -> Result<bool> {
        let exists: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM entries WHERE id = ?1)",
            [id],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    pub fn len(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM entries", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn test_open_creates_missing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("diary.sqlite");
        let storage = Storage::open(&path).unwrap();
        assert!(path.exists());
        assert!(storage.is_empty().unwrap());
    }

    #[test]
    fn test_put_get_overwrite() {
        let temp = NamedTempFile::new().unwrap();
        let storage = Storage::open(temp.path()).unwrap();

        assert_eq!(storage.get("a").unwrap(), None);
        storage.put("a", b"first").unwrap();
        assert_eq!(storage.get("a").unwrap(), Some(b"first".to_vec()));
        storage.put("a", b"second").unwrap();
        assert_eq!(storage.get("a").unwrap(), Some(b"second".to_vec()));
        assert_eq!(storage.len().unwrap(), 1);
    }

    #[test]
    fn test_delete_and_contains() {
        let temp = NamedTempFile::new().unwrap();
        let storage = Storage::open(temp.path()).unwrap();
        storage.put("a", b"x").unwrap();

        assert!(storage.contains("a").unwrap());
        assert!(storage.delete("a").unwrap());
        assert!(!storage.contains("a").unwrap());
        assert!(!storage.delete("a").unwrap());
    }

    #[test]
    fn test_keys() {
        let temp = NamedTempFile::new().unwrap();
        let storage = Storage::open(temp.path()).unwrap();
        storage.put("b", b"2").unwrap();
        storage.put("a", b"1").unwrap();
        let mut keys = storage.keys().unwrap();
        keys.sort();
        assert_eq!(keys, vec!["a", "b"]);
    }

    #[test]
    fn test_reopen_preserves_contents() {
        let temp = NamedTempFile::new().unwrap();
        {
            let storage = Storage::open(temp.path()).unwrap();
            storage.put("a", &[0u8, 159, 146, 150]).unwrap();
        }
        let storage = Storage::open(temp.path()).unwrap();
        assert_eq!(storage.get("a").unwrap(), Some(vec![0u8, 159, 146, 150]));
    }

    #[test]
    fn test_open_invalid_database() {
        let temp = NamedTempFile::new().unwrap();
        std::fs::write(temp.path(), "not a database, just some text that is long enough").unwrap();
        let result = Storage::open(temp.path());
        assert!(result.is_err());
        assert!(result.err().unwrap().is_storage());
    }

    #[test]
    fn test_text_payload_is_readable() {
        let temp = NamedTempFile::new().unwrap();
        let storage = Storage::open(temp.path()).unwrap();
        storage
            .connection()
            .execute(
                "INSERT INTO entries (id, payload) VALUES ('legacy', '{\"title\":\"x\"}')",
                [],
            )
            .unwrap();
        assert_eq!(storage.get("legacy").unwrap(), Some(br#"{"title":"x"}"#.to_vec()));
    }

    #[test]
    fn test_put_all_is_all_or_nothing() {
        let temp = NamedTempFile::new().unwrap();
        let mut storage = Storage::open(temp.path()).unwrap();
        storage.put("a", b"old").unwrap();
        storage
            .connection()
            .execute_batch(
                "CREATE TRIGGER reject_poison BEFORE INSERT ON entries
                 WHEN NEW.id = 'poison'
                 BEGIN SELECT RAISE(ABORT, 'poisoned'); END;",
            )
            .unwrap();

        let batch = vec![
            ("a".to_string(), b"new".to_vec()),
            ("poison".to_string(), b"x".to_vec()),
        ];
        assert!(storage.put_all(&batch).is_err());
        assert_eq!(storage.get("a").unwrap(), Some(b"old".to_vec()));
        assert!(!storage.contains("poison").unwrap());

        storage.put_all(&batch[..1]).unwrap();
        assert_eq!(storage.get("a").unwrap(), Some(b"new".to_vec()));
    }
}
