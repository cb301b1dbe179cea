//! SQLite implementation of the RecordStore trait.
//!
//! Uses rusqlite with bundled SQLite. Each compare-and-swap runs in an
//! immediate transaction, so concurrent writers (including other processes
//! sharing the file) are serialized by SQLite itself.

use std::path::Path;
use std::sync::Mutex;

use bytes::Bytes;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};

use mutable_dht_core::{PeerAddr, PublicKey, Record, Signature};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::{decide, now_millis, InsertResult, RecordStore, StoredEntry};

/// SQLite-based store implementation.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T>,
    {
        let mut conn = self.conn.lock().map_err(|_| StoreError::LockPoisoned)?;
        f(&mut conn)
    }
}

const SELECT_ENTRY: &str = "SELECT public_key, seq, value, signature, confirmed_by, updated_at
     FROM mutable_records WHERE public_key = ?1";

fn fixed<const N: usize>(row: &Row<'_>, idx: usize) -> rusqlite::Result<[u8; N]> {
    let bytes: Vec<u8> = row.get(idx)?;
    bytes
        .try_into()
        .map_err(|_| rusqlite::Error::InvalidColumnType(idx, format!("blob[{}]", N), Type::Blob))
}

// Helper to convert a row to StoredEntry
fn row_to_entry(row: &Row<'_>) -> rusqlite::Result<StoredEntry> {
    let public_key = PublicKey::from_bytes(fixed::<32>(row, 0)?);
    let seq = u64::from_be_bytes(fixed::<8>(row, 1)?);
    let value: Vec<u8> = row.get(2)?;
    let signature = Signature::from_bytes(fixed::<64>(row, 3)?);
    let confirmed_by = row
        .get::<_, Option<String>>(4)?
        .map(|s| s.parse::<PeerAddr>())
        .transpose()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?;

    Ok(StoredEntry {
        record: Record {
            public_key,
            seq,
            value: Bytes::from(value),
            signature,
        },
        confirmed_by,
        updated_at: row.get(5)?,
    })
}

fn load(conn: &Connection, public_key: &PublicKey) -> Result<Option<StoredEntry>> {
    Ok(conn
        .query_row(
            SELECT_ENTRY,
            params![public_key.as_bytes().as_slice()],
            row_to_entry,
        )
        .optional()?)
}

impl RecordStore for SqliteStore {
    fn compare_and_swap(&self, record: &Record, from: Option<&PeerAddr>) -> Result<InsertResult> {
        self.with_conn(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let current = load(&tx, &record.public_key)?;
            let result = decide(current.as_ref().map(|e| &e.record), record);
            let now = now_millis();

            match &result {
                InsertResult::Inserted { .. } => {
                    tx.execute(
                        "INSERT OR REPLACE INTO mutable_records
                            (public_key, seq, value, signature, confirmed_by, updated_at)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                        params![
                            record.public_key.as_bytes().as_slice(),
                            record.seq.to_be_bytes().as_slice(),
                            &record.value[..],
                            record.signature.as_bytes().as_slice(),
                            from.map(|a| a.to_string()),
                            now,
                        ],
                    )?;
                }
                InsertResult::AlreadyExists => {
                    tx.execute(
                        "UPDATE mutable_records
                         SET confirmed_by = COALESCE(?2, confirmed_by), updated_at = ?3
                         WHERE public_key = ?1",
                        params![
                            record.public_key.as_bytes().as_slice(),
                            from.map(|a| a.to_string()),
                            now,
                        ],
                    )?;
                }
                InsertResult::SequenceReused { .. } | InsertResult::Stale { .. } => {}
            }

            tx.commit()?;
            Ok(result)
        })
    }

    fn get(&self, public_key: &PublicKey) -> Result<Option<StoredEntry>> {
        self.with_conn(|conn| load(conn, public_key))
    }

    fn len(&self) -> Result<usize> {
        self.with_conn(|conn| {
            let count: i64 =
                conn.query_row("SELECT COUNT(*) FROM mutable_records", [], |row| row.get(0))?;
            usize::try_from(count).map_err(|_| StoreError::InvalidData(format!("count {}", count)))
        })
    }

    fn public_keys(&self) -> Result<Vec<PublicKey>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT public_key FROM mutable_records")?;
            let keys = stmt
                .query_map([], |row| fixed::<32>(row, 0).map(PublicKey::from_bytes))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(keys)
        })
    }
}
