//! `StorageEngine` — single write connection in WAL mode, migrated on open.
//! Every multi-table write in the engine (create, update, delete,
//! consolidation apply) goes through `StorageEngine::transaction`, which
//! guarantees commit-or-rollback on every exit path including panics.

use std::sync::Mutex;

use rusqlite::Connection;

use cme_core::errors::CortexResult;

use crate::{migrations, to_storage_err};

pub struct StorageEngine {
    conn: Mutex<Connection>,
}

impl StorageEngine {
    /// Open (or create) the database at `path`, run pending migrations, and
    /// configure WAL mode for single-writer/multi-reader concurrency.
    pub fn open(path: &str) -> CortexResult<Self> {
        let conn = if path == ":memory:" {
            Connection::open_in_memory().map_err(|e| to_storage_err(e.to_string()))?
        } else {
            Connection::open(path).map_err(|e| to_storage_err(e.to_string()))?
        };

        if path != ":memory:" {
            conn.pragma_update(None, "journal_mode", "WAL")
                .map_err(|e| to_storage_err(e.to_string()))?;
        }
        conn.pragma_update(None, "foreign_keys", "ON")
            .map_err(|e| to_storage_err(e.to_string()))?;

        migrations::run_migrations(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run `f` inside a transaction: `BEGIN IMMEDIATE`, then `COMMIT` on
    /// `Ok`, `ROLLBACK` on `Err` or panic (via the guard's `Drop`).
    pub fn transaction<T>(
        &self,
        f: impl FnOnce(&Connection) -> CortexResult<T>,
    ) -> CortexResult<T> {
        let conn = self.conn.lock().expect("storage mutex poisoned");
        conn.execute_batch("BEGIN IMMEDIATE")
            .map_err(|e| to_storage_err(e.to_string()))?;

        let mut guard = RollbackGuard {
            conn: &conn,
            committed: false,
        };

        let result = f(&conn);

        match &result {
            Ok(_) => {
                conn.execute_batch("COMMIT")
                    .map_err(|e| to_storage_err(e.to_string()))?;
                guard.committed = true;
            }
            Err(_) => {
                drop(guard);
                return result;
            }
        }
        drop(guard);
        result
    }

    /// Run `f` against the connection without opening a transaction. Used
    /// for read-only paths (search, stats) that don't need isolation
    /// stronger than SQLite's default.
    pub fn read<T>(&self, f: impl FnOnce(&Connection) -> CortexResult<T>) -> CortexResult<T> {
        let conn = self.conn.lock().expect("storage mutex poisoned");
        f(&conn)
    }
}

/// Rolls back the open transaction unless `committed` was set, so every
/// exit path (including an early return or panic-driven unwind) leaves no
/// dangling transaction.
struct RollbackGuard<'a> {
    conn: &'a Connection,
    committed: bool,
}

impl Drop for RollbackGuard<'_> {
    fn drop(&mut self) {
        if !self.committed {
            let _ = self.conn.execute_batch("ROLLBACK");
        }
    }
}
