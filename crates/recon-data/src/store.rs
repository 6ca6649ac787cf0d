//! Persistence sinks for reconstructed block records.
//!
//! [`Store`] is the SQLite sink: one table per collection, WAL mode for
//! concurrent readers, and one SQL transaction per block so a block is either
//! fully stored or not at all. [`JsonLinesSink`] writes the same items as
//! newline-delimited JSON for piping into other tools.

use std::cell::RefCell;
use std::io::Write;

use eyre::{Context, Result};
use rusqlite::Connection;

use crate::types::{StoreItem, StoreRecord};

/// Receives the ordered item sequence of one block.
pub trait Sink {
    /// Writes every item of one block, returning the number written.
    ///
    /// # Errors
    /// Returns error if the underlying storage rejects the write.
    fn write_items(&self, block_number: u64, items: &[StoreItem]) -> Result<usize>;
}

/// Stored item counts for one block.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CollectionCounts {
    pub headers: u64,
    pub transactions: u64,
    pub receipts: u64,
    pub logs: u64,
}

pub struct Store {
    conn: RefCell<Connection>,
}

impl Store {
    /// Creates or opens a SQLite database with WAL mode enabled.
    ///
    /// # Errors
    /// Returns error if the database cannot be opened or migrations fail.
    pub fn new(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .wrap_err_with(|| format!("failed to open SQLite database at {path}"))?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        let store = Self {
            conn: RefCell::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    fn run_migrations(&self) -> Result<()> {
        self.conn.borrow_mut().execute_batch(
            "
            CREATE TABLE IF NOT EXISTS headers (
                block_number INTEGER PRIMARY KEY,
                block_hash TEXT NOT NULL,
                record TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS transactions (
                block_number INTEGER NOT NULL,
                tx_hash TEXT NOT NULL,
                tx_index TEXT NOT NULL,
                record TEXT NOT NULL,
                created_at TEXT NOT NULL,
                PRIMARY KEY (block_number, tx_hash)
            );

            CREATE TABLE IF NOT EXISTS receipts (
                block_number INTEGER NOT NULL,
                tx_hash TEXT NOT NULL,
                tx_index TEXT NOT NULL,
                record TEXT NOT NULL,
                created_at TEXT NOT NULL,
                PRIMARY KEY (block_number, tx_hash)
            );

            CREATE TABLE IF NOT EXISTS logs (
                block_number INTEGER NOT NULL,
                tx_hash TEXT NOT NULL,
                log_index TEXT NOT NULL,
                record TEXT NOT NULL,
                created_at TEXT NOT NULL,
                PRIMARY KEY (block_number, tx_hash, log_index)
            );
            ",
        )?;
        Ok(())
    }

    /// Returns true if a header for `block_number` is already stored.
    ///
    /// # Errors
    /// Returns error if the query fails.
    pub fn block_exists(&self, block_number: u64) -> Result<bool> {
        let count: u64 = self.conn.borrow().query_row(
            "SELECT COUNT(*) FROM headers WHERE block_number = ?",
            rusqlite::params![block_number],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Counts stored items per collection for one block.
    ///
    /// # Errors
    /// Returns error if any query fails.
    pub fn collection_counts(&self, block_number: u64) -> Result<CollectionCounts> {
        let conn = self.conn.borrow();
        let count = |table: &str| -> Result<u64> {
            let sql = format!("SELECT COUNT(*) FROM {table} WHERE block_number = ?");
            let n = conn.query_row(&sql, rusqlite::params![block_number], |row| row.get(0))?;
            Ok(n)
        };

        Ok(CollectionCounts {
            headers: count("headers")?,
            transactions: count("transactions")?,
            receipts: count("receipts")?,
            logs: count("logs")?,
        })
    }
}

impl Sink for Store {
    /// Inserts all items of a block inside a single SQL transaction.
    fn write_items(&self, block_number: u64, items: &[StoreItem]) -> Result<usize> {
        let mut conn = self.conn.borrow_mut();
        let tx = conn.transaction()?;
        {
            let mut header_stmt = tx.prepare(
                "INSERT INTO headers (block_number, block_hash, record, created_at)
                 VALUES (?, ?, ?, ?)",
            )?;
            let mut tx_stmt = tx.prepare(
                "INSERT INTO transactions (block_number, tx_hash, tx_index, record, created_at)
                 VALUES (?, ?, ?, ?, ?)",
            )?;
            let mut receipt_stmt = tx.prepare(
                "INSERT INTO receipts (block_number, tx_hash, tx_index, record, created_at)
                 VALUES (?, ?, ?, ?, ?)",
            )?;
            let mut log_stmt = tx.prepare(
                "INSERT INTO logs (block_number, tx_hash, log_index, record, created_at)
                 VALUES (?, ?, ?, ?, ?)",
            )?;

            for item in items {
                let created_at = item.created_at.to_rfc3339();
                match &item.record {
                    StoreRecord::Header(h) => {
                        header_stmt.execute(rusqlite::params![
                            block_number,
                            h.hash,
                            serde_json::to_string(h)?,
                            created_at,
                        ])?;
                    }
                    StoreRecord::Transaction(t) => {
                        tx_stmt.execute(rusqlite::params![
                            block_number,
                            t.hash,
                            t.transaction_index,
                            serde_json::to_string(t)?,
                            created_at,
                        ])?;
                    }
                    StoreRecord::Receipt(r) => {
                        receipt_stmt.execute(rusqlite::params![
                            block_number,
                            r.transaction_hash,
                            r.transaction_index,
                            serde_json::to_string(r)?,
                            created_at,
                        ])?;
                    }
                    StoreRecord::Log(l) => {
                        log_stmt.execute(rusqlite::params![
                            block_number,
                            l.transaction_hash,
                            l.log_index,
                            serde_json::to_string(l)?,
                            created_at,
                        ])?;
                    }
                }
            }
        }

        tx.commit()
            .wrap_err_with(|| format!("failed to commit block {block_number}"))?;
        tracing::debug!(block_number, items = items.len(), "block stored");
        Ok(items.len())
    }
}

/// Writes one JSON [`StoreItem`] per line.
pub struct JsonLinesSink<W: Write> {
    out: RefCell<W>,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: RefCell::new(out),
        }
    }

    /// Returns the inner writer.
    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }
}

impl<W: Write> Sink for JsonLinesSink<W> {
    fn write_items(&self, _block_number: u64, items: &[StoreItem]) -> Result<usize> {
        let mut out = self.out.borrow_mut();
        for item in items {
            serde_json::to_writer(&mut *out, item)?;
            out.write_all(b"\n")?;
        }
        out.flush()?;
        Ok(items.len())
    }
}
