//! `DuckDB` connection pool management.
//!
//! Every pooled connection is cloned from one root connection so that all of
//! them share a single database instance, including `:memory:` databases.

use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use ::duckdb::Connection;

/// Access mode for database connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    /// Read-only access.
    ReadOnly,
    /// Read-write access.
    ReadWrite,
}

struct PoolState {
    read_only: Vec<Connection>,
    read_write: Vec<Connection>,
}

struct PoolInner {
    db_path: PathBuf,
    max_pool_size: usize,
    root: Mutex<Connection>,
    state: Mutex<PoolState>,
}

/// A connection pool manager for `DuckDB` connections.
#[derive(Clone)]
pub struct DuckDbConnectionManager {
    inner: Arc<PoolInner>,
}

impl DuckDbConnectionManager {
    /// Open the database at `path` and build a pool around it.
    ///
    /// # Errors
    /// Returns an error if the database file cannot be opened.
    pub fn open(path: impl Into<PathBuf>, max_pool_size: usize) -> Result<Self, ::duckdb::Error> {
        let db_path = path.into();
        let root = if db_path.as_os_str() == ":memory:" {
            Connection::open_in_memory()?
        } else {
            Connection::open(db_path.as_path())?
        };
        root.execute_batch("PRAGMA disable_progress_bar;")?;

        Ok(Self {
            inner: Arc::new(PoolInner {
                db_path,
                max_pool_size: max_pool_size.max(1),
                root: Mutex::new(root),
                state: Mutex::new(PoolState {
                    read_only: Vec::new(),
                    read_write: Vec::new(),
                }),
            }),
        })
    }

    /// Acquire a connection from the pool.
    ///
    /// # Errors
    /// Returns an error if a fresh connection cannot be cloned from the root.
    ///
    /// # Panics
    /// Panics if a pool mutex is poisoned (indicating a previous panic while
    /// holding the lock).
    pub fn acquire(&self, mode: AccessMode) -> Result<PooledConnection, ::duckdb::Error> {
        let mut state = self
            .inner
            .state
            .lock()
            .expect("duckdb connection pool mutex poisoned");
        let connection = match mode {
            AccessMode::ReadOnly => state.read_only.pop(),
            AccessMode::ReadWrite => state.read_write.pop(),
        };
        drop(state);

        let connection = match connection {
            Some(connection) => connection,
            None => self
                .inner
                .root
                .lock()
                .expect("duckdb root connection mutex poisoned")
                .try_clone()?,
        };

        Ok(PooledConnection {
            mode,
            pool: Arc::clone(&self.inner),
            connection: Some(connection),
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn db_path(&self) -> &Path {
        self.inner.db_path.as_path()
    }
}

/// A pooled connection that returns to the pool when dropped.
pub struct PooledConnection {
    mode: AccessMode,
    pool: Arc<PoolInner>,
    connection: Option<Connection>,
}

impl PooledConnection {
    pub fn mode(&self) -> AccessMode {
        self.mode
    }
}

impl Deref for PooledConnection {
    type Target = Connection;

    fn deref(&self) -> &Self::Target {
        self.connection
            .as_ref()
            .expect("pooled connection unexpectedly missing")
    }
}

impl DerefMut for PooledConnection {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.connection
            .as_mut()
            .expect("pooled connection unexpectedly missing")
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        let Some(connection) = self.connection.take() else {
            return;
        };

        let mut state = self
            .pool
            .state
            .lock()
            .expect("duckdb connection pool mutex poisoned");
        let idle = match self.mode {
            AccessMode::ReadOnly => &mut state.read_only,
            AccessMode::ReadWrite => &mut state.read_write,
        };
        if idle.len() < self.pool.max_pool_size {
            idle.push(connection);
        }
    }
}
