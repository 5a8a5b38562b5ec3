use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::r2d2::{self, ConnectionManager, CustomizeConnection};
use domain::DomainError;
use std::time::Duration;

pub mod schema;
pub use schema::*;

pub type SqlitePool = r2d2::Pool<ConnectionManager<SqliteConnection>>;

const IN_MEMORY: &str = ":memory:";
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Per-connection setup run by the pool whenever it opens a connection.
///
/// Writers wait up to `busy_timeout` for the lock instead of failing with
/// `database is locked`, and WAL lets readers proceed while a write is open.
#[derive(Debug, Clone, Copy)]
pub struct SqliteOptions {
    pub busy_timeout: Duration,
}

impl Default for SqliteOptions {
    fn default() -> Self {
        Self {
            busy_timeout: BUSY_TIMEOUT,
        }
    }
}

impl CustomizeConnection<SqliteConnection, r2d2::Error> for SqliteOptions {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> Result<(), r2d2::Error> {
        let pragmas = format!(
            "PRAGMA busy_timeout = {}; PRAGMA journal_mode = WAL; PRAGMA synchronous = NORMAL;",
            self.busy_timeout.as_millis()
        );
        conn.batch_execute(&pragmas)
            .and_then(|_| conn.batch_execute(CREATE_USERS_TABLE))
            .map_err(r2d2::Error::QueryError)
    }
}

pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens the pool; every pooled connection makes sure the `users` table exists.
    ///
    /// An in-memory database lives and dies with its connection, so for
    /// `:memory:` the pool holds exactly one connection that is never recycled.
    pub fn new(database_path: &str) -> Result<Self, DomainError> {
        let manager = ConnectionManager::<SqliteConnection>::new(database_path);
        let mut builder =
            SqlitePool::builder().connection_customizer(Box::new(SqliteOptions::default()));
        if database_path == IN_MEMORY {
            builder = builder
                .max_size(1)
                .max_lifetime(None)
                .idle_timeout(None);
        }
        let pool = builder
            .build(manager)
            .map_err(|e| DomainError::RepositoryError(e.to_string()))?;

        Ok(Database { pool })
    }

    pub fn in_memory() -> Result<Self, DomainError> {
        Self::new(IN_MEMORY)
    }

    pub fn get_pool(&self) -> &SqlitePool {
        &self.pool
    }
}
