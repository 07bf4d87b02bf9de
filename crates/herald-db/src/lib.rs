//! Database layer for the Herald alert router.
//!
//! Provides SQLite connection pooling (via `r2d2`), WAL-mode initialization,
//! embedded SQL migrations, and the startup connect-with-retry loop. Both
//! the subscriber table and the stream table are created through versioned
//! migrations managed by this crate.
//!
//! # Design decisions
//!
//! - **SQLite with WAL mode**: concurrent dispatch tasks read subscriber
//!   batches and append alerts while the consumer loop deletes inbound
//!   records. WAL mode allows those readers alongside a single writer.
//! - **`r2d2` connection pool**: one process-wide pool shared by every
//!   dispatch task; no extra locking on top of it.
//! - **Embedded migrations**: SQL files are compiled into the binary via
//!   `include_str!`, so the schema ships with the router.

mod migrations;
mod pool;

pub use migrations::{run_migrations, MigrationError};
pub use pool::{connect_with_retry, create_pool, DbPool, DbRuntimeSettings, PoolError};
