//! SQLite backend for the ratecard store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on the connection's
//! own thread without blocking the async runtime. The database runs in WAL
//! mode and a file-backed store keeps a pool of read-only connections next to
//! its writer, so reads never wait for an in-flight write.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
