//! SQL store integration.
//!
//! The library talks to ClickHouse through the [`Store`] trait. Two
//! implementations ship with the crate:
//!
//! - **ClickHouse** - the HTTP interface, via a blocking client
//! - **Mock** - an in-memory store for tests and demos
//!
//! # Example
//!
//! ```no_run
//! use ferry::{ConnectionConfig, ClickHouseStore, Store};
//!
//! let store = ClickHouseStore::connect(ConnectionConfig::from_env().unwrap()).unwrap();
//! let result = store.query("SELECT 1").unwrap();
//! assert_eq!(result.row_count(), 1);
//! ```

pub mod catalog;
mod clickhouse;
mod mock;
mod provider;

pub use clickhouse::ClickHouseStore;
pub use mock::MockStore;
pub use provider::{ColumnInfo, QueryResult, RowStream, Store};
