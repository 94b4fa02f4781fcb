//! Spreadsheet-backed table storage.
//!
//! [`TableStore`] turns worksheets of a remote spreadsheet into named tables
//! with a header row. The remote itself sits behind [`SheetsBackend`], with a
//! Google Sheets client for production and an in-process backend for local
//! runs and tests.

pub mod backend;
pub mod cache;
pub mod error;
pub mod google;
pub mod memory;
pub mod retry;
pub mod schema;
pub mod store;
pub mod table;

pub use backend::{Grid, SheetsBackend, Window};
pub use cache::TableSet;
pub use error::{Result, StoreError};
pub use google::{GoogleSheets, ServiceAccountKey};
pub use memory::MemoryBackend;
pub use retry::RetryPolicy;
pub use store::TableStore;
pub use table::Table;
