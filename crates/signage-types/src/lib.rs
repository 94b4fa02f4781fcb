/// Shared types for the signage workspace.
///
/// `models` holds one record type per spreadsheet table plus the string <->
/// typed conversions; `api` holds the HTTP request/response shapes used by
/// signage-api and its clients.

pub mod api;
pub mod flags;
pub mod models;

pub use models::{Record, TableRow};
