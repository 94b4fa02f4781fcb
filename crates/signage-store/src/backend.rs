use futures_util::future::BoxFuture;

use crate::error::Result;

/// A rectangular grid of cell text, first row = header when present.
pub type Grid = Vec<Vec<String>>;

/// The remote tabular store, reduced to the calls the table layer needs.
///
/// Worksheets are addressed by title. Implementations must report quota
/// failures as `StoreError::RateLimited` so the retry wrapper can tell them
/// apart from everything else.
pub trait SheetsBackend: Send + Sync {
    /// Titles of every worksheet in the spreadsheet.
    fn worksheet_titles(&self) -> BoxFuture<'_, Result<Vec<String>>>;

    /// All populated cells of a worksheet.
    fn read_values<'a>(&'a self, title: &'a str) -> BoxFuture<'a, Result<Grid>>;

    /// First row of a worksheet; empty if the sheet has no header yet.
    fn header_row<'a>(&'a self, title: &'a str) -> BoxFuture<'a, Result<Vec<String>>>;

    /// Remove every value from a worksheet.
    fn clear<'a>(&'a self, title: &'a str) -> BoxFuture<'a, Result<()>>;

    /// Write `values` starting at A1, verbatim.
    fn update<'a>(&'a self, title: &'a str, values: Grid) -> BoxFuture<'a, Result<()>>;

    /// Append one row after the last populated row, as if typed by a user.
    fn append_row<'a>(&'a self, title: &'a str, row: Vec<String>) -> BoxFuture<'a, Result<()>>;

    /// Read a bounded window of each worksheet in one round trip. The result
    /// has one grid per requested title, in request order.
    fn batch_get<'a>(
        &'a self,
        titles: &'a [String],
        window: Window,
    ) -> BoxFuture<'a, Result<Vec<Grid>>>;

    /// Create an empty worksheet.
    fn add_worksheet<'a>(
        &'a self,
        title: &'a str,
        rows: u32,
        cols: u32,
    ) -> BoxFuture<'a, Result<()>>;
}

/// Row/column bound for batched reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub rows: u32,
    pub cols: u32,
}

impl Default for Window {
    fn default() -> Self {
        Self {
            rows: 1000,
            cols: 26,
        }
    }
}

impl Window {
    /// A1 notation for `title` bounded by this window, e.g. `'news'!A1:Z1000`.
    pub fn a1_range(&self, title: &str) -> String {
        format!(
            "'{}'!A1:{}{}",
            title.replace('\'', "''"),
            column_letters(self.cols),
            self.rows
        )
    }
}

/// 1-based column number to spreadsheet letters (1 -> A, 26 -> Z, 27 -> AA).
pub fn column_letters(mut n: u32) -> String {
    let mut out = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        out.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}
