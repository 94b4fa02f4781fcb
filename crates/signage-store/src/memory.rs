use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use futures_util::future::{BoxFuture, FutureExt};

use crate::backend::{Grid, SheetsBackend, Window};
use crate::error::{Result, StoreError};

/// In-process spreadsheet used for local development and tests.
///
/// Failures can be scripted with [`MemoryBackend::fail_next`] or forced for
/// every call with [`MemoryBackend::set_offline`]; [`MemoryBackend::calls`]
/// counts how many calls reached the backend.
#[derive(Default)]
pub struct MemoryBackend {
    sheets: Mutex<HashMap<String, Grid>>,
    faults: Mutex<VecDeque<StoreError>>,
    offline: AtomicBool,
    calls: Mutex<HashMap<&'static str, usize>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend pre-populated with one empty worksheet per title.
    pub fn with_worksheets(titles: &[&str]) -> Self {
        let backend = Self::new();
        {
            let mut sheets = backend.lock_sheets();
            for t in titles {
                sheets.insert(t.to_string(), Vec::new());
            }
        }
        backend
    }

    /// Replace a worksheet's contents wholesale, creating it if needed.
    pub fn seed(&self, title: &str, grid: Grid) {
        self.lock_sheets().insert(title.to_string(), grid);
    }

    /// Current contents of a worksheet, without trailing blank rows.
    pub fn snapshot(&self, title: &str) -> Option<Grid> {
        self.lock_sheets().get(title).map(|g| trimmed(g))
    }

    /// Queue an error to be returned by the next backend call.
    pub fn fail_next(&self, err: StoreError) {
        self.faults.lock().unwrap_or_else(|e| e.into_inner()).push_back(err);
    }

    /// While offline every call fails with a permanent 503.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of calls made to `op` (e.g. `"batch_get"`).
    pub fn calls(&self, op: &str) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(op)
            .copied()
            .unwrap_or(0)
    }

    fn lock_sheets(&self) -> std::sync::MutexGuard<'_, HashMap<String, Grid>> {
        self.sheets.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn enter(&self, op: &'static str) -> Result<()> {
        *self
            .calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(op)
            .or_default() += 1;

        if let Some(err) = self.faults.lock().unwrap_or_else(|e| e.into_inner()).pop_front() {
            return Err(err);
        }
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Remote {
                status: 503,
                message: "backend offline".into(),
            });
        }
        Ok(())
    }

    fn with_sheet<T>(&self, title: &str, f: impl FnOnce(&mut Grid) -> T) -> Result<T> {
        let mut sheets = self.lock_sheets();
        let grid = sheets
            .get_mut(title)
            .ok_or_else(|| StoreError::MissingWorksheet(title.to_string()))?;
        Ok(f(grid))
    }
}

fn trimmed(grid: &Grid) -> Grid {
    let mut g = grid.clone();
    while g.last().is_some_and(|r| r.iter().all(|c| c.is_empty())) {
        g.pop();
    }
    g
}

impl SheetsBackend for MemoryBackend {
    fn worksheet_titles(&self) -> BoxFuture<'_, Result<Vec<String>>> {
        let out = self.enter("worksheet_titles").map(|_| {
            let mut titles: Vec<String> = self.lock_sheets().keys().cloned().collect();
            titles.sort();
            titles
        });
        async move { out }.boxed()
    }

    fn read_values<'a>(&'a self, title: &'a str) -> BoxFuture<'a, Result<Grid>> {
        let out = self
            .enter("read_values")
            .and_then(|_| self.with_sheet(title, |g| trimmed(g)));
        async move { out }.boxed()
    }

    fn header_row<'a>(&'a self, title: &'a str) -> BoxFuture<'a, Result<Vec<String>>> {
        let out = self.enter("header_row").and_then(|_| {
            self.with_sheet(title, |g| {
                let mut header = g.first().cloned().unwrap_or_default();
                while header.last().is_some_and(|c| c.is_empty()) {
                    header.pop();
                }
                header
            })
        });
        async move { out }.boxed()
    }

    fn clear<'a>(&'a self, title: &'a str) -> BoxFuture<'a, Result<()>> {
        let out = self
            .enter("clear")
            .and_then(|_| self.with_sheet(title, |g| g.clear()));
        async move { out }.boxed()
    }

    fn update<'a>(&'a self, title: &'a str, values: Grid) -> BoxFuture<'a, Result<()>> {
        let out = self.enter("update").and_then(|_| {
            self.with_sheet(title, |g| {
                for (r, row) in values.into_iter().enumerate() {
                    if g.len() <= r {
                        g.resize(r + 1, Vec::new());
                    }
                    for (c, cell) in row.into_iter().enumerate() {
                        if g[r].len() <= c {
                            g[r].resize(c + 1, String::new());
                        }
                        g[r][c] = cell;
                    }
                }
            })
        });
        async move { out }.boxed()
    }

    fn append_row<'a>(&'a self, title: &'a str, row: Vec<String>) -> BoxFuture<'a, Result<()>> {
        let out = self.enter("append_row").and_then(|_| {
            self.with_sheet(title, |g| {
                *g = trimmed(g);
                g.push(row);
            })
        });
        async move { out }.boxed()
    }

    fn batch_get<'a>(
        &'a self,
        titles: &'a [String],
        window: Window,
    ) -> BoxFuture<'a, Result<Vec<Grid>>> {
        let out = self.enter("batch_get").and_then(|_| {
            titles
                .iter()
                .map(|t| {
                    self.with_sheet(t, |g| {
                        trimmed(g)
                            .into_iter()
                            .take(window.rows as usize)
                            .map(|row| row.into_iter().take(window.cols as usize).collect())
                            .collect()
                    })
                })
                .collect::<Result<Vec<Grid>>>()
        });
        async move { out }.boxed()
    }

    fn add_worksheet<'a>(
        &'a self,
        title: &'a str,
        _rows: u32,
        _cols: u32,
    ) -> BoxFuture<'a, Result<()>> {
        let out = self.enter("add_worksheet").and_then(|_| {
            let mut sheets = self.lock_sheets();
            if sheets.contains_key(title) {
                return Err(StoreError::Remote {
                    status: 400,
                    message: format!("A sheet with the name \"{}\" already exists", title),
                });
            }
            sheets.insert(title.to_string(), Vec::new());
            Ok(())
        });
        async move { out }.boxed()
    }
}
