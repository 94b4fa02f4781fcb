use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use signage_types::{Record, TableRow};

use crate::backend::{SheetsBackend, Window};
use crate::cache::{BatchCache, TableSet};
use crate::error::Result;
use crate::retry::RetryPolicy;
use crate::schema::{KNOWN_TABLES, default_columns};
use crate::table::Table;

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(90);

/// Rows given to worksheets created by [`TableStore::ensure_headers`].
const NEW_WORKSHEET_ROWS: u32 = 100;

/// Named tables on top of a [`SheetsBackend`].
///
/// Every remote call goes through the retry policy. Writes replace whole
/// worksheets and are not coordinated: two writers racing on one table can
/// lose an update. Reads through [`read_tables`](Self::read_tables) are
/// cached for the configured TTL and the cache is dropped after every write.
pub struct TableStore {
    backend: Arc<dyn SheetsBackend>,
    retry: RetryPolicy,
    window: Window,
    cache: BatchCache,
}

impl TableStore {
    pub fn new(backend: Arc<dyn SheetsBackend>) -> Self {
        Self {
            backend,
            retry: RetryPolicy::default(),
            window: Window::default(),
            cache: BatchCache::new(DEFAULT_CACHE_TTL),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache = BatchCache::new(ttl);
        self
    }

    pub fn with_window(mut self, window: Window) -> Self {
        self.window = window;
        self
    }

    /// Drop every cached batch read.
    pub fn invalidate(&self) {
        self.cache.clear();
        debug!("Table cache cleared");
    }

    // -- Direct reads/writes --

    /// Read a whole worksheet. Remote failures propagate.
    pub async fn read(&self, table: &str) -> Result<Table> {
        let grid = self
            .retry
            .run("read_values", || self.backend.read_values(table))
            .await?;
        Ok(Table::from_grid(table, grid))
    }

    /// Clear `table` and write `data` (header + rows) in its place. An empty
    /// `data` leaves only the default header, or nothing for unknown tables.
    pub async fn replace(&self, table: &str, data: &Table) -> Result<()> {
        let result = self.replace_inner(table, data).await;
        self.invalidate();
        match &result {
            Ok(()) => info!("Replaced {} ({} rows)", table, data.len()),
            Err(e) => error!("Failed to write {}: {}", table, e),
        }
        result
    }

    async fn replace_inner(&self, table: &str, data: &Table) -> Result<()> {
        self.retry
            .run("clear", || self.backend.clear(table))
            .await?;

        let grid = if data.is_empty() {
            match default_columns(table) {
                Some(cols) => vec![cols.iter().map(|c| c.to_string()).collect()],
                None => return Ok(()),
            }
        } else {
            data.to_grid()
        };

        self.retry
            .run("update", || self.backend.update(table, grid.clone()))
            .await
    }

    /// Append one record aligned to the worksheet's current header. A known
    /// table without a header gets its default header first.
    pub async fn append(&self, table: &str, row: &Record) -> Result<()> {
        let result = self.append_inner(table, row).await;
        self.invalidate();
        if let Err(e) = &result {
            error!("Failed to append to {}: {}", table, e);
        }
        result
    }

    async fn append_inner(&self, table: &str, row: &Record) -> Result<()> {
        let mut header = self
            .retry
            .run("header_row", || self.backend.header_row(table))
            .await?;

        if header.is_empty() {
            let Some(cols) = default_columns(table) else {
                warn!("Not appending to {}: worksheet has no header", table);
                return Ok(());
            };
            header = cols.iter().map(|c| c.to_string()).collect();
            self.retry
                .run("update", || self.backend.update(table, vec![header.clone()]))
                .await?;
        }

        let values = Table::new(header).align(row);
        self.retry
            .run("append_row", || self.backend.append_row(table, values.clone()))
            .await?;
        debug!("Appended row to {}", table);
        Ok(())
    }

    /// Update the row whose `key_field` matches `row[key_field]`, overwriting
    /// only the fields present in `row`; append if no row matches.
    ///
    /// This is a read-modify-write of the whole worksheet with no version
    /// check: a concurrent writer between the read and the write is lost.
    pub async fn upsert(&self, table: &str, key_field: &str, row: &Record) -> Result<()> {
        let mut current = self.read(table).await.inspect_err(|e| {
            error!("Failed to read {} for upsert: {}", table, e);
        })?;

        if default_columns(table).is_some() && (current.is_empty() || !current.has_column(key_field))
        {
            current = Table::default_for(table);
        }

        let key = row.get(key_field).map(String::as_str).unwrap_or_default();
        if !key.is_empty() {
            if let Some(idx) = current.position(key_field, key) {
                for (field, value) in row {
                    current.set(idx, field, value.clone());
                }
                return self.replace(table, &current).await;
            }
        }

        self.append(table, row).await
    }

    // -- Batched, cached, degrading reads --

    /// Read several tables in one round trip.
    ///
    /// Results are cached for the store's TTL. If the batch call fails the
    /// error is logged and every requested table comes back as its default
    /// schema (or fully empty when unknown); such fallbacks are not cached.
    pub async fn read_tables(&self, names: &[&str]) -> TableSet {
        let key: Vec<String> = names.iter().map(|n| n.to_string()).collect();
        if let Some(hit) = self.cache.get(&key) {
            return hit;
        }

        let window = self.window;
        let generation = self.cache.generation();
        match self
            .retry
            .run("batch_get", || self.backend.batch_get(&key, window))
            .await
        {
            Ok(grids) => {
                let tables: TableSet = key
                    .iter()
                    .cloned()
                    .zip(grids)
                    .map(|(name, grid)| {
                        let t = Table::from_grid(&name, grid);
                        (name, t)
                    })
                    .collect();
                if !self.cache.put(key, tables.clone(), generation) {
                    debug!("Not caching {:?}: a write landed during the read", names);
                }
                tables
            }
            Err(e) => {
                error!("Batch read of {:?} failed, serving defaults: {}", names, e);
                key.into_iter()
                    .map(|name| {
                        let t = Table::default_for(&name);
                        (name, t)
                    })
                    .collect()
            }
        }
    }

    /// Single-table form of [`read_tables`](Self::read_tables).
    pub async fn read_table(&self, name: &str) -> Table {
        self.read_tables(&[name])
            .await
            .remove(name)
            .unwrap_or_else(|| Table::default_for(name))
    }

    /// Cached read keeping only rows flagged active.
    pub async fn read_active(&self, name: &str) -> Table {
        self.read_table(name).await.filter_active()
    }

    /// Cached read parsed into typed records.
    pub async fn read_typed<T: TableRow>(&self) -> Vec<T> {
        self.read_table(T::TABLE).await.typed()
    }

    // -- Provisioning --

    /// Make sure every known worksheet exists and has a header row. Returns
    /// the tables whose header was written.
    pub async fn ensure_headers(&self) -> Result<Vec<String>> {
        let titles = self
            .retry
            .run("worksheet_titles", || self.backend.worksheet_titles())
            .await?;

        let mut written = Vec::new();
        for &table in KNOWN_TABLES {
            let cols = default_columns(table).unwrap_or_default();
            if !titles.iter().any(|t| t == table) {
                self.retry
                    .run("add_worksheet", || {
                        self.backend
                            .add_worksheet(table, NEW_WORKSHEET_ROWS, cols.len().max(1) as u32)
                    })
                    .await?;
            }
            let header = self
                .retry
                .run("header_row", || self.backend.header_row(table))
                .await?;
            if header.is_empty() {
                let grid = vec![cols.iter().map(|c| c.to_string()).collect::<Vec<_>>()];
                self.retry
                    .run("update", || self.backend.update(table, grid.clone()))
                    .await?;
                written.push(table.to_string());
            }
        }

        self.invalidate();
        info!("Headers ensured; wrote {} header rows", written.len());
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Grid;
    use crate::error::StoreError;
    use crate::memory::MemoryBackend;
    use futures_util::future::{BoxFuture, FutureExt};
    use signage_types::models::NewsItem;

    fn grid(rows: &[&[&str]]) -> Vec<Vec<String>> {
        rows.iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    fn rec(pairs: &[(&str, &str)]) -> Record {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn setup() -> (Arc<MemoryBackend>, TableStore) {
        let backend = Arc::new(MemoryBackend::with_worksheets(KNOWN_TABLES));
        let store = TableStore::new(backend.clone()).with_retry(RetryPolicy::immediate(3));
        (backend, store)
    }

    fn seed_news(backend: &MemoryBackend) {
        backend.seed(
            "news",
            grid(&[
                &["id", "title", "description", "image_url", "active", "created_at"],
                &["1", "Launch", "d1", "", "True", "2025-01-01 09:00:00"],
                &["2", "Draft", "d2", "", "false", "2025-01-02 09:00:00"],
                &["3", "Picnic", "d3", "", "yes", "2025-01-03 09:00:00"],
            ]),
        );
    }

    #[tokio::test]
    async fn read_empty_sheet_yields_default_schema() {
        let (_backend, store) = setup();
        let t = store.read("birthdays").await.unwrap();
        assert!(t.is_empty());
        assert_eq!(t.columns(), &["id", "name", "sector", "birthday", "photo_url", "active"]);
    }

    #[tokio::test]
    async fn read_missing_sheet_propagates() {
        let (_backend, store) = setup();
        let err = store.read("nope").await.unwrap_err();
        assert!(matches!(err, StoreError::MissingWorksheet(_)));
    }

    #[tokio::test]
    async fn replace_is_idempotent() {
        let (backend, store) = setup();
        seed_news(&backend);
        let data = Table::from_typed(&[NewsItem {
            id: "9".into(),
            title: "Only".into(),
            active: true,
            ..Default::default()
        }]);

        store.replace("news", &data).await.unwrap();
        let once = backend.snapshot("news").unwrap();
        store.replace("news", &data).await.unwrap();
        let twice = backend.snapshot("news").unwrap();

        assert_eq!(once, twice);
        assert_eq!(once.len(), 2);
        assert_eq!(once[1][0], "9");
    }

    #[tokio::test]
    async fn replace_with_nothing_keeps_default_header() {
        let (backend, store) = setup();
        seed_news(&backend);
        store.replace("news", &Table::default()).await.unwrap();
        assert_eq!(backend.snapshot("news").unwrap(), vec![NewsItem::COLUMNS.to_vec()]);

        backend.seed("scratch", grid(&[&["a"], &["1"]]));
        store.replace("scratch", &Table::default()).await.unwrap();
        assert!(backend.snapshot("scratch").unwrap().is_empty());
    }

    #[tokio::test]
    async fn append_writes_default_header_first() {
        let (backend, store) = setup();
        store
            .append("videos", &rec(&[("id", "7"), ("url", "https://x/v.mp4"), ("bogus", "z")]))
            .await
            .unwrap();
        let g = backend.snapshot("videos").unwrap();
        assert_eq!(g[0], ["id", "title", "url", "duration_seconds", "active"]);
        assert_eq!(g[1], ["7", "", "https://x/v.mp4", "", ""]);
    }

    #[tokio::test]
    async fn append_aligns_to_existing_header() {
        let (backend, store) = setup();
        backend.seed("settings", grid(&[&["value", "key"]]));
        store
            .append("settings", &rec(&[("key", "theme"), ("value", "dark")]))
            .await
            .unwrap();
        assert_eq!(backend.snapshot("settings").unwrap()[1], ["dark", "theme"]);
    }

    #[tokio::test]
    async fn upsert_missing_key_appends_one_record() {
        let (backend, store) = setup();
        seed_news(&backend);
        store
            .upsert("news", "id", &rec(&[("id", "4"), ("title", "New")]))
            .await
            .unwrap();
        let t = store.read("news").await.unwrap();
        assert_eq!(t.len(), 4);
        assert_eq!(t.get(3, "title"), Some("New"));
        assert_eq!(t.position("id", "4"), Some(3));
    }

    #[tokio::test]
    async fn upsert_existing_key_overwrites_only_given_fields() {
        let (backend, store) = setup();
        seed_news(&backend);
        store
            .upsert("news", "id", &rec(&[("id", "2"), ("active", "true")]))
            .await
            .unwrap();
        let t = store.read("news").await.unwrap();
        assert_eq!(t.len(), 3);
        assert_eq!(t.get(1, "active"), Some("true"));
        assert_eq!(t.get(1, "title"), Some("Draft"));
        assert_eq!(t.get(1, "created_at"), Some("2025-01-02 09:00:00"));
    }

    #[tokio::test]
    async fn upsert_on_empty_known_table_appends() {
        let (backend, store) = setup();
        store
            .upsert("settings", "key", &rec(&[("key", "k"), ("value", "v")]))
            .await
            .unwrap();
        assert_eq!(
            backend.snapshot("settings").unwrap(),
            grid(&[&["key", "value"], &["k", "v"]])
        );
    }

    #[tokio::test]
    async fn batch_read_is_cached_until_write() {
        let (backend, store) = setup();
        seed_news(&backend);

        let first = store.read_tables(&["news", "videos"]).await;
        let second = store.read_tables(&["news", "videos"]).await;
        assert_eq!(backend.calls("batch_get"), 1);
        assert_eq!(first["news"], second["news"]);
        assert_eq!(first["news"].len(), 3);
        assert_eq!(first["videos"].columns().len(), 5);

        store
            .upsert("news", "id", &rec(&[("id", "1"), ("title", "Changed")]))
            .await
            .unwrap();
        let third = store.read_tables(&["news", "videos"]).await;
        assert_eq!(backend.calls("batch_get"), 2);
        assert_eq!(third["news"].get(0, "title"), Some("Changed"));
    }

    #[tokio::test]
    async fn batch_failure_degrades_to_defaults() {
        let (backend, store) = setup();
        seed_news(&backend);
        backend.set_offline(true);

        let tables = store.read_tables(&["news", "users", "scratch"]).await;
        assert_eq!(tables.len(), 3);
        assert!(tables["news"].is_empty());
        assert_eq!(tables["news"].columns()[0], "id");
        assert_eq!(tables["users"].columns()[0], "username");
        assert!(tables["scratch"].columns().is_empty());

        // Fallbacks are not cached.
        backend.set_offline(false);
        assert_eq!(store.read_table("news").await.len(), 3);
    }

    #[tokio::test]
    async fn batch_read_retries_quota_errors() {
        let (backend, store) = setup();
        seed_news(&backend);
        backend.fail_next(StoreError::RateLimited {
            status: 429,
            message: "Quota exceeded".into(),
        });
        let t = store.read_table("news").await;
        assert_eq!(t.len(), 3);
        assert_eq!(backend.calls("batch_get"), 2);
    }

    #[tokio::test]
    async fn write_failure_propagates() {
        let (backend, store) = setup();
        backend.fail_next(StoreError::Auth("revoked".into()));
        let err = store
            .replace("news", &Table::default_for("news"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Auth(_)));
    }

    #[tokio::test]
    async fn read_active_filters_case_insensitively() {
        let (backend, store) = setup();
        seed_news(&backend);
        let active = store.read_active("news").await;
        assert_eq!(active.len(), 2);
        assert_eq!(active.get(0, "title"), Some("Launch"));
        assert_eq!(active.get(1, "title"), Some("Picnic"));
        assert!(active.has_column("active"));
    }

    #[tokio::test]
    async fn ensure_headers_creates_missing_sheets() {
        let backend = Arc::new(MemoryBackend::with_worksheets(&["news"]));
        let store = TableStore::new(backend.clone());
        seed_news(&backend);

        let written = store.ensure_headers().await.unwrap();
        assert!(!written.contains(&"news".to_string()));
        assert_eq!(written.len(), KNOWN_TABLES.len() - 1);
        assert_eq!(backend.snapshot("worldclocks").unwrap()[0], ["id", "label", "timezone"]);
        assert_eq!(backend.snapshot("news").unwrap().len(), 4);
    }

    /// Holds every batch read open until released, after taking its
    /// snapshot, so a write can land in between.
    struct GatedBackend {
        inner: Arc<MemoryBackend>,
        entered: tokio::sync::Notify,
        release: tokio::sync::Notify,
    }

    impl SheetsBackend for GatedBackend {
        fn worksheet_titles(&self) -> BoxFuture<'_, Result<Vec<String>>> {
            self.inner.worksheet_titles()
        }
        fn read_values<'a>(&'a self, title: &'a str) -> BoxFuture<'a, Result<Grid>> {
            self.inner.read_values(title)
        }
        fn header_row<'a>(&'a self, title: &'a str) -> BoxFuture<'a, Result<Vec<String>>> {
            self.inner.header_row(title)
        }
        fn clear<'a>(&'a self, title: &'a str) -> BoxFuture<'a, Result<()>> {
            self.inner.clear(title)
        }
        fn update<'a>(&'a self, title: &'a str, values: Grid) -> BoxFuture<'a, Result<()>> {
            self.inner.update(title, values)
        }
        fn append_row<'a>(&'a self, title: &'a str, row: Vec<String>) -> BoxFuture<'a, Result<()>> {
            self.inner.append_row(title, row)
        }
        fn batch_get<'a>(
            &'a self,
            titles: &'a [String],
            window: Window,
        ) -> BoxFuture<'a, Result<Vec<Grid>>> {
            let snapshot = self.inner.batch_get(titles, window);
            async move {
                let out = snapshot.await;
                self.entered.notify_one();
                self.release.notified().await;
                out
            }
            .boxed()
        }
        fn add_worksheet<'a>(
            &'a self,
            title: &'a str,
            rows: u32,
            cols: u32,
        ) -> BoxFuture<'a, Result<()>> {
            self.inner.add_worksheet(title, rows, cols)
        }
    }

    #[tokio::test]
    async fn read_overlapping_a_write_is_not_cached() {
        let inner = Arc::new(MemoryBackend::with_worksheets(KNOWN_TABLES));
        seed_news(&inner);
        let gated = Arc::new(GatedBackend {
            inner: inner.clone(),
            entered: tokio::sync::Notify::new(),
            release: tokio::sync::Notify::new(),
        });
        let store = TableStore::new(gated.clone()).with_retry(RetryPolicy::immediate(3));

        let (stale, ()) = tokio::join!(store.read_tables(&["news"]), async {
            gated.entered.notified().await;
            store
                .append("news", &rec(&[("id", "4"), ("title", "Late")]))
                .await
                .unwrap();
            gated.release.notify_one();
        });
        assert_eq!(stale["news"].len(), 3);

        gated.release.notify_one();
        let fresh = store.read_tables(&["news"]).await;
        assert_eq!(fresh["news"].len(), 4);
        assert_eq!(inner.calls("batch_get"), 2);
    }
}
