use signage_types::flags::is_truthy;
use signage_types::{Record, TableRow};

use crate::schema::default_columns;

/// A worksheet materialised in memory: a header row plus data rows, every row
/// exactly as wide as the header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Empty table carrying the default header of `name`, or no header at all
    /// when the table is unknown.
    pub fn default_for(name: &str) -> Self {
        let columns = default_columns(name)
            .map(|cols| cols.iter().map(|c| c.to_string()).collect())
            .unwrap_or_default();
        Self::new(columns)
    }

    /// Parse a raw grid (first row = header) read from worksheet `name`.
    ///
    /// A grid without a header or without data rows yields the default schema
    /// for `name`.
    pub fn from_grid(name: &str, grid: Vec<Vec<String>>) -> Self {
        let mut iter = grid.into_iter();
        let Some(header) = iter.next() else {
            return Self::default_for(name);
        };

        let mut columns: Vec<String> = header.into_iter().map(|c| c.trim().to_string()).collect();
        while columns.last().is_some_and(|c| c.is_empty()) {
            columns.pop();
        }
        if columns.is_empty() {
            return Self::default_for(name);
        }

        let width = columns.len();
        let rows: Vec<Vec<String>> = iter
            .filter(|row| row.iter().any(|c| !c.trim().is_empty()))
            .map(|mut row| {
                row.resize(width, String::new());
                row
            })
            .collect();

        if rows.is_empty() {
            return Self::default_for(name);
        }
        Self { columns, rows }
    }

    /// Build a table from records, aligned to `columns`.
    pub fn from_records(columns: Vec<String>, records: &[Record]) -> Self {
        let mut table = Self::new(columns);
        for r in records {
            table.push_record(r);
        }
        table
    }

    pub fn from_typed<T: TableRow>(rows: &[T]) -> Self {
        let columns = T::COLUMNS.iter().map(|c| c.to_string()).collect();
        let records: Vec<Record> = rows.iter().map(TableRow::to_record).collect();
        Self::from_records(columns, &records)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn get(&self, row: usize, column: &str) -> Option<&str> {
        let col = self.column_index(column)?;
        self.rows.get(row).map(|r| r[col].as_str())
    }

    /// Overwrite one cell. Returns false if the row or column does not exist.
    pub fn set(&mut self, row: usize, column: &str, value: impl Into<String>) -> bool {
        let Some(col) = self.column_index(column) else {
            return false;
        };
        match self.rows.get_mut(row) {
            Some(r) => {
                r[col] = value.into();
                true
            }
            None => false,
        }
    }

    /// Index of the first row whose `key_field` equals `key`.
    pub fn position(&self, key_field: &str, key: &str) -> Option<usize> {
        let col = self.column_index(key_field)?;
        self.rows.iter().position(|r| r[col] == key)
    }

    /// Append a record aligned to the header; missing fields become empty and
    /// fields outside the header are dropped.
    pub fn push_record(&mut self, record: &Record) {
        let row = self.align(record);
        self.rows.push(row);
    }

    /// Values of `record` in header order.
    pub fn align(&self, record: &Record) -> Vec<String> {
        self.columns
            .iter()
            .map(|c| record.get(c).cloned().unwrap_or_default())
            .collect()
    }

    pub fn record(&self, row: usize) -> Option<Record> {
        let r = self.rows.get(row)?;
        Some(self.columns.iter().cloned().zip(r.iter().cloned()).collect())
    }

    pub fn records(&self) -> Vec<Record> {
        (0..self.rows.len()).filter_map(|i| self.record(i)).collect()
    }

    pub fn typed<T: TableRow>(&self) -> Vec<T> {
        self.records().iter().map(T::from_record).collect()
    }

    /// Keep only rows whose `active` cell is truthy, preserving order. Tables
    /// without an `active` column are returned unchanged; the column itself is
    /// retained.
    pub fn filter_active(&self) -> Self {
        let Some(col) = self.column_index("active") else {
            return self.clone();
        };
        Self {
            columns: self.columns.clone(),
            rows: self
                .rows
                .iter()
                .filter(|r| is_truthy(&r[col]))
                .cloned()
                .collect(),
        }
    }

    /// Header followed by data rows, ready for a bulk write.
    pub fn to_grid(&self) -> Vec<Vec<String>> {
        let mut grid = Vec::with_capacity(self.rows.len() + 1);
        grid.push(self.columns.clone());
        grid.extend(self.rows.iter().cloned());
        grid
    }
}
