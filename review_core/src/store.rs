pub use crate::config::*;

/// An append-only table of records.
///
/// Implementations must refuse to append a record when a record for the
/// same reviewer and item already exists, and report the failure as
/// [`StoreError::Duplicate`].
pub trait RecordStore {
    /// All the rows currently stored, in no particular order. Rows may come
    /// from older revisions of the form and carry different columns.
    fn load_rows(&self) -> StoreResult<Vec<Row>>;

    fn append(&mut self, record: &Record) -> StoreResult<()>;

    /// A short description used in log messages.
    fn describe(&self) -> String;
}

/// A store kept in memory, mostly for tests.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    pub rows: Vec<Row>,
}

impl RecordStore for MemoryStore {
    fn load_rows(&self) -> StoreResult<Vec<Row>> {
        Ok(self.rows.clone())
    }

    fn append(&mut self, record: &Record) -> StoreResult<()> {
        if self.rows.iter().any(|r| record.matches_row(r)) {
            return DuplicateSnafu {
                reviewer: record.reviewer.clone(),
                key: record.key().to_string(),
            }
            .fail();
        }
        self.rows.push(record.to_row());
        Ok(())
    }

    fn describe(&self) -> String {
        format!("memory store ({} rows)", self.rows.len())
    }
}
