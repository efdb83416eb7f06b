mod coerce;
mod config;
pub mod catalog;
pub mod form;
pub mod manual;
pub mod store;

use log::{debug, info, warn};
use snafu::prelude::*;
use std::collections::{HashMap, HashSet};

pub use crate::coerce::*;
pub use crate::config::*;
use crate::form::{build_record, FormInput};
use crate::store::RecordStore;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// The presented items split in two, by position in the item list.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Partition {
    pub annotated: Vec<usize>,
    pub candidates: Vec<usize>,
}

/// Splits the items into those already annotated by the reviewer and those
/// still waiting for a judgment.
///
/// Only the rows of the contract's revision are considered. Rows without a
/// schema tag are taken to be of that revision. A considered row that lacks
/// the reviewer field or one of the identity fields is an error.
///
/// Arguments:
/// * `items` the presented catalog items, in presentation order
/// * `rows` the content of the record store
/// * `reviewer` the current reviewer
/// * `contract` the identity fields of the active revision
pub fn partition_items(
    items: &[Item],
    rows: &[Row],
    reviewer: &str,
    contract: &IdentityContract,
) -> SessionResult<Partition> {
    let done = reviewer_keys(rows, reviewer, contract)?;
    debug!(
        "partition_items: reviewer {:?} has {} annotated keys among {} rows",
        reviewer,
        done.len(),
        rows.len()
    );
    let mut annotated: Vec<usize> = Vec::new();
    let mut candidates: Vec<usize> = Vec::new();
    for (idx, item) in items.iter().enumerate() {
        let key = item.key(contract)?;
        if done.contains(&key.canonical()) {
            annotated.push(idx);
        } else {
            candidates.push(idx);
        }
    }
    Ok(Partition {
        annotated,
        candidates,
    })
}

fn reviewer_keys(
    rows: &[Row],
    reviewer: &str,
    contract: &IdentityContract,
) -> SessionResult<HashSet<String>> {
    let revision = contract.revision.tag();
    let mut keys: HashSet<String> = HashSet::new();
    for (idx, row) in rows.iter().enumerate() {
        if !same_revision(row, contract.revision) {
            debug!("reviewer_keys: skipping row {} of another revision", idx);
            continue;
        }
        let row_reviewer = row.get(REVIEWER_FIELD).context(MissingRecordFieldSnafu {
            row: idx,
            field: REVIEWER_FIELD,
            revision,
        })?;
        if !is_reviewer(row_reviewer, reviewer) {
            continue;
        }
        let mut values = Vec::with_capacity(contract.fields.len());
        for field in contract.fields.iter() {
            let v = row.get(field).context(MissingRecordFieldSnafu {
                row: idx,
                field: field.clone(),
                revision,
            })?;
            values.push(v.clone());
        }
        keys.insert(ItemKey(values).canonical());
    }
    Ok(keys)
}

fn same_revision(row: &Row, revision: FormRevision) -> bool {
    match row.get(SCHEMA_FIELD) {
        Some(serde_json::Value::String(tag)) => tag == revision.tag(),
        _ => true,
    }
}

/// Number of records per judgment label for one reviewer. All the labels
/// of the revision are listed, in their natural order, even with a zero count.
pub fn judgment_summary(
    rows: &[Row],
    reviewer: &str,
    revision: FormRevision,
) -> Vec<(String, usize)> {
    let (column, labels): (&str, Vec<&str>) = match revision {
        FormRevision::StatusReview => (
            "status",
            ReviewStatus::ALL.iter().map(|s| s.label()).collect(),
        ),
        FormRevision::AdequacyReview => (
            "adequacy",
            Adequacy::ALL.iter().map(|a| a.label()).collect(),
        ),
    };
    let mut counts: HashMap<String, usize> = HashMap::new();
    for row in rows.iter().filter(|r| same_revision(r, revision)) {
        let is_reviewer = row
            .get(REVIEWER_FIELD)
            .map(|v| is_reviewer(v, reviewer))
            .unwrap_or(false);
        if is_reviewer {
            let label = row.get(column).map(display_value).unwrap_or_default();
            *counts.entry(label).or_insert(0) += 1;
        }
    }
    labels
        .iter()
        .map(|l| (l.to_string(), counts.get(*l).cloned().unwrap_or(0)))
        .collect()
}

/// The progress readout of a reviewer over the presented items.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub struct Progress {
    pub annotated: usize,
    pub total: usize,
}

impl Progress {
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.annotated as f64 / self.total as f64
        }
    }
}

impl std::fmt::Display for Progress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{} ({:.1}%)",
            self.annotated,
            self.total,
            self.fraction() * 100.0
        )
    }
}

/// The state of one reviewer going through the catalog.
///
/// The cursor is a plain offset into the candidates. It is never reset when
/// the candidates are recomputed, so it may point at a different item after a
/// refresh.
#[derive(Debug, Clone)]
pub struct Session {
    reviewer: String,
    contract: IdentityContract,
    items: Vec<Item>,
    candidates: Vec<usize>,
    offset: usize,
    rows: Vec<Row>,
}

impl Session {
    /// Starts a session over the presented items. Until the first refresh,
    /// every item is a candidate.
    pub fn new(
        reviewer: &str,
        contract: IdentityContract,
        items: Vec<Item>,
    ) -> SessionResult<Session> {
        let reviewer = reviewer.trim();
        ensure!(!reviewer.is_empty(), MissingReviewerSnafu {});
        let candidates: Vec<usize> = (0..items.len()).collect();
        Ok(Session {
            reviewer: reviewer.to_string(),
            contract,
            items,
            candidates,
            offset: 0,
            rows: Vec::new(),
        })
    }

    pub fn reviewer(&self) -> &str {
        &self.reviewer
    }

    pub fn contract(&self) -> &IdentityContract {
        &self.contract
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn candidates(&self) -> Vec<&Item> {
        self.candidates.iter().map(|idx| &self.items[*idx]).collect()
    }

    /// Reloads the store and recomputes the candidates. The offset is kept.
    ///
    /// A store that cannot be read is treated as empty.
    pub fn refresh(&mut self, store: &dyn RecordStore) -> SessionResult<()> {
        let rows = match store.load_rows() {
            Ok(rows) => rows,
            Err(e) => {
                warn!(
                    "refresh: could not read {}, presenting all the items: {}",
                    store.describe(),
                    e
                );
                Vec::new()
            }
        };
        let partition = partition_items(&self.items, &rows, &self.reviewer, &self.contract)?;
        debug!(
            "refresh: {} candidates, {} annotated",
            partition.candidates.len(),
            partition.annotated.len()
        );
        self.candidates = partition.candidates;
        self.rows = rows;
        Ok(())
    }

    /// The item under the cursor, or None when everything is annotated.
    pub fn current(&self) -> Option<&Item> {
        if self.candidates.is_empty() {
            None
        } else {
            let idx = self.candidates[self.offset % self.candidates.len()];
            Some(&self.items[idx])
        }
    }

    pub fn show_next(&mut self) {
        self.offset = self.offset.wrapping_add(1);
    }

    pub fn seek(&mut self, offset: usize) {
        self.offset = offset;
    }

    pub fn submit(
        &mut self,
        form: &FormInput,
        store: &mut dyn RecordStore,
    ) -> SessionResult<Record> {
        let timestamp = chrono::Local::now().format(TIMESTAMP_FORMAT).to_string();
        self.submit_at(form, store, timestamp)
    }

    /// Validates the form, appends the record for the current item and moves
    /// the cursor forward.
    ///
    /// On any error nothing is written, the cursor stays in place and the
    /// form is left untouched for another attempt.
    pub fn submit_at(
        &mut self,
        form: &FormInput,
        store: &mut dyn RecordStore,
        timestamp: String,
    ) -> SessionResult<Record> {
        let item = self.current().context(AllAnnotatedSnafu {})?.clone();
        let valid = form
            .validate(self.contract.revision)
            .map_err(|issues| SessionError::InvalidForm { issues })?;
        let record = build_record(&item, &self.contract, &self.reviewer, valid, timestamp)?;
        store.append(&record).context(StoreSnafu {})?;
        info!(
            "submit: {} recorded {} for item {} in {}",
            self.reviewer,
            record.judgment.label(),
            record.key(),
            store.describe()
        );
        self.offset = self.offset.wrapping_add(1);
        if let Err(e) = self.refresh(&*store) {
            warn!("submit: record saved but the candidates could not be recomputed: {}", e);
        }
        Ok(record)
    }

    pub fn progress(&self) -> Progress {
        Progress {
            annotated: self.items.len() - self.candidates.len(),
            total: self.items.len(),
        }
    }

    /// Counts per judgment label, as of the last refresh.
    pub fn summary(&self) -> Vec<(String, usize)> {
        judgment_summary(&self.rows, &self.reviewer, self.contract.revision)
    }
}
