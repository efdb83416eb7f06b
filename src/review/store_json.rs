// A record store keeping one JSON file per record.

use log::{debug, warn};
use serde_json::Value as JSValue;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use review_core::store::RecordStore;

use crate::review::{io_common::slug, *};

pub struct JsonDirStore {
    root: PathBuf,
}

impl JsonDirStore {
    pub fn new(path: &str) -> JsonDirStore {
        JsonDirStore {
            root: PathBuf::from(path),
        }
    }

    fn path_str(&self) -> String {
        self.root.display().to_string()
    }

    /// The file of a record. The digest makes it unique per (revision,
    /// reviewer, item).
    pub fn file_name(record: &Record) -> String {
        let digest: String = record.digest().chars().take(16).collect();
        format!("validation_{}_{}.json", slug(&record.reviewer), digest)
    }
}

impl RecordStore for JsonDirStore {
    fn load_rows(&self) -> StoreResult<Vec<Row>> {
        if !self.root.exists() {
            debug!("load_rows: {} does not exist yet", self.path_str());
            return Ok(vec![]);
        }
        let entries = fs::read_dir(&self.root).context(UnavailableSnafu {
            path: self.path_str(),
        })?;
        let mut paths: Vec<PathBuf> = Vec::new();
        for entry_r in entries {
            let entry = entry_r.context(UnavailableSnafu {
                path: self.path_str(),
            })?;
            let p = entry.path();
            if p.extension().and_then(|e| e.to_str()) == Some("json") {
                paths.push(p);
            }
        }
        paths.sort();

        let mut rows: Vec<Row> = Vec::new();
        for p in paths.iter() {
            let contents = match fs::read_to_string(p) {
                Ok(c) => c,
                Err(e) => {
                    warn!("load_rows: skipping unreadable file {:?}: {}", p, e);
                    continue;
                }
            };
            match serde_json::from_str::<JSValue>(&contents) {
                Ok(JSValue::Object(obj)) => {
                    let row: Row = obj
                        .iter()
                        .map(|(k, v)| (k.clone(), coerce_value(v)))
                        .collect();
                    rows.push(row);
                }
                Ok(_) => warn!("load_rows: skipping {:?}: not a JSON object", p),
                Err(e) => warn!("load_rows: skipping {:?}: {}", p, e),
            }
        }
        debug!("load_rows: {} rows from {}", rows.len(), self.path_str());
        Ok(rows)
    }

    fn append(&mut self, record: &Record) -> StoreResult<()> {
        let duplicate = self.load_rows()?.iter().any(|r| record.matches_row(r));
        ensure!(
            !duplicate,
            DuplicateSnafu {
                reviewer: record.reviewer.clone(),
                key: record.key().to_string(),
            }
        );

        fs::create_dir_all(&self.root).context(UnavailableSnafu {
            path: self.path_str(),
        })?;
        let p = self.root.join(JsonDirStore::file_name(record));
        let path = p.display().to_string();
        let file = match fs::OpenOptions::new().write(true).create_new(true).open(&p) {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return DuplicateSnafu {
                    reviewer: record.reviewer.clone(),
                    key: record.key().to_string(),
                }
                .fail();
            }
            Err(e) => return Err(e).context(UnavailableSnafu { path }),
        };
        let written = serde_json::to_writer_pretty(&file, &JSValue::Object(record.to_row()));
        if let Err(e) = written {
            drop(file);
            if let Err(e2) = fs::remove_file(&p) {
                warn!("append: could not remove the partial file {}: {}", path, e2);
            }
            return Err(e).context(EncodingSnafu { path });
        }
        debug!("append: wrote {}", path);
        Ok(())
    }

    fn describe(&self) -> String {
        format!("JSON directory {}", self.path_str())
    }
}
