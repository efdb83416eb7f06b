// A record store appending rows to a sheet, kept as a CSV file per
// (table, sheet).

use log::debug;
use std::fs;
use std::path::PathBuf;

use review_core::store::RecordStore;

use crate::review::{io_common::clean_header, *};

pub struct SheetStore {
    path: PathBuf,
}

impl SheetStore {
    pub fn new(root: &str, table_name: &str, sheet_name: &str) -> SheetStore {
        let file_name = format!("{}.csv", sheet_name);
        let path: PathBuf = [root, table_name, file_name.as_str()].iter().collect();
        SheetStore { path }
    }

    fn path_str(&self) -> String {
        self.path.display().to_string()
    }

    /// The header and the rows of the sheet. A sheet that does not exist yet
    /// has neither.
    fn read_sheet(&self) -> StoreResult<(Vec<String>, Vec<Row>)> {
        if !self.path.exists() {
            return Ok((vec![], vec![]));
        }
        let path = self.path_str();
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(&self.path)
            .with_whatever_context(|_| format!("could not open sheet {}", path))?;
        let header: Vec<String> = rdr
            .headers()
            .with_whatever_context(|_| format!("could not read the header of sheet {}", path))?
            .iter()
            .map(clean_header)
            .collect();
        let mut rows: Vec<Row> = Vec::new();
        for (idx, line_r) in rdr.records().enumerate() {
            let line = line_r.with_whatever_context(|_| {
                format!("could not read line {} of sheet {}", idx + 2, path)
            })?;
            let row: Row = header
                .iter()
                .zip(line.iter())
                .map(|(column, cell)| (column.clone(), coerce_text(cell)))
                .collect();
            rows.push(row);
        }
        Ok((header, rows))
    }
}

impl RecordStore for SheetStore {
    fn load_rows(&self) -> StoreResult<Vec<Row>> {
        let (_, rows) = self.read_sheet()?;
        debug!("load_rows: {} rows from {}", rows.len(), self.path_str());
        Ok(rows)
    }

    fn append(&mut self, record: &Record) -> StoreResult<()> {
        let path = self.path_str();
        let (header, rows) = self.read_sheet()?;
        let duplicate = rows.iter().any(|r| record.matches_row(r));
        ensure!(
            !duplicate,
            DuplicateSnafu {
                reviewer: record.reviewer.clone(),
                key: record.key().to_string(),
            }
        );

        let columns = record.columns();
        let file = if header.is_empty() {
            if let Some(parent) = self.path.parent() {
                fs::create_dir_all(parent).context(UnavailableSnafu { path: path.clone() })?;
            }
            let file = fs::File::create(&self.path).context(UnavailableSnafu { path: path.clone() })?;
            let mut wtr = csv::WriterBuilder::new()
                .has_headers(false)
                .from_writer(&file);
            wtr.write_record(columns.iter().map(|(c, _)| c.as_str()))
                .with_whatever_context(|_| format!("could not write the header of sheet {}", path))?;
            wtr.flush().context(UnavailableSnafu { path: path.clone() })?;
            debug!("append: created sheet {}", path);
            drop(wtr);
            file
        } else {
            for (column, _) in columns.iter() {
                ensure!(
                    header.contains(column),
                    SchemaMismatchSnafu {
                        column: column.clone(),
                        path: path.clone(),
                    }
                );
            }
            fs::OpenOptions::new()
                .append(true)
                .open(&self.path)
                .context(UnavailableSnafu { path: path.clone() })?
        };

        let row = record.to_row();
        let cells: Vec<String> = if header.is_empty() {
            columns.iter().map(|(_, v)| display_value(v)).collect()
        } else {
            header
                .iter()
                .map(|c| row.get(c).map(display_value).unwrap_or_default())
                .collect()
        };
        let mut wtr = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(&file);
        wtr.write_record(&cells)
            .with_whatever_context(|_| format!("could not append to sheet {}", path))?;
        wtr.flush().context(UnavailableSnafu { path: path.clone() })?;
        debug!("append: {} cells to {}", cells.len(), path);
        Ok(())
    }

    fn describe(&self) -> String {
        format!("sheet {}", self.path_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use review_core::form::{build_record, FormInput};
    use serde_json::Value as JSValue;

    fn element(questao: &str) -> Item {
        let mut fields = Row::new();
        for (k, v) in [
            ("sistema", JSValue::from("SIMEC")),
            ("ano", JSValue::from(2021)),
            ("dimensao_padrao", JSValue::from("Gestão")),
            ("subdimensao", JSValue::from("Planejamento")),
            ("questao", JSValue::from(questao)),
            ("elemento", JSValue::from("a")),
            ("nivel", JSValue::from(4)),
            ("texto_completo", JSValue::from("Existe um plano?")),
        ] {
            fields.insert(k.to_string(), v);
        }
        Item {
            position: 0,
            fields,
        }
    }

    fn record(reviewer: &str, questao: &str, status: &str) -> Record {
        let contract = IdentityContract::for_revision(FormRevision::StatusReview);
        let new_item_text = if status == "new_item" {
            "Um item novo".to_string()
        } else {
            "".to_string()
        };
        let form = FormInput {
            status: status.to_string(),
            new_item_text,
            ..Default::default()
        }
        .validate(FormRevision::StatusReview)
        .unwrap();
        build_record(
            &element(questao),
            &contract,
            reviewer,
            form,
            "2024-05-02 10:00:00".to_string(),
        )
        .unwrap()
    }

    fn store(dir: &tempfile::TempDir) -> SheetStore {
        SheetStore::new(&dir.path().display().to_string(), "review", "round1")
    }

    #[test]
    fn missing_sheet_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(store(&dir).load_rows().unwrap().is_empty());
    }

    #[test]
    fn rows_are_read_back_and_matched() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = store(&dir);
        s.append(&record("ana", "1.1", "approve")).unwrap();
        s.append(&record("ana", "1.2", "new_item")).unwrap();
        assert!(dir.path().join("review").join("round1.csv").exists());

        let rows = s.load_rows().unwrap();
        assert_eq!(rows.len(), 2);
        // Text cells come back as numbers and booleans.
        assert_eq!(rows[0].get("ano"), Some(&JSValue::from(2021)));
        assert_eq!(rows[1].get("new_item"), Some(&JSValue::Bool(true)));
        assert_eq!(rows[0].get("new_item_text"), Some(&JSValue::Null));
        assert!(record("ana", "1.1", "reject").matches_row(&rows[0]));
        assert!(!record("bruno", "1.1", "reject").matches_row(&rows[0]));
    }

    #[test]
    fn duplicate_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = store(&dir);
        s.append(&record("ana", "1.1", "approve")).unwrap();
        let res = s.append(&record("ana", "1.1", "reject"));
        assert!(matches!(res, Err(StoreError::Duplicate { .. })));
        assert_eq!(s.load_rows().unwrap().len(), 1);
    }

    #[test]
    fn codes_that_look_alike_are_different_items() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = store(&dir);
        for q in ["1.1", "1.10", "01", "1"] {
            s.append(&record("ana", q, "approve")).unwrap();
        }
        let rows = s.load_rows().unwrap();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].get("questao"), Some(&JSValue::from(1.1)));
        assert_eq!(rows[1].get("questao"), Some(&JSValue::from("1.10")));
        assert_eq!(rows[2].get("questao"), Some(&JSValue::from("01")));
        let res = s.append(&record("ana", "1.10", "reject"));
        assert!(matches!(res, Err(StoreError::Duplicate { .. })));
    }

    #[test]
    fn unknown_column_is_a_schema_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let sheet = dir.path().join("review");
        fs::create_dir_all(&sheet).unwrap();
        fs::write(
            sheet.join("round1.csv"),
            "timestamp,reviewer,sistema,ano,dimensao_padrao,subdimensao,questao,elemento,status\n",
        )
        .unwrap();
        let mut s = store(&dir);
        let res = s.append(&record("ana", "1.1", "approve"));
        match res {
            Err(StoreError::SchemaMismatch { column, .. }) => assert_eq!(column, "schema"),
            x => panic!("unexpected {:?}", x),
        }
        assert!(s.load_rows().unwrap().is_empty());
    }
}
