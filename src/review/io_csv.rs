// Primitives for reading CSV catalogs.

use log::debug;
use serde_json::Value as JSValue;

use crate::review::{
    io_common::{clean_header, simplify_file_name},
    *,
};

/// Reads a CSV catalog. The first line holds the column names.
///
/// Every cell goes through the text coercion, so the items carry numbers,
/// booleans and nulls where the file has them.
pub fn read_csv_catalog(path: &str) -> ReviewResult<Vec<Item>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .context(CsvOpenSnafu { path })?;
    let header: Vec<String> = rdr
        .headers()
        .context(CsvOpenSnafu { path })?
        .iter()
        .map(clean_header)
        .collect();
    debug!(
        "read_csv_catalog: {}: header: {:?}",
        simplify_file_name(path),
        header
    );

    let mut res: Vec<Item> = Vec::new();
    for (idx, line_r) in rdr.records().enumerate() {
        // The header is line 1.
        let lineno = idx + 2;
        let line = line_r.context(CsvLineParseSnafu { path, lineno })?;
        let mut fields = Row::new();
        for (col_idx, column) in header.iter().enumerate() {
            let v = match line.get(col_idx) {
                Some(s) => coerce_text(s),
                None => JSValue::Null,
            };
            fields.insert(column.clone(), v);
        }
        res.push(Item {
            position: idx,
            fields,
        });
    }
    Ok(res)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn read_catalog_with_bom_and_missing_values() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("catalog.csv");
        fs::write(
            &p,
            "\u{feff}questao,nivel,texto_completo,peso\n\
             1.1,4,\"Existe, por escrito, um plano?\",nan\n\
             1.2,3,Outro texto\n\
             1.10,4,Terceiro texto,01\n",
        )
        .unwrap();
        let items = read_csv_catalog(&p.display().to_string()).unwrap();
        assert_eq!(items.len(), 3);
        let first = &items[0];
        assert_eq!(first.position, 0);
        assert_eq!(first.get("questao"), Some(&JSValue::from(1.1)));
        assert_eq!(first.get("nivel"), Some(&JSValue::from(4)));
        assert_eq!(first.display("texto_completo"), "Existe, por escrito, um plano?");
        assert_eq!(first.get("peso"), Some(&JSValue::Null));
        // Short line.
        assert_eq!(items[1].get("peso"), Some(&JSValue::Null));
        // Codes keep their text.
        assert_eq!(items[2].get("questao"), Some(&JSValue::from("1.10")));
        assert_eq!(items[2].get("peso"), Some(&JSValue::from("01")));
    }

    #[test]
    fn missing_file() {
        let res = read_csv_catalog("/nonexistent/catalog.csv");
        assert!(matches!(res, Err(ReviewError::CsvOpen { .. })));
    }
}
