use calamine::{open_workbook, DataType, Reader, Xlsx};
use log::debug;
use serde_json::Value as JSValue;

use crate::review::{io_common::clean_header, *};

/// Reads an Excel catalog. The first row of the worksheet holds the column
/// names.
pub fn read_excel_catalog(path: &str, worksheet_name: Option<&str>) -> ReviewResult<Vec<Item>> {
    let wrange = get_range(path, worksheet_name)?;

    let mut iter = wrange.rows();
    let header: Vec<String> = iter
        .next()
        .context(EmptyExcelSnafu { path })?
        .iter()
        .map(|c| match coerce_cell(c) {
            JSValue::Null => "".to_string(),
            v => clean_header(&display_value(&v)),
        })
        .collect();
    debug!("read_excel_catalog: header: {:?}", header);

    let mut res: Vec<Item> = Vec::new();
    for (idx, row) in iter.enumerate() {
        let mut fields = Row::new();
        for (col_idx, column) in header.iter().enumerate() {
            if column.is_empty() {
                continue;
            }
            let v = row.get(col_idx).map(coerce_cell).unwrap_or(JSValue::Null);
            fields.insert(column.clone(), v);
        }
        res.push(Item {
            position: idx,
            fields,
        });
    }
    Ok(res)
}

/// Opens the worksheet with the given name, or the only worksheet of the file.
fn get_range(path: &str, worksheet_name_o: Option<&str>) -> ReviewResult<calamine::Range<DataType>> {
    debug!(
        "get_range: path: {:?} worksheet: {:?}",
        path, worksheet_name_o
    );
    let mut workbook: Xlsx<_> = open_workbook(path).context(OpeningExcelSnafu { path })?;

    if let Some(worksheet_name) = worksheet_name_o {
        let wrange = workbook
            .worksheet_range(worksheet_name)
            .context(MissingWorksheetSnafu {
                path,
                name: worksheet_name,
            })?
            .context(OpeningExcelSnafu { path })?;
        Ok(wrange)
    } else {
        let all_worksheets = workbook.worksheets();
        match all_worksheets.as_slice() {
            [] => EmptyExcelSnafu { path }.fail(),
            [(worksheet_name, wrange)] => {
                debug!("get_range: using the only worksheet {:?}", worksheet_name);
                Ok(wrange.clone())
            }
            _ => AmbiguousWorksheetSnafu {
                path,
                names: all_worksheets
                    .iter()
                    .map(|(n, _)| n.clone())
                    .collect::<Vec<String>>(),
            }
            .fail(),
        }
    }
}

/// Converts an Excel cell to a plain value. Never fails: cells that carry
/// no usable value become null.
pub fn coerce_cell(cell: &DataType) -> JSValue {
    match cell {
        DataType::Empty => JSValue::Null,
        DataType::Error(_) => JSValue::Null,
        DataType::Int(i) => JSValue::from(*i),
        DataType::Float(f) => coerce_float(*f),
        // Serial date, kept as a number.
        DataType::DateTime(f) => coerce_float(*f),
        DataType::Bool(b) => JSValue::Bool(*b),
        DataType::String(s) if s.trim().is_empty() => JSValue::Null,
        DataType::String(s) => JSValue::from(s.clone()),
        #[allow(unreachable_patterns)]
        _ => JSValue::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cells() {
        assert_eq!(coerce_cell(&DataType::Empty), JSValue::Null);
        assert_eq!(coerce_cell(&DataType::Float(f64::NAN)), JSValue::Null);
        assert_eq!(coerce_cell(&DataType::Float(4.0)), JSValue::from(4));
        assert_eq!(coerce_cell(&DataType::Float(1.5)), JSValue::from(1.5));
        assert_eq!(coerce_cell(&DataType::Int(2021)), JSValue::from(2021));
        assert_eq!(coerce_cell(&DataType::Bool(true)), JSValue::Bool(true));
        assert_eq!(coerce_cell(&DataType::String("  ".to_string())), JSValue::Null);
        assert_eq!(
            coerce_cell(&DataType::String("Governança".to_string())),
            JSValue::from("Governança")
        );
        assert_eq!(
            coerce_cell(&DataType::Error(calamine::CellErrorType::NA)),
            JSValue::Null
        );
    }

    #[test]
    fn missing_file() {
        let res = read_excel_catalog("/nonexistent/catalog.xlsx", None);
        assert!(matches!(res, Err(ReviewError::OpeningExcel { .. })));
    }
}
