use crate::review::*;

use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value as JSValue;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_STORE_PATH: &str = "validations";
pub const DEFAULT_TABLE_NAME: &str = "survey_review";
pub const DEFAULT_SHEET_NAME: &str = "validations";
pub const DEFAULT_CONTENT_COLUMN: &str = "texto_completo";

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct CatalogSource {
    pub provider: String,
    #[serde(rename = "filePath")]
    pub file_path: String,
    #[serde(rename = "excelWorksheetName")]
    pub excel_worksheet_name: Option<String>,
    #[serde(rename = "contentColumn")]
    pub content_column: Option<String>,
    #[serde(rename = "levelColumn")]
    pub level_column: Option<String>,
    pub level: Option<JSValue>,
}

impl CatalogSource {
    pub fn content_column(&self) -> String {
        self.content_column
            .clone()
            .unwrap_or_else(|| DEFAULT_CONTENT_COLUMN.to_string())
    }

    /// The (column, value) pair selecting the rows to review, if any.
    /// The value is coerced the same way as the catalog cells.
    pub fn level_filter(&self) -> Option<(String, JSValue)> {
        match (&self.level_column, &self.level) {
            (Some(column), Some(JSValue::String(s))) => Some((column.clone(), coerce_text(s))),
            (Some(column), Some(v)) if !v.is_null() => Some((column.clone(), coerce_value(v))),
            _ => None,
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct StoreSettings {
    pub provider: String,
    pub path: String,
    #[serde(rename = "tableName")]
    pub table_name: Option<String>,
    #[serde(rename = "sheetName")]
    pub sheet_name: Option<String>,
}

impl StoreSettings {
    pub fn table_name(&self) -> &str {
        self.table_name.as_deref().unwrap_or(DEFAULT_TABLE_NAME)
    }

    pub fn sheet_name(&self) -> &str {
        self.sheet_name.as_deref().unwrap_or(DEFAULT_SHEET_NAME)
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct ReviewConfig {
    #[serde(rename = "catalogSource")]
    pub catalog_source: CatalogSource,
    #[serde(rename = "recordStore")]
    pub record_store: StoreSettings,
    #[serde(rename = "formRevision")]
    pub form_revision: FormRevision,
    #[serde(rename = "identityFields")]
    pub identity_fields: Option<Vec<String>>,
    #[serde(rename = "categoryColumns")]
    pub category_columns: Option<Vec<String>>,
    #[serde(rename = "displayColumns")]
    pub display_columns: Option<Vec<String>>,
}

impl ReviewConfig {
    pub fn contract(&self) -> IdentityContract {
        IdentityContract::with_fields(
            self.form_revision,
            self.identity_fields.as_deref().unwrap_or(&[]),
        )
    }

    pub fn category_columns(&self) -> Vec<String> {
        match &self.category_columns {
            Some(cols) => cols.clone(),
            None => default_category_columns(self.form_revision),
        }
    }

    pub fn display_columns(&self) -> Vec<String> {
        match &self.display_columns {
            Some(cols) => cols.clone(),
            None => default_display_columns(self.form_revision),
        }
    }

    /// Makes the relative paths of the configuration relative to `root`.
    pub fn resolve_paths(mut self, root: &Path) -> ReviewConfig {
        self.catalog_source.file_path = resolve(root, &self.catalog_source.file_path);
        self.record_store.path = resolve(root, &self.record_store.path);
        self
    }
}

fn resolve(root: &Path, path: &str) -> String {
    if Path::new(path).is_absolute() {
        path.to_string()
    } else {
        let p: PathBuf = [root, Path::new(path)].iter().collect();
        p.display().to_string()
    }
}

fn default_category_columns(revision: FormRevision) -> Vec<String> {
    let cols: &[&str] = match revision {
        FormRevision::StatusReview => &["dimensao_padrao", "subdimensao"],
        FormRevision::AdequacyReview => &[],
    };
    cols.iter().map(|s| s.to_string()).collect()
}

fn default_display_columns(revision: FormRevision) -> Vec<String> {
    let cols: &[&str] = match revision {
        FormRevision::StatusReview => &[
            "sistema",
            "ano",
            "dimensao_padrao",
            "subdimensao",
            "questao",
            "elemento",
            "tipo_elemento",
        ],
        FormRevision::AdequacyReview => &["numero_questao"],
    };
    cols.iter().map(|s| s.to_string()).collect()
}

/// The configuration used when only a catalog file is given.
///
/// The catalog provider is guessed from the file extension. The first
/// revision only reviews the rows at level 4 of the hierarchy.
pub fn default_config(input: &str, revision: FormRevision) -> ReviewConfig {
    let provider = if input.to_lowercase().ends_with(".xlsx") {
        "xlsx"
    } else {
        "csv"
    };
    let (level_column, level) = match revision {
        FormRevision::StatusReview => (Some("nivel".to_string()), Some(JSValue::from(4))),
        FormRevision::AdequacyReview => (None, None),
    };
    ReviewConfig {
        catalog_source: CatalogSource {
            provider: provider.to_string(),
            file_path: input.to_string(),
            excel_worksheet_name: None,
            content_column: None,
            level_column,
            level,
        },
        record_store: StoreSettings {
            provider: "jsonDir".to_string(),
            path: DEFAULT_STORE_PATH.to_string(),
            table_name: None,
            sheet_name: None,
        },
        form_revision: revision,
        identity_fields: None,
        category_columns: None,
        display_columns: None,
    }
}

pub fn read_config(path: &str) -> ReviewResult<ReviewConfig> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let config: ReviewConfig =
        serde_json::from_str(&contents).context(ParsingJsonSnafu { path })?;
    debug!("read_config: {:?}", config);
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_config() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("review.json");
        fs::write(
            &p,
            r#"{
                "catalogSource": {
                    "provider": "xlsx",
                    "filePath": "catalog.xlsx",
                    "excelWorksheetName": "Itens",
                    "levelColumn": "nivel",
                    "level": "4"
                },
                "recordStore": {"provider": "sheet", "path": "/srv/reviews", "sheetName": "round2"},
                "formRevision": "statusReview",
                "categoryColumns": ["dimensao_padrao"]
            }"#,
        )
        .unwrap();
        let path = p.display().to_string();
        let config = read_config(&path).unwrap().resolve_paths(dir.path());
        assert_eq!(
            config.catalog_source.file_path,
            dir.path().join("catalog.xlsx").display().to_string()
        );
        assert_eq!(config.record_store.path, "/srv/reviews");
        assert_eq!(config.record_store.table_name(), DEFAULT_TABLE_NAME);
        assert_eq!(config.record_store.sheet_name(), "round2");
        assert_eq!(
            config.catalog_source.level_filter(),
            Some(("nivel".to_string(), JSValue::from(4)))
        );
        assert_eq!(config.contract().fields.len(), 6);
        assert_eq!(config.category_columns(), vec!["dimensao_padrao"]);
        assert_eq!(config.display_columns()[0], "sistema");
    }

    #[test]
    fn unknown_revision_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("review.json");
        fs::write(
            &p,
            r#"{
                "catalogSource": {"provider": "csv", "filePath": "c.csv"},
                "recordStore": {"provider": "jsonDir", "path": "out"},
                "formRevision": "v3"
            }"#,
        )
        .unwrap();
        let res = read_config(&p.display().to_string());
        assert!(matches!(res, Err(ReviewError::ParsingJson { .. })));
    }

    #[test]
    fn defaults_from_file_name() {
        let config = default_config("data/Catalog.XLSX", FormRevision::StatusReview);
        assert_eq!(config.catalog_source.provider, "xlsx");
        assert_eq!(config.record_store.path, DEFAULT_STORE_PATH);
        assert_eq!(config.catalog_source.content_column(), "texto_completo");
        assert_eq!(
            config.catalog_source.level_filter(),
            Some(("nivel".to_string(), JSValue::from(4)))
        );
    }
}
