// ********* Input data structures ***********

use serde::{Deserialize, Serialize};
use serde_json::Map as JSMap;
use serde_json::Value as JSValue;
use snafu::prelude::*;

use crate::coerce::coerce_value;

/// A row of a flat table: column name to a plain primitive value
/// (string, number, boolean or null).
pub type Row = JSMap<String, JSValue>;

pub const TIMESTAMP_FIELD: &str = "timestamp";
pub const REVIEWER_FIELD: &str = "reviewer";
pub const SCHEMA_FIELD: &str = "schema";

/// The revisions of the review form.
///
/// Each revision fixes the identity fields of an item and the judgment
/// collected for it.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Serialize, Deserialize)]
pub enum FormRevision {
    /// First revision: hierarchical key, one status per item.
    #[serde(rename = "statusReview")]
    StatusReview,
    /// Later revision: keyed by question number, adequacy and relevance.
    #[serde(rename = "adequacyReview")]
    AdequacyReview,
}

impl FormRevision {
    /// The tag written in the `schema` column of every record.
    pub fn tag(&self) -> &'static str {
        match self {
            FormRevision::StatusReview => "statusReview",
            FormRevision::AdequacyReview => "adequacyReview",
        }
    }

    pub fn from_tag(tag: &str) -> Option<FormRevision> {
        match tag {
            "statusReview" => Some(FormRevision::StatusReview),
            "adequacyReview" => Some(FormRevision::AdequacyReview),
            _ => None,
        }
    }

    pub fn default_identity_fields(&self) -> &'static [&'static str] {
        match self {
            FormRevision::StatusReview => &[
                "sistema",
                "ano",
                "dimensao_padrao",
                "subdimensao",
                "questao",
                "elemento",
            ],
            FormRevision::AdequacyReview => &["numero_questao"],
        }
    }

    /// Item columns copied into each record next to the identity fields.
    pub fn context_fields(&self) -> &'static [&'static str] {
        match self {
            FormRevision::StatusReview => &["nivel", "tipo_elemento", "texto_completo"],
            FormRevision::AdequacyReview => &["texto_completo"],
        }
    }
}

/// The fields that identify an item, for one form revision.
///
/// All the fields are required: an item or a stored record of the same
/// revision that lacks one of them is an error, never a silent mismatch.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct IdentityContract {
    pub revision: FormRevision,
    pub fields: Vec<String>,
}

impl IdentityContract {
    pub fn for_revision(revision: FormRevision) -> IdentityContract {
        IdentityContract {
            revision,
            fields: revision
                .default_identity_fields()
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }

    /// Overrides the identity fields. An empty list keeps the defaults.
    pub fn with_fields(revision: FormRevision, fields: &[String]) -> IdentityContract {
        if fields.is_empty() {
            IdentityContract::for_revision(revision)
        } else {
            IdentityContract {
                revision,
                fields: fields.to_vec(),
            }
        }
    }
}

/// The values of the identity fields of an item, in contract order.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ItemKey(pub Vec<JSValue>);

impl ItemKey {
    /// A stable textual form, usable as a hash key. Values are compared on
    /// their cell text, so `"4"`, `4` and `4.0` are the same key part while
    /// `"1.10"` and `1.1` are not.
    pub fn canonical(&self) -> String {
        let parts: Vec<JSValue> = self.0.iter().map(|v| JSValue::from(cell_text(v))).collect();
        JSValue::Array(parts).to_string()
    }
}

impl std::fmt::Display for ItemKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self.0.iter().map(display_value).collect();
        write!(f, "{}", parts.join(" / "))
    }
}

/// One row of the catalog.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Item {
    /// Position of the row in the catalog file, starting at 0 after the header.
    pub position: usize,
    pub fields: Row,
}

impl Item {
    pub fn get(&self, column: &str) -> Option<&JSValue> {
        self.fields.get(column)
    }

    /// The value of a column as displayed to the reviewer. Missing and null
    /// values are empty.
    pub fn display(&self, column: &str) -> String {
        self.get(column).map(display_value).unwrap_or_default()
    }

    pub fn key(&self, contract: &IdentityContract) -> SessionResult<ItemKey> {
        let mut values: Vec<JSValue> = Vec::with_capacity(contract.fields.len());
        for field in contract.fields.iter() {
            let v = self.get(field).context(MissingItemFieldSnafu {
                position: self.position,
                field: field.clone(),
            })?;
            values.push(v.clone());
        }
        Ok(ItemKey(values))
    }
}

/// Renders a primitive value the way it appears in a table cell.
pub fn display_value(v: &JSValue) -> String {
    match v {
        JSValue::Null => "".to_string(),
        JSValue::String(s) => s.clone(),
        x => x.to_string(),
    }
}

/// The text used to compare identity values coming from different readers.
/// Strings are compared on their trimmed text, never re-read as numbers.
/// Integral floats are written as integers.
pub fn cell_text(v: &JSValue) -> String {
    match v {
        JSValue::String(s) => s.trim().to_string(),
        x => display_value(&coerce_value(x)),
    }
}

/// True if the reviewer cell of a stored row names this reviewer. Spaces
/// around either name are ignored.
pub fn is_reviewer(v: &JSValue, reviewer: &str) -> bool {
    display_value(v).trim() == reviewer.trim()
}

// ********* Judgments ***********

#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum ReviewStatus {
    Approve,
    Reject,
    SuggestWording,
    /// The reviewer proposes an additional item.
    NewItem,
}

impl ReviewStatus {
    pub const ALL: [ReviewStatus; 4] = [
        ReviewStatus::Approve,
        ReviewStatus::Reject,
        ReviewStatus::SuggestWording,
        ReviewStatus::NewItem,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ReviewStatus::Approve => "approve",
            ReviewStatus::Reject => "reject",
            ReviewStatus::SuggestWording => "suggest_wording",
            ReviewStatus::NewItem => "new_item",
        }
    }

    pub fn parse(s: &str) -> Option<ReviewStatus> {
        let norm = normalize_label(s);
        ReviewStatus::ALL.iter().find(|st| st.label() == norm).cloned()
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum Adequacy {
    Adequate,
    /// Triggers a mandatory justification.
    Partial,
    Inadequate,
}

impl Adequacy {
    pub const ALL: [Adequacy; 3] = [Adequacy::Adequate, Adequacy::Partial, Adequacy::Inadequate];

    pub fn label(&self) -> &'static str {
        match self {
            Adequacy::Adequate => "adequate",
            Adequacy::Partial => "partial",
            Adequacy::Inadequate => "inadequate",
        }
    }

    pub fn parse(s: &str) -> Option<Adequacy> {
        let norm = normalize_label(s);
        Adequacy::ALL.iter().find(|a| a.label() == norm).cloned()
    }
}

fn normalize_label(s: &str) -> String {
    s.trim().to_lowercase().replace([' ', '-'], "_")
}

pub const MIN_RELEVANCE: u8 = 1;
pub const MAX_RELEVANCE: u8 = 5;

#[derive(Eq, PartialEq, Debug, Clone)]
pub enum Judgment {
    Status(ReviewStatus),
    Adequacy { adequacy: Adequacy, relevance: u8 },
}

impl Judgment {
    pub fn label(&self) -> &'static str {
        match self {
            Judgment::Status(s) => s.label(),
            Judgment::Adequacy { adequacy, .. } => adequacy.label(),
        }
    }
}

// ********* Records ***********

/// One submitted annotation.
#[derive(PartialEq, Debug, Clone)]
pub struct Record {
    pub timestamp: String,
    pub reviewer: String,
    pub revision: FormRevision,
    /// The identity fields of the item, in contract order.
    pub identity: Vec<(String, JSValue)>,
    /// Other item columns copied for readability of the sink.
    pub context: Vec<(String, JSValue)>,
    pub judgment: Judgment,
    pub comment: String,
    pub justification: Option<String>,
    pub new_item_text: Option<String>,
}

impl Record {
    /// The columns of the record, in the order they are written to a sink.
    pub fn columns(&self) -> Vec<(String, JSValue)> {
        let mut cols: Vec<(String, JSValue)> = vec![
            (TIMESTAMP_FIELD.to_string(), JSValue::from(self.timestamp.clone())),
            (REVIEWER_FIELD.to_string(), JSValue::from(self.reviewer.clone())),
            (SCHEMA_FIELD.to_string(), JSValue::from(self.revision.tag())),
        ];
        cols.extend(self.identity.iter().cloned());
        cols.extend(self.context.iter().cloned());
        match &self.judgment {
            Judgment::Status(status) => {
                cols.push(("status".to_string(), JSValue::from(status.label())));
                cols.push(("comment".to_string(), JSValue::from(self.comment.clone())));
                cols.push((
                    "new_item".to_string(),
                    JSValue::Bool(*status == ReviewStatus::NewItem),
                ));
                cols.push(("new_item_text".to_string(), optional_text(&self.new_item_text)));
            }
            Judgment::Adequacy {
                adequacy,
                relevance,
            } => {
                cols.push(("adequacy".to_string(), JSValue::from(adequacy.label())));
                cols.push(("relevance".to_string(), JSValue::from(*relevance)));
                cols.push(("justification".to_string(), optional_text(&self.justification)));
                cols.push(("comment".to_string(), JSValue::from(self.comment.clone())));
            }
        }
        cols
    }

    pub fn to_row(&self) -> Row {
        self.columns().into_iter().collect()
    }

    pub fn key(&self) -> ItemKey {
        ItemKey(self.identity.iter().map(|(_, v)| v.clone()).collect())
    }

    /// A digest of (revision, reviewer, identity). Two records share a digest
    /// exactly when they annotate the same item for the same reviewer.
    pub fn digest(&self) -> String {
        sha256::digest(format!(
            "{}\u{1f}{}\u{1f}{}",
            self.revision.tag(),
            self.reviewer,
            self.key().canonical()
        ))
    }

    /// True if the stored row annotates the same item for the same reviewer.
    /// Rows without a schema tag are considered to be of this revision.
    pub fn matches_row(&self, row: &Row) -> bool {
        let same_revision = match row.get(SCHEMA_FIELD) {
            Some(JSValue::String(tag)) => tag == self.revision.tag(),
            _ => true,
        };
        same_revision
            && row
                .get(REVIEWER_FIELD)
                .map(|v| is_reviewer(v, &self.reviewer))
                .unwrap_or(false)
            && self
                .identity
                .iter()
                .all(|(field, v)| row.get(field).map(cell_text) == Some(cell_text(v)))
    }
}

fn optional_text(s: &Option<String>) -> JSValue {
    match s {
        Some(x) if !x.is_empty() => JSValue::from(x.clone()),
        _ => JSValue::Null,
    }
}

// ********* Errors ***********

/// Problems found in a form before anything is written.
#[derive(Eq, PartialEq, Debug, Clone, Snafu)]
#[snafu(visibility(pub))]
pub enum ValidationError {
    #[snafu(display("{field} is mandatory"))]
    MissingField { field: &'static str },
    #[snafu(display("{field} does not accept the value {value:?}"))]
    InvalidValue { field: &'static str, value: String },
    #[snafu(display("{field} is mandatory when {trigger} is {value}"))]
    MissingDependentField {
        field: &'static str,
        trigger: &'static str,
        value: &'static str,
    },
}

impl ValidationError {
    /// The name of the form field the problem is about.
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::MissingField { field } => field,
            ValidationError::InvalidValue { field, .. } => field,
            ValidationError::MissingDependentField { field, .. } => field,
        }
    }
}

/// Failures of a record store. None of them is retried.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum StoreError {
    #[snafu(display("record store unavailable at {path}: {source}"))]
    Unavailable {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("could not encode or decode a record at {path}: {source}"))]
    Encoding {
        source: serde_json::Error,
        path: String,
    },
    #[snafu(display("column {column:?} does not exist in sheet {path}"))]
    SchemaMismatch { column: String, path: String },
    #[snafu(display("{reviewer} already annotated item {key}"))]
    Duplicate { reviewer: String, key: String },
    #[snafu(whatever, display("{message}"))]
    Backend {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum SessionError {
    #[snafu(display("a reviewer name is required to start a session"))]
    MissingReviewer {},
    #[snafu(display("all items annotated"))]
    AllAnnotated {},
    #[snafu(display("catalog row {position} has no identity field {field:?}"))]
    MissingItemField { position: usize, field: String },
    #[snafu(display(
        "stored record #{row} has no field {field:?} required by revision {revision}"
    ))]
    MissingRecordField {
        row: usize,
        field: String,
        revision: &'static str,
    },
    #[snafu(display("the form cannot be submitted: {}", describe_issues(issues)))]
    InvalidForm { issues: Vec<ValidationError> },
    #[snafu(display("the record could not be saved: {source}"))]
    Store { source: StoreError },
}

pub type SessionResult<T> = Result<T, SessionError>;

fn describe_issues(issues: &[ValidationError]) -> String {
    let msgs: Vec<String> = issues.iter().map(|i| i.to_string()).collect();
    msgs.join("; ")
}
