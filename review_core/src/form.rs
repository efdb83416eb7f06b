pub use crate::config::*;
use crate::coerce::coerce_value;

/// The values typed by a reviewer, before validation.
///
/// The form belongs to the caller and is never consumed by a submission, so
/// the values survive a failed attempt.
///
/// ```
/// use review_core::form::FormInput;
/// use review_core::{FormRevision, Judgment, ReviewStatus};
///
/// let form = FormInput {
///     status: "approve".to_string(),
///     ..Default::default()
/// };
/// let valid = form.validate(FormRevision::StatusReview).unwrap();
/// assert_eq!(valid.judgment, Judgment::Status(ReviewStatus::Approve));
/// ```
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct FormInput {
    pub status: String,
    pub adequacy: String,
    pub relevance: String,
    pub justification: String,
    pub comment: String,
    pub new_item_text: String,
}

/// A form that passed validation.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ValidForm {
    pub judgment: Judgment,
    pub comment: String,
    pub justification: Option<String>,
    pub new_item_text: Option<String>,
}

impl FormInput {
    /// Checks the mandatory and conditional fields of the given revision.
    /// All the problems are reported, one per field.
    pub fn validate(&self, revision: FormRevision) -> Result<ValidForm, Vec<ValidationError>> {
        let mut issues: Vec<ValidationError> = Vec::new();
        let judgment = match revision {
            FormRevision::StatusReview => self.validate_status(&mut issues),
            FormRevision::AdequacyReview => self.validate_adequacy(&mut issues),
        };
        match judgment {
            Some(judgment) if issues.is_empty() => Ok(ValidForm {
                judgment,
                comment: self.comment.trim().to_string(),
                justification: non_empty(&self.justification),
                new_item_text: non_empty(&self.new_item_text),
            }),
            _ => Err(issues),
        }
    }

    fn validate_status(&self, issues: &mut Vec<ValidationError>) -> Option<Judgment> {
        if self.status.trim().is_empty() {
            issues.push(ValidationError::MissingField { field: "status" });
            return None;
        }
        let status = match ReviewStatus::parse(&self.status) {
            Some(s) => s,
            None => {
                issues.push(ValidationError::InvalidValue {
                    field: "status",
                    value: self.status.clone(),
                });
                return None;
            }
        };
        if status == ReviewStatus::NewItem && self.new_item_text.trim().is_empty() {
            issues.push(ValidationError::MissingDependentField {
                field: "new_item_text",
                trigger: "status",
                value: ReviewStatus::NewItem.label(),
            });
        }
        Some(Judgment::Status(status))
    }

    fn validate_adequacy(&self, issues: &mut Vec<ValidationError>) -> Option<Judgment> {
        let adequacy = if self.adequacy.trim().is_empty() {
            issues.push(ValidationError::MissingField { field: "adequacy" });
            None
        } else if let Some(a) = Adequacy::parse(&self.adequacy) {
            Some(a)
        } else {
            issues.push(ValidationError::InvalidValue {
                field: "adequacy",
                value: self.adequacy.clone(),
            });
            None
        };

        let relevance = if self.relevance.trim().is_empty() {
            issues.push(ValidationError::MissingField { field: "relevance" });
            None
        } else {
            match self.relevance.trim().parse::<u8>() {
                Ok(r) if (MIN_RELEVANCE..=MAX_RELEVANCE).contains(&r) => Some(r),
                _ => {
                    issues.push(ValidationError::InvalidValue {
                        field: "relevance",
                        value: self.relevance.clone(),
                    });
                    None
                }
            }
        };

        if adequacy == Some(Adequacy::Partial) && self.justification.trim().is_empty() {
            issues.push(ValidationError::MissingDependentField {
                field: "justification",
                trigger: "adequacy",
                value: Adequacy::Partial.label(),
            });
        }

        match (adequacy, relevance) {
            (Some(adequacy), Some(relevance)) => Some(Judgment::Adequacy {
                adequacy,
                relevance,
            }),
            _ => None,
        }
    }
}

fn non_empty(s: &str) -> Option<String> {
    let t = s.trim();
    if t.is_empty() {
        None
    } else {
        Some(t.to_string())
    }
}

/// Assembles the record for an item. Every copied value is coerced to a
/// plain primitive.
pub fn build_record(
    item: &Item,
    contract: &IdentityContract,
    reviewer: &str,
    form: ValidForm,
    timestamp: String,
) -> SessionResult<Record> {
    let key = item.key(contract)?;
    let identity: Vec<(String, serde_json::Value)> = contract
        .fields
        .iter()
        .cloned()
        .zip(key.0.iter().map(coerce_value))
        .collect();
    let context: Vec<(String, serde_json::Value)> = contract
        .revision
        .context_fields()
        .iter()
        .filter(|f| !contract.fields.iter().any(|idf| idf.as_str() == **f))
        .map(|f| {
            let v = item.get(f).map(coerce_value).unwrap_or(serde_json::Value::Null);
            (f.to_string(), v)
        })
        .collect();
    Ok(Record {
        timestamp,
        reviewer: reviewer.to_string(),
        revision: contract.revision,
        identity,
        context,
        judgment: form.judgment,
        comment: form.comment,
        justification: form.justification,
        new_item_text: form.new_item_text,
    })
}
