//! Struct validation with field exclusion and one aggregated client message.

use crate::error::{codes, ApiError};
use axum::http::StatusCode;
use serde_json::Value;
use std::collections::HashSet;
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

/// First failing rule for one field.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldViolation {
    /// Field path, e.g. `email` or `address.city` or `items[2].sku`.
    pub field: String,
    /// Rule code as reported by the validator (`required`, `length`, `email`, ...).
    pub tag: String,
    /// Offending value, when the rule reports it.
    pub value: Value,
}

impl FieldViolation {
    pub fn describe(&self) -> String {
        let value = match &self.value {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        };
        format!("[{}]: '{}' | Needs to implement '{}'", self.field, value, self.tag)
    }
}

/// Validate `data`, dropping fields named in `exclude` (case-insensitive). Sorted by field path.
pub fn violations<T: Validate>(data: &T, exclude: &[&str]) -> Vec<FieldViolation> {
    let errors = match data.validate() {
        Ok(()) => return Vec::new(),
        Err(e) => e,
    };
    let excluded: HashSet<String> = exclude.iter().map(|f| f.to_lowercase()).collect();
    let mut out = Vec::new();
    collect("", &errors, &excluded, &mut out);
    out.sort_by(|a, b| a.field.cmp(&b.field));
    out
}

fn collect(prefix: &str, errors: &ValidationErrors, excluded: &HashSet<String>, out: &mut Vec<FieldViolation>) {
    for (field, kind) in errors.errors() {
        let field = field.to_string();
        let path = if prefix.is_empty() {
            field.clone()
        } else {
            format!("{}.{}", prefix, field)
        };
        if excluded.contains(&path.to_lowercase()) || excluded.contains(&field.to_lowercase()) {
            continue;
        }
        match kind {
            ValidationErrorsKind::Field(errs) => {
                if let Some(first) = errs.first() {
                    out.push(FieldViolation {
                        field: path,
                        tag: first.code.to_string(),
                        value: first.params.get("value").cloned().unwrap_or(Value::Null),
                    });
                }
            }
            ValidationErrorsKind::Struct(inner) => collect(&path, inner, excluded, out),
            ValidationErrorsKind::List(items) => {
                for (idx, inner) in items {
                    collect(&format!("{}[{}]", path, idx), inner, excluded, out);
                }
            }
        }
    }
}

/// `Ok` when nothing fails; otherwise a 400 listing every violation joined with ` and `.
pub fn validate_excluding<T: Validate>(data: &T, exclude: &[&str]) -> Result<(), ApiError> {
    let found = violations(data, exclude);
    if found.is_empty() {
        return Ok(());
    }
    let message = found
        .iter()
        .map(FieldViolation::describe)
        .collect::<Vec<_>>()
        .join(" and ");
    Err(ApiError::new(StatusCode::BAD_REQUEST, codes::INVALID_REQUEST, message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Validate)]
    struct NewUser {
        #[validate(required)]
        name: Option<String>,
        #[validate(email)]
        email: String,
        #[validate(length(min = 8))]
        password: String,
    }

    fn valid() -> NewUser {
        NewUser {
            name: Some("Ada".into()),
            email: "ada@example.com".into(),
            password: "correct horse".into(),
        }
    }

    #[test]
    fn valid_struct_has_no_violations() {
        assert!(violations(&valid(), &[]).is_empty());
        assert!(validate_excluding(&valid(), &[]).is_ok());
    }

    #[test]
    fn excluded_required_field_is_ignored() {
        let user = NewUser { name: None, ..valid() };
        assert_eq!(violations(&user, &[]).len(), 1);
        assert!(violations(&user, &["name"]).is_empty());
        assert!(violations(&user, &["NAME"]).is_empty());
    }

    #[test]
    fn reports_field_tag_and_value() {
        let user = NewUser {
            email: "nope".into(),
            ..valid()
        };
        let found = violations(&user, &[]);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].field, "email");
        assert_eq!(found[0].tag, "email");
        assert_eq!(found[0].value, json!("nope"));
        assert_eq!(found[0].describe(), "[email]: 'nope' | Needs to implement 'email'");
    }

    #[test]
    fn aggregates_all_violations_into_one_error() {
        let user = NewUser {
            name: None,
            email: "nope".into(),
            password: "short".into(),
        };
        let err = validate_excluding(&user, &[]).unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.code, codes::INVALID_REQUEST);
        let parts: Vec<&str> = err.message.split(" and ").collect();
        assert_eq!(parts.len(), 3);
        assert!(parts[0].starts_with("[email]"));
        assert!(parts[1].starts_with("[name]"));
        assert!(parts[2].starts_with("[password]: 'short'"));
    }
}
