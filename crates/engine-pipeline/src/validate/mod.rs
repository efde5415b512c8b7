mod catalog;

use crate::error::RowError;
use catalog::check_rule;
use engine_config::{Severity, TableMapping};
use model::records::row::RowData;

/// The Validator (§4.5): runs each field's `constraints` and the table's
/// `rowValidators` against an already-transformed row. A rule at `Error`
/// severity rejects the row into the Failure Store; `Warning` is recorded
/// but lets the row continue to the Loader.
pub struct Validator;

/// Warnings collected while validating a row that passed despite them —
/// surfaced to callers that want to log or export non-fatal violations.
pub struct ValidationWarning {
    pub field: String,
    pub rule: String,
    pub reason: String,
}

impl Validator {
    pub fn validate_batch(
        mapping: &TableMapping,
        rows: Vec<RowData>,
    ) -> (Vec<(RowData, Vec<ValidationWarning>)>, Vec<(RowData, RowError)>) {
        let mut ok = Vec::with_capacity(rows.len());
        let mut failed = Vec::new();
        for row in rows {
            match Self::validate_row(mapping, &row) {
                Ok(warnings) => ok.push((row, warnings)),
                Err(e) => failed.push((row, e)),
            }
        }
        (ok, failed)
    }

    pub fn validate_row(mapping: &TableMapping, row: &RowData) -> Result<Vec<ValidationWarning>, RowError> {
        let mut warnings = Vec::new();

        for field in &mapping.field_mappings {
            let value = row.get_value(field.target.names().first().copied().unwrap_or_default());
            for rule in &field.constraints {
                if let Err(reason) = check_rule(rule, &value) {
                    let err = RowError::Validation {
                        field: field.target.names().join(","),
                        rule: rule.name().to_string(),
                        reason,
                    };
                    return Err(err);
                }
            }
        }

        for validator in &mapping.row_validators {
            let value = row.get_value(&validator.field);
            if let Err(reason) = check_rule(&validator.rule, &value) {
                match validator.severity {
                    Severity::Error => {
                        return Err(RowError::Validation {
                            field: validator.field.clone(),
                            rule: validator.rule.name().to_string(),
                            reason,
                        });
                    }
                    Severity::Warning => warnings.push(ValidationWarning {
                        field: validator.field.clone(),
                        rule: validator.rule.name().to_string(),
                        reason,
                    }),
                }
            }
        }

        Ok(warnings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine_config::{FieldMapping, FieldRef, RowValidator, ValidationRule};
    use model::core::data_type::DataType;
    use model::core::value::{FieldValue, Value};

    fn row(name: &str, value: Value) -> RowData {
        RowData::new(
            "users",
            vec![FieldValue {
                name: name.into(),
                value: Some(value),
                data_type: DataType::String,
            }],
        )
    }

    fn mapping(field_mappings: Vec<FieldMapping>, row_validators: Vec<RowValidator>) -> TableMapping {
        TableMapping {
            source_table: "users".into(),
            target_table: "users".into(),
            primary_key: "id".into(),
            timestamp_column: "updated_at".into(),
            soft_delete_column: None,
            batch_size: 100,
            field_mappings,
            row_validators,
        }
    }

    #[test]
    fn not_null_rejects_null_value() {
        let field = FieldMapping {
            source: FieldRef::Single("email".into()),
            target: FieldRef::Single("email".into()),
            data_type: DataType::String,
            transform: None,
            constraints: vec![ValidationRule::NotNull],
        };
        let mapping = mapping(vec![field], vec![]);
        let row = row("email", Value::Null);
        assert!(Validator::validate_row(&mapping, &row).is_err());
    }

    #[test]
    fn warning_severity_lets_row_through() {
        let mapping = mapping(
            vec![],
            vec![RowValidator {
                field: "email".into(),
                rule: ValidationRule::EmailFormat,
                severity: Severity::Warning,
            }],
        );
        let row = row("email", Value::String("not-an-email".into()));
        let warnings = Validator::validate_row(&mapping, &row).unwrap();
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn error_severity_rejects_row() {
        let mapping = mapping(
            vec![],
            vec![RowValidator {
                field: "email".into(),
                rule: ValidationRule::EmailFormat,
                severity: Severity::Error,
            }],
        );
        let row = row("email", Value::String("not-an-email".into()));
        assert!(Validator::validate_row(&mapping, &row).is_err());
    }
}
