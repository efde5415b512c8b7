mod catalog;

use crate::error::RowError;
use catalog::apply_transform;
use engine_config::TableMapping;
use model::core::data_type::DataType;
use model::core::value::Value;
use model::records::row::RowData;

/// The Transformer (§4.4): applies each field mapping's declared transform,
/// or an implicit type coercion when none is declared, into the target's
/// column namespace. A row that fails any one field's transform is pulled
/// out of the batch rather than aborting it.
pub struct Transformer;

impl Transformer {
    pub fn transform_batch(
        mapping: &TableMapping,
        rows: Vec<RowData>,
    ) -> (Vec<RowData>, Vec<(RowData, RowError)>) {
        let mut ok = Vec::with_capacity(rows.len());
        let mut failed = Vec::new();
        for row in rows {
            match Self::transform_row(mapping, &row) {
                Ok(out) => ok.push(out),
                Err(e) => failed.push((row, e)),
            }
        }
        (ok, failed)
    }

    pub fn transform_row(mapping: &TableMapping, row: &RowData) -> Result<RowData, RowError> {
        let mut out = RowData::new(&mapping.target_table, Vec::with_capacity(mapping.field_mappings.len()));
        for field in &mapping.field_mappings {
            let inputs: Vec<Value> = field
                .source
                .names()
                .iter()
                .map(|name| row.get_value(name))
                .collect();

            let target_arity = field.target.names().len();
            let outputs = match &field.transform {
                Some(transform) => {
                    apply_transform(transform, &inputs, target_arity).map_err(|reason| RowError::Transform {
                        field: field.source.names().join(","),
                        transform: transform.name().to_string(),
                        reason,
                    })?
                }
                None => {
                    let value = inputs.into_iter().next().unwrap_or(Value::Null);
                    vec![coerce(value, &field.data_type).map_err(|reason| RowError::Transform {
                        field: field.target.names().join(","),
                        transform: "implicit".to_string(),
                        reason,
                    })?]
                }
            };

            for (name, value) in field.target.names().into_iter().zip(outputs.into_iter()) {
                out.set_value(name, value, field.data_type.clone());
            }
        }
        Ok(out)
    }
}

/// Implicit type coercion applied when a field mapping declares no
/// transform: the raw source value is simply cast into the declared target
/// type. `Null` always propagates untouched.
fn coerce(value: Value, data_type: &DataType) -> Result<Value, String> {
    if matches!(value, Value::Null) {
        return Ok(Value::Null);
    }
    use DataType::*;
    match data_type {
        Short | ShortUnsigned | Int | Int4 | IntUnsigned | Long | LongLong | Year => value
            .as_i64()
            .map(Value::Int)
            .ok_or_else(|| format!("cannot coerce '{value}' to an integer")),
        Float | Double => value
            .as_f64()
            .map(Value::Float)
            .ok_or_else(|| format!("cannot coerce '{value}' to a float")),
        Decimal | NewDecimal => value
            .as_big_decimal()
            .map(Value::Decimal)
            .ok_or_else(|| format!("cannot coerce '{value}' to a decimal")),
        Boolean => value
            .as_bool()
            .map(Value::Boolean)
            .ok_or_else(|| format!("cannot coerce '{value}' to a boolean")),
        Date => match &value {
            Value::Date(_) => Ok(value),
            Value::Timestamp(ts) => Ok(Value::Date(ts.date_naive())),
            Value::String(s) => chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .map(Value::Date)
                .map_err(|e| e.to_string()),
            _ => Err(format!("cannot coerce '{value}' to a date")),
        },
        Timestamp | TimestampTz => match &value {
            Value::Timestamp(_) => Ok(value),
            Value::TimestampNaive(naive) => Ok(Value::Timestamp(naive.and_utc())),
            Value::Date(d) => d
                .and_hms_opt(0, 0, 0)
                .map(|naive| Value::Timestamp(naive.and_utc()))
                .ok_or_else(|| format!("cannot coerce '{value}' to a timestamp")),
            Value::String(s) => chrono::DateTime::parse_from_rfc3339(s)
                .map(|dt| Value::Timestamp(dt.with_timezone(&chrono::Utc)))
                .map_err(|e| e.to_string()),
            _ => Err(format!("cannot coerce '{value}' to a timestamp")),
        },
        Json => match &value {
            Value::Json(_) => Ok(value),
            Value::String(s) => serde_json::from_str(s).map(Value::Json).map_err(|e| e.to_string()),
            _ => Ok(Value::Json(serde_json::Value::String(
                value.as_string().unwrap_or_default(),
            ))),
        },
        _ => value
            .as_string()
            .map(Value::String)
            .ok_or_else(|| format!("cannot coerce '{value}' to a string")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine_config::{FieldMapping, FieldRef, Transform};
    use model::core::value::FieldValue;

    fn mapping(field_mappings: Vec<FieldMapping>) -> TableMapping {
        TableMapping {
            source_table: "users".into(),
            target_table: "users".into(),
            primary_key: "id".into(),
            timestamp_column: "updated_at".into(),
            soft_delete_column: None,
            batch_size: 100,
            field_mappings,
            row_validators: vec![],
        }
    }

    fn field(source: &str, target: &str, data_type: DataType, transform: Option<Transform>) -> FieldMapping {
        FieldMapping {
            source: FieldRef::Single(source.into()),
            target: FieldRef::Single(target.into()),
            data_type,
            transform,
            constraints: vec![],
        }
    }

    fn row(name: &str, value: Value, data_type: DataType) -> RowData {
        RowData::new(
            "users",
            vec![FieldValue {
                name: name.into(),
                value: Some(value),
                data_type,
            }],
        )
    }

    #[test]
    fn implicit_coercion_casts_declared_type() {
        let mapping = mapping(vec![field("age", "age", DataType::Int, None)]);
        let row = row("age", Value::String("42".into()), DataType::String);
        let out = Transformer::transform_row(&mapping, &row).unwrap();
        assert_eq!(out.get_value("age"), Value::Int(42));
    }

    #[test]
    fn null_propagates_without_transform_error() {
        let mapping = mapping(vec![field("age", "age", DataType::Int, None)]);
        let row = row("age", Value::Null, DataType::Null);
        let out = Transformer::transform_row(&mapping, &row).unwrap();
        assert_eq!(out.get_value("age"), Value::Null);
    }

    #[test]
    fn trim_transform_normalizes_whitespace() {
        let mapping = mapping(vec![field("name", "name", DataType::String, Some(Transform::Trim))]);
        let row = row("name", Value::String("  bob  ".into()), DataType::String);
        let out = Transformer::transform_row(&mapping, &row).unwrap();
        assert_eq!(out.get_value("name"), Value::String("bob".into()));
    }

    #[test]
    fn unmapped_value_without_default_fails() {
        let mapping = mapping(vec![field(
            "status",
            "status",
            DataType::String,
            Some(Transform::ValueMap {
                map: std::collections::BTreeMap::from([(
                    "A".to_string(),
                    engine_config::ConfigValue::String("active".into()),
                )]),
                default: None,
            }),
        )]);
        let row = row("status", Value::String("Z".into()), DataType::String);
        assert!(Transformer::transform_row(&mapping, &row).is_err());
    }
}
