use crate::error::ConfigError;
use model::core::data_type::DataType;
use serde::{Deserialize, Serialize};

/// A field reference in a mapping entry: either a single source/target
/// column, or a tuple used by composite transforms (`concat`, `split`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum FieldRef {
    Single(String),
    Tuple(Vec<String>),
}

impl FieldRef {
    pub fn arity(&self) -> usize {
        match self {
            FieldRef::Single(_) => 1,
            FieldRef::Tuple(names) => names.len(),
        }
    }

    pub fn names(&self) -> Vec<&str> {
        match self {
            FieldRef::Single(name) => vec![name.as_str()],
            FieldRef::Tuple(names) => names.iter().map(String::as_str).collect(),
        }
    }
}

/// A configuration-time literal — the value half of `default(value)`,
/// `valueMap` dictionary entries, and `inList`/`dateRange` bounds. Kept
/// distinct from the runtime `model::Value` tagged union: config literals
/// are untyped YAML scalars, coerced to a typed `Value` by the transformer
/// only once the target field's declared type is known.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ConfigValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Null,
}

impl std::fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigValue::Bool(b) => write!(f, "{b}"),
            ConfigValue::Int(i) => write!(f, "{i}"),
            ConfigValue::Float(x) => write!(f, "{x}"),
            ConfigValue::String(s) => write!(f, "{s}"),
            ConfigValue::Null => write!(f, "null"),
        }
    }
}

/// The closed transform catalog (§4.4). Dispatch is by tag, never by
/// reflection on a function registry at row time — an unrecognized `name`
/// fails to deserialize, which is precisely the "unknown transforms are a
/// configuration error surfaced at startup" contract.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "name", rename_all = "camelCase")]
pub enum Transform {
    ValueMap {
        map: std::collections::BTreeMap<String, ConfigValue>,
        #[serde(default)]
        default: Option<ConfigValue>,
    },
    ToString,
    ToInt,
    ToFloat,
    ToDecimal {
        scale: u32,
    },
    ToDatetime {
        #[serde(default)]
        format: Option<String>,
    },
    ToDate,
    Trim,
    Lowercase,
    Uppercase,
    Concat {
        separator: String,
    },
    Split {
        n: usize,
    },
    Default {
        value: ConfigValue,
    },
    BoolToTimestamp,
}

impl Transform {
    /// Source/target tuple arity this transform requires, if it imposes one.
    /// `concat` consumes a tuple source into a single target; `split` is the
    /// mirror image.
    pub fn required_source_arity(&self) -> Option<usize> {
        match self {
            Transform::Concat { .. } => None, // any arity >= 1
            Transform::Split { .. } => Some(1),
            _ => None,
        }
    }

    pub fn required_target_arity(&self, source_arity: usize) -> Option<usize> {
        match self {
            Transform::Concat { .. } => Some(1),
            Transform::Split { n } => Some(*n),
            _ if source_arity > 1 => None,
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Transform::ValueMap { .. } => "valueMap",
            Transform::ToString => "toString",
            Transform::ToInt => "toInt",
            Transform::ToFloat => "toFloat",
            Transform::ToDecimal { .. } => "toDecimal",
            Transform::ToDatetime { .. } => "toDatetime",
            Transform::ToDate => "toDate",
            Transform::Trim => "trim",
            Transform::Lowercase => "lowercase",
            Transform::Uppercase => "uppercase",
            Transform::Concat { .. } => "concat",
            Transform::Split { .. } => "split",
            Transform::Default { .. } => "default",
            Transform::BoolToTimestamp => "boolToTimestamp",
        }
    }
}

/// Severity of a validation rule (§4.5): `error` rejects the row, `warning`
/// annotates but lets it through.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Error,
    Warning,
}

/// The closed validation rule catalog (§4.5), shared by field-level
/// `constraints` and table-level `rowValidators`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "rule", rename_all = "camelCase")]
pub enum ValidationRule {
    NotNull,
    NotEmpty,
    MinLength { n: usize },
    MaxLength { n: usize },
    MinValue { n: f64 },
    MaxValue { n: f64 },
    Positive,
    NonNegative,
    Regex { pattern: String },
    EmailFormat,
    PhoneFormat,
    InList { values: Vec<ConfigValue> },
    DateRange {
        #[serde(default)]
        min: Option<String>,
        #[serde(default)]
        max: Option<String>,
    },
}

impl ValidationRule {
    pub fn name(&self) -> &'static str {
        match self {
            ValidationRule::NotNull => "notNull",
            ValidationRule::NotEmpty => "notEmpty",
            ValidationRule::MinLength { .. } => "minLength",
            ValidationRule::MaxLength { .. } => "maxLength",
            ValidationRule::MinValue { .. } => "minValue",
            ValidationRule::MaxValue { .. } => "maxValue",
            ValidationRule::Positive => "positive",
            ValidationRule::NonNegative => "nonNegative",
            ValidationRule::Regex { .. } => "regex",
            ValidationRule::EmailFormat => "emailFormat",
            ValidationRule::PhoneFormat => "phoneFormat",
            ValidationRule::InList { .. } => "inList",
            ValidationRule::DateRange { .. } => "dateRange",
        }
    }
}

/// A table-level row validator: a rule that may reference any
/// already-transformed field, sharing the catalog/composition of
/// field-level `constraints`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowValidator {
    pub field: String,
    #[serde(flatten)]
    pub rule: ValidationRule,
    #[serde(default)]
    pub severity: Severity,
}

/// One entry of `fieldMappings`: how to read source field(s), transform
/// them, and write the result into target field(s).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldMapping {
    pub source: FieldRef,
    pub target: FieldRef,
    #[serde(rename = "type")]
    pub data_type: DataType,
    #[serde(default)]
    pub transform: Option<Transform>,
    #[serde(default)]
    pub constraints: Vec<ValidationRule>,
}

/// Declarative per-table configuration (§3), read-only at runtime. Loaded
/// once from the table mapping document and validated before any store or
/// connection is touched.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableMapping {
    pub source_table: String,
    pub target_table: String,
    pub primary_key: String,
    pub timestamp_column: String,
    #[serde(default)]
    pub soft_delete_column: Option<String>,
    pub batch_size: usize,
    pub field_mappings: Vec<FieldMapping>,
    #[serde(default)]
    pub row_validators: Vec<RowValidator>,
}

impl TableMapping {
    /// Startup validation: batch size, field arity against declared
    /// transforms, and that `primaryKey`/`timestampColumn` appear somewhere
    /// in the mapping. Never consults a live connection.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.source_table.trim().is_empty() {
            return Err(ConfigError::MissingField {
                table: self.target_table.clone(),
                field: "sourceTable".into(),
            });
        }
        if self.primary_key.trim().is_empty() {
            return Err(ConfigError::MissingField {
                table: self.source_table.clone(),
                field: "primaryKey".into(),
            });
        }
        if self.timestamp_column.trim().is_empty() {
            return Err(ConfigError::MissingField {
                table: self.source_table.clone(),
                field: "timestampColumn".into(),
            });
        }
        if self.batch_size == 0 {
            return Err(ConfigError::InvalidBatchSize {
                table: self.source_table.clone(),
                batch_size: 0,
            });
        }

        for fm in &self.field_mappings {
            let Some(transform) = &fm.transform else {
                continue;
            };
            let source_arity = fm.source.arity();
            let target_arity = fm.target.arity();

            match transform {
                Transform::Concat { .. } => {
                    if source_arity < 2 || target_arity != 1 {
                        return Err(ConfigError::ArityMismatch {
                            table: self.source_table.clone(),
                            field: format!("{:?}", fm.source),
                            transform: transform.name().into(),
                            expected: "tuple source, single target".into(),
                            got: format!("source arity {source_arity}, target arity {target_arity}"),
                        });
                    }
                }
                Transform::Split { n } => {
                    if source_arity != 1 || target_arity != *n {
                        return Err(ConfigError::ArityMismatch {
                            table: self.source_table.clone(),
                            field: format!("{:?}", fm.source),
                            transform: transform.name().into(),
                            expected: format!("single source, {n}-tuple target"),
                            got: format!("source arity {source_arity}, target arity {target_arity}"),
                        });
                    }
                }
                _ => {
                    if source_arity != 1 || target_arity != 1 {
                        return Err(ConfigError::ArityMismatch {
                            table: self.source_table.clone(),
                            field: format!("{:?}", fm.source),
                            transform: transform.name().into(),
                            expected: "single source, single target".into(),
                            got: format!("source arity {source_arity}, target arity {target_arity}"),
                        });
                    }
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_concat_with_single_source() {
        let mapping = TableMapping {
            source_table: "users".into(),
            target_table: "users".into(),
            primary_key: "id".into(),
            timestamp_column: "updated_at".into(),
            soft_delete_column: None,
            batch_size: 100,
            field_mappings: vec![FieldMapping {
                source: FieldRef::Single("first".into()),
                target: FieldRef::Single("full_name".into()),
                data_type: DataType::String,
                transform: Some(Transform::Concat {
                    separator: " ".into(),
                }),
                constraints: vec![],
            }],
            row_validators: vec![],
        };

        assert!(matches!(
            mapping.validate(),
            Err(ConfigError::ArityMismatch { .. })
        ));
    }

    #[test]
    fn accepts_well_formed_split() {
        let mapping = TableMapping {
            source_table: "users".into(),
            target_table: "users".into(),
            primary_key: "id".into(),
            timestamp_column: "updated_at".into(),
            soft_delete_column: None,
            batch_size: 100,
            field_mappings: vec![FieldMapping {
                source: FieldRef::Single("full_name".into()),
                target: FieldRef::Tuple(vec!["first".into(), "last".into()]),
                data_type: DataType::String,
                transform: Some(Transform::Split { n: 2 }),
                constraints: vec![],
            }],
            row_validators: vec![],
        };

        assert!(mapping.validate().is_ok());
    }

    #[test]
    fn deserializes_field_mapping_from_yaml() {
        let yaml = r#"
sourceTable: users
targetTable: users
primaryKey: id
timestampColumn: updated_at
batchSize: 500
fieldMappings:
  - source: email
    target: email
    type: VarChar
    constraints:
      - rule: emailFormat
      - rule: notNull
rowValidators:
  - field: age
    rule: minValue
    n: 0
    severity: warning
"#;
        let mapping: TableMapping = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(mapping.field_mappings.len(), 1);
        assert_eq!(mapping.row_validators.len(), 1);
        assert_eq!(mapping.row_validators[0].severity, Severity::Warning);
        mapping.validate().unwrap();
    }
}
