use crate::core::value::{FieldValue, Value};
use serde::{Deserialize, Serialize};

/// A single row flowing through the pipeline, carried as a column→value map
/// of mixed runtime types. `entity` names the table the row belongs to
/// (source table on extraction, target table after transform).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RowData {
    pub entity: String,
    pub field_values: Vec<FieldValue>,
}

impl RowData {
    pub fn new(entity: &str, field_values: Vec<FieldValue>) -> Self {
        RowData {
            entity: entity.to_string(),
            field_values,
        }
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.field_values
            .iter()
            .find(|f| f.name.eq_ignore_ascii_case(field))
    }

    pub fn get_value(&self, field: &str) -> Value {
        self.get(field)
            .and_then(|f| f.value.clone())
            .unwrap_or(Value::Null)
    }

    pub fn set_value(&mut self, field: &str, value: Value, data_type: crate::core::data_type::DataType) {
        if let Some(existing) = self
            .field_values
            .iter_mut()
            .find(|f| f.name.eq_ignore_ascii_case(field))
        {
            existing.value = Some(value);
            existing.data_type = data_type;
        } else {
            self.field_values.push(FieldValue {
                name: field.to_string(),
                value: Some(value),
                data_type,
            });
        }
    }

    pub fn entity_name(&self) -> String {
        self.entity.clone()
    }

    pub fn size_bytes(&self) -> usize {
        let mut size = self.entity.len();
        for field_value in &self.field_values {
            size += field_value.name.len();
            size += match &field_value.value {
                Some(v) => v.size_bytes(),
                None => 0,
            };
        }
        size
    }
}
