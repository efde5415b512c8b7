//! Row decoding shared by both connector directions: a column-name/type pair
//! decides which typed getter to call against the driver's row type, and the
//! result is folded into the engine's dynamically-typed `RowData` (§9 "carry
//! `(value, declaredType)` pairs through the pipeline").

use bigdecimal::BigDecimal;
use model::core::{
    data_type::DataType,
    value::{FieldValue, Value},
};
use model::records::row::RowData;
use mysql_async::Row as MySqlRow;
use mysql_async::consts::ColumnType;
use mysql_async::prelude::FromValue;
use std::str::FromStr;
use tokio_postgres::Row as PgRow;

/// Maps mysql_async's wire-protocol `ColumnType` to the type-name strings
/// `DataType::from_mysql_type` understands (the names MySQL's own
/// `information_schema.columns.data_type` would report).
fn mysql_type_name(column: &mysql_async::Column) -> &'static str {
    use mysql_async::consts::ColumnFlags;
    let unsigned = column.flags().contains(ColumnFlags::UNSIGNED_FLAG);
    match column.column_type() {
        ColumnType::MYSQL_TYPE_TINY => {
            if unsigned {
                "TINYINT UNSIGNED"
            } else {
                "TINYINT"
            }
        }
        ColumnType::MYSQL_TYPE_SHORT => {
            if unsigned {
                "SMALLINT UNSIGNED"
            } else {
                "SMALLINT"
            }
        }
        ColumnType::MYSQL_TYPE_INT24 => "MEDIUMINT",
        ColumnType::MYSQL_TYPE_LONG => {
            if unsigned {
                "INT UNSIGNED"
            } else {
                "INT"
            }
        }
        ColumnType::MYSQL_TYPE_LONGLONG => {
            if unsigned {
                "BIGINT UNSIGNED"
            } else {
                "BIGINT"
            }
        }
        ColumnType::MYSQL_TYPE_FLOAT => "FLOAT",
        ColumnType::MYSQL_TYPE_DOUBLE => "DOUBLE",
        ColumnType::MYSQL_TYPE_DECIMAL | ColumnType::MYSQL_TYPE_NEWDECIMAL => "DECIMAL",
        ColumnType::MYSQL_TYPE_NULL => "NULL",
        ColumnType::MYSQL_TYPE_TIMESTAMP | ColumnType::MYSQL_TYPE_TIMESTAMP2 => "TIMESTAMP",
        ColumnType::MYSQL_TYPE_DATETIME | ColumnType::MYSQL_TYPE_DATETIME2 => "DATETIME",
        ColumnType::MYSQL_TYPE_DATE | ColumnType::MYSQL_TYPE_NEWDATE => "DATE",
        ColumnType::MYSQL_TYPE_TIME | ColumnType::MYSQL_TYPE_TIME2 => "TIME",
        ColumnType::MYSQL_TYPE_YEAR => "YEAR",
        ColumnType::MYSQL_TYPE_BIT => "BIT",
        ColumnType::MYSQL_TYPE_JSON => "JSON",
        ColumnType::MYSQL_TYPE_ENUM => "ENUM",
        ColumnType::MYSQL_TYPE_SET => "SET",
        ColumnType::MYSQL_TYPE_TINY_BLOB => "TINYBLOB",
        ColumnType::MYSQL_TYPE_MEDIUM_BLOB => "MEDIUMBLOB",
        ColumnType::MYSQL_TYPE_LONG_BLOB => "LONGBLOB",
        ColumnType::MYSQL_TYPE_BLOB => "BLOB",
        ColumnType::MYSQL_TYPE_GEOMETRY => "GEOMETRY",
        ColumnType::MYSQL_TYPE_VARCHAR | ColumnType::MYSQL_TYPE_VAR_STRING => "VARCHAR",
        _ => "TEXT",
    }
}

fn mysql_get<T>(row: &MySqlRow, idx: usize) -> Option<T>
where
    T: FromValue,
{
    row.get_opt::<T, _>(idx).and_then(|res| res.ok())
}

fn mysql_value(row: &MySqlRow, idx: usize, data_type: &DataType) -> Option<Value> {
    match data_type {
        DataType::Short | DataType::ShortUnsigned => mysql_get::<i64>(row, idx).map(Value::Int),
        DataType::Int | DataType::Int4 => mysql_get::<i64>(row, idx).map(Value::Int),
        DataType::IntUnsigned | DataType::Long | DataType::LongLong | DataType::Year => {
            mysql_get::<u64>(row, idx).map(Value::Uint)
        }
        DataType::Float | DataType::Double => mysql_get::<f64>(row, idx).map(Value::Float),
        DataType::Decimal | DataType::NewDecimal => mysql_get::<String>(row, idx)
            .and_then(|s| BigDecimal::from_str(&s).ok())
            .map(Value::Decimal),
        DataType::Boolean => mysql_get::<bool>(row, idx)
            .or_else(|| mysql_get::<i64>(row, idx).map(|v| v != 0))
            .map(Value::Boolean),
        DataType::Json => mysql_get::<serde_json::Value>(row, idx).map(Value::Json),
        DataType::Date => mysql_get::<chrono::NaiveDate>(row, idx).map(Value::Date),
        DataType::Timestamp | DataType::TimestampTz => {
            mysql_get::<chrono::NaiveDateTime>(row, idx)
                .map(|naive| Value::Timestamp(naive.and_utc()))
        }
        DataType::Enum => mysql_get::<String>(row, idx)
            .map(|v| Value::Enum(row.columns_ref()[idx].name_str().into_owned(), v)),
        DataType::TinyBlob
        | DataType::MediumBlob
        | DataType::LongBlob
        | DataType::Blob
        | DataType::Binary
        | DataType::VarBinary
        | DataType::Bytea
        | DataType::Bit
        | DataType::Geometry => mysql_get::<Vec<u8>>(row, idx).map(Value::Bytes),
        _ => mysql_get::<String>(row, idx).map(Value::String),
    }
}

fn mysql_field_value(row: &MySqlRow, idx: usize) -> FieldValue {
    let column = &row.columns()[idx];
    let name = column.name_str().into_owned();
    let type_name = mysql_type_name(column);
    let data_type = DataType::from_mysql_type(type_name).unwrap_or(DataType::Custom(type_name.into()));
    let value = mysql_value(row, idx, &data_type);
    FieldValue {
        name,
        value,
        data_type,
    }
}

pub fn mysql_row_to_row_data(row: &MySqlRow, table: &str) -> RowData {
    let field_values = (0..row.columns().len())
        .map(|idx| mysql_field_value(row, idx))
        .collect();
    RowData::new(table, field_values)
}

/// Decodes a single named column out of a raw mysql row — used by the
/// extractor to read the cursor's timestamp/primary-key columns without
/// materializing the whole row.
pub fn mysql_column_value(row: &MySqlRow, name: &str) -> Option<Value> {
    let idx = row
        .columns()
        .iter()
        .position(|c| c.name_str() == name)?;
    mysql_field_value(row, idx).value
}

fn pg_value(row: &PgRow, idx: usize, data_type: &DataType) -> Option<Value> {
    match data_type {
        DataType::Short | DataType::ShortUnsigned => {
            row.try_get::<_, Option<i16>>(idx).ok().flatten().map(|v| Value::Int(v as i64))
        }
        DataType::Int | DataType::Int4 | DataType::IntUnsigned => {
            row.try_get::<_, Option<i32>>(idx).ok().flatten().map(|v| Value::Int(v as i64))
        }
        DataType::Long | DataType::LongLong => {
            row.try_get::<_, Option<i64>>(idx).ok().flatten().map(Value::Int)
        }
        DataType::Float => row.try_get::<_, Option<f32>>(idx).ok().flatten().map(|v| Value::Float(v as f64)),
        DataType::Double => row.try_get::<_, Option<f64>>(idx).ok().flatten().map(Value::Float),
        DataType::Decimal | DataType::NewDecimal => row
            .try_get::<_, Option<rust_decimal::Decimal>>(idx)
            .ok()
            .flatten()
            .and_then(|d| BigDecimal::from_str(&d.to_string()).ok())
            .map(Value::Decimal),
        DataType::Boolean => row.try_get::<_, Option<bool>>(idx).ok().flatten().map(Value::Boolean),
        DataType::Json => row
            .try_get::<_, Option<serde_json::Value>>(idx)
            .ok()
            .flatten()
            .map(Value::Json),
        DataType::Date => row.try_get::<_, Option<chrono::NaiveDate>>(idx).ok().flatten().map(Value::Date),
        DataType::Timestamp => row
            .try_get::<_, Option<chrono::NaiveDateTime>>(idx)
            .ok()
            .flatten()
            .map(|naive| Value::Timestamp(naive.and_utc())),
        DataType::TimestampTz => row
            .try_get::<_, Option<chrono::DateTime<chrono::Utc>>>(idx)
            .ok()
            .flatten()
            .map(Value::Timestamp),
        DataType::Bytea
        | DataType::Blob
        | DataType::TinyBlob
        | DataType::MediumBlob
        | DataType::LongBlob
        | DataType::Binary
        | DataType::VarBinary => {
            row.try_get::<_, Option<Vec<u8>>>(idx).ok().flatten().map(Value::Bytes)
        }
        _ => row.try_get::<_, Option<String>>(idx).ok().flatten().map(Value::String),
    }
}

/// Decodes a single positional column out of a raw postgres row by its
/// declared type — used by the loader to read back primary keys whose
/// target type isn't known until the table mapping is consulted.
pub fn pg_column_value(row: &PgRow, idx: usize, data_type: &DataType) -> Option<Value> {
    pg_value(row, idx, data_type)
}

pub fn pg_row_to_row_data(row: &PgRow, table: &str) -> RowData {
    let field_values = row
        .columns()
        .iter()
        .enumerate()
        .map(|(idx, column)| {
            let name = column.name().to_string();
            let type_name = column.type_().name().to_uppercase();
            let data_type =
                DataType::from_postgres_type(&type_name).unwrap_or(DataType::Custom(type_name));
            let value = pg_value(row, idx, &data_type);
            FieldValue {
                name,
                value,
                data_type,
            }
        })
        .collect();
    RowData::new(table, field_values)
}

