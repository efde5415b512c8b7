use chrono::{Datelike, Timelike};
use model::core::value::Value;
use mysql_async::Value as MySqlValue;

/// Binds a `model::Value` to mysql_async's wire value, the way the teacher's
/// connector layer does it — one arm per `Value` variant, null falling
/// through to `MySqlValue::NULL`.
pub fn to_mysql_value(value: &Value) -> MySqlValue {
    match value {
        Value::SmallInt(v) => MySqlValue::Int(*v as i64),
        Value::Int32(v) => MySqlValue::Int(*v as i64),
        Value::Int(v) => MySqlValue::Int(*v),
        Value::Uint(v) => MySqlValue::UInt(*v),
        Value::Usize(v) => MySqlValue::UInt(*v as u64),
        Value::Float(v) => MySqlValue::Double(*v),
        Value::Decimal(v) => MySqlValue::Bytes(v.to_string().into_bytes()),
        Value::String(v) => MySqlValue::Bytes(v.clone().into_bytes()),
        Value::Boolean(v) => MySqlValue::Int(if *v { 1 } else { 0 }),
        Value::Json(v) => MySqlValue::Bytes(v.to_string().into_bytes()),
        Value::Uuid(v) => MySqlValue::Bytes(v.to_string().into_bytes()),
        Value::Bytes(v) => MySqlValue::Bytes(v.clone()),
        Value::Date(d) => MySqlValue::Date(d.year() as u16, d.month() as u8, d.day() as u8, 0, 0, 0, 0),
        Value::Timestamp(ts) => {
            let naive = ts.naive_utc();
            MySqlValue::Date(
                naive.year() as u16,
                naive.month() as u8,
                naive.day() as u8,
                naive.hour() as u8,
                naive.minute() as u8,
                naive.second() as u8,
                naive.and_utc().timestamp_subsec_micros(),
            )
        }
        Value::TimestampNaive(naive) => MySqlValue::Date(
            naive.year() as u16,
            naive.month() as u8,
            naive.day() as u8,
            naive.hour() as u8,
            naive.minute() as u8,
            naive.second() as u8,
            0,
        ),
        Value::Enum(_, v) => MySqlValue::Bytes(v.clone().into_bytes()),
        Value::StringArray(v) => MySqlValue::Bytes(format!("{v:?}").into_bytes()),
        Value::Null => MySqlValue::NULL,
    }
}
