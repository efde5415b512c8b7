use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use engine_config::{ConfigValue, Transform};
use model::core::value::Value;

/// Closed dispatch over the transform catalog (§4.4). `Transform` itself
/// can't hold an unrecognized tag — deserialization already rejected it at
/// config load — so this match is exhaustive by construction.
///
/// `target_arity` is the number of target `FieldValue`s the caller expects
/// back (1 for most transforms, `n` for `split(n)`): the null short-circuit
/// below must still produce one `Value::Null` per target column, or the
/// caller's `zip` over target names silently drops the trailing ones.
/// `concat` is excluded from the short-circuit: it joins non-null parts, so
/// an all-null tuple falls through to its own arm and joins to `""`, not `Null`.
pub(super) fn apply_transform(
    transform: &Transform,
    inputs: &[Value],
    target_arity: usize,
) -> Result<Vec<Value>, String> {
    if !matches!(transform, Transform::Default { .. } | Transform::Concat { .. })
        && inputs.iter().all(|v| matches!(v, Value::Null))
    {
        return Ok(vec![Value::Null; target_arity.max(1)]);
    }
    let first = inputs.first().cloned().unwrap_or(Value::Null);

    match transform {
        Transform::ValueMap { map, default } => {
            let key = first
                .as_string()
                .ok_or_else(|| "value is not representable as a lookup key".to_string())?;
            match map.get(&key) {
                Some(v) => Ok(vec![config_value_to_value(v)]),
                None => default
                    .as_ref()
                    .map(|d| vec![config_value_to_value(d)])
                    .ok_or_else(|| format!("no valueMap entry for '{key}'")),
            }
        }
        Transform::ToString => Ok(vec![Value::String(
            first.as_string().ok_or("cannot convert to string")?,
        )]),
        Transform::ToInt => Ok(vec![Value::Int(first.as_i64().ok_or("cannot convert to int")?)]),
        Transform::ToFloat => Ok(vec![Value::Float(first.as_f64().ok_or("cannot convert to float")?)]),
        Transform::ToDecimal { scale } => {
            let decimal = first.as_big_decimal().ok_or("cannot convert to decimal")?;
            Ok(vec![Value::Decimal(decimal.with_scale(*scale as i64))])
        }
        Transform::ToDatetime { format } => {
            let s = first.as_string().ok_or("cannot parse non-string value as datetime")?;
            let naive = parse_datetime(&s, format.as_deref())?;
            Ok(vec![Value::Timestamp(naive.and_utc())])
        }
        Transform::ToDate => {
            let s = first.as_string().ok_or("cannot parse non-string value as date")?;
            let date = NaiveDate::parse_from_str(&s, "%Y-%m-%d").map_err(|e| e.to_string())?;
            Ok(vec![Value::Date(date)])
        }
        Transform::Trim => Ok(vec![Value::String(
            first.as_string().ok_or("cannot trim a non-string value")?.trim().to_string(),
        )]),
        Transform::Lowercase => Ok(vec![Value::String(
            first
                .as_string()
                .ok_or("cannot lowercase a non-string value")?
                .to_lowercase(),
        )]),
        Transform::Uppercase => Ok(vec![Value::String(
            first
                .as_string()
                .ok_or("cannot uppercase a non-string value")?
                .to_uppercase(),
        )]),
        Transform::Concat { separator } => {
            let joined = inputs
                .iter()
                .map(|v| v.as_string().unwrap_or_default())
                .collect::<Vec<_>>()
                .join(separator);
            Ok(vec![Value::String(joined)])
        }
        Transform::Split { n } => {
            let s = first.as_string().ok_or("cannot split a non-string value")?;
            let mut parts: Vec<String> = s
                .split_whitespace()
                .take((*n).max(1))
                .map(str::to_string)
                .collect();
            parts.resize(*n, String::new());
            Ok(parts.into_iter().map(Value::String).collect())
        }
        Transform::Default { value } => {
            if matches!(first, Value::Null) {
                Ok(vec![config_value_to_value(value)])
            } else {
                Ok(vec![first])
            }
        }
        Transform::BoolToTimestamp => {
            let flag = first.as_bool().ok_or("cannot convert to bool")?;
            Ok(vec![if flag { Value::Timestamp(Utc::now()) } else { Value::Null }])
        }
    }
}

fn parse_datetime(s: &str, format: Option<&str>) -> Result<NaiveDateTime, String> {
    if let Some(fmt) = format {
        return NaiveDateTime::parse_from_str(s, fmt).map_err(|e| e.to_string());
    }
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.naive_utc())
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S"))
        .map_err(|e| e.to_string())
}

fn config_value_to_value(cv: &ConfigValue) -> Value {
    match cv {
        ConfigValue::Bool(b) => Value::Boolean(*b),
        ConfigValue::Int(i) => Value::Int(*i),
        ConfigValue::Float(f) => Value::Float(*f),
        ConfigValue::String(s) => Value::String(s.clone()),
        ConfigValue::Null => Value::Null,
    }
}
