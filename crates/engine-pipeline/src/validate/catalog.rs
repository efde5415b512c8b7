use chrono::NaiveDate;
use engine_config::ValidationRule;
use model::core::value::Value;
use regex::Regex;

/// Closed dispatch over the validation rule catalog (§4.5), shared by
/// field-level constraints and table-level row validators.
pub(super) fn check_rule(rule: &ValidationRule, value: &Value) -> Result<(), String> {
    match rule {
        ValidationRule::NotNull => {
            if matches!(value, Value::Null) {
                Err("value is null".to_string())
            } else {
                Ok(())
            }
        }
        ValidationRule::NotEmpty => match value.as_string() {
            Some(s) if !s.is_empty() => Ok(()),
            Some(_) => Err("value is empty".to_string()),
            None if matches!(value, Value::Null) => Err("value is null".to_string()),
            None => Ok(()),
        },
        ValidationRule::MinLength { n } => {
            let s = value.as_string().ok_or("value has no string representation")?;
            if s.chars().count() >= *n {
                Ok(())
            } else {
                Err(format!("length {} is below minimum {n}", s.chars().count()))
            }
        }
        ValidationRule::MaxLength { n } => {
            let s = value.as_string().ok_or("value has no string representation")?;
            if s.chars().count() <= *n {
                Ok(())
            } else {
                Err(format!("length {} exceeds maximum {n}", s.chars().count()))
            }
        }
        ValidationRule::MinValue { n } => {
            let x = value.as_f64().ok_or("value is not numeric")?;
            if x >= *n {
                Ok(())
            } else {
                Err(format!("{x} is below minimum {n}"))
            }
        }
        ValidationRule::MaxValue { n } => {
            let x = value.as_f64().ok_or("value is not numeric")?;
            if x <= *n {
                Ok(())
            } else {
                Err(format!("{x} exceeds maximum {n}"))
            }
        }
        ValidationRule::Positive => {
            let x = value.as_f64().ok_or("value is not numeric")?;
            if x > 0.0 {
                Ok(())
            } else {
                Err(format!("{x} is not positive"))
            }
        }
        ValidationRule::NonNegative => {
            let x = value.as_f64().ok_or("value is not numeric")?;
            if x >= 0.0 {
                Ok(())
            } else {
                Err(format!("{x} is negative"))
            }
        }
        ValidationRule::Regex { pattern } => {
            let s = value.as_string().ok_or("value has no string representation")?;
            let re = Regex::new(pattern).map_err(|e| format!("invalid pattern '{pattern}': {e}"))?;
            if re.is_match(&s) {
                Ok(())
            } else {
                Err(format!("'{s}' does not match /{pattern}/"))
            }
        }
        ValidationRule::EmailFormat => {
            let s = value.as_string().ok_or("value has no string representation")?;
            if email_re().is_match(&s) {
                Ok(())
            } else {
                Err(format!("'{s}' is not a valid email address"))
            }
        }
        ValidationRule::PhoneFormat => {
            let s = value.as_string().ok_or("value has no string representation")?;
            if phone_re().is_match(&s) {
                Ok(())
            } else {
                Err(format!("'{s}' is not a valid phone number"))
            }
        }
        ValidationRule::InList { values } => {
            let s = value.as_string().unwrap_or_default();
            let matched = values.iter().any(|v| v.to_string() == s);
            if matched {
                Ok(())
            } else {
                Err(format!("'{s}' is not one of the allowed values"))
            }
        }
        ValidationRule::DateRange { min, max } => {
            let d = value_as_date(value).ok_or("value is not a date")?;
            if let Some(min) = min {
                let min = NaiveDate::parse_from_str(min, "%Y-%m-%d").map_err(|e| e.to_string())?;
                if d < min {
                    return Err(format!("{d} is before minimum {min}"));
                }
            }
            if let Some(max) = max {
                let max = NaiveDate::parse_from_str(max, "%Y-%m-%d").map_err(|e| e.to_string())?;
                if d > max {
                    return Err(format!("{d} is after maximum {max}"));
                }
            }
            Ok(())
        }
    }
}

fn value_as_date(value: &Value) -> Option<NaiveDate> {
    match value {
        Value::Date(d) => Some(*d),
        Value::Timestamp(ts) => Some(ts.date_naive()),
        Value::TimestampNaive(naive) => Some(naive.date()),
        Value::String(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d").ok(),
        _ => None,
    }
}

fn email_re() -> &'static Regex {
    static RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("static email pattern is valid"))
}

fn phone_re() -> &'static Regex {
    static RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\+?[0-9()\-\s]{7,20}$").expect("static phone pattern is valid"))
}
