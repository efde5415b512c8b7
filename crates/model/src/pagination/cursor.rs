use crate::core::value::Value;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The composite cursor used to order and resume extraction: a monotonic
/// timestamp paired with the primary key as a tiebreaker for rows that
/// share a timestamp. `None` means "no checkpoint yet" — a full scan.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Cursor {
    None,
    TsPk { ts: DateTime<Utc>, pk: Value },
}

impl Cursor {
    pub fn ts_pk(ts: DateTime<Utc>, pk: Value) -> Self {
        Cursor::TsPk { ts, pk }
    }

    pub fn ts(&self) -> Option<DateTime<Utc>> {
        match self {
            Cursor::None => None,
            Cursor::TsPk { ts, .. } => Some(*ts),
        }
    }

    pub fn pk(&self) -> Option<&Value> {
        match self {
            Cursor::None => None,
            Cursor::TsPk { pk, .. } => Some(pk),
        }
    }

    /// Lexicographic ordering used to enforce the checkpoint monotonicity
    /// invariant: `(ts, pk)` must be strictly increasing across advances.
    pub fn precedes(&self, other: &Cursor) -> bool {
        match (self, other) {
            (Cursor::None, Cursor::None) => false,
            (Cursor::None, Cursor::TsPk { .. }) => true,
            (Cursor::TsPk { .. }, Cursor::None) => false,
            (Cursor::TsPk { ts: t1, pk: p1 }, Cursor::TsPk { ts: t2, pk: p2 }) => match t1.cmp(t2) {
                std::cmp::Ordering::Less => true,
                std::cmp::Ordering::Greater => false,
                std::cmp::Ordering::Equal => p1.compare(p2) == Some(std::cmp::Ordering::Less),
            },
        }
    }
}

impl Default for Cursor {
    fn default() -> Self {
        Cursor::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(hm: &str) -> DateTime<Utc> {
        format!("2026-01-01T{hm}:00Z").parse().unwrap()
    }

    #[test]
    fn none_precedes_any_cursor() {
        let c = Cursor::ts_pk(ts("10:00"), Value::Int(1));
        assert!(Cursor::None.precedes(&c));
        assert!(!c.precedes(&Cursor::None));
    }

    #[test]
    fn tie_broken_by_primary_key() {
        let a = Cursor::ts_pk(ts("10:01"), Value::Int(3));
        let b = Cursor::ts_pk(ts("10:01"), Value::Int(4));
        assert!(a.precedes(&b));
        assert!(!b.precedes(&a));
    }

    #[test]
    fn later_timestamp_precedes_regardless_of_pk() {
        let a = Cursor::ts_pk(ts("10:00"), Value::Int(99));
        let b = Cursor::ts_pk(ts("10:01"), Value::Int(1));
        assert!(a.precedes(&b));
    }
}
