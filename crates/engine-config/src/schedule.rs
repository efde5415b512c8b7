use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// One entry of the schedule document (§6): `{id, cronExpression, tables,
/// fullSync, enabled, maxInstances, coalesce}`. `maxInstances` is always 1 in
/// this engine (§4.8's single-writer lock enforces it regardless of the
/// declared value) — kept as a field for forward-compatible documents, not
/// consulted by the scheduler.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    pub id: String,
    pub cron_expression: String,
    pub tables: Vec<String>,
    #[serde(default)]
    pub full_sync: bool,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_max_instances")]
    pub max_instances: u32,
    #[serde(default = "default_true")]
    pub coalesce: bool,
}

fn default_true() -> bool {
    true
}

fn default_max_instances() -> u32 {
    1
}

/// The full schedule document: a named list of schedules, each firing a
/// subset of the configured tables.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ScheduleDocument {
    #[serde(default)]
    pub schedules: Vec<Schedule>,
}

impl ScheduleDocument {
    pub fn validate(&self, known_tables: &[String]) -> Result<(), crate::error::ConfigError> {
        let mut seen = std::collections::HashSet::new();
        for schedule in &self.schedules {
            if !seen.insert(schedule.id.clone()) {
                return Err(crate::error::ConfigError::DuplicateSchedule(
                    schedule.id.clone(),
                ));
            }
            for table in &schedule.tables {
                if !known_tables.iter().any(|t| t == table) {
                    return Err(crate::error::ConfigError::UnknownScheduleTable {
                        id: schedule.id.clone(),
                        table: table.clone(),
                    });
                }
            }
            if cron::Schedule::from_str(&schedule.cron_expression).is_err() {
                return Err(crate::error::ConfigError::InvalidCron {
                    id: schedule.id.clone(),
                    expr: schedule.cron_expression.clone(),
                    reason: "not a valid cron expression".into(),
                });
            }
        }
        Ok(())
    }
}
