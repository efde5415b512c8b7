use crate::error::ConfigError;
use crate::mapping::TableMapping;
use crate::schedule::ScheduleDocument;
use crate::settings::RuntimeSettings;
use std::collections::HashSet;
use std::path::Path;

/// Loads and validates the table mapping document. Every `TableMapping` is
/// checked individually (`TableMapping::validate`) and the set is checked for
/// duplicate source tables. Returns before any connection is opened.
pub fn load_table_mappings(path: impl AsRef<Path>) -> Result<Vec<TableMapping>, ConfigError> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;

    let mappings: Vec<TableMapping> =
        serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;

    let mut seen = HashSet::new();
    for mapping in &mappings {
        mapping.validate()?;
        if !seen.insert(mapping.source_table.clone()) {
            return Err(ConfigError::DuplicateTable(mapping.source_table.clone()));
        }
    }

    Ok(mappings)
}

/// Loads and validates the schedule document against the already-loaded set
/// of table mappings (a schedule may only reference configured tables).
pub fn load_schedule(
    path: impl AsRef<Path>,
    mappings: &[TableMapping],
) -> Result<ScheduleDocument, ConfigError> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;

    let doc: ScheduleDocument =
        serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;

    let known: Vec<String> = mappings.iter().map(|m| m.source_table.clone()).collect();
    doc.validate(&known)?;
    Ok(doc)
}

/// Loads runtime settings, falling back to defaults for any field the
/// document omits (and to an all-default `RuntimeSettings` if the file is
/// entirely absent — this is the one config surface optional at startup).
pub fn load_runtime_settings(path: impl AsRef<Path>) -> Result<RuntimeSettings, ConfigError> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(RuntimeSettings::default());
    }

    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;

    serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_and_validates_table_mappings() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
- sourceTable: users
  targetTable: users
  primaryKey: id
  timestampColumn: updated_at
  batchSize: 200
  fieldMappings:
    - source: email
      target: email
      type: VarChar
"#
        )
        .unwrap();

        let mappings = load_table_mappings(file.path()).unwrap();
        assert_eq!(mappings.len(), 1);
        assert_eq!(mappings[0].source_table, "users");
    }

    #[test]
    fn rejects_duplicate_source_table() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
- sourceTable: users
  targetTable: users
  primaryKey: id
  timestampColumn: updated_at
  batchSize: 200
  fieldMappings: []
- sourceTable: users
  targetTable: users_v2
  primaryKey: id
  timestampColumn: updated_at
  batchSize: 200
  fieldMappings: []
"#
        )
        .unwrap();

        assert!(matches!(
            load_table_mappings(file.path()),
            Err(ConfigError::DuplicateTable(_))
        ));
    }

    #[test]
    fn schedule_rejects_unknown_table() {
        let mappings = vec![];
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
schedules:
  - id: nightly
    cronExpression: "0 0 * * * *"
    tables: ["users"]
"#
        )
        .unwrap();

        assert!(matches!(
            load_schedule(file.path(), &mappings),
            Err(ConfigError::UnknownScheduleTable { .. })
        ));
    }

    #[test]
    fn missing_runtime_settings_file_uses_defaults() {
        let settings = load_runtime_settings("/nonexistent/path/settings.yaml").unwrap();
        assert_eq!(settings.batch_size, 500);
    }
}
