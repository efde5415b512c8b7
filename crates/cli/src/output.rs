use crate::error::CliError;
use engine_core::failure::FailedRecord;
use engine_pipeline::RunReport;

/// Renders a `RunReport` as a human-readable table (the default for `sync`
/// and `status` on a TTY).
pub fn print_report_table(report: &RunReport) {
    println!(
        "run {}  started {}  completed {}  status {:?}",
        report.run_id,
        report.started_at.to_rfc3339(),
        report.completed_at.to_rfc3339(),
        report.status()
    );
    println!(
        "{:<24} {:>10} {:>10} {:>10} {:>10} {:>10} {:>10}",
        "table", "extracted", "transformed", "validated", "loaded", "failed", "deleted"
    );
    for table in &report.tables {
        println!(
            "{:<24} {:>10} {:>10} {:>10} {:>10} {:>10} {:>10}",
            table.table,
            table.extracted,
            table.transformed,
            table.validated,
            table.loaded,
            table.failed,
            table.deleted,
        );
        if let Some(error) = &table.error {
            println!("  ! {}: {}", table.table, error);
        }
    }
    println!(
        "total loaded: {}  total failed: {}",
        report.total_loaded(),
        report.total_failed()
    );
}

pub fn report_to_json(report: &RunReport) -> Result<String, CliError> {
    Ok(serde_json::to_string_pretty(report)?)
}

pub async fn write_report_json(report: &RunReport, path: &str) -> Result<(), CliError> {
    let json = report_to_json(report)?;
    tokio::fs::write(path, json).await?;
    Ok(())
}

pub fn print_report_json(report: &RunReport) -> Result<(), CliError> {
    println!("{}", report_to_json(report)?);
    Ok(())
}

/// Renders a page of `FailedRecord`s as a human-readable table (`failures`).
pub fn print_failures_table(records: &[FailedRecord]) {
    println!(
        "{:<6} {:<20} {:<12} {:<10} {:<10} {}",
        "id", "table", "stage", "status", "retries", "error"
    );
    for record in records {
        println!(
            "{:<6} {:<20} {:<12} {:<10} {:<10} {}",
            record.id,
            record.table_name,
            record.stage,
            record.status,
            record.retry_count,
            record.error_message,
        );
    }
}
