use crate::{
    conn::{ConnectionPinger, MySqlConnectionPinger, PostgresConnectionPinger},
    env::EnvManager,
    error::CliError,
    shutdown::ShutdownCoordinator,
};
use clap::Parser;
use commands::Commands;
use engine_config::{RuntimeSettings, TableMapping};
use engine_core::failure::FailureFilter;
use engine_core::{CheckpointStore, FailureStore};
use engine_runtime::{Engine, Scheduler};
use std::process;
use tokio_util::sync::CancellationToken;
use tracing::{Level, info};
use uuid::Uuid;

mod commands;
mod conn;
mod env;
mod error;
mod output;
mod shutdown;

/// Operator entry point for the sync engine (§6): trigger a run, run the
/// scheduled daemon, inspect state, reset a checkpoint, browse the Failure
/// Store, or probe a connection.
#[derive(Parser)]
#[command(name = "sync-engine", version, about = "Incremental ETL sync engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Table mapping document (§3 `TableMapping`).
    #[arg(long, global = true, default_value = "config/tables.yaml")]
    mapping: String,

    /// Schedule document (§6), consulted by `daemon`.
    #[arg(long, global = true, default_value = "config/schedule.yaml")]
    schedule: String,

    /// Runtime settings (batch size, worker count, retry tuning, paths).
    #[arg(long, global = true, default_value = "config/settings.yaml")]
    settings: String,

    /// Optional `.env` file supplementing the process environment with
    /// `MYSQL_URL`/`POSTGRES_URL`.
    #[arg(long, global = true)]
    env_file: Option<String>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let exit_code = match run_cli(cli).await {
        Ok(code) => code,
        Err(e) => {
            match &e {
                CliError::ShutdownRequested => {
                    info!("shutdown requested, exiting");
                }
                _ => {
                    tracing::error!("{}", e);
                }
            }
            e.exit_code()
        }
    };

    process::exit(exit_code);
}

async fn run_cli(cli: Cli) -> Result<i32, CliError> {
    let mut env_manager = EnvManager::new();
    if let Some(path) = &cli.env_file {
        env_manager.load_from_file(path)?;
    }

    let settings = load_runtime_settings(&cli.settings)?;
    tracing_subscriber::fmt()
        .with_max_level(parse_log_level(&settings.log_filter))
        .init();

    let cancel = CancellationToken::new();
    let shutdown_coordinator = ShutdownCoordinator::new(cancel.clone());
    shutdown_coordinator.register_handlers();

    match cli.command {
        Commands::Sync {
            tables,
            full,
            no_resume,
            output,
        } => {
            run_sync(
                &cli,
                &env_manager,
                settings,
                tables,
                full,
                no_resume,
                output,
                cancel,
            )
            .await
        }

        Commands::Daemon => run_daemon(&cli, &env_manager, settings, cancel).await,

        Commands::Status => run_status(&cli, &env_manager, settings).await,

        Commands::Reset { table } => run_reset(&cli, &env_manager, settings, table).await,

        Commands::Failures {
            table,
            status,
            stage,
            limit,
            offset,
            export,
        } => {
            run_failures(
                &env_manager,
                settings,
                table,
                status,
                stage,
                limit,
                offset,
                export,
            )
            .await
        }

        Commands::TestConnection => run_test_connection(&env_manager).await,
    }
}

fn load_runtime_settings(path: &str) -> Result<RuntimeSettings, CliError> {
    Ok(engine_config::loader::load_runtime_settings(path)?)
}

fn load_mappings(path: &str) -> Result<Vec<TableMapping>, CliError> {
    Ok(engine_config::loader::load_table_mappings(path)?)
}

fn required_env(env_manager: &EnvManager, key: &str) -> Result<String, CliError> {
    env_manager
        .all()
        .get(key)
        .cloned()
        .ok_or_else(|| CliError::Config(format!("missing required environment variable {key}")))
}

fn parse_log_level(filter: &str) -> Level {
    filter.parse().unwrap_or(Level::INFO)
}

async fn connect_engine(
    env_manager: &EnvManager,
    settings: RuntimeSettings,
) -> Result<Engine, CliError> {
    let mysql_url = required_env(env_manager, "MYSQL_URL")?;
    let postgres_url = required_env(env_manager, "POSTGRES_URL")?;
    Engine::connect(&mysql_url, &postgres_url, settings)
        .await
        .map_err(CliError::from)
}

#[allow(clippy::too_many_arguments)]
async fn run_sync(
    cli: &Cli,
    env_manager: &EnvManager,
    settings: RuntimeSettings,
    tables: Vec<String>,
    full: bool,
    no_resume: bool,
    output: Option<String>,
    cancel: CancellationToken,
) -> Result<i32, CliError> {
    let mappings = load_mappings(&cli.mapping)?;
    let selected: Vec<TableMapping> = if tables.is_empty() {
        mappings
    } else {
        mappings
            .into_iter()
            .filter(|m| tables.contains(&m.source_table))
            .collect()
    };
    if selected.is_empty() {
        return Err(CliError::Usage("no matching tables to sync".to_string()));
    }

    let lock = engine_runtime::FileLock::new(settings.lock_file_path.clone());
    let guard = match lock.try_acquire() {
        Ok(guard) => guard,
        Err(engine_runtime::LockError::AlreadyHeld(pid)) => {
            println!("skipped: sync already running (pid {pid})");
            return Ok(0);
        }
        Err(e) => return Err(CliError::Unexpected(e.to_string())),
    };

    let engine = connect_engine(env_manager, settings).await?;

    if no_resume {
        for mapping in &selected {
            if let Some(checkpoint) = engine.checkpoints().get(&mapping.source_table).await?
                && checkpoint.status == engine_core::CheckpointStatus::Running
            {
                return Err(CliError::Usage(format!(
                    "table '{}' has a running checkpoint and --no-resume was given",
                    mapping.source_table
                )));
            }
        }
    }

    let run_id = Uuid::new_v4().to_string();
    info!(run_id = %run_id, tables = selected.len(), full, "starting manual sync");
    let report = engine.sync(&selected, &run_id, full, &cancel).await;
    drop(guard);

    if let Some(path) = &output {
        output::write_report_json(&report, path).await?;
    }
    output::print_report_table(&report);

    Ok(report.exit_code())
}

async fn run_daemon(
    cli: &Cli,
    env_manager: &EnvManager,
    settings: RuntimeSettings,
    cancel: CancellationToken,
) -> Result<i32, CliError> {
    let mappings = load_mappings(&cli.mapping)?;
    let document = engine_config::loader::load_schedule(&cli.schedule, &mappings)?;
    let lock_file_path = settings.lock_file_path.clone();
    let engine = connect_engine(env_manager, settings).await?;

    let scheduler = Scheduler::new(&engine, &mappings, &lock_file_path);
    info!(
        schedules = document.schedules.len(),
        "starting scheduler daemon"
    );
    scheduler.run_daemon(&document, cancel).await;
    Ok(0)
}

async fn run_status(
    cli: &Cli,
    env_manager: &EnvManager,
    settings: RuntimeSettings,
) -> Result<i32, CliError> {
    let mappings = load_mappings(&cli.mapping)?;
    let lock = engine_runtime::FileLock::new(settings.lock_file_path.clone());
    let engine = connect_engine(env_manager, settings).await?;

    match lock.current_holder()? {
        Some(pid) => println!("scheduler lock held by pid {pid}"),
        None => println!("scheduler lock is free"),
    }

    println!(
        "{:<24} {:<10} {:<24} {:<8}",
        "table", "status", "last run", "records"
    );
    for mapping in &mappings {
        match engine.checkpoints().get(&mapping.source_table).await? {
            Some(cp) => {
                let last_run = cp
                    .last_run_at
                    .map(|t| t.to_rfc3339())
                    .unwrap_or_else(|| "never".to_string());
                println!(
                    "{:<24} {:<10} {:<24} {:<8}",
                    mapping.source_table, cp.status, last_run, cp.records_synced
                );
                if let Some(err) = &cp.last_error {
                    println!("  ! {}: {}", mapping.source_table, err);
                }
            }
            None => println!(
                "{:<24} {:<10} {:<24} {:<8}",
                mapping.source_table, "unsynced", "never", 0
            ),
        }
    }

    let stats = engine.failures().statistics().await?;
    println!("failed records: {} total", stats.total);
    for (status, count) in &stats.by_status {
        println!("  {status}: {count}");
    }

    Ok(0)
}

async fn run_reset(
    cli: &Cli,
    env_manager: &EnvManager,
    settings: RuntimeSettings,
    table: String,
) -> Result<i32, CliError> {
    let mappings = load_mappings(&cli.mapping)?;
    let engine = connect_engine(env_manager, settings).await?;

    if table == "all" {
        for mapping in &mappings {
            engine.checkpoints().reset(&mapping.source_table).await?;
            println!("reset checkpoint for '{}'", mapping.source_table);
        }
    } else {
        if !mappings.iter().any(|m| m.source_table == table) {
            return Err(CliError::Usage(format!("unknown table '{table}'")));
        }
        engine.checkpoints().reset(&table).await?;
        println!("reset checkpoint for '{table}'");
    }

    Ok(0)
}

#[allow(clippy::too_many_arguments)]
async fn run_failures(
    env_manager: &EnvManager,
    settings: RuntimeSettings,
    table: Option<String>,
    status: Option<commands::FailureStatusArg>,
    stage: Option<commands::StageArg>,
    limit: usize,
    offset: usize,
    export: Option<String>,
) -> Result<i32, CliError> {
    let engine = connect_engine(env_manager, settings).await?;

    let filter = FailureFilter {
        table,
        status: status.map(Into::into),
        stage: stage.map(Into::into),
    };

    if let Some(path) = export {
        let mut file = std::fs::File::create(&path)?;
        let count = engine.failures().export(&mut file).await?;
        println!("exported {count} failed records to {path}");
        return Ok(0);
    }

    let records = engine.failures().list(&filter, limit, offset).await?;
    output::print_failures_table(&records);
    Ok(0)
}

async fn run_test_connection(env_manager: &EnvManager) -> Result<i32, CliError> {
    let mysql_url = required_env(env_manager, "MYSQL_URL")?;
    let postgres_url = required_env(env_manager, "POSTGRES_URL")?;

    MySqlConnectionPinger {
        conn_str: mysql_url,
    }
    .ping()
    .await?;
    PostgresConnectionPinger {
        conn_str: postgres_url,
    }
    .ping()
    .await?;

    println!("both connections OK");
    Ok(0)
}
