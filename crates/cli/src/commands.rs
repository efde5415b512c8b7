use clap::Subcommand;

use engine_core::failure::{FailureStatus, Stage};

/// Operator-facing commands (§6): run a sync once, run the scheduled daemon,
/// inspect cursor/lock state, reset a table's cursor, browse rejected rows,
/// or probe a connection string.
#[derive(Subcommand)]
pub enum Commands {
    /// Runs one sync across the configured tables (or a subset) and exits.
    Sync {
        /// Restrict the run to these source tables (repeatable).
        #[arg(long = "table", value_name = "TABLE")]
        tables: Vec<String>,

        /// Ignores the stored checkpoint and re-extracts every row.
        #[arg(long)]
        full: bool,

        /// Fails instead of resuming if a table's checkpoint is mid-run.
        #[arg(long)]
        no_resume: bool,

        /// Writes the run report as JSON to this file in addition to stdout.
        #[arg(long)]
        output: Option<String>,
    },

    /// Runs the cron-scheduled loop in the foreground until signaled to stop.
    Daemon,

    /// Prints each configured table's stored checkpoint and lock state.
    Status,

    /// Clears a table's stored checkpoint so the next sync starts from
    /// scratch. Pass "all" to reset every configured table.
    Reset {
        table: String,
    },

    /// Lists rejected rows from the failure store, optionally filtered.
    Failures {
        #[arg(long)]
        table: Option<String>,

        #[arg(long, value_enum)]
        status: Option<FailureStatusArg>,

        #[arg(long, value_enum)]
        stage: Option<StageArg>,

        #[arg(long, default_value_t = 50)]
        limit: usize,

        #[arg(long, default_value_t = 0)]
        offset: usize,

        /// Writes every matching record (ignoring limit/offset) as JSON to
        /// this file instead of printing a page to stdout.
        #[arg(long)]
        export: Option<String>,
    },

    /// Pings the configured source and target connections.
    TestConnection,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum FailureStatusArg {
    Pending,
    Resolved,
    Ignored,
    Retrying,
}

impl From<FailureStatusArg> for FailureStatus {
    fn from(value: FailureStatusArg) -> Self {
        match value {
            FailureStatusArg::Pending => FailureStatus::Pending,
            FailureStatusArg::Resolved => FailureStatus::Resolved,
            FailureStatusArg::Ignored => FailureStatus::Ignored,
            FailureStatusArg::Retrying => FailureStatus::Retrying,
        }
    }
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum StageArg {
    Transform,
    Validate,
    Load,
}

impl From<StageArg> for Stage {
    fn from(value: StageArg) -> Self {
        match value {
            StageArg::Transform => Stage::Transform,
            StageArg::Validate => Stage::Validate,
            StageArg::Load => Stage::Load,
        }
    }
}
