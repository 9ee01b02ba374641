pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use leadquote_core::domain::submission::SyncStatus;

#[derive(Debug, Parser)]
#[command(
    name = "leadquote",
    about = "Leadquote operator CLI",
    long_about = "Apply migrations, inspect configuration, preview quotes and inspect stored lead submissions.",
    after_help = "Examples:\n  leadquote migrate\n  leadquote quote --dob 1960-05-31 --plan annual --today 2025-05-01\n  leadquote submissions --status sync-failed --limit 20"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Preview the age band and quote for a date of birth without side effects")]
    Quote {
        #[arg(long, help = "Primary applicant date of birth (YYYY-MM-DD)")]
        dob: String,
        #[arg(long, help = "Payment plan: monthly, annual or yearly")]
        plan: String,
        #[arg(long, help = "Partner date of birth (YYYY-MM-DD)")]
        partner_dob: Option<String>,
        #[arg(long, help = "Evaluate as of this date instead of today (UTC)")]
        today: Option<String>,
    },
    #[command(about = "Derive the idempotency key a submission would carry")]
    Key {
        #[arg(long)]
        email: String,
        #[arg(long, help = "UTC receipt day (YYYY-MM-DD); defaults to today")]
        date: Option<String>,
        #[arg(long, default_value = "v1")]
        schema_version: String,
    },
    #[command(about = "Validate an enum schema file, or the bundled schema, and summarize it")]
    Schema {
        #[arg(long)]
        path: Option<PathBuf>,
    },
    #[command(about = "List stored submissions by sync status, newest first")]
    Submissions {
        #[arg(long, value_enum, default_value_t = StatusArg::SyncFailed)]
        status: StatusArg,
        #[arg(long, default_value_t = 50)]
        limit: u32,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum StatusArg {
    Received,
    Synced,
    SyncFailed,
}

impl From<StatusArg> for SyncStatus {
    fn from(value: StatusArg) -> Self {
        match value {
            StatusArg::Received => SyncStatus::Received,
            StatusArg::Synced => SyncStatus::Synced,
            StatusArg::SyncFailed => SyncStatus::SyncFailed,
        }
    }
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Config => commands::config::run(),
        Command::Quote { dob, plan, partner_dob, today } => {
            commands::quote::run(commands::quote::QuoteArgs { dob, plan, partner_dob, today })
        }
        Command::Key { email, date, schema_version } => {
            commands::key::run(&email, date.as_deref(), &schema_version)
        }
        Command::Schema { path } => commands::schema::run(path.as_deref()),
        Command::Submissions { status, limit } => {
            commands::submissions::run(status.into(), limit)
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
