mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;

use commands::loan::{CheckArgs, ProjectArgs, ScheduleArgs, SummaryArgs};

/// Student loan projections with grace-period comparisons
#[derive(Parser)]
#[command(
    name = "slc",
    version,
    about = "Student loan projections with grace-period comparisons",
    long_about = "Project student loan repayment with decimal precision: \
                  month-by-month amortization schedules, grace-period interest \
                  accrual (simple or compound), extra-payment effects, and a \
                  no-grace comparison scenario."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a full projection: summary metrics, schedules, grace impact
    Project(ProjectArgs),
    /// Print only the month-by-month schedule rows
    Schedule(ScheduleArgs),
    /// Print a formatted repayment summary in the chosen currency
    Summary(SummaryArgs),
    /// Validate loan inputs without running a projection
    Check(CheckArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn main() {
    let cli = Cli::parse();

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Project(args) => commands::loan::run_project(args),
        Commands::Schedule(args) => commands::loan::run_schedule(args),
        Commands::Summary(args) => commands::loan::run_summary(args),
        Commands::Check(args) => commands::loan::run_check(args),
        Commands::Version => {
            println!("slc {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
