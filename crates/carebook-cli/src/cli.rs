//! Command-line interface definition.

use std::path::PathBuf;

use carebook_core::YearMonth;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};

/// carebook - Book and reschedule appointments from the terminal
#[derive(Debug, Parser)]
#[command(name = "carebook")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "CAREBOOK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v')]
    pub debug: bool,

    /// Scheduling API base URL (overrides the config file)
    #[arg(long, env = "CAREBOOK_API_URL")]
    pub api_url: Option<String>,

    /// Bearer token (overrides the config file; supports env:: and pass::)
    #[arg(long, env = "CAREBOOK_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Print results as JSON
    #[arg(long)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// List providers
    Doctors {
        /// Only providers whose name matches
        #[arg(long)]
        search: Option<String>,

        /// Only providers at this location
        #[arg(long)]
        location: Option<String>,

        /// Follow pagination and list every page
        #[arg(long)]
        all: bool,
    },

    /// Show available dates for a month
    Calendar {
        #[command(flatten)]
        target: ProviderArgs,

        /// Month to show (YYYY-MM), defaults to the current month
        #[arg(long)]
        month: Option<YearMonth>,
    },

    /// Show free times on a date
    Times {
        #[command(flatten)]
        target: ProviderArgs,

        /// Date (YYYY-MM-DD)
        #[arg(long)]
        date: NaiveDate,
    },

    /// Book a new appointment
    Book {
        #[command(flatten)]
        target: ProviderArgs,

        #[command(flatten)]
        slot: SlotArgs,

        /// Callback number, required for phone appointments
        #[arg(long)]
        phone: Option<String>,
    },

    /// Move an existing appointment
    Reschedule {
        /// Appointment identifier
        #[arg(long)]
        appointment: String,

        #[command(flatten)]
        target: ProviderArgs,

        /// Current date of the appointment; the calendar opens on its month
        #[arg(long)]
        current_date: Option<NaiveDate>,

        #[command(flatten)]
        slot: SlotArgs,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Provider and appointment type selection.
#[derive(Debug, Clone, clap::Args)]
pub struct ProviderArgs {
    /// Provider identifier
    #[arg(long)]
    pub doctor: String,

    /// Appointment type identifier
    #[arg(long = "type")]
    pub appointment_type: String,
}

/// The slot to commit.
#[derive(Debug, Clone, clap::Args)]
pub struct SlotArgs {
    /// Date (YYYY-MM-DD)
    #[arg(long)]
    pub date: NaiveDate,

    /// Time as listed by `carebook times`
    #[arg(long)]
    pub time: String,

    /// Notes for the provider
    #[arg(long)]
    pub notes: Option<String>,
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Dump current configuration
    Dump,

    /// Validate configuration
    Validate,

    /// Show configuration file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_book() {
        let cli = Cli::try_parse_from([
            "carebook", "book", "--doctor", "7", "--type", "5", "--date", "2024-03-10", "--time",
            "2:30 PM", "--phone", "555-0100",
        ])
        .unwrap();

        match cli.command {
            Command::Book {
                target,
                slot,
                phone,
            } => {
                assert_eq!(target.doctor, "7");
                assert_eq!(target.appointment_type, "5");
                assert_eq!(slot.date, NaiveDate::from_ymd_opt(2024, 3, 10).unwrap());
                assert_eq!(slot.time, "2:30 PM");
                assert_eq!(phone.as_deref(), Some("555-0100"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn parses_calendar_month() {
        let cli = Cli::try_parse_from([
            "carebook", "calendar", "--doctor", "7", "--type", "5", "--month", "2024-04",
        ])
        .unwrap();
        match cli.command {
            Command::Calendar { month, .. } => assert_eq!(month, YearMonth::new(2024, 4)),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn rejects_bad_month() {
        let result = Cli::try_parse_from([
            "carebook", "calendar", "--doctor", "7", "--type", "5", "--month", "April",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
