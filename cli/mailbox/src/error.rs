//! Error handling and display for the CLI.

use colored::Colorize;
use mailbox_tracker::store::StoreError;
use mailbox_tracker::TrackerError;
use thiserror::Error;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Cannot reach the campaign database: {0}")]
    Database(#[source] StoreError),

    #[error(transparent)]
    Tracker(#[from] TrackerError),
}

/// Hint shown under an error, if one applies.
fn hint(err: &CliError) -> Option<&'static str> {
    match err {
        CliError::Database(_) => Some("Hint: Check DATABASE_URL or pass --database-url."),
        CliError::Tracker(TrackerError::NotFound(_)) => {
            Some("Hint: Run `mailbox campaign list` to see campaigns.")
        }
        CliError::Tracker(TrackerError::Timeout(_)) => {
            Some("Hint: The database is slow to answer. Raise --timeout-ms.")
        }
        CliError::Tracker(TrackerError::Storage(StoreError::DuplicateCampaign(_))) => {
            Some("Hint: Campaign id collided repeatedly. Try again.")
        }
        _ => None,
    }
}

/// Print an error in a user-friendly format.
pub fn print_error(err: &anyhow::Error) {
    eprintln!("{} {}", "Error:".red().bold(), err);

    if let Some(hint) = err.downcast_ref::<CliError>().and_then(hint) {
        eprintln!("\n{}", hint.yellow());
    }
}
