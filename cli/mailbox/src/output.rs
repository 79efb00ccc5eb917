//! Output formatting for CLI commands.

use colored::Colorize;
use serde::Serialize;
use tabled::{Table, Tabled};

const CLI_SCHEMA_VERSION: &str = "mailbox.cli.v1";

/// Output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable table format.
    #[default]
    Table,
    /// JSON format.
    Json,
}

impl OutputFormat {
    pub fn parse(value: &str) -> Self {
        match value {
            "json" => OutputFormat::Json,
            _ => OutputFormat::Table,
        }
    }
}

/// Print rows as a table, or as a JSON array.
pub fn print_output<T: Serialize + Tabled>(data: &[T], format: OutputFormat) {
    match format {
        OutputFormat::Table => print_table(data),
        OutputFormat::Json => println!("{}", format_json(data, "[]")),
    }
}

/// Print rows as a table; "No items found." when there are none.
pub fn print_table<T: Tabled>(data: &[T]) {
    if data.is_empty() {
        println!("{}", "No items found.".dimmed());
    } else {
        println!("{}", Table::new(data));
    }
}

/// Print a single item as JSON.
pub fn print_single<T: Serialize>(data: &T) {
    println!("{}", format_json(data, "{}"));
}

/// Print a success message.
pub fn print_success(message: &str) {
    println!("{} {}", "Success:".green().bold(), message);
}

/// Print an info message.
pub fn print_info(message: &str) {
    println!("{} {}", "Info:".blue().bold(), message);
}

/// JSON envelope. Serialized directly so report fields keep their order.
#[derive(Serialize)]
struct Envelope<'a, T: ?Sized> {
    #[serde(rename = "schemaVersion")]
    schema_version: &'static str,
    data: &'a T,
}

fn format_json<T: Serialize + ?Sized>(data: &T, fallback: &str) -> String {
    let envelope = Envelope {
        schema_version: CLI_SCHEMA_VERSION,
        data,
    };
    serde_json::to_string_pretty(&envelope).unwrap_or_else(|_| fallback.to_string())
}
