use chrono::NaiveDateTime;
use colored::Colorize;
use rust_decimal::Decimal;

use crate::renewal::stage::{RenewalStage, Urgency};

/// Format a money amount with its currency code
pub fn format_money(amount: Decimal, currency: &str) -> String {
    format!("{:.2} {}", amount, currency).yellow().to_string()
}

/// Days remaining coloured by urgency band; blank when unset
pub fn format_days_remaining(days_remaining: Option<i64>) -> String {
    let Some(days) = days_remaining else {
        return String::new();
    };

    let text = Urgency::describe(days);
    match Urgency::from_days(days) {
        Urgency::Overdue | Urgency::Critical => text.red().bold().to_string(),
        Urgency::Warning => text.truecolor(255, 165, 0).bold().to_string(),
        Urgency::Notice => text.yellow().bold().to_string(),
        Urgency::Healthy => text.green().bold().to_string(),
    }
}

pub fn format_stage(stage: Option<RenewalStage>) -> String {
    match stage {
        None => "-".dimmed().to_string(),
        Some(RenewalStage::Expired) => stage_label(stage).red().to_string(),
        Some(s) if s.is_critical() => stage_label(stage).yellow().to_string(),
        Some(_) => stage_label(stage).green().to_string(),
    }
}

fn stage_label(stage: Option<RenewalStage>) -> &'static str {
    stage.map(|s| s.label()).unwrap_or("-")
}

pub fn format_timestamp(timestamp: &NaiveDateTime) -> String {
    timestamp.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Prompt user for yes/no confirmation; unreadable input counts as no
pub fn confirm_action(prompt: &str) -> bool {
    use std::io::{self, Write};

    print!("{} (y/N): ", prompt);
    if io::stdout().flush().is_err() {
        return false;
    }

    let mut input = String::new();
    if io::stdin().read_line(&mut input).is_err() {
        return false;
    }

    matches!(input.trim().to_lowercase().as_str(), "y" | "yes")
}

pub fn print_table_border(width: usize) {
    println!("{}", "=".repeat(width));
}

/// Print one row, padding each column to its width. Colour codes in a
/// column count towards its width, so coloured columns go last.
pub fn print_table_row(columns: &[&str], widths: &[usize]) {
    let row = columns
        .iter()
        .zip(widths)
        .map(|(col, width)| format!("{:<width$}", col, width = *width))
        .collect::<Vec<_>>()
        .join("  ");
    println!("{}", row.trim_end());
}
