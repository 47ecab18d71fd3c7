//! Shared helper functions for CLI commands.

use console::style;

use crate::config::Settings;
use crate::repository::DbContext;
use crate::services::HarvestReport;

/// Create directories and the schema, then hand back a context.
pub async fn open_database(settings: &Settings) -> anyhow::Result<DbContext> {
    settings.ensure_directories()?;
    let ctx = settings.create_db_context();
    ctx.init_schema().await?;
    Ok(ctx)
}

/// Format a stored score for display.
pub fn format_score(score: Option<f64>) -> String {
    match score {
        Some(s) => format!("{:.3}", s),
        None => "-".to_string(),
    }
}

/// Cut a string to `max` characters, appending an ellipsis when shortened.
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}

pub fn print_harvest_report(report: &HarvestReport) {
    let marker = if report.aborted() {
        style("✗").red()
    } else {
        style("✓").green()
    };
    println!(
        "{} {} since {}: {} listed, {} new, {} complete, {} duplicate, {} failed",
        marker,
        style(report.source.slug()).bold(),
        report.since,
        report.listed,
        report.inserted,
        report.completed,
        report.duplicates,
        report.failed
    );
    if let Some(ref error) = report.error {
        println!(
            "  {} stopped after {} attempt(s): {}",
            style("!").yellow(),
            report.attempts,
            error
        );
    }
    if let Some(date) = report.watermark {
        println!("  {} watermark set to {}", style("→").cyan(), date);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_score() {
        assert_eq!(format_score(Some(0.7)), "0.700");
        assert_eq!(format_score(None), "-");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a longer title here", 10), "a longe...");
        assert_eq!(truncate("élévation", 9), "élévation");
    }
}
