//! Database status command.

use console::style;
use serde::Serialize;

use crate::cli::helpers::open_database;
use crate::config::Settings;
use crate::models::SourceTable;
use crate::repository::SourceCounts;

#[derive(Serialize)]
struct StatusReport {
    database: String,
    sources: Vec<(SourceTable, SourceCounts)>,
    structured: i64,
    watermark: Option<String>,
}

/// Print per-source counts, structured records and the harvest watermark.
pub async fn cmd_status(settings: &Settings, json: bool) -> anyhow::Result<()> {
    let ctx = open_database(settings).await?;
    let articles = ctx.articles();

    let mut sources = Vec::with_capacity(SourceTable::ALL.len());
    for table in SourceTable::ALL {
        sources.push((table, articles.counts(table).await?));
    }
    let report = StatusReport {
        database: settings.database_url(),
        sources,
        structured: ctx.structured().count().await?,
        watermark: ctx
            .meta()
            .get_watermark()
            .await?
            .map(|d| d.format("%Y-%m-%d").to_string()),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{} {}", style("Database:").bold(), report.database);
    println!(
        "  {:<10} {:>8} {:>10} {:>14}",
        "source", "articles", "with text", "controversial"
    );
    for (table, counts) in &report.sources {
        println!(
            "  {:<10} {:>8} {:>10} {:>14}",
            table.slug(),
            counts.total,
            counts.with_text,
            counts.controversial
        );
    }
    println!("  Structured records: {}", report.structured);
    println!(
        "  Last harvest:       {}",
        report.watermark.as_deref().unwrap_or("never")
    );
    Ok(())
}
