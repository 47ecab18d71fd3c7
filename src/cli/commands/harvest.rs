//! Harvest, backfill and reanalyze commands.

use console::style;

use crate::cli::helpers::{open_database, print_harvest_report};
use crate::config::Settings;
use crate::models::SourceTable;
use crate::services::Pipeline;

/// Harvest one source, or all of them when `table` is `None`.
pub async fn cmd_harvest(settings: &Settings, table: Option<SourceTable>) -> anyhow::Result<()> {
    let ctx = open_database(settings).await?;
    let pipeline = Pipeline::from_settings(&ctx, settings)?;

    let reports = match table {
        Some(table) => vec![pipeline.harvest(table).await?],
        None => pipeline.harvest_all().await?,
    };

    for report in &reports {
        print_harvest_report(report);
    }
    Ok(())
}

/// Fetch and extract text for stored articles missing it.
pub async fn cmd_backfill(
    settings: &Settings,
    source: Option<SourceTable>,
    limit: Option<usize>,
) -> anyhow::Result<()> {
    let ctx = open_database(settings).await?;
    let pipeline = Pipeline::from_settings(&ctx, settings)?;

    let source = source.unwrap_or(settings.harvest.backfill_source);
    let limit = limit.unwrap_or(settings.harvest.backfill_limit);
    println!(
        "{} Backfilling up to {} {} articles",
        style("→").cyan(),
        limit,
        source.slug()
    );

    let report = pipeline.backfill(source, limit).await?;
    println!(
        "{} {} extracted, {} failed ({} attempted)",
        style("✓").green(),
        report.extracted,
        report.failed,
        report.attempted
    );
    Ok(())
}

/// Re-score stored text and print one line per article.
pub async fn cmd_reanalyze(settings: &Settings, source: SourceTable, limit: i64) -> anyhow::Result<()> {
    let ctx = open_database(settings).await?;
    let pipeline = Pipeline::from_settings(&ctx, settings)?;

    let report = pipeline.reanalyze(source, limit).await?;
    let results = &report.articles;
    if results.is_empty() && report.failed == 0 {
        println!("{} No {} articles with text", style("!").yellow(), source.slug());
        return Ok(());
    }

    for r in results {
        let flag = if r.is_controversial {
            style("controversial").red().to_string()
        } else {
            style("ok").dim().to_string()
        };
        println!("  #{:<6} {:.3}  {}", r.id, r.score, flag);
    }
    let flagged = results.iter().filter(|r| r.is_controversial).count();
    println!(
        "{} Reanalyzed {} articles, {} controversial, {} failed",
        style("✓").green(),
        results.len(),
        flagged,
        report.failed
    );
    Ok(())
}
