//! GROBID structured-analysis commands.

use console::style;

use crate::cli::helpers::{format_score, open_database, truncate};
use crate::config::Settings;
use crate::models::SourceTable;
use crate::services::{build_processor, build_structured_analysis, rescore_structured};

/// Analyze one stored article and print its structured record.
pub async fn cmd_grobid_analyze(settings: &Settings, source: SourceTable, id: i32) -> anyhow::Result<()> {
    let ctx = open_database(settings).await?;
    let processor = build_processor(&ctx, settings)?;
    let analysis = build_structured_analysis(&ctx, settings, &processor)?;

    let record = analysis.analyze_article(source, id).await?;
    println!(
        "{} {}",
        style("✓").green(),
        record.title.as_deref().unwrap_or("(untitled)")
    );
    if let Some(ref authors) = record.authors {
        println!("  Authors:   {}", authors);
    }
    println!("  Citations: {}", record.citations.len());
    if let Some(ref c) = record.controversy {
        println!(
            "  Score:     {} {}",
            format_score(Some(c.score)),
            if c.is_controversial { "(controversial)" } else { "" }
        );
        println!("  Excerpt:   {}", truncate(&c.excerpt, 120));
    }
    Ok(())
}

/// Analyze a batch of articles with no structured record yet.
pub async fn cmd_grobid_batch(settings: &Settings, limit: i64) -> anyhow::Result<()> {
    let ctx = open_database(settings).await?;
    let processor = build_processor(&ctx, settings)?;
    let analysis = build_structured_analysis(&ctx, settings, &processor)?;

    println!("{} Sending up to {} articles per source to GROBID", style("→").cyan(), limit);
    let report = analysis.analyze_batch(limit).await?;
    println!(
        "{} {} analyzed, {} failed",
        style("✓").green(),
        report.analyzed,
        report.failed
    );
    Ok(())
}

/// Re-score stored TEI documents without calling GROBID.
pub async fn cmd_grobid_rescore(settings: &Settings) -> anyhow::Result<()> {
    let ctx = open_database(settings).await?;
    let processor = build_processor(&ctx, settings)?;

    let report = rescore_structured(&ctx.structured(), processor.scorer()).await?;
    println!(
        "{} Re-scored {} documents, {} controversial, {} failed",
        style("✓").green(),
        report.rescored,
        report.controversial,
        report.failed
    );
    Ok(())
}
