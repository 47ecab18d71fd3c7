//! Full pipeline command, one-shot or as a daemon.

use std::time::Duration;

use console::style;

use crate::cli::helpers::{open_database, print_harvest_report};
use crate::config::Settings;
use crate::services::{Pipeline, PipelineReport};

/// Run the pipeline once, or repeatedly every `interval` seconds until Ctrl+C.
pub async fn cmd_pipeline(
    settings: &Settings,
    limit: Option<usize>,
    daemon: bool,
    interval: u64,
) -> anyhow::Result<()> {
    let ctx = open_database(settings).await?;
    let pipeline = Pipeline::from_settings(&ctx, settings)?;

    if !daemon {
        let report = pipeline.run_full(limit).await;
        print_pipeline_report(&report);
        if !report.errors.is_empty() {
            anyhow::bail!("{} pipeline stage(s) failed", report.errors.len());
        }
        return Ok(());
    }

    let interval = Duration::from_secs(interval.max(1));
    println!(
        "{} Pipeline daemon started, one pass every {}s (Ctrl+C to stop)",
        style("→").cyan(),
        interval.as_secs()
    );

    loop {
        // Stage errors are reported; the next tick runs regardless.
        print_pipeline_report(&pipeline.run_full(limit).await);

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = tokio::signal::ctrl_c() => {
                println!("{} Stopping pipeline daemon", style("→").cyan());
                return Ok(());
            }
        }
    }
}

fn print_pipeline_report(report: &PipelineReport) {
    for harvest in &report.harvests {
        print_harvest_report(harvest);
    }
    let backfill = &report.backfill;
    println!(
        "{} Backfill {}: {} extracted, {} failed",
        style("✓").green(),
        backfill.source.map(|s| s.slug()).unwrap_or("-"),
        backfill.extracted,
        backfill.failed
    );
    println!(
        "{} Structured re-score: {} documents, {} controversial, {} failed",
        style("✓").green(),
        report.rescore.rescored,
        report.rescore.controversial,
        report.rescore.failed
    );
    for error in &report.errors {
        eprintln!("{} {}", style("✗").red(), error);
    }
}
