//! Administrative purge of one source.

use console::style;

use crate::cli::helpers::open_database;
use crate::config::Settings;
use crate::models::SourceTable;

/// Delete every article of `source` and its structured records.
pub async fn cmd_purge(settings: &Settings, source: SourceTable, yes: bool) -> anyhow::Result<()> {
    let ctx = open_database(settings).await?;
    let counts = ctx.articles().counts(source).await?;

    if !yes {
        println!(
            "{} This deletes {} {} articles. Re-run with --yes to confirm.",
            style("!").yellow(),
            counts.total,
            source.slug()
        );
        return Ok(());
    }

    let articles = ctx.articles().purge(source).await?;
    let structured = ctx.structured().purge(source).await?;
    println!(
        "{} Deleted {} articles and {} structured records from {}",
        style("✓").green(),
        articles,
        structured,
        source.as_str()
    );
    Ok(())
}
