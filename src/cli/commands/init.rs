//! Initialize command.

use console::style;

use crate::cli::helpers::open_database;
use crate::config::Settings;
use crate::extract::PdfTextExtractor;
use crate::grobid::GrobidClient;

/// Initialize the data directory and database.
pub async fn cmd_init(settings: &Settings) -> anyhow::Result<()> {
    let ctx = open_database(settings).await?;

    for table in ctx.list_tables().await? {
        println!("  {} Table: {}", style("✓").green(), table);
    }

    if !PdfTextExtractor::is_available().await {
        println!(
            "{} pdftotext not found; install poppler-utils to extract full text",
            style("!").yellow()
        );
    }

    let grobid = GrobidClient::new(&settings.grobid)?;
    if !grobid.is_alive().await {
        println!(
            "{} GROBID not reachable at {}; structured analysis is unavailable",
            style("!").yellow(),
            settings.grobid.url
        );
    }

    println!(
        "{} Initialized sciharvest in {}",
        style("✓").green(),
        settings.data_dir.display()
    );
    println!("  PDFs: {}", settings.pdf_dir.display());

    Ok(())
}
