//! Local search command.

use console::style;

use crate::cli::helpers::{format_score, open_database, truncate};
use crate::config::Settings;
use crate::models::SourceTable;
use crate::repository::ArticleSearch;

/// Search stored articles of one source and print a page of results.
pub async fn cmd_search(
    settings: &Settings,
    source: SourceTable,
    search: &ArticleSearch,
    page: i64,
    limit: i64,
    json: bool,
) -> anyhow::Result<()> {
    let ctx = open_database(settings).await?;
    let results = ctx.articles().search(source, search, page, limit).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    if results.articles.is_empty() {
        println!("{} No matching {} articles", style("!").yellow(), source.slug());
        return Ok(());
    }

    for article in &results.articles {
        println!(
            "  #{:<6} {:<10} {:>6}  {}",
            article.id,
            article.publication_date.as_deref().unwrap_or("-"),
            format_score(article.controversy_score),
            truncate(&article.title, 70)
        );
        if let Some(authors) = article.authors.as_deref().filter(|a| !a.is_empty()) {
            println!("          {}", style(truncate(authors, 70)).dim());
        }
    }

    let pages = (results.total + results.limit - 1) / results.limit;
    println!(
        "{} {} matches, page {}/{}",
        style("✓").green(),
        results.total,
        results.page,
        pages.max(1)
    );
    Ok(())
}
