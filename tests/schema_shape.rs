//! Schema shape tests.
//!
//! Creates the schema through the async context, then inspects the file
//! with a plain SQLite connection.

use rusqlite::Connection;
use tempfile::tempdir;

use sciharvest::repository::DbContext;

fn columns(conn: &Connection, table: &str) -> Vec<String> {
    let mut stmt = conn
        .prepare(&format!("PRAGMA table_info({})", table))
        .unwrap();
    stmt.query_map([], |row| row.get::<_, String>(1))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap()
}

async fn schema_file() -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("schema.db");
    let ctx = DbContext::from_path(&path);
    ctx.init_schema().await.unwrap();
    // idempotent
    ctx.init_schema().await.unwrap();
    (dir, path)
}

#[tokio::test]
async fn test_article_tables_share_columns() {
    let (_dir, path) = schema_file().await;
    let conn = Connection::open(&path).unwrap();

    let expected = [
        "id",
        "titre",
        "auteurs",
        "date_publication",
        "resume",
        "lien_pdf",
        "texte_complet",
        "est_controverse",
        "score_controverse",
        "extrait_controverse",
    ];
    for table in ["articles_openalex", "articles_oai"] {
        assert_eq!(columns(&conn, table), expected, "columns of {}", table);
    }
}

#[tokio::test]
async fn test_pdf_link_is_unique() {
    let (_dir, path) = schema_file().await;
    let conn = Connection::open(&path).unwrap();

    conn.execute(
        "INSERT INTO articles_oai (titre, lien_pdf) VALUES ('A', 'http://x/a.pdf')",
        [],
    )
    .unwrap();
    let dup = conn.execute(
        "INSERT INTO articles_oai (titre, lien_pdf) VALUES ('B', 'http://x/a.pdf')",
        [],
    );
    assert!(dup.is_err());

    // the same link may live in the other table
    conn.execute(
        "INSERT INTO articles_openalex (titre, lien_pdf) VALUES ('A', 'http://x/a.pdf')",
        [],
    )
    .unwrap();
}

#[tokio::test]
async fn test_structured_metadata_unique_per_article_and_source() {
    let (_dir, path) = schema_file().await;
    let conn = Connection::open(&path).unwrap();

    let insert = "INSERT INTO grobid_metadata (article_id, source, date_extraction) VALUES (?1, ?2, '2024-01-01T00:00:00Z')";
    conn.execute(insert, rusqlite::params![1, "articles_oai"]).unwrap();
    conn.execute(insert, rusqlite::params![1, "articles_openalex"])
        .unwrap();
    assert!(conn
        .execute(insert, rusqlite::params![1, "articles_oai"])
        .is_err());
}

#[tokio::test]
async fn test_meta_table_exists() {
    let (_dir, path) = schema_file().await;
    let conn = Connection::open(&path).unwrap();

    assert_eq!(columns(&conn, "meta"), ["key", "value"]);
}
