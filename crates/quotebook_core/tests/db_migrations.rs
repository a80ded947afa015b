use quotebook_core::db::migrations::{latest_version, schema_version};
use quotebook_core::db::{open_db, open_db_in_memory, DbError};
use quotebook_core::{BookRepository, RepoError, SqliteBookRepository};
use rusqlite::Connection;

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn).unwrap(), latest_version());
    assert_table_exists(&conn, "books");
    assert_table_exists(&conn, "quotes");
    assert_index_exists(&conn, "idx_books_user_id");
}

#[test]
fn opened_connection_enforces_foreign_keys() {
    let conn = open_db_in_memory().unwrap();
    let enabled: i64 = conn
        .query_row("PRAGMA foreign_keys;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(enabled, 1);
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("quotebook.db");

    let first = open_db(&path).unwrap();
    assert_eq!(schema_version(&first).unwrap(), latest_version());
    drop(first);

    let second = open_db(&path).unwrap();
    assert_eq!(schema_version(&second).unwrap(), latest_version());
    assert_table_exists(&second, "books");
}

#[test]
fn repository_initialize_can_run_on_every_start() {
    let mut repo = SqliteBookRepository::open_in_memory().unwrap();
    repo.initialize().unwrap();
    repo.initialize().unwrap();
    assert_table_exists(repo.connection(), "quotes");
}

#[test]
fn repository_initialize_bootstraps_a_raw_connection() {
    let mut repo = SqliteBookRepository::new(Connection::open_in_memory().unwrap());
    repo.initialize().unwrap();

    assert_eq!(schema_version(repo.connection()).unwrap(), latest_version());
    assert_index_exists(repo.connection(), "idx_books_user_id");
}

#[test]
fn initialize_recreates_tables_missing_from_versioned_database() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(&format!("PRAGMA user_version = {};", latest_version()))
        .unwrap();

    let mut repo = SqliteBookRepository::new(conn);
    repo.initialize().unwrap();

    assert_table_exists(repo.connection(), "books");
    assert_table_exists(repo.connection(), "quotes");
    assert_index_exists(repo.connection(), "idx_books_user_id");
}

#[test]
fn reopening_file_recreates_dropped_user_index() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("quotebook.db");

    let repo = SqliteBookRepository::open(&path).unwrap();
    repo.connection()
        .execute_batch("DROP INDEX idx_books_user_id;")
        .unwrap();
    assert_eq!(sqlite_master_count(repo.connection(), "index", "idx_books_user_id"), 0);
    drop(repo);

    let mut repo = SqliteBookRepository::open(&path).unwrap();
    assert_index_exists(repo.connection(), "idx_books_user_id");
    repo.initialize().unwrap();
    assert_index_exists(repo.connection(), "idx_books_user_id");
}

#[test]
fn reopening_file_recreates_dropped_quotes_table() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("quotebook.db");

    let repo = SqliteBookRepository::open(&path).unwrap();
    repo.connection().execute_batch("DROP TABLE quotes;").unwrap();
    drop(repo);

    let repo = SqliteBookRepository::open(&path).unwrap();
    assert_table_exists(repo.connection(), "quotes");
    assert_index_exists(repo.connection(), "idx_quotes_book_id");
}

#[test]
fn initialize_rejects_table_missing_required_column() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TABLE books (id TEXT PRIMARY KEY NOT NULL, title TEXT NOT NULL);
         CREATE TABLE quotes (id TEXT PRIMARY KEY NOT NULL, book_id TEXT NOT NULL, text TEXT NOT NULL);",
    )
    .unwrap();
    conn.execute_batch(&format!("PRAGMA user_version = {};", latest_version()))
        .unwrap();

    let mut repo = SqliteBookRepository::new(conn);
    assert!(matches!(
        repo.initialize(),
        Err(RepoError::MissingRequiredColumn {
            table: "books",
            column: "user_id"
        })
    ));
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    match open_db(&path).unwrap_err() {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

fn assert_table_exists(conn: &Connection, name: &str) {
    assert_eq!(sqlite_master_count(conn, "table", name), 1, "table {name} does not exist");
}

fn assert_index_exists(conn: &Connection, name: &str) {
    assert_eq!(sqlite_master_count(conn, "index", name), 1, "index {name} does not exist");
}

fn sqlite_master_count(conn: &Connection, kind: &str, name: &str) -> i64 {
    conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = ?1 AND name = ?2;",
        [kind, name],
        |row| row.get(0),
    )
    .unwrap()
}
