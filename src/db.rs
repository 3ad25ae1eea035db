// ==========================================
// Wortmann CSV 导入系统 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为
// - 统一 busy_timeout，减少并发导入时的偶发 busy 错误
// - 建表语句集中在此（本库仅四张表，不引入外部迁移）
// ==========================================

use rusqlite::Connection;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 初始化发票相关表结构（幂等）
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS counterparty (
            code        TEXT PRIMARY KEY,
            name        TEXT NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS invoice (
            invoice_id        TEXT PRIMARY KEY,
            doc_no            TEXT NOT NULL UNIQUE,
            counterparty_code TEXT NOT NULL REFERENCES counterparty(code),
            issue_date        TEXT NOT NULL,
            currency          TEXT NOT NULL,
            discount_percent  TEXT,
            total             TEXT NOT NULL,
            grand_total       TEXT NOT NULL,
            created_at        TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS invoice_line (
            invoice_id  TEXT NOT NULL REFERENCES invoice(invoice_id) ON DELETE CASCADE,
            line_no     INTEGER NOT NULL,
            article_no  TEXT,
            description TEXT,
            qty         TEXT NOT NULL,
            unit_price  TEXT NOT NULL,
            line_total  TEXT NOT NULL,
            PRIMARY KEY (invoice_id, line_no)
        );

        CREATE TABLE IF NOT EXISTS import_batch (
            batch_id      TEXT PRIMARY KEY,
            file_name     TEXT,
            status        TEXT NOT NULL,
            total_rows    INTEGER NOT NULL,
            created_rows  INTEGER NOT NULL,
            skipped_rows  INTEGER NOT NULL,
            rejected_rows INTEGER NOT NULL,
            imported_at   TEXT,
            elapsed_ms    INTEGER,
            report_json   TEXT
        );
        "#,
    )
}
