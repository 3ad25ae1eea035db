// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 提供测试所需的数据库初始化、客户主数据种子等功能
// ==========================================

use rusqlite::Connection;
use std::error::Error;
use tempfile::NamedTempFile;
use wortmann_invoice_import::db::{init_schema, open_sqlite_connection};

/// 创建临时测试数据库并初始化 schema
///
/// # 返回
/// - NamedTempFile: 临时数据库文件（需要保持存活）
/// - String: 数据库文件路径
pub fn create_test_db() -> Result<(NamedTempFile, String), Box<dyn Error>> {
    let temp_file = NamedTempFile::new()?;
    let db_path = temp_file.path().to_str().ok_or("non-utf8 temp path")?.to_string();

    let conn = open_sqlite_connection(&db_path)?;
    init_schema(&conn)?;

    Ok((temp_file, db_path))
}

/// 登记测试客户主数据
pub fn seed_counterparty(db_path: &str, code: &str, name: &str) -> Result<(), Box<dyn Error>> {
    let conn = Connection::open(db_path)?;
    conn.execute(
        "INSERT OR IGNORE INTO counterparty (code, name) VALUES (?1, ?2)",
        rusqlite::params![code, name],
    )?;
    Ok(())
}

/// 统计 invoice 表记录数
pub fn count_invoices(db_path: &str) -> Result<i64, Box<dyn Error>> {
    let conn = Connection::open(db_path)?;
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM invoice", [], |row| row.get(0))?;
    Ok(count)
}
