// ==========================================
// Wortmann CSV 导入系统 - SQLite 发票存储实现
// ==========================================
// 职责: InvoiceStore 的 rusqlite 实现
// 事务边界: 每张发票一个事务（表头 + 行项目原子提交）
// 红线: 金额以 TEXT 存储 Decimal 字符串，避免浮点损失
// ==========================================

use crate::db::{init_schema, open_sqlite_connection};
use crate::domain::invoice::InvoiceDraft;
use crate::domain::report::{ImportBatch, ImportStatus};
use crate::repository::error::{StorageError, StorageResult};
use crate::repository::invoice_store::InvoiceStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

// ==========================================
// SqliteInvoiceStore
// ==========================================
pub struct SqliteInvoiceStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteInvoiceStore {
    /// 创建新的存储实例（打开连接并确保表结构）
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> StorageResult<Self> {
        let conn = open_sqlite_connection(db_path)
            .map_err(|e| StorageError::ConnectionError(e.to_string()))?;
        init_schema(&conn).map_err(|e| StorageError::ConnectionError(e.to_string()))?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> StorageResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| StorageError::LockError(e.to_string()))
    }
}

/// 凭证号唯一约束命中时给出业务可辨识的错误
fn map_insert_err(err: rusqlite::Error, doc_no: &str) -> StorageError {
    match &err {
        rusqlite::Error::SqliteFailure(_, Some(msg)) if msg.contains("UNIQUE") => {
            StorageError::DocumentNumberExists(doc_no.to_string())
        }
        _ => StorageError::from(err),
    }
}

/// 批次状态 TEXT → 枚举（历史数据容错为 FAILED）
fn parse_status(raw: &str) -> ImportStatus {
    match raw {
        "SUCCESS" => ImportStatus::Success,
        "PARTIAL" => ImportStatus::Partial,
        _ => ImportStatus::Failed,
    }
}

#[async_trait]
impl InvoiceStore for SqliteInvoiceStore {
    async fn find_invoice_by_document_number(
        &self,
        doc_no: &str,
    ) -> StorageResult<Option<String>> {
        let conn = self.lock()?;
        let id: Option<String> = conn
            .query_row(
                "SELECT invoice_id FROM invoice WHERE doc_no = ?1",
                params![doc_no],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id)
    }

    async fn create_invoice(&self, draft: &InvoiceDraft) -> StorageResult<String> {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction()
            .map_err(|e| StorageError::TransactionError(e.to_string()))?;

        // 客户存在性校验（提交时，拒绝仅影响该行）
        let counterparty_exists: Option<i64> = tx
            .query_row(
                "SELECT 1 FROM counterparty WHERE code = ?1",
                params![draft.counterparty],
                |row| row.get(0),
            )
            .optional()?;
        if counterparty_exists.is_none() {
            return Err(StorageError::CounterpartyNotFound(
                draft.counterparty.clone(),
            ));
        }

        let invoice_id = Uuid::new_v4().to_string();
        tx.execute(
            r#"
            INSERT INTO invoice (
                invoice_id, doc_no, counterparty_code, issue_date, currency,
                discount_percent, total, grand_total, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                invoice_id,
                draft.doc_no,
                draft.counterparty,
                draft.issue_date.format("%Y-%m-%d").to_string(),
                draft.currency,
                draft.discount_percent.map(|d| d.to_string()),
                draft.total.to_string(),
                draft.grand_total().to_string(),
                Utc::now().to_rfc3339(),
            ],
        )
        .map_err(|e| map_insert_err(e, &draft.doc_no))?;

        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO invoice_line (
                    invoice_id, line_no, article_no, description,
                    qty, unit_price, line_total
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
            )?;
            for line in &draft.lines {
                stmt.execute(params![
                    invoice_id,
                    line.line_no,
                    line.article_no,
                    line.description,
                    line.qty.to_string(),
                    line.unit_price.to_string(),
                    line.subtotal().to_string(),
                ])?;
            }
        }

        tx.commit()
            .map_err(|e| StorageError::TransactionError(e.to_string()))?;

        Ok(invoice_id)
    }

    async fn register_counterparty(&self, code: &str, name: &str) -> StorageResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR IGNORE INTO counterparty (code, name) VALUES (?1, ?2)",
            params![code, name],
        )?;
        Ok(())
    }

    async fn insert_batch(&self, batch: &ImportBatch) -> StorageResult<()> {
        let conn = self.lock()?;
        conn.execute(
            r#"
            INSERT INTO import_batch (
                batch_id, file_name, status, total_rows, created_rows,
                skipped_rows, rejected_rows, imported_at, elapsed_ms, report_json
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                batch.batch_id,
                batch.file_name,
                batch.status.as_str(),
                batch.total_rows,
                batch.created_rows,
                batch.skipped_rows,
                batch.rejected_rows,
                batch.imported_at.map(|t| t.to_rfc3339()),
                batch.elapsed_ms,
                batch.report_json,
            ],
        )?;
        Ok(())
    }

    async fn recent_batches(&self, limit: usize) -> StorageResult<Vec<ImportBatch>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT batch_id, file_name, status, total_rows, created_rows,
                   skipped_rows, rejected_rows, imported_at, elapsed_ms, report_json
            FROM import_batch
            ORDER BY imported_at DESC
            LIMIT ?1
            "#,
        )?;

        let batches = stmt
            .query_map(params![limit as i64], |row| {
                let status_raw: String = row.get(2)?;
                let imported_at_raw: Option<String> = row.get(7)?;
                Ok(ImportBatch {
                    batch_id: row.get(0)?,
                    file_name: row.get(1)?,
                    status: parse_status(&status_raw),
                    total_rows: row.get(3)?,
                    created_rows: row.get(4)?,
                    skipped_rows: row.get(5)?,
                    rejected_rows: row.get(6)?,
                    imported_at: imported_at_raw.and_then(|t| {
                        DateTime::parse_from_rfc3339(&t)
                            .ok()
                            .map(|dt| dt.with_timezone(&Utc))
                    }),
                    elapsed_ms: row.get(8)?,
                    report_json: row.get(9)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(batches)
    }

    async fn count_invoices(&self) -> StorageResult<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM invoice", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::invoice::InvoiceLine;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use std::str::FromStr;
    use tempfile::NamedTempFile;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn test_store() -> (NamedTempFile, SqliteInvoiceStore) {
        let temp = NamedTempFile::new().unwrap();
        let store = SqliteInvoiceStore::new(temp.path().to_str().unwrap()).unwrap();
        (temp, store)
    }

    fn test_draft(doc_no: &str) -> InvoiceDraft {
        InvoiceDraft {
            doc_no: doc_no.to_string(),
            counterparty: "K0042".to_string(),
            issue_date: NaiveDate::from_ymd_opt(2025, 3, 14).unwrap(),
            currency: "EUR".to_string(),
            lines: vec![InvoiceLine {
                line_no: 1,
                article_no: Some("ART-9".to_string()),
                description: Some("Office Lizenz".to_string()),
                qty: dec("3"),
                unit_price: dec("12.50"),
            }],
            total: dec("37.50"),
            discount_percent: None,
        }
    }

    #[tokio::test]
    async fn test_create_and_find_invoice() {
        let (_temp, store) = test_store();
        store.register_counterparty("K0042", "Musterfirma GmbH").await.unwrap();

        let id = store.create_invoice(&test_draft("RE-1001")).await.unwrap();
        assert!(!id.is_empty());

        let found = store
            .find_invoice_by_document_number("RE-1001")
            .await
            .unwrap();
        assert_eq!(found, Some(id));
        assert_eq!(store.count_invoices().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_doc_no_is_constraint_error() {
        let (_temp, store) = test_store();
        store.register_counterparty("K0042", "Musterfirma GmbH").await.unwrap();

        store.create_invoice(&test_draft("RE-1001")).await.unwrap();
        let err = store.create_invoice(&test_draft("RE-1001")).await.unwrap_err();
        assert!(err.is_document_number_conflict());
        // 第二次提交不得留下任何残留行
        assert_eq!(store.count_invoices().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_unknown_counterparty_rejected_atomically() {
        let (_temp, store) = test_store();
        let err = store.create_invoice(&test_draft("RE-1001")).await.unwrap_err();
        assert!(err.is_counterparty_missing());
        assert_eq!(store.count_invoices().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_batch_roundtrip() {
        let (_temp, store) = test_store();
        let batch = ImportBatch {
            batch_id: "b-1".to_string(),
            file_name: Some("wortmann_2025_03.csv".to_string()),
            status: ImportStatus::Partial,
            total_rows: 11,
            created_rows: 9,
            skipped_rows: 1,
            rejected_rows: 1,
            imported_at: Some(Utc::now()),
            elapsed_ms: Some(42),
            report_json: None,
        };
        store.insert_batch(&batch).await.unwrap();

        let batches = store.recent_batches(10).await.unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].batch_id, "b-1");
        assert_eq!(batches[0].status, ImportStatus::Partial);
        assert_eq!(batches[0].total_rows, 11);
    }
}
