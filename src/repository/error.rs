// ==========================================
// Wortmann CSV 导入系统 - 存储层错误类型
// ==========================================
// 工具: thiserror 派生宏
// 红线: 约束违反必须可区分（凭证号唯一约束 → 幂等跳过）
// ==========================================

use thiserror::Error;

/// 存储层错误类型
#[derive(Error, Debug)]
pub enum StorageError {
    // ===== 提交约束 =====
    #[error("凭证号已存在: {0}")]
    DocumentNumberExists(String),

    #[error("客户编号不存在: {0}")]
    CounterpartyNotFound(String),

    // ===== 数据库错误 =====
    #[error("数据库连接失败: {0}")]
    ConnectionError(String),

    #[error("数据库锁获取失败: {0}")]
    LockError(String),

    #[error("数据库事务失败: {0}")]
    TransactionError(String),

    #[error("数据库查询失败: {0}")]
    QueryError(String),

    // ===== 通用错误 =====
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StorageError {
    /// 凭证号唯一约束命中（并发竞态下的兜底信号，调用方按幂等跳过处理）
    pub fn is_document_number_conflict(&self) -> bool {
        matches!(self, StorageError::DocumentNumberExists(_))
    }

    pub fn is_counterparty_missing(&self) -> bool {
        matches!(self, StorageError::CounterpartyNotFound(_))
    }
}

// 实现 From<rusqlite::Error>
impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(_, Some(msg)) if msg.contains("UNIQUE") => {
                StorageError::DocumentNumberExists(msg)
            }
            _ => StorageError::QueryError(err.to_string()),
        }
    }
}

/// Result 类型别名
pub type StorageResult<T> = Result<T, StorageError>;
