// ==========================================
// Wortmann CSV 导入系统 - API 层错误类型
// ==========================================
// 工具: thiserror 派生宏
// ==========================================

use thiserror::Error;

/// API 层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("导入错误: {0}")]
    ImportError(String),

    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("无效输入: {0}")]
    InvalidInput(String),
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;
