// ==========================================
// Wortmann CSV 导入系统 - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// 分层: 管道级错误（致命，整体中止）/ 行级错误（仅影响单行）
// ==========================================

use crate::domain::report::RejectReason;
use rust_decimal::Decimal;
use thiserror::Error;

/// 导入模块错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 管道级错误（致命，status = failed）=====
    #[error("解码失败 (字节偏移 {offset}): 0x{byte:02X} 在 {encoding} 中无映射")]
    DecodeError {
        offset: usize,
        byte: u8,
        encoding: String,
    },

    #[error("表头缺少必填列: {}", .missing.join(", "))]
    SchemaError { missing: Vec<String> },

    #[error("未知编码标签: {0}")]
    UnknownEncoding(String),

    #[error("CSV 表头解析失败: {0}")]
    HeaderParseError(String),

    // ===== 行级错误（仅拒绝该行）=====
    #[error("行结构损坏 (行 {row}): {message}")]
    StructuralRowError { row: usize, message: String },

    #[error("必填字段缺失 (行 {row}): {field}")]
    MissingField { row: usize, field: &'static str },

    #[error("日期格式错误 (行 {row}, 字段 {field}): 期望 TT.MM.JJJJ，实际 {value}")]
    DateFormatError {
        row: usize,
        field: &'static str,
        value: String,
    },

    #[error("数值格式错误 (行 {row}, 字段 {field}): 无法解析 {value}")]
    NumberFormatError {
        row: usize,
        field: &'static str,
        value: String,
    },

    #[error("货币代码格式错误 (行 {row}): {value}（期望 ISO 4217 三字母码）")]
    CurrencyFormatError { row: usize, value: String },

    #[error("总额不一致 (行 {row}): 声明 {stated}，重算 {computed}，容差 {tolerance}")]
    TotalMismatch {
        row: usize,
        stated: Decimal,
        computed: Decimal,
        tolerance: Decimal,
    },

    #[error("负数行无对应正数行 (行 {row}): 凭证号 {doc_no}")]
    NoOffsetMatch { row: usize, doc_no: String },

    #[error("数值超出范围 (行 {row}, 字段 {field}): {value}")]
    ValueRangeError {
        row: usize,
        field: &'static str,
        value: Decimal,
    },

    // ===== 存储层错误（提交时，行级）=====
    #[error("存储层错误 (行 {row}): {source}")]
    Storage {
        row: usize,
        #[source]
        source: crate::repository::error::StorageError,
    },

    #[error("存储层调用超时 (行 {row}): 超过 {timeout_ms} ms")]
    StorageTimeout { row: usize, timeout_ms: u64 },

    // ===== 通用错误 =====
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ImportError {
    /// 是否为管道级致命错误（中止整次导入，零行处理）
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ImportError::DecodeError { .. }
                | ImportError::UnknownEncoding(_)
                | ImportError::SchemaError { .. }
                | ImportError::HeaderParseError(_)
        )
    }

    /// 行级错误对应的拒绝原因代码
    pub fn reject_reason(&self) -> RejectReason {
        match self {
            ImportError::StructuralRowError { .. } => RejectReason::StructuralRow,
            ImportError::MissingField { .. } => RejectReason::MissingField,
            ImportError::DateFormatError { .. } => RejectReason::BadDate,
            ImportError::NumberFormatError { .. } => RejectReason::BadNumber,
            ImportError::ValueRangeError { .. } => RejectReason::BadNumber,
            ImportError::CurrencyFormatError { .. } => RejectReason::BadCurrency,
            ImportError::TotalMismatch { .. } => RejectReason::TotalMismatch,
            ImportError::NoOffsetMatch { .. } => RejectReason::NoOffsetMatch,
            ImportError::Storage { source, .. } => {
                if source.is_counterparty_missing() {
                    RejectReason::CounterpartyUnknown
                } else {
                    RejectReason::Storage
                }
            }
            ImportError::StorageTimeout { .. } => RejectReason::StorageTimeout,
            // 管道级错误不产生行结果；此分支仅为完整性
            _ => RejectReason::Storage,
        }
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        let decode = ImportError::DecodeError {
            offset: 12,
            byte: 0x81,
            encoding: "cp1252".to_string(),
        };
        assert!(decode.is_fatal());

        let schema = ImportError::SchemaError {
            missing: vec!["doc_no".to_string()],
        };
        assert!(schema.is_fatal());

        let row = ImportError::MissingField {
            row: 3,
            field: "currency",
        };
        assert!(!row.is_fatal());
    }

    #[test]
    fn test_reject_reason_mapping() {
        let err = ImportError::TotalMismatch {
            row: 2,
            stated: Decimal::new(1000, 2),
            computed: Decimal::new(990, 2),
            tolerance: Decimal::new(1, 2),
        };
        assert_eq!(err.reject_reason(), RejectReason::TotalMismatch);
        assert!(err.to_string().contains("行 2"));
    }
}
