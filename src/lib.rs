// ==========================================
// Wortmann CSV 导入系统 - 核心库
// ==========================================
// 依据: Wortmann CSV 导出格式 (cp1252, 分号分隔)
// 系统定位: 固定模式导入器——一个厂商、一种行格式
// 保证: 无重复发票、失败不留半成品、逐行可追溯报告
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 存储层 - 数据访问
pub mod repository;

// 导入层 - 管道
pub mod importer;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域实体
pub use domain::{
    ImportBatch, ImportReport, ImportStatus, InvoiceDraft, InvoiceLine, OutcomeKind,
    RawImportInput, RawInvoiceRow, RejectReason, RowOutcome, SkipReason,
};

// 导入管道
pub use importer::{
    ByteDecoder, CreditOffset, DraftValidator, DuplicateGuard, FieldMapper, ImportError,
    InvoiceImporter, InvoiceImporterImpl, RowParser,
};

// 配置
pub use config::ImportConfig;

// 存储
pub use repository::{InvoiceStore, SqliteInvoiceStore, StorageError};

// API
pub use api::ImportApi;

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "Wortmann CSV 导入系统";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
