// ==========================================
// Wortmann CSV 导入系统 - 存储层
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 红线: Repository 不含业务逻辑；所有查询参数化
// ==========================================

pub mod error;
pub mod invoice_store;
pub mod sqlite_store;

// 重导出核心类型
pub use error::{StorageError, StorageResult};
pub use invoice_store::InvoiceStore;
pub use sqlite_store::SqliteInvoiceStore;
