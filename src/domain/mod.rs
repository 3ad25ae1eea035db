// ==========================================
// Wortmann CSV 导入系统 - 领域模型层
// ==========================================
// 职责: 定义发票实体与导入结果类型
// 红线: 不含数据访问逻辑,不含管道逻辑
// ==========================================

pub mod invoice;
pub mod report;

// 重导出核心类型
pub use invoice::{InvoiceDraft, InvoiceLine, RawImportInput, RawInvoiceRow};
pub use report::{
    ImportBatch, ImportReport, ImportStatus, OutcomeKind, RejectReason, RowOutcome, SkipReason,
};
