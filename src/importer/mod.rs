// ==========================================
// Wortmann CSV 导入系统 - 导入层
// ==========================================
// 职责: 字节流 → 发票落库的完整管道
// 阶段: 解码 → 解析 → 映射 → 冲抵 → 校验 → 幂等 → 提交
// ==========================================

// 模块声明
pub mod byte_decoder;
pub mod credit_offset;
pub mod draft_validator;
pub mod duplicate_guard;
pub mod error;
pub mod field_mapper;
pub mod invoice_importer_impl;
pub mod invoice_importer_trait;
pub mod row_parser;

// 重导出核心类型
pub use byte_decoder::ByteDecoder;
pub use credit_offset::{CreditOffset, OffsetOutcome};
pub use draft_validator::DraftValidator;
pub use duplicate_guard::{DuplicateGuard, KeyCheck};
pub use error::{ImportError, ImportResult};
pub use field_mapper::FieldMapper;
pub use invoice_importer_impl::InvoiceImporterImpl;
pub use row_parser::{ParsedRow, RowIter, RowParser};

// 重导出 Trait 接口
pub use invoice_importer_trait::InvoiceImporter;
