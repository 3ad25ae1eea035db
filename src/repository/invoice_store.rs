// ==========================================
// Wortmann CSV 导入系统 - 发票存储 Trait
// ==========================================
// 职责: 定义导入管道所需的存储访问接口（不包含实现）
// 红线: Repository 不含业务规则，只做数据 CRUD
// ==========================================

use crate::domain::invoice::InvoiceDraft;
use crate::domain::report::ImportBatch;
use crate::repository::error::StorageResult;
use async_trait::async_trait;

// ==========================================
// InvoiceStore Trait
// ==========================================
// 用途: 发票创建与幂等查询
// 实现者: SqliteInvoiceStore（使用 rusqlite）
#[async_trait]
pub trait InvoiceStore: Send + Sync {
    // ===== 幂等查询 =====

    /// 按凭证号查询已提交发票
    ///
    /// # 参数
    /// - doc_no: 凭证号（自然键）
    ///
    /// # 返回
    /// - Ok(Some(invoice_id)): 已存在
    /// - Ok(None): 不存在
    async fn find_invoice_by_document_number(
        &self,
        doc_no: &str,
    ) -> StorageResult<Option<String>>;

    // ===== 提交 =====

    /// 创建发票（表头 + 行项目在单个事务内原子落库）
    ///
    /// # 参数
    /// - draft: 已校验的发票草稿
    ///
    /// # 返回
    /// - Ok(invoice_id): 创建成功
    /// - Err(DocumentNumberExists): 凭证号唯一约束命中（并发兜底）
    /// - Err(CounterpartyNotFound): 客户编号不在主数据中
    /// - Err: 其他数据库错误（该事务整体回滚）
    async fn create_invoice(&self, draft: &InvoiceDraft) -> StorageResult<String>;

    // ===== 主数据 =====

    /// 登记客户主数据（初始化/测试种子）
    ///
    /// # 参数
    /// - code: 客户内部编号
    /// - name: 客户名称
    async fn register_counterparty(&self, code: &str, name: &str) -> StorageResult<()>;

    // ===== 批次审计 =====

    /// 插入导入批次记录
    ///
    /// # 参数
    /// - batch: 批次信息
    async fn insert_batch(&self, batch: &ImportBatch) -> StorageResult<()>;

    /// 查询最近的导入批次
    ///
    /// # 参数
    /// - limit: 返回记录数限制
    async fn recent_batches(&self, limit: usize) -> StorageResult<Vec<ImportBatch>>;

    // ===== 统计 =====

    /// 统计 invoice 表记录数
    async fn count_invoices(&self) -> StorageResult<usize>;
}
