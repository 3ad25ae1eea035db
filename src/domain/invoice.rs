// ==========================================
// Wortmann CSV 导入系统 - 发票领域模型
// ==========================================
// 依据: Wortmann CSV 导出格式 (cp1252, 分号分隔)
// 红线: 金额一律使用 Decimal，禁止二进制浮点
// ==========================================

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ==========================================
// RawImportInput - 系统边界输入
// ==========================================
// 用途: 文件提交时在边界处一次性构造；产出后不可变
#[derive(Debug, Clone)]
pub struct RawImportInput {
    pub bytes: Vec<u8>,           // 原始字节流
    pub declared_encoding: String, // 声明编码标签（厂商固定 cp1252）
    pub source_name: String,      // 源文件名（审计与诊断用）
}

impl RawImportInput {
    pub fn new(bytes: Vec<u8>, declared_encoding: String, source_name: String) -> Self {
        Self {
            bytes,
            declared_encoding,
            source_name,
        }
    }
}

// ==========================================
// RawInvoiceRow - 导入中间结构体
// ==========================================
// 用途: 导入管道中间产物（行解析 → 字段映射 → 此结构）
// 生命周期: 仅在导入流程内
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawInvoiceRow {
    // 源字段（已类型转换）
    pub doc_no: Option<String>,        // 凭证号（自然键）
    pub counterparty: Option<String>,  // 客户内部编号
    pub issue_date: Option<NaiveDate>, // 开票日期
    pub currency: Option<String>,      // 货币代码
    pub article_no: Option<String>,    // 外部物料编号
    pub description: Option<String>,   // 物料描述
    pub qty: Option<Decimal>,          // 数量（德式小数逗号已转换）
    pub unit_price: Option<Decimal>,   // 单价
    pub total: Option<Decimal>,        // 行总额（文件声明值）

    // 元信息
    pub row_number: usize, // 原始文件数据行号（1 起，用于诊断）
}

// ==========================================
// InvoiceLine - 发票行项目
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceLine {
    pub line_no: u32,                // 行序号（1 起）
    pub article_no: Option<String>,  // 外部物料编号
    pub description: Option<String>, // 描述
    pub qty: Decimal,                // 数量
    pub unit_price: Decimal,         // 单价
}

impl InvoiceLine {
    /// 行小计 = qty × unit_price
    pub fn subtotal(&self) -> Decimal {
        self.qty * self.unit_price
    }
}

// ==========================================
// InvoiceDraft - 已校验的发票创建请求
// ==========================================
// 不变式: total 与行小计之和的差 ≤ 容差（校验器保证）
// 用途: 校验器产出，存储层消费；产出后不可变
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceDraft {
    pub doc_no: String,       // 凭证号（自然键，批内与跨批唯一）
    pub counterparty: String, // 客户内部编号
    pub issue_date: NaiveDate,
    pub currency: String, // ISO 4217 三字母码
    pub lines: Vec<InvoiceLine>,
    pub total: Decimal, // 文件声明总额

    // 结算补充（来自配置的客户折扣表）
    pub discount_percent: Option<Decimal>,
}

impl InvoiceDraft {
    /// 重算总额（行小计之和）
    pub fn computed_total(&self) -> Decimal {
        self.lines.iter().map(InvoiceLine::subtotal).sum()
    }

    /// 折后应收总额
    pub fn grand_total(&self) -> Decimal {
        match self.discount_percent {
            Some(d) => self.total * (Decimal::ONE_HUNDRED - d) / Decimal::ONE_HUNDRED,
            None => self.total,
        }
    }
}
