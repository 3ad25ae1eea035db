// ==========================================
// Wortmann CSV 导入系统 - 导入结果模型
// ==========================================
// 职责: 逐行结果、整体状态与批次审计记录
// 红线: RowOutcome / ImportReport 产出后不可变
// ==========================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// SkipReason - 跳过原因
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    Duplicate,    // 凭证号已存在（批内或跨批），幂等跳过
    ZeroTotal,    // 冲抵后总额为零（Nullrechnungen unterdrücken）
    OffsetMerged, // 负数行已并入对应正数行
}

// ==========================================
// RejectReason - 拒绝原因代码
// ==========================================
// 红线: 每个拒绝必须携带具体代码，禁止笼统的 "invalid row"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectReason {
    StructuralRow,       // 行结构损坏（引号不闭合/字段数不符）
    MissingField,        // 必填字段缺失或为空
    BadDate,             // 日期格式错误
    BadNumber,           // 数值格式错误
    BadCurrency,         // 货币代码格式错误
    TotalMismatch,       // 声明总额与重算总额超出容差
    NoOffsetMatch,       // 负数行找不到对应的正数行
    CounterpartyUnknown, // 客户编号在主数据中不存在
    Storage,             // 存储层提交失败
    StorageTimeout,      // 存储层调用超时
}

// ==========================================
// OutcomeKind - 行结果类型
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutcomeKind {
    Created { invoice_id: String },
    Skipped { reason: SkipReason },
    Rejected { reason: RejectReason, detail: String },
}

// ==========================================
// RowOutcome - 单行导入结果
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RowOutcome {
    pub row_number: usize,      // 原始文件数据行号（1 起）
    pub doc_no: Option<String>, // 凭证号（可解析时）
    pub kind: OutcomeKind,
}

impl RowOutcome {
    pub fn is_created(&self) -> bool {
        matches!(self.kind, OutcomeKind::Created { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self.kind, OutcomeKind::Skipped { .. })
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self.kind, OutcomeKind::Rejected { .. })
    }
}

// ==========================================
// ImportStatus - 整体状态
// ==========================================
// success: 无 Rejected；partial: 至少一行 Rejected；
// failed: 管道级失败（解码/表头），未处理任何行
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportStatus {
    Success,
    Partial,
    Failed,
}

impl ImportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportStatus::Success => "SUCCESS",
            ImportStatus::Partial => "PARTIAL",
            ImportStatus::Failed => "FAILED",
        }
    }
}

// ==========================================
// ImportReport - 导入报告（唯一对外产物）
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportReport {
    pub status: ImportStatus,
    pub total_rows: usize, // 已见数据行数（= outcomes.len()）
    pub created: usize,
    pub skipped: usize,
    pub rejected: usize,
    pub outcomes: Vec<RowOutcome>, // 按文件行序
    pub message: String,           // 人类可读摘要（德文，面向 Wortmann 对账）
}

impl ImportReport {
    /// 由逐行结果汇总报告
    pub fn from_outcomes(outcomes: Vec<RowOutcome>) -> Self {
        let created = outcomes.iter().filter(|o| o.is_created()).count();
        let skipped = outcomes.iter().filter(|o| o.is_skipped()).count();
        let rejected = outcomes.iter().filter(|o| o.is_rejected()).count();
        let status = if rejected > 0 {
            ImportStatus::Partial
        } else {
            ImportStatus::Success
        };

        let message = render_summary(&outcomes, created, skipped, rejected);

        ImportReport {
            status,
            total_rows: outcomes.len(),
            created,
            skipped,
            rejected,
            outcomes,
            message,
        }
    }

    /// 管道级失败报告（解码失败/表头缺列）：零行处理
    pub fn failed(message: String) -> Self {
        ImportReport {
            status: ImportStatus::Failed,
            total_rows: 0,
            created: 0,
            skipped: 0,
            rejected: 0,
            outcomes: Vec::new(),
            message,
        }
    }
}

/// 生成德文摘要文本（对齐 Wortmann 对账报告格式）
fn render_summary(
    outcomes: &[RowOutcome],
    created: usize,
    skipped: usize,
    rejected: usize,
) -> String {
    let mut lines = vec![
        format!("Gesamtzahl Zeilen: {}", outcomes.len()),
        format!("Gesamtzahl erz. Rechnungen: {}", created),
        format!("Übersprungen: {}", skipped),
    ];

    if rejected > 0 {
        lines.push(format!("\nFehler ({}):", rejected));
        for outcome in outcomes {
            if let OutcomeKind::Rejected { detail, .. } = &outcome.kind {
                lines.push(format!("- Zeile {}: {}", outcome.row_number, detail));
            }
        }
    }

    lines.join("\n")
}

// ==========================================
// ImportBatch - 导入批次审计记录
// ==========================================
// 用途: 每次导入落库一条（Importhistorie）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportBatch {
    pub batch_id: String, // 批次 ID（UUID）
    pub file_name: Option<String>,
    pub status: ImportStatus,
    pub total_rows: i32,
    pub created_rows: i32,
    pub skipped_rows: i32,
    pub rejected_rows: i32,
    pub imported_at: Option<DateTime<Utc>>,
    pub elapsed_ms: Option<i32>,
    pub report_json: Option<String>, // 完整 ImportReport 的 JSON
}
