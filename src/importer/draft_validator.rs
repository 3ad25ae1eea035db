// ==========================================
// Wortmann CSV 导入系统 - 发票草稿校验器
// ==========================================
// 职责: RawInvoiceRow → InvoiceDraft（每行独立，首错即停）
// 校验顺序: 字段齐全 → 代码形态 → 数值范围 → 总额一致性
// 红线: 总额不一致一律拒绝，绝不静默修正
// ==========================================

use crate::domain::invoice::{InvoiceDraft, InvoiceLine, RawInvoiceRow};
use crate::importer::error::{ImportError, ImportResult};
use rust_decimal::Decimal;

pub struct DraftValidator {
    total_tolerance: Decimal, // 最小货币单位（默认 0.01）
}

impl DraftValidator {
    pub fn new(total_tolerance: Decimal) -> Self {
        Self { total_tolerance }
    }

    /// 校验并构造发票草稿
    ///
    /// # 参数
    /// - row: 类型化行（字段映射器产物，冲抵已完成）
    /// - discount_percent: 客户折扣（配置表查得，可空）
    ///
    /// # 返回
    /// - Ok(InvoiceDraft): 全部校验通过
    /// - Err: 行级错误，携带行号与具体原因代码
    pub fn build_draft(
        &self,
        row: &RawInvoiceRow,
        discount_percent: Option<Decimal>,
    ) -> ImportResult<InvoiceDraft> {
        let row_number = row.row_number;

        let doc_no = require(row.doc_no.as_deref(), "doc_no", row_number)?;
        let counterparty = require(row.counterparty.as_deref(), "counterparty", row_number)?;
        let issue_date = row.issue_date.ok_or(ImportError::MissingField {
            row: row_number,
            field: "date",
        })?;
        let currency_raw = require(row.currency.as_deref(), "currency", row_number)?;
        let qty = row.qty.ok_or(ImportError::MissingField {
            row: row_number,
            field: "qty",
        })?;
        let unit_price = row.unit_price.ok_or(ImportError::MissingField {
            row: row_number,
            field: "price",
        })?;
        let stated_total = row.total.ok_or(ImportError::MissingField {
            row: row_number,
            field: "total",
        })?;

        // 货币代码形态（ISO 4217 三字母）；客户/物料编号的存在性
        // 校验延迟到存储层提交时
        let currency = validate_currency(&currency_raw, row_number)?;

        // 数值范围（冲抵后仍须为正）
        if qty <= Decimal::ZERO {
            return Err(ImportError::ValueRangeError {
                row: row_number,
                field: "qty",
                value: qty,
            });
        }
        if unit_price < Decimal::ZERO {
            return Err(ImportError::ValueRangeError {
                row: row_number,
                field: "price",
                value: unit_price,
            });
        }

        let lines = vec![InvoiceLine {
            line_no: 1,
            article_no: row.article_no.clone(),
            description: row.description.clone(),
            qty,
            unit_price,
        }];

        // 总额一致性：重算值与声明值之差 ≤ 容差
        let computed: Decimal = lines.iter().map(InvoiceLine::subtotal).sum();
        if (computed - stated_total).abs() > self.total_tolerance {
            return Err(ImportError::TotalMismatch {
                row: row_number,
                stated: stated_total,
                computed,
                tolerance: self.total_tolerance,
            });
        }

        Ok(InvoiceDraft {
            doc_no,
            counterparty,
            issue_date,
            currency,
            lines,
            total: stated_total,
            discount_percent,
        })
    }
}

fn require(
    value: Option<&str>,
    field: &'static str,
    row: usize,
) -> ImportResult<String> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(ImportError::MissingField { row, field }),
    }
}

/// ISO 4217 形态校验：恰好 3 个 ASCII 字母，统一转大写
fn validate_currency(raw: &str, row: usize) -> ImportResult<String> {
    let trimmed = raw.trim();
    if trimmed.len() == 3 && trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
        Ok(trimmed.to_ascii_uppercase())
    } else {
        Err(ImportError::CurrencyFormatError {
            row,
            value: raw.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn validator() -> DraftValidator {
        DraftValidator::new(Decimal::new(1, 2))
    }

    fn valid_row() -> RawInvoiceRow {
        RawInvoiceRow {
            doc_no: Some("RE-1001".to_string()),
            counterparty: Some("K0042".to_string()),
            issue_date: NaiveDate::from_ymd_opt(2025, 3, 14),
            currency: Some("eur".to_string()),
            article_no: Some("ART-9".to_string()),
            description: Some("Office Lizenz".to_string()),
            qty: Some(dec("3")),
            unit_price: Some(dec("12.50")),
            total: Some(dec("37.50")),
            row_number: 1,
        }
    }

    #[test]
    fn test_valid_row_builds_draft() {
        let draft = validator().build_draft(&valid_row(), None).unwrap();
        assert_eq!(draft.doc_no, "RE-1001");
        assert_eq!(draft.currency, "EUR"); // 统一大写
        assert_eq!(draft.lines.len(), 1);
        assert_eq!(draft.computed_total(), dec("37.50"));
    }

    #[test]
    fn test_total_within_tolerance_accepted() {
        let mut row = valid_row();
        row.total = Some(dec("37.51")); // 差 1 分，在容差内
        let draft = validator().build_draft(&row, None).unwrap();
        assert_eq!(draft.total, dec("37.51"));
    }

    #[test]
    fn test_total_mismatch_rejected() {
        let mut row = valid_row();
        row.total = Some(dec("40.00"));
        let err = validator().build_draft(&row, None).unwrap_err();
        match err {
            ImportError::TotalMismatch {
                stated, computed, ..
            } => {
                assert_eq!(stated, dec("40.00"));
                assert_eq!(computed, dec("37.50"));
            }
            other => panic!("Expected TotalMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_bad_currency_code() {
        let mut row = valid_row();
        row.currency = Some("EURO".to_string());
        let err = validator().build_draft(&row, None).unwrap_err();
        assert!(matches!(err, ImportError::CurrencyFormatError { .. }));
    }

    #[test]
    fn test_negative_qty_rejected() {
        let mut row = valid_row();
        row.qty = Some(dec("-1"));
        row.total = Some(dec("-12.50"));
        let err = validator().build_draft(&row, None).unwrap_err();
        assert!(matches!(
            err,
            ImportError::ValueRangeError { field: "qty", .. }
        ));
    }

    #[test]
    fn test_discount_carried_onto_draft() {
        let draft = validator()
            .build_draft(&valid_row(), Some(dec("7.5")))
            .unwrap();
        assert_eq!(draft.discount_percent, Some(dec("7.5")));
    }
}
