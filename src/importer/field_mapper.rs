// ==========================================
// Wortmann CSV 导入系统 - 字段映射器
// ==========================================
// 职责: ParsedRow → RawInvoiceRow 类型转换
// 校验顺序（每行独立，首错即停）:
//   1. 必填字段非空  2. 日期/数值格式
// 红线: 金额解析为 Decimal，禁止 f64 中转
// ==========================================

use crate::domain::invoice::RawInvoiceRow;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::row_parser::{ParsedRow, REQUIRED_COLUMNS};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::str::FromStr;

/// 厂商日期格式（德式 TT.MM.JJJJ，兼容 ISO）
const DATE_FORMATS: [&str; 2] = ["%d.%m.%Y", "%Y-%m-%d"];

pub struct FieldMapper;

impl FieldMapper {
    /// 将解析行映射为类型化的 RawInvoiceRow
    ///
    /// # 返回
    /// - Ok(RawInvoiceRow): 必填字段齐全且格式合法
    /// - Err(MissingField / DateFormatError / NumberFormatError): 行级错误
    pub fn map_to_raw_invoice(&self, row: &ParsedRow) -> ImportResult<RawInvoiceRow> {
        // 必填字段非空（按固定列序报告第一个缺失）
        for field in REQUIRED_COLUMNS {
            if self.get_string(row, field).is_none() {
                return Err(ImportError::MissingField {
                    row: row.row_number,
                    field,
                });
            }
        }

        Ok(RawInvoiceRow {
            doc_no: self.get_string(row, "doc_no"),
            counterparty: self.get_string(row, "counterparty"),
            issue_date: Some(self.parse_date(row, "date")?),
            currency: self.get_string(row, "currency"),
            article_no: self.get_string(row, "article_no"),
            description: self.get_string(row, "description"),
            qty: Some(self.parse_decimal(row, "qty")?),
            unit_price: Some(self.parse_decimal(row, "price")?),
            total: Some(self.parse_decimal(row, "total")?),
            row_number: row.row_number,
        })
    }

    /// 提取字符串字段（空白 → None）
    fn get_string(&self, row: &ParsedRow, key: &str) -> Option<String> {
        row.fields.get(key).and_then(|v| {
            let trimmed = v.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        })
    }

    /// 解析日期（TT.MM.JJJJ，兼容 YYYY-MM-DD）
    fn parse_date(&self, row: &ParsedRow, key: &'static str) -> ImportResult<NaiveDate> {
        let value = self
            .get_string(row, key)
            .ok_or(ImportError::MissingField {
                row: row.row_number,
                field: key,
            })?;

        DATE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDate::parse_from_str(&value, fmt).ok())
            .ok_or(ImportError::DateFormatError {
                row: row.row_number,
                field: key,
                value,
            })
    }

    /// 解析德式小数（"135,4" → 135.4），兼容点号小数
    fn parse_decimal(&self, row: &ParsedRow, key: &'static str) -> ImportResult<Decimal> {
        let value = self
            .get_string(row, key)
            .ok_or(ImportError::MissingField {
                row: row.row_number,
                field: key,
            })?;

        let normalized = value.replace(',', ".");
        Decimal::from_str(&normalized).map_err(|_| ImportError::NumberFormatError {
            row: row.row_number,
            field: key,
            value,
        })
    }
}
