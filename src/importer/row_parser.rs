// ==========================================
// Wortmann CSV 导入系统 - 行解析器
// ==========================================
// 依据: Wortmann CSV 导出格式（分号分隔，cp1252）
// 职责: 表头校验 + 惰性逐行产出 ParsedRow
// 红线: 行级损坏只标记该行，绝不中止整个文件
// ==========================================

use crate::importer::error::{ImportError, ImportResult};
use csv::ReaderBuilder;
use std::collections::HashMap;
use std::io::Cursor;

// ==========================================
// 固定列模式（逻辑列名 + 厂商别名）
// ==========================================
// 匹配规则: 大小写不敏感 + 去空白；未知多余列忽略
pub const REQUIRED_COLUMNS: [&str; 7] = [
    "doc_no",
    "counterparty",
    "date",
    "currency",
    "qty",
    "price",
    "total",
];

pub const OPTIONAL_COLUMNS: [&str; 2] = ["description", "article_no"];

/// 逻辑列的可接受表头别名（均为小写）
fn aliases(logical: &str) -> &'static [&'static str] {
    match logical {
        "doc_no" => &["doc_no", "referencenumber", "belegnummer"],
        "counterparty" => &["counterparty", "customcustomernr", "kundennummer"],
        "date" => &["date", "invoicedate", "belegdatum", "datum"],
        "currency" => &["currency", "waehrung", "währung"],
        "qty" => &["qty", "amount", "menge"],
        "price" => &["price", "einzelpreis"],
        "total" => &["total", "totalprice", "gesamtpreis"],
        "description" => &["description", "articlename", "bezeichnung"],
        "article_no" => &["article_no", "articlenumber_mandant", "artikelnummer"],
        _ => &[],
    }
}

// ==========================================
// ParsedRow - 解析后的原始行
// ==========================================
// fields 以逻辑列名为键；structural_error 非空时该行
// 在下游直接成为 Rejected，fields 不可信
#[derive(Debug, Clone)]
pub struct ParsedRow {
    pub row_number: usize, // 数据行号（1 起，不含表头与空行）
    pub fields: HashMap<String, String>,
    pub structural_error: Option<String>,
}

// ==========================================
// RowParser
// ==========================================
pub struct RowParser;

impl RowParser {
    /// 解析解码后的文本为惰性行序列
    ///
    /// # 参数
    /// - text: 已解码文本（含表头行）
    /// - delimiter: 分隔符；None 时按表头行自动识别（';' 优先于 ','）
    ///
    /// # 返回
    /// - Ok(RowIter): 惰性、有限、不可重置的行迭代器
    /// - Err(SchemaError): 必填列缺失（致命）
    pub fn parse(&self, text: String, delimiter: Option<u8>) -> ImportResult<RowIter> {
        let delim = delimiter.unwrap_or_else(|| detect_delimiter(&text));

        let mut reader = ReaderBuilder::new()
            .delimiter(delim)
            .has_headers(true)
            .flexible(true) // 字段数不符由本层显式检测
            .from_reader(Cursor::new(text.into_bytes()));

        // 表头 → 逐列逻辑名（未知列为 None）
        let headers = reader
            .headers()
            .map_err(|e| ImportError::HeaderParseError(e.to_string()))?;
        let columns: Vec<Option<&'static str>> = headers
            .iter()
            .map(|h| resolve_column(h))
            .collect();
        let expected_fields = columns.len();

        // 必填列齐全性校验（致命）
        let missing: Vec<String> = REQUIRED_COLUMNS
            .iter()
            .filter(|req| !columns.contains(&Some(**req)))
            .map(|req| req.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(ImportError::SchemaError { missing });
        }

        Ok(RowIter {
            records: reader.into_records(),
            columns,
            expected_fields,
            row_number: 0,
        })
    }
}

/// 表头单元格 → 逻辑列名
fn resolve_column(header: &str) -> Option<&'static str> {
    let normalized = header.trim().to_lowercase();
    REQUIRED_COLUMNS
        .iter()
        .chain(OPTIONAL_COLUMNS.iter())
        .find(|&&logical| aliases(logical).contains(&normalized.as_str()))
        .copied()
}

/// 按表头行识别分隔符（厂商导出为 ';'，普通导出为 ','）
fn detect_delimiter(text: &str) -> u8 {
    let header_line = text.lines().next().unwrap_or("");
    let semicolons = header_line.matches(';').count();
    let commas = header_line.matches(',').count();
    if semicolons >= commas && semicolons > 0 {
        b';'
    } else {
        b','
    }
}

// ==========================================
// RowIter - 惰性行迭代器
// ==========================================
// 一次性消费；空行跳过不占行号
pub struct RowIter {
    records: csv::StringRecordsIntoIter<Cursor<Vec<u8>>>,
    columns: Vec<Option<&'static str>>,
    expected_fields: usize,
    row_number: usize,
}

impl Iterator for RowIter {
    type Item = ParsedRow;

    fn next(&mut self) -> Option<ParsedRow> {
        loop {
            match self.records.next()? {
                Ok(record) => {
                    // 跳过全空白行（csv 已忽略真正的空行，
                    // 这里处理 ";;" 之类只有分隔符的行）
                    if record.iter().all(|v| v.trim().is_empty()) {
                        continue;
                    }

                    self.row_number += 1;

                    if record.len() != self.expected_fields {
                        return Some(ParsedRow {
                            row_number: self.row_number,
                            fields: HashMap::new(),
                            structural_error: Some(format!(
                                "字段数不符: 期望 {}, 实际 {}",
                                self.expected_fields,
                                record.len()
                            )),
                        });
                    }

                    let mut fields = HashMap::new();
                    for (idx, value) in record.iter().enumerate() {
                        if let Some(logical) = self.columns.get(idx).copied().flatten() {
                            fields.insert(logical.to_string(), value.trim().to_string());
                        }
                    }

                    return Some(ParsedRow {
                        row_number: self.row_number,
                        fields,
                        structural_error: None,
                    });
                }
                Err(e) => {
                    self.row_number += 1;
                    return Some(ParsedRow {
                        row_number: self.row_number,
                        fields: HashMap::new(),
                        structural_error: Some(format!("CSV 行解析错误: {}", e)),
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_all(text: &str) -> Vec<ParsedRow> {
        RowParser
            .parse(text.to_string(), None)
            .unwrap()
            .collect()
    }

    #[test]
    fn test_parse_comma_header() {
        let rows = parse_all(
            "doc_no,counterparty,date,currency,qty,price,total\n\
             RE-1,K1,14.03.2025,EUR,2,10.00,20.00\n",
        );
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].row_number, 1);
        assert_eq!(rows[0].fields.get("doc_no"), Some(&"RE-1".to_string()));
        assert!(rows[0].structural_error.is_none());
    }

    #[test]
    fn test_parse_vendor_aliases_semicolon() {
        let rows = parse_all(
            "CustomCustomerNr;ReferenceNumber;InvoiceDate;Currency;Amount;Price;TotalPrice;ArticleNumber_Mandant\n\
             K0042;RE-77;14.03.2025;EUR;3;12,50;37,50;ART-9\n",
        );
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.fields.get("counterparty"), Some(&"K0042".to_string()));
        assert_eq!(row.fields.get("doc_no"), Some(&"RE-77".to_string()));
        assert_eq!(row.fields.get("qty"), Some(&"3".to_string()));
        assert_eq!(row.fields.get("article_no"), Some(&"ART-9".to_string()));
    }

    #[test]
    fn test_header_case_insensitive_and_trimmed() {
        let rows = parse_all(
            " Doc_No , COUNTERPARTY ,date,currency,qty,price,total\n\
             RE-1,K1,14.03.2025,EUR,1,5.00,5.00\n",
        );
        assert_eq!(rows[0].fields.get("doc_no"), Some(&"RE-1".to_string()));
        assert_eq!(rows[0].fields.get("counterparty"), Some(&"K1".to_string()));
    }

    #[test]
    fn test_missing_required_column_is_schema_error() {
        // currency 缺失
        let err = RowParser
            .parse(
                "doc_no,counterparty,date,qty,price,total\nRE-1,K1,14.03.2025,1,2,2\n".to_string(),
                None,
            )
            .err()
            .unwrap();
        match err {
            ImportError::SchemaError { missing } => {
                assert_eq!(missing, vec!["currency".to_string()]);
            }
            other => panic!("Expected SchemaError, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_extra_column_ignored() {
        let rows = parse_all(
            "doc_no,counterparty,date,currency,qty,price,total,internal_flag\n\
             RE-1,K1,14.03.2025,EUR,1,5.00,5.00,x\n",
        );
        assert!(rows[0].structural_error.is_none());
        assert!(!rows[0].fields.contains_key("internal_flag"));
    }

    #[test]
    fn test_wrong_field_count_flags_row_only() {
        let rows = parse_all(
            "doc_no,counterparty,date,currency,qty,price,total\n\
             RE-1,K1,14.03.2025,EUR,1,5.00\n\
             RE-2,K1,14.03.2025,EUR,1,5.00,5.00\n",
        );
        assert_eq!(rows.len(), 2);
        assert!(rows[0].structural_error.is_some());
        assert!(rows[1].structural_error.is_none());
        assert_eq!(rows[1].fields.get("doc_no"), Some(&"RE-2".to_string()));
    }

    #[test]
    fn test_blank_and_delimiter_only_lines_skipped() {
        let rows = parse_all(
            "doc_no,counterparty,date,currency,qty,price,total\n\
             RE-1,K1,14.03.2025,EUR,1,5.00,5.00\n\
             \n\
             ,,,,,,\n\
             RE-2,K1,14.03.2025,EUR,1,5.00,5.00\n",
        );
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].row_number, 2);
    }

    #[test]
    fn test_quoted_field_with_embedded_delimiter() {
        let rows = parse_all(
            "doc_no,counterparty,date,currency,qty,price,total,description\n\
             RE-1,K1,14.03.2025,EUR,1,5.00,5.00,\"Lizenz, Jahresvertrag\"\n",
        );
        assert_eq!(
            rows[0].fields.get("description"),
            Some(&"Lizenz, Jahresvertrag".to_string())
        );
    }
}
