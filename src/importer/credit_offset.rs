// ==========================================
// Wortmann CSV 导入系统 - 负数行冲抵
// ==========================================
// 依据: Wortmann 导出中的贷记行（数量为负）约定
// 职责: 负数行与对应正数行合并（数量/总额相加，单价不变）
// 匹配键: (counterparty, doc_no, article_no)，优先相邻行
// ==========================================

use crate::domain::invoice::RawInvoiceRow;
use rust_decimal::Decimal;
use std::collections::HashSet;

// ==========================================
// OffsetOutcome - 冲抵结果
// ==========================================
#[derive(Debug)]
pub struct OffsetOutcome {
    /// 存活行（正数行，已并入其贷记行的数量/总额），保持文件顺序
    pub rows: Vec<RawInvoiceRow>,
    /// 已并入正数行的负数行 (行号, 凭证号) → Skipped(OffsetMerged)
    pub merged: Vec<(usize, String)>,
    /// 找不到对应正数行的负数行 (行号, 凭证号) → Rejected(NoOffsetMatch)
    pub unmatched: Vec<(usize, String)>,
}

pub struct CreditOffset;

impl CreditOffset {
    /// 对一批类型化行执行冲抵合并
    pub fn offset(&self, mut rows: Vec<RawInvoiceRow>) -> OffsetOutcome {
        let mut merged = Vec::new();
        let mut unmatched = Vec::new();
        // 已被某条负数行占用的正数行下标（一对一冲抵）
        let mut used: HashSet<usize> = HashSet::new();
        // 扫描期识别出的负数行下标（合并会改写正数行的符号，
        // 过滤必须依据扫描期结果，不能依据合并后的符号）
        let mut neg_indices: HashSet<usize> = HashSet::new();
        // (负数行下标, 伙伴正数行下标)
        let mut plans: Vec<(usize, usize)> = Vec::new();

        for i in 0..rows.len() {
            if !is_negative(&rows[i]) {
                continue;
            }
            neg_indices.insert(i);
            match find_partner(&rows, i, &used) {
                Some(j) => {
                    used.insert(j);
                    plans.push((i, j));
                }
                None => unmatched.push((rows[i].row_number, doc_no_of(&rows[i]))),
            }
        }

        for (neg, pos) in &plans {
            let neg_qty = rows[*neg].qty.unwrap_or_default();
            let neg_total = rows[*neg].total.unwrap_or_default();
            merged.push((rows[*neg].row_number, doc_no_of(&rows[*neg])));

            let partner = &mut rows[*pos];
            partner.qty = Some(partner.qty.unwrap_or_default() + neg_qty);
            partner.total = Some(partner.total.unwrap_or_default() + neg_total);
        }

        // 负数行（无论是否冲抵成功）不再进入后续管道
        let rows = rows
            .into_iter()
            .enumerate()
            .filter(|(idx, _)| !neg_indices.contains(idx))
            .map(|(_, r)| r)
            .collect();

        OffsetOutcome {
            rows,
            merged,
            unmatched,
        }
    }
}

fn doc_no_of(row: &RawInvoiceRow) -> String {
    row.doc_no.clone().unwrap_or_default()
}

fn is_negative(row: &RawInvoiceRow) -> bool {
    row.qty.map(|q| q < Decimal::ZERO).unwrap_or(false)
}

/// 为负数行寻找可冲抵的正数行：先看相邻行（常见情形），再全表扫描
fn find_partner(rows: &[RawInvoiceRow], i: usize, used: &HashSet<usize>) -> Option<usize> {
    let adjacent = [i.checked_sub(1), i.checked_add(1)];
    for j in adjacent.into_iter().flatten() {
        if j < rows.len() && candidate_matches(rows, i, j, used) {
            return Some(j);
        }
    }
    (0..rows.len()).find(|&j| j != i && candidate_matches(rows, i, j, used))
}

fn candidate_matches(rows: &[RawInvoiceRow], i: usize, j: usize, used: &HashSet<usize>) -> bool {
    if j == i || used.contains(&j) || is_negative(&rows[j]) {
        return false;
    }
    let (neg, pos) = (&rows[i], &rows[j]);
    pos.qty.map(|q| q > Decimal::ZERO).unwrap_or(false)
        && neg.counterparty == pos.counterparty
        && neg.doc_no == pos.doc_no
        && neg.article_no == pos.article_no
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn raw_row(row_number: usize, doc_no: &str, qty: &str, total: &str) -> RawInvoiceRow {
        RawInvoiceRow {
            doc_no: Some(doc_no.to_string()),
            counterparty: Some("K0042".to_string()),
            issue_date: NaiveDate::from_ymd_opt(2025, 3, 14),
            currency: Some("EUR".to_string()),
            article_no: Some("ART-9".to_string()),
            description: None,
            qty: Some(dec(qty)),
            unit_price: Some(dec("10.00")),
            total: Some(dec(total)),
            row_number,
        }
    }

    #[test]
    fn test_no_negatives_passthrough() {
        let outcome = CreditOffset.offset(vec![
            raw_row(1, "RE-1", "2", "20.00"),
            raw_row(2, "RE-2", "3", "30.00"),
        ]);
        assert_eq!(outcome.rows.len(), 2);
        assert!(outcome.merged.is_empty());
        assert!(outcome.unmatched.is_empty());
    }

    #[test]
    fn test_adjacent_negative_merged() {
        let outcome = CreditOffset.offset(vec![
            raw_row(1, "RE-1", "5", "50.00"),
            raw_row(2, "RE-1", "-2", "-20.00"),
        ]);
        assert_eq!(outcome.rows.len(), 1);
        assert_eq!(outcome.rows[0].qty, Some(dec("3")));
        assert_eq!(outcome.rows[0].total, Some(dec("30.00")));
        assert_eq!(outcome.rows[0].unit_price, Some(dec("10.00")));
        assert_eq!(outcome.merged, vec![(2, "RE-1".to_string())]);
    }

    #[test]
    fn test_non_adjacent_negative_merged() {
        let outcome = CreditOffset.offset(vec![
            raw_row(1, "RE-1", "5", "50.00"),
            raw_row(2, "RE-2", "1", "10.00"),
            raw_row(3, "RE-1", "-5", "-50.00"),
        ]);
        assert_eq!(outcome.rows.len(), 2);
        assert_eq!(outcome.rows[0].qty, Some(dec("0")));
        assert_eq!(outcome.merged.len(), 1);
    }

    #[test]
    fn test_unmatched_negative_reported() {
        let outcome = CreditOffset.offset(vec![
            raw_row(1, "RE-1", "5", "50.00"),
            raw_row(2, "RE-9", "-2", "-20.00"), // 凭证号不同，无法冲抵
        ]);
        assert_eq!(outcome.rows.len(), 1);
        assert_eq!(outcome.rows[0].qty, Some(dec("5")));
        assert_eq!(outcome.unmatched, vec![(2, "RE-9".to_string())]);
    }

    #[test]
    fn test_positive_row_absorbs_single_negative_only() {
        let outcome = CreditOffset.offset(vec![
            raw_row(1, "RE-1", "5", "50.00"),
            raw_row(2, "RE-1", "-2", "-20.00"),
            raw_row(3, "RE-1", "-1", "-10.00"), // 伙伴已被占用
        ]);
        assert_eq!(outcome.rows.len(), 1);
        assert_eq!(outcome.rows[0].qty, Some(dec("3")));
        assert_eq!(outcome.merged.len(), 1);
        assert_eq!(outcome.unmatched.len(), 1);
        assert_eq!(outcome.unmatched[0].0, 3);
    }
}
