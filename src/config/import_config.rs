// ==========================================
// Wortmann CSV 导入系统 - 导入配置
// ==========================================
// 职责: 显式配置结构体（替代宿主系统的动态设置单据）
// 红线: 不读取任何全局/进程级状态，一律显式传入
// ==========================================

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// 存储层调用默认超时（毫秒）
pub const DEFAULT_STORAGE_TIMEOUT_MS: u64 = 5_000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportConfig {
    /// 声明编码标签
    ///
    /// # 默认值
    /// - "cp1252"（厂商导出工具固定使用）
    pub encoding: String,

    /// 分隔符；None 时按表头行自动识别
    ///
    /// # 默认值
    /// - None
    pub delimiter: Option<u8>,

    /// 总额容差（最小货币单位）
    ///
    /// # 默认值
    /// - 0.01
    pub total_tolerance: Decimal,

    /// 是否压制零额发票（Nullrechnungen unterdrücken）
    ///
    /// # 默认值
    /// - true
    pub suppress_zero_invoices: bool,

    /// 客户折扣表（客户编号 → 折扣百分比）
    ///
    /// # 默认值
    /// - 空表
    pub customer_discounts: HashMap<String, Decimal>,

    /// 存储层调用超时（毫秒），超时仅拒绝该行
    ///
    /// # 默认值
    /// - 5000
    pub storage_timeout_ms: u64,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            encoding: crate::importer::byte_decoder::DEFAULT_ENCODING.to_string(),
            delimiter: None,
            total_tolerance: Decimal::new(1, 2),
            suppress_zero_invoices: true,
            customer_discounts: HashMap::new(),
            storage_timeout_ms: DEFAULT_STORAGE_TIMEOUT_MS,
        }
    }
}

impl ImportConfig {
    pub fn storage_timeout(&self) -> Duration {
        Duration::from_millis(self.storage_timeout_ms)
    }

    /// 查询客户折扣百分比（编号去空白匹配）
    pub fn discount_for(&self, counterparty: &str) -> Option<Decimal> {
        self.customer_discounts.get(counterparty.trim()).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_defaults() {
        let config = ImportConfig::default();
        assert_eq!(config.encoding, "cp1252");
        assert_eq!(config.delimiter, None);
        assert_eq!(config.total_tolerance, Decimal::new(1, 2));
        assert!(config.suppress_zero_invoices);
        assert_eq!(config.storage_timeout_ms, 5_000);
    }

    #[test]
    fn test_discount_lookup() {
        let mut config = ImportConfig::default();
        config
            .customer_discounts
            .insert("K0042".to_string(), Decimal::from_str("7.5").unwrap());

        assert_eq!(
            config.discount_for("K0042"),
            Some(Decimal::from_str("7.5").unwrap())
        );
        assert_eq!(config.discount_for(" K0042 "), config.discount_for("K0042"));
        assert_eq!(config.discount_for("K0001"), None);
    }
}
