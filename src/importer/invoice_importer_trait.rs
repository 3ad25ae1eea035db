// ==========================================
// Wortmann CSV 导入系统 - 发票导入 Trait
// ==========================================
// 职责: 定义导入接口（不包含实现）
// 契约: 行级错误绝不越过 ImportReport 边界向上抛出；
//       仅管道级致命错误以 failed 状态体现在报告中
// ==========================================

use crate::domain::invoice::RawImportInput;
use crate::domain::report::ImportReport;
use async_trait::async_trait;

// ==========================================
// InvoiceImporter Trait
// ==========================================
// 用途: 发票导入主接口
// 实现者: InvoiceImporterImpl
#[async_trait]
pub trait InvoiceImporter: Send + Sync {
    /// 执行一次完整导入
    ///
    /// # 参数
    /// - input: 边界输入（字节流 + 声明编码 + 源文件名）
    ///
    /// # 返回
    /// - ImportReport: 唯一可观察产物；本方法不失败——
    ///   解码/表头级错误以 status = failed 返回
    ///
    /// # 导入流程
    /// 1. 字节解码（严格，按声明编码）
    /// 2. 表头校验 + 惰性行解析
    /// 3. 字段映射与类型转换
    /// 4. 负数行冲抵
    /// 5. 草稿校验（总额一致性）
    /// 6. 幂等检查（批内 + 提交前一刻的跨批查询）
    /// 7. 逐行提交（每张发票一个事务）+ 批次审计
    async fn import(&self, input: RawImportInput) -> ImportReport;

    /// 从字节流导入（便捷入口，编码取自配置）
    ///
    /// # 参数
    /// - file_bytes: 文件完整内容（cp1252 编码）
    /// - file_name: 源文件名（批次审计与诊断用）
    async fn import_bytes(&self, file_bytes: &[u8], file_name: &str) -> ImportReport;

    /// 批量导入多个文件（并发执行）
    ///
    /// # 参数
    /// - files: (文件内容, 文件名) 列表
    ///
    /// # 返回
    /// - Vec<ImportReport>: 每个文件的导入报告，顺序与输入一致
    ///
    /// # 说明
    /// - 每个文件的导入相互独立，互不影响
    /// - 跨批幂等性由逐行的提交前查询保证
    async fn batch_import(&self, files: Vec<(Vec<u8>, String)>) -> Vec<ImportReport>;
}
