// ==========================================
// Wortmann CSV 导入系统 - 导入 API
// ==========================================
// 职责: 入站边界——每个上传文件调用一次 submit_import
// 契约: submit_import 永不失败；管道级错误以 failed 报告返回
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::config::ImportConfig;
use crate::domain::report::{ImportBatch, ImportReport};
use crate::importer::{InvoiceImporter, InvoiceImporterImpl};
use crate::repository::{InvoiceStore, SqliteInvoiceStore};

/// 导入 API
pub struct ImportApi {
    db_path: String,
    config: ImportConfig,
}

impl ImportApi {
    /// 创建新的 ImportApi 实例（默认配置）
    pub fn new(db_path: String) -> Self {
        Self {
            db_path,
            config: ImportConfig::default(),
        }
    }

    /// 创建带自定义配置的实例（折扣表、容差、零额压制等）
    pub fn with_config(db_path: String, config: ImportConfig) -> Self {
        Self { db_path, config }
    }

    /// 提交上传文件并执行导入
    ///
    /// # 参数
    /// - file_bytes: CSV 文件完整内容（cp1252）
    /// - file_name: 上传文件名
    ///
    /// # 返回
    /// - ImportReport: 整体状态 + 行数统计 + 逐行诊断；
    ///   行级错误不向上抛出，致命错误以 failed 状态返回
    pub async fn submit_import(&self, file_bytes: Vec<u8>, file_name: &str) -> ImportReport {
        match self.create_importer() {
            Ok(importer) => importer.import_bytes(&file_bytes, file_name).await,
            Err(e) => ImportReport::failed(format!("导入器初始化失败: {}", e)),
        }
    }

    /// 查询最近的导入批次（Importhistorie）
    ///
    /// # 参数
    /// - limit: 返回记录数（1-100）
    pub async fn recent_batches(&self, limit: usize) -> ApiResult<Vec<ImportBatch>> {
        let limit = limit.clamp(1, 100);
        let store = self.create_store()?;
        store
            .recent_batches(limit)
            .await
            .map_err(|e| ApiError::DatabaseError(e.to_string()))
    }

    fn create_importer(&self) -> ApiResult<InvoiceImporterImpl<SqliteInvoiceStore>> {
        let store = self.create_store()?;
        Ok(InvoiceImporterImpl::new(store, self.config.clone()))
    }

    fn create_store(&self) -> ApiResult<SqliteInvoiceStore> {
        SqliteInvoiceStore::new(&self.db_path)
            .map_err(|e| ApiError::DatabaseError(format!("创建存储失败: {}", e)))
    }
}
