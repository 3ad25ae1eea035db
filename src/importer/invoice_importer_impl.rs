// ==========================================
// Wortmann CSV 导入系统 - 发票导入器实现
// ==========================================
// 职责: 整合导入流程，从字节流到发票落库
// 流程: 解码 → 解析 → 映射 → 冲抵 → 校验 → 幂等 → 逐行提交
// 提交策略: 行级原子、整单尽力而为；仅解码/表头错误整体中止
// ==========================================

use crate::config::ImportConfig;
use crate::domain::invoice::{RawImportInput, RawInvoiceRow};
use crate::domain::report::{
    ImportBatch, ImportReport, OutcomeKind, RowOutcome, SkipReason,
};
use crate::importer::byte_decoder::ByteDecoder;
use crate::importer::credit_offset::CreditOffset;
use crate::importer::draft_validator::DraftValidator;
use crate::importer::duplicate_guard::{DuplicateGuard, KeyCheck};
use crate::importer::error::ImportError;
use crate::importer::field_mapper::FieldMapper;
use crate::importer::invoice_importer_trait::InvoiceImporter;
use crate::importer::row_parser::RowParser;
use crate::repository::invoice_store::InvoiceStore;
use chrono::Utc;
use rust_decimal::Decimal;
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

// ==========================================
// InvoiceImporterImpl
// ==========================================
pub struct InvoiceImporterImpl<S>
where
    S: InvoiceStore,
{
    // 存储协作方
    store: S,

    // 配置
    config: ImportConfig,

    // 管道组件
    byte_decoder: ByteDecoder,
    row_parser: RowParser,
    field_mapper: FieldMapper,
    credit_offset: CreditOffset,
    draft_validator: DraftValidator,
}

impl<S> InvoiceImporterImpl<S>
where
    S: InvoiceStore,
{
    /// 创建新的导入器实例
    ///
    /// # 参数
    /// - store: 发票存储协作方
    /// - config: 导入配置
    pub fn new(store: S, config: ImportConfig) -> Self {
        let draft_validator = DraftValidator::new(config.total_tolerance);
        Self {
            store,
            config,
            byte_decoder: ByteDecoder,
            row_parser: RowParser,
            field_mapper: FieldMapper,
            credit_offset: CreditOffset,
            draft_validator,
        }
    }
}

#[async_trait::async_trait]
impl<S> InvoiceImporter for InvoiceImporterImpl<S>
where
    S: InvoiceStore + Send + Sync,
{
    #[instrument(skip(self, input), fields(batch_id))]
    async fn import(&self, input: RawImportInput) -> ImportReport {
        let start_time = Instant::now();
        let batch_id = Uuid::new_v4().to_string();
        let file_name = input.source_name.as_str();
        info!(batch_id = %batch_id, file_name = %file_name, size = input.bytes.len(), "开始导入 Wortmann CSV");

        // === 步骤 1: 字节解码（致命错误整体中止）===
        debug!("步骤 1: 字节解码");
        let text = match self
            .byte_decoder
            .decode(&input.bytes, &input.declared_encoding)
        {
            Ok(text) => text,
            Err(e) => {
                error!(batch_id = %batch_id, error = %e, "解码失败，导入中止");
                return self.fatal_report(&batch_id, file_name, &e, start_time).await;
            }
        };

        // === 步骤 2: 表头校验 + 行解析 ===
        debug!("步骤 2: 表头校验与行解析");
        let row_iter = match self.row_parser.parse(text, self.config.delimiter) {
            Ok(iter) => iter,
            Err(e) => {
                error!(batch_id = %batch_id, error = %e, "表头校验失败，导入中止");
                return self.fatal_report(&batch_id, file_name, &e, start_time).await;
            }
        };

        // === 步骤 3: 字段映射（行级错误仅拒绝该行）===
        debug!("步骤 3: 字段映射");
        let mut outcomes: Vec<RowOutcome> = Vec::new();
        let mut typed_rows: Vec<RawInvoiceRow> = Vec::new();
        for parsed in row_iter {
            if let Some(message) = &parsed.structural_error {
                warn!(row_number = parsed.row_number, message = %message, "行结构损坏");
                let err = ImportError::StructuralRowError {
                    row: parsed.row_number,
                    message: message.clone(),
                };
                outcomes.push(reject_outcome(parsed.row_number, None, &err));
                continue;
            }

            let doc_no_hint = parsed
                .fields
                .get("doc_no")
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .map(str::to_string);

            match self.field_mapper.map_to_raw_invoice(&parsed) {
                Ok(raw) => typed_rows.push(raw),
                Err(e) => {
                    warn!(row_number = parsed.row_number, error = %e, "字段映射失败");
                    outcomes.push(reject_outcome(parsed.row_number, doc_no_hint, &e));
                }
            }
        }
        info!(
            mapped = typed_rows.len(),
            failed = outcomes.len(),
            "字段映射完成"
        );

        // === 步骤 4: 负数行冲抵 ===
        debug!("步骤 4: 负数行冲抵");
        let offset = self.credit_offset.offset(typed_rows);
        for (row_number, doc_no) in &offset.merged {
            outcomes.push(RowOutcome {
                row_number: *row_number,
                doc_no: Some(doc_no.clone()),
                kind: OutcomeKind::Skipped {
                    reason: SkipReason::OffsetMerged,
                },
            });
        }
        for (row_number, doc_no) in &offset.unmatched {
            let err = ImportError::NoOffsetMatch {
                row: *row_number,
                doc_no: doc_no.clone(),
            };
            warn!(row_number = row_number, doc_no = %doc_no, "负数行无对应正数行");
            outcomes.push(reject_outcome(*row_number, Some(doc_no.clone()), &err));
        }

        // === 步骤 5-7: 逐行 校验 → 幂等 → 提交（文件顺序）===
        debug!("步骤 5-7: 校验、幂等检查与提交");
        let mut guard = DuplicateGuard::new();
        for raw in offset.rows {
            let outcome = self.process_row(&mut guard, raw).await;
            outcomes.push(outcome);
        }

        // === 汇总报告（按文件行序）===
        outcomes.sort_by_key(|o| o.row_number);
        let report = ImportReport::from_outcomes(outcomes);

        // === 批次审计 ===
        self.persist_batch(&batch_id, file_name, &report, start_time)
            .await;

        info!(
            batch_id = %batch_id,
            status = report.status.as_str(),
            total = report.total_rows,
            created = report.created,
            skipped = report.skipped,
            rejected = report.rejected,
            elapsed_ms = start_time.elapsed().as_millis() as u64,
            "Wortmann CSV 导入完成"
        );

        report
    }

    async fn import_bytes(&self, file_bytes: &[u8], file_name: &str) -> ImportReport {
        let input = RawImportInput::new(
            file_bytes.to_vec(),
            self.config.encoding.clone(),
            file_name.to_string(),
        );
        self.import(input).await
    }

    async fn batch_import(&self, files: Vec<(Vec<u8>, String)>) -> Vec<ImportReport> {
        use futures::future::join_all;

        info!(count = files.len(), "开始批量导入文件");

        let tasks = files.iter().map(|(bytes, name)| async move {
            let report = self.import_bytes(bytes, name).await;
            info!(
                file = %name,
                status = report.status.as_str(),
                created = report.created,
                "文件导入结束"
            );
            report
        });

        let reports = join_all(tasks).await;

        info!(
            total = reports.len(),
            "批量导入完成"
        );

        reports
    }
}

// 辅助方法
impl<S> InvoiceImporterImpl<S>
where
    S: InvoiceStore,
{
    /// 处理单行：校验 → 零额压制 → 批内幂等 → 跨批幂等 → 提交
    async fn process_row(&self, guard: &mut DuplicateGuard, raw: RawInvoiceRow) -> RowOutcome {
        let row_number = raw.row_number;

        // 完全冲抵的行（数量与总额归零）按零额发票压制
        if self.config.suppress_zero_invoices
            && raw.qty == Some(Decimal::ZERO)
            && raw.total == Some(Decimal::ZERO)
        {
            debug!(row_number, "零额行压制（完全冲抵）");
            return RowOutcome {
                row_number,
                doc_no: raw.doc_no.clone(),
                kind: OutcomeKind::Skipped {
                    reason: SkipReason::ZeroTotal,
                },
            };
        }

        // 草稿校验（含总额一致性）
        let discount = raw
            .counterparty
            .as_deref()
            .and_then(|c| self.config.discount_for(c));
        let draft = match self.draft_validator.build_draft(&raw, discount) {
            Ok(draft) => draft,
            Err(e) => {
                warn!(row_number, error = %e, "草稿校验失败");
                return reject_outcome(row_number, raw.doc_no.clone(), &e);
            }
        };

        // 折后零额发票压制（Nullrechnungen unterdrücken）
        if self.config.suppress_zero_invoices && draft.grand_total().is_zero() {
            debug!(row_number, doc_no = %draft.doc_no, "零额发票压制");
            return RowOutcome {
                row_number,
                doc_no: Some(draft.doc_no),
                kind: OutcomeKind::Skipped {
                    reason: SkipReason::ZeroTotal,
                },
            };
        }

        // 批内幂等：同一凭证号首行生效，其后跳过
        if guard.check_and_record(&draft.doc_no) == KeyCheck::Duplicate {
            debug!(row_number, doc_no = %draft.doc_no, "批内重复凭证号");
            return RowOutcome {
                row_number,
                doc_no: Some(draft.doc_no),
                kind: OutcomeKind::Skipped {
                    reason: SkipReason::Duplicate,
                },
            };
        }

        // 跨批幂等：提交前一刻查询，缩小并发竞态窗口
        let timeout = self.config.storage_timeout();
        let lookup = tokio::time::timeout(
            timeout,
            self.store.find_invoice_by_document_number(&draft.doc_no),
        )
        .await;
        let existing = match lookup {
            Err(_) => {
                let e = ImportError::StorageTimeout {
                    row: row_number,
                    timeout_ms: self.config.storage_timeout_ms,
                };
                warn!(row_number, doc_no = %draft.doc_no, "幂等查询超时");
                return reject_outcome(row_number, Some(draft.doc_no), &e);
            }
            Ok(Err(storage_err)) => {
                let e = ImportError::Storage {
                    row: row_number,
                    source: storage_err,
                };
                warn!(row_number, doc_no = %draft.doc_no, error = %e, "幂等查询失败");
                return reject_outcome(row_number, Some(draft.doc_no), &e);
            }
            Ok(Ok(existing)) => existing,
        };

        if existing.is_some() {
            debug!(row_number, doc_no = %draft.doc_no, "凭证号已提交过，幂等跳过");
            return RowOutcome {
                row_number,
                doc_no: Some(draft.doc_no),
                kind: OutcomeKind::Skipped {
                    reason: SkipReason::Duplicate,
                },
            };
        }

        // 提交（单事务；失败仅拒绝该行，已建发票不回滚）
        let commit = tokio::time::timeout(timeout, self.store.create_invoice(&draft)).await;
        match commit {
            Err(_) => {
                let e = ImportError::StorageTimeout {
                    row: row_number,
                    timeout_ms: self.config.storage_timeout_ms,
                };
                warn!(row_number, doc_no = %draft.doc_no, "提交超时");
                reject_outcome(row_number, Some(draft.doc_no), &e)
            }
            Ok(Err(storage_err)) if storage_err.is_document_number_conflict() => {
                // 并发竞态兜底：另一导入已抢先提交，按幂等跳过
                debug!(row_number, doc_no = %draft.doc_no, "唯一约束命中，幂等跳过");
                RowOutcome {
                    row_number,
                    doc_no: Some(draft.doc_no),
                    kind: OutcomeKind::Skipped {
                        reason: SkipReason::Duplicate,
                    },
                }
            }
            Ok(Err(storage_err)) => {
                let e = ImportError::Storage {
                    row: row_number,
                    source: storage_err,
                };
                warn!(row_number, doc_no = %draft.doc_no, error = %e, "提交失败");
                reject_outcome(row_number, Some(draft.doc_no), &e)
            }
            Ok(Ok(invoice_id)) => {
                debug!(row_number, doc_no = %draft.doc_no, invoice_id = %invoice_id, "发票创建成功");
                RowOutcome {
                    row_number,
                    doc_no: Some(draft.doc_no),
                    kind: OutcomeKind::Created { invoice_id },
                }
            }
        }
    }

    /// 管道级致命错误：零行处理，status = failed
    async fn fatal_report(
        &self,
        batch_id: &str,
        file_name: &str,
        err: &ImportError,
        start_time: Instant,
    ) -> ImportReport {
        let report = ImportReport::failed(err.to_string());
        self.persist_batch(batch_id, file_name, &report, start_time)
            .await;
        report
    }

    /// 落库批次审计记录（审计失败只记日志，不影响报告）
    async fn persist_batch(
        &self,
        batch_id: &str,
        file_name: &str,
        report: &ImportReport,
        start_time: Instant,
    ) {
        let batch = ImportBatch {
            batch_id: batch_id.to_string(),
            file_name: Some(file_name.to_string()),
            status: report.status,
            total_rows: report.total_rows as i32,
            created_rows: report.created as i32,
            skipped_rows: report.skipped as i32,
            rejected_rows: report.rejected as i32,
            imported_at: Some(Utc::now()),
            elapsed_ms: Some(start_time.elapsed().as_millis() as i32),
            report_json: serde_json::to_string(report).ok(),
        };

        if let Err(e) = self.store.insert_batch(&batch).await {
            warn!(batch_id = %batch_id, error = %e, "批次审计记录写入失败");
        }
    }
}

fn reject_outcome(row_number: usize, doc_no: Option<String>, err: &ImportError) -> RowOutcome {
    RowOutcome {
        row_number,
        doc_no,
        kind: OutcomeKind::Rejected {
            reason: err.reject_reason(),
            detail: err.to_string(),
        },
    }
}
