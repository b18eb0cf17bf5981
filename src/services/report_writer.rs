//! 报告写入服务 - 业务能力层
//!
//! 只负责"把一个批次写成 JSON 报告"，不关心流程

use chrono::{DateTime, Local};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::models::{EquipmentType, ValidationBatch};
use crate::orchestrator::{equipment_summary, BatchSummary, EquipmentStats};

/// 报告文件内容
#[derive(Debug, Serialize)]
struct ValidationReport<'a> {
    generated_at: DateTime<Local>,
    summary: &'a BatchSummary,
    equipment: BTreeMap<EquipmentType, EquipmentStats>,
    batch: &'a ValidationBatch,
}

/// 报告写入服务
pub struct ReportWriter {
    report_file_path: String,
}

impl ReportWriter {
    pub fn new() -> Self {
        Self {
            report_file_path: "validation_report.json".to_string(),
        }
    }

    /// 使用自定义文件路径创建
    pub fn with_path(path: impl Into<String>) -> Self {
        Self {
            report_file_path: path.into(),
        }
    }

    pub fn path(&self) -> &str {
        &self.report_file_path
    }

    /// 写入报告（覆盖已有文件）
    pub async fn write(&self, batch: &ValidationBatch, summary: &BatchSummary) -> AppResult<()> {
        let report = ValidationReport {
            generated_at: Local::now(),
            summary,
            equipment: equipment_summary(batch),
            batch,
        };
        let content = serde_json::to_string_pretty(&report)?;

        debug!(
            "写入报告: {} | 结果数: {} | 大小: {} 字节",
            self.report_file_path,
            batch.results().len(),
            content.len()
        );

        tokio::fs::write(&self.report_file_path, content)
            .await
            .map_err(|e| AppError::file(&self.report_file_path, e))?;

        Ok(())
    }
}

impl Default for ReportWriter {
    fn default() -> Self {
        Self::new()
    }
}
