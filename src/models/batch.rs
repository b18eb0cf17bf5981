//! 验证结果与验证批次
//!
//! `ValidationResult` 每个任务只生成一次，生成后不再修改。
//! `ValidationBatch` 只有状态、时间戳和结果序列是可变的，且只能由编排层在
//! RUNNING 期间修改；进入终态后不再变化。

use crate::error::OrchestrationError;
use crate::models::response::{duration_secs, EquipmentResponse};
use crate::models::test_item::EquipmentType;
use crate::models::verdict::{ReviewStatus, Verdict};
use chrono::{DateTime, Local};
use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// 结果所属的任务来源
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskOrigin {
    pub test_item_id: String,
    pub batch_id: String,
    pub equipment_type: EquipmentType,
    pub scenario: String,
}

/// 单个任务的验证结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationResult {
    pub id: String,
    pub test_item_id: String,
    pub batch_id: String,
    pub equipment_type: EquipmentType,
    pub scenario: String,
    /// 任务在调用模拟器之前失败时为空
    pub response: Option<EquipmentResponse>,
    pub verdict: Verdict,
    #[serde(with = "duration_secs")]
    pub execution_time: Duration,
    pub error_message: Option<String>,
    pub review_status: ReviewStatus,
    pub created_at: DateTime<Local>,
}

impl ValidationResult {
    pub fn new(
        origin: TaskOrigin,
        response: Option<EquipmentResponse>,
        verdict: Verdict,
        execution_time: Duration,
        error_message: Option<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            test_item_id: origin.test_item_id,
            batch_id: origin.batch_id,
            equipment_type: origin.equipment_type,
            scenario: origin.scenario,
            response,
            review_status: ReviewStatus::for_verdict(verdict.kind),
            verdict,
            execution_time,
            error_message,
            created_at: Local::now(),
        }
    }
}

/// 批次状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BatchStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl BatchStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, BatchStatus::Completed | BatchStatus::Failed)
    }

    /// 只允许 PENDING → RUNNING → COMPLETED | FAILED
    fn can_transition_to(self, next: BatchStatus) -> bool {
        matches!(
            (self, next),
            (BatchStatus::Pending, BatchStatus::Running)
                | (BatchStatus::Running, BatchStatus::Completed)
                | (BatchStatus::Running, BatchStatus::Failed)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BatchStatus::Pending => "PENDING",
            BatchStatus::Running => "RUNNING",
            BatchStatus::Completed => "COMPLETED",
            BatchStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 验证批次
#[derive(Debug, Clone, Serialize)]
pub struct ValidationBatch {
    id: String,
    name: String,
    status: BatchStatus,
    created_at: DateTime<Local>,
    started_at: Option<DateTime<Local>>,
    finished_at: Option<DateTime<Local>>,
    failure_reason: Option<String>,
    results: Vec<ValidationResult>,
}

impl ValidationBatch {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            status: BatchStatus::Pending,
            created_at: Local::now(),
            started_at: None,
            finished_at: None,
            failure_reason: None,
            results: Vec::new(),
        }
    }

    /// 以当前时间命名的批次
    pub fn with_default_name() -> Self {
        Self::new(format!("验证批次_{}", Local::now().format("%Y%m%d_%H%M%S")))
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn status(&self) -> BatchStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Local> {
        self.created_at
    }

    pub fn started_at(&self) -> Option<DateTime<Local>> {
        self.started_at
    }

    pub fn finished_at(&self) -> Option<DateTime<Local>> {
        self.finished_at
    }

    /// FAILED 批次的失败原因
    pub fn failure_reason(&self) -> Option<&str> {
        self.failure_reason.as_deref()
    }

    /// 按完成顺序排列的结果
    pub fn results(&self) -> &[ValidationResult] {
        &self.results
    }

    pub(crate) fn start(&mut self) -> Result<(), OrchestrationError> {
        self.transition(BatchStatus::Running)?;
        self.started_at = Some(Local::now());
        Ok(())
    }

    pub(crate) fn push_result(&mut self, result: ValidationResult) {
        debug_assert_eq!(self.status, BatchStatus::Running);
        self.results.push(result);
    }

    pub(crate) fn complete(&mut self) -> Result<(), OrchestrationError> {
        self.transition(BatchStatus::Completed)?;
        self.finished_at = Some(Local::now());
        Ok(())
    }

    pub(crate) fn fail(&mut self, reason: impl Into<String>) -> Result<(), OrchestrationError> {
        self.transition(BatchStatus::Failed)?;
        self.failure_reason = Some(reason.into());
        self.finished_at = Some(Local::now());
        Ok(())
    }

    fn transition(&mut self, next: BatchStatus) -> Result<(), OrchestrationError> {
        if !self.status.can_transition_to(next) {
            return Err(OrchestrationError::InvalidTransition {
                batch_id: self.id.clone(),
                from: self.status.to_string(),
                to: next.to_string(),
            });
        }
        self.status = next;
        Ok(())
    }
}
