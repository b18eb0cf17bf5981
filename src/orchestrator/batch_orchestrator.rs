//! 批次编排器 - 编排层
//!
//! ## 职责
//!
//! 1. **展开**：测试项 × 场景 × 设备类型 → `Vec<TaskUnit>`
//! 2. **并发控制**：固定大小的工作池（Semaphore），任务放在 `JoinSet` 中，
//!    编排 future 被丢弃时未完成的任务一并中止
//! 3. **汇总**：按完成顺序收集结果，唯一写入批次的地方
//! 4. **状态迁移**：PENDING → RUNNING → COMPLETED | FAILED
//!
//! ## 取消
//!
//! 取消后尚未拿到许可的任务直接跳过，正在执行的任务照常完成并保留结果，
//! 批次以 FAILED 结束，失败原因为 `cancelled`。

use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::context::RunContext;
use crate::error::{AppResult, OrchestrationError};
use crate::infrastructure::EquipmentSimulator;
use crate::models::{
    TaskOrigin, TestItem, ValidationBatch, ValidationResult, Verdict, VerdictKind,
};
use crate::orchestrator::cancel::CancellationToken;
use crate::orchestrator::progress::ProgressSink;
use crate::orchestrator::summary::{summarize, BatchSummary};
use crate::services::ResultAnalyzer;
use crate::utils::logging::{log_batch_complete, log_batch_start};
use crate::workflow::{TaskFlow, TaskUnit};

/// 取消时记录的失败原因
pub const CANCELLED_REASON: &str = "cancelled";

/// 批次编排器
pub struct BatchOrchestrator {
    ctx: Arc<RunContext>,
    flow: Arc<TaskFlow>,
}

impl BatchOrchestrator {
    pub fn new(
        ctx: Arc<RunContext>,
        simulator: Arc<EquipmentSimulator>,
        analyzer: Arc<ResultAnalyzer>,
    ) -> Self {
        Self {
            ctx,
            flow: Arc::new(TaskFlow::new(simulator, analyzer)),
        }
    }

    pub fn context(&self) -> &RunContext {
        &self.ctx
    }

    /// 展开测试项
    ///
    /// 顺序：测试项 → 场景 → 设备类型，`index` 为派发序号
    pub fn expand(items: &[Arc<TestItem>]) -> Vec<TaskUnit> {
        let mut units = Vec::with_capacity(items.iter().map(|i| i.task_count()).sum());
        for item in items {
            for scenario in &item.scenarios {
                for &equipment_type in &item.condition.equipment_types {
                    units.push(TaskUnit::new(
                        units.len(),
                        Arc::clone(item),
                        scenario.clone(),
                        equipment_type,
                    ));
                }
            }
        }
        units
    }

    /// 使用配置中的并发数执行批次
    pub async fn run(
        &self,
        batch: &mut ValidationBatch,
        items: &[Arc<TestItem>],
        sink: &dyn ProgressSink,
    ) -> AppResult<BatchSummary> {
        self.execute(batch, items, self.ctx.config().max_concurrent_tasks, sink)
            .await
    }

    /// 执行批次
    pub async fn execute(
        &self,
        batch: &mut ValidationBatch,
        items: &[Arc<TestItem>],
        concurrency: usize,
        sink: &dyn ProgressSink,
    ) -> AppResult<BatchSummary> {
        self.execute_with_cancel(batch, items, concurrency, sink, &CancellationToken::new())
            .await
    }

    /// 执行批次，支持取消
    ///
    /// 批次不是 PENDING 时返回错误且不执行任何任务；其余情况都返回汇总，
    /// 失败信息体现在批次状态和 `failure_reason` 上。
    pub async fn execute_with_cancel(
        &self,
        batch: &mut ValidationBatch,
        items: &[Arc<TestItem>],
        concurrency: usize,
        sink: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> AppResult<BatchSummary> {
        batch.start()?;

        let units = Self::expand(items);
        let total = units.len();
        log_batch_start(batch.name(), total, concurrency);

        if concurrency == 0 || concurrency > Semaphore::MAX_PERMITS {
            let err = OrchestrationError::WorkerPool {
                concurrency,
                reason: format!("并发数必须在 1..={} 之间", Semaphore::MAX_PERMITS),
            };
            error!("❌ {}", err);
            batch.fail(err.to_string())?;
            let summary = summarize(batch);
            log_batch_complete(&summary);
            return Ok(summary);
        }

        let semaphore = Arc::new(Semaphore::new(concurrency));
        // 调用方提前丢弃本 future 时，JoinSet 随之中止所有未完成的任务
        let mut join_set = JoinSet::new();

        for unit in units {
            let semaphore = Arc::clone(&semaphore);
            let flow = Arc::clone(&self.flow);
            let cancel = cancel.clone();
            let batch_id = batch.id().to_string();
            let origin = unit.origin(&batch_id);
            let label = unit.to_string();

            join_set.spawn(async move {
                let outcome = AssertUnwindSafe(async move {
                    let _permit = semaphore.acquire_owned().await.ok()?;
                    if cancel.is_cancelled() {
                        return None;
                    }
                    Some(flow.run(&unit, &batch_id).await)
                })
                .catch_unwind()
                .await;
                (origin, label, outcome)
            });
        }

        let mut completed = 0usize;
        let mut skipped = 0usize;

        while let Some(joined) = join_set.join_next().await {
            let (origin, label, outcome) = match joined {
                Ok(task) => task,
                Err(join_err) => {
                    error!("❌ 任务被运行时中止: {}", join_err);
                    continue;
                }
            };
            let result = match outcome {
                Ok(Some(result)) => result,
                Ok(None) => {
                    skipped += 1;
                    continue;
                }
                Err(payload) => task_error_result(origin, label, payload),
            };

            completed += 1;
            batch.push_result(result);
            if let Some(latest) = batch.results().last() {
                sink.on_progress(completed as f64 / total as f64, latest);
            }
        }

        if completed == total {
            batch.complete()?;
        } else if cancel.is_cancelled() {
            warn!(
                "⚠️  {}",
                OrchestrationError::Cancelled { completed, total }
            );
            batch.fail(CANCELLED_REASON)?;
        } else {
            let reason = format!("{}/{} 个任务未执行", total - completed, total);
            error!("❌ 批次 {} 未完成: {}", batch.name(), reason);
            batch.fail(reason)?;
        }

        if skipped > 0 {
            info!("⏭️  跳过 {} 个未开始的任务", skipped);
        }

        let summary = summarize(batch);
        log_batch_complete(&summary);
        Ok(summary)
    }
}

/// 任务 panic 时生成的结果
fn task_error_result(
    origin: TaskOrigin,
    label: String,
    payload: Box<dyn Any + Send>,
) -> ValidationResult {
    let err = OrchestrationError::TaskPanicked {
        task: label,
        message: panic_message(payload),
    };
    error!("❌ {}", err);
    let message = err.to_string();
    ValidationResult::new(
        origin,
        None,
        Verdict::task_error(VerdictKind::Warning, message.clone()),
        Duration::ZERO,
        Some(message),
    )
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "未知 panic".to_string()
    }
}
