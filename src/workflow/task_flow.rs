//! 任务处理流程 - 流程层
//!
//! 核心职责：定义"一个验证任务"的完整处理流程
//!
//! 流程顺序：
//! 1. 测试分类 → 设备命令（无法映射则直接 FAIL）
//! 2. 模拟器执行命令
//! 3. 分析器判定
//! 4. 生成验证结果（计时覆盖 1-3）

use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::infrastructure::{command_for, EquipmentSimulator};
use crate::models::{ValidationResult, Verdict, VerdictKind};
use crate::services::ResultAnalyzer;
use crate::workflow::task_ctx::TaskUnit;

/// 任务处理流程
///
/// - 不持有批次，不关心其他任务
/// - 只依赖模拟器和分析器
/// - 任何情况下都恰好产出一个结果
pub struct TaskFlow {
    simulator: Arc<EquipmentSimulator>,
    analyzer: Arc<ResultAnalyzer>,
}

impl TaskFlow {
    pub fn new(simulator: Arc<EquipmentSimulator>, analyzer: Arc<ResultAnalyzer>) -> Self {
        Self {
            simulator,
            analyzer,
        }
    }

    pub async fn run(&self, unit: &TaskUnit, batch_id: &str) -> ValidationResult {
        let started = Instant::now();
        let item = &unit.item;

        let command = match command_for(&item.category) {
            Ok(command) => command,
            Err(e) => {
                warn!("{} ❌ 无法确定设备命令: {}", unit, e);
                return ValidationResult::new(
                    unit.origin(batch_id),
                    None,
                    Verdict::task_error(VerdictKind::Fail, e.to_string()),
                    started.elapsed(),
                    Some(e.to_string()),
                );
            }
        };

        debug!("{} 执行命令 {}", unit, command);
        let mut rng = self.simulator.rng_for(unit.index);
        let response = self
            .simulator
            .respond(command, unit.equipment_type, &mut rng)
            .await;

        let verdict = self.analyzer.analyze(&item.condition, &response).await;
        let error_message = response.error_message.clone();

        info!(
            "{} ✓ 判定: {} (置信度 {:.2})",
            unit, verdict.kind, verdict.confidence
        );

        ValidationResult::new(
            unit.origin(batch_id),
            Some(response),
            verdict,
            started.elapsed(),
            error_message,
        )
    }
}
