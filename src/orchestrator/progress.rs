//! 进度回调
//!
//! 每完成一个任务回调一次，按完成顺序调用，`fraction` 单调不减，
//! 最后一个任务完成时恰好为 1.0。实现方必须尽快返回。

use tracing::info;

use crate::models::ValidationResult;

/// 进度回调
pub trait ProgressSink: Send + Sync {
    fn on_progress(&self, fraction: f64, latest: &ValidationResult);
}

impl<F> ProgressSink for F
where
    F: Fn(f64, &ValidationResult) + Send + Sync,
{
    fn on_progress(&self, fraction: f64, latest: &ValidationResult) {
        self(fraction, latest)
    }
}

/// 通过日志输出进度
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingProgress;

impl ProgressSink for LoggingProgress {
    fn on_progress(&self, fraction: f64, latest: &ValidationResult) {
        info!(
            "📈 进度 {:>5.1}% | 测试项#{} 场景#{} 设备#{} → {}",
            fraction * 100.0,
            latest.test_item_id,
            latest.scenario,
            latest.equipment_type,
            latest.verdict.kind
        );
    }
}

/// 不做任何事
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn on_progress(&self, _fraction: f64, _latest: &ValidationResult) {}
}
