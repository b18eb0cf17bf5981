/// 日志工具模块
///
/// 提供日志初始化、格式化和输出的辅助函数
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::Config;
use crate::context::JudgmentHealth;
use crate::orchestrator::BatchSummary;

/// 初始化全局日志
///
/// 设置了 `RUST_LOG` 时以它为准，否则使用 `info`（`verbose` 时为 `debug`）。
/// 重复调用不会报错，只有第一次生效。
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(false))
        .try_init()
        .ok();
}

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 实验室验证批次模式");
    info!("📊 最大并发数: {}", config.max_concurrent_tasks);
    if config.judgment_configured() {
        info!("🤖 语义判定: {} @ {}", config.llm_model_name, config.llm_api_base_url);
    } else {
        info!("🤖 语义判定: 未启用，只使用兜底规则");
    }
    if let Some(seed) = config.simulator_seed {
        info!("🎲 模拟器种子: {}", seed);
    }
    info!("{}", "=".repeat(60));
}

/// 记录测试项加载信息
///
/// # 参数
/// - `items`: 测试项数量
/// - `tasks`: 展开后的任务数量
pub fn log_items_loaded(items: usize, tasks: usize) {
    info!("✓ 找到 {} 个测试项", items);
    info!("📋 展开为 {} 个验证任务\n", tasks);
}

/// 记录批次开始信息
pub fn log_batch_start(batch_name: &str, total: usize, concurrency: usize) {
    info!("\n{}", "=".repeat(60));
    info!("📦 开始执行批次: {}", batch_name);
    info!("📄 任务总数: {} | 并发数: {}", total, concurrency);
    info!("{}", "=".repeat(60));
}

/// 记录批次完成信息
pub fn log_batch_complete(summary: &BatchSummary) {
    info!("\n{}", "─".repeat(60));
    info!(
        "✓ 批次 {} 结束 [{}]: 通过 {}/{}",
        summary.batch_name, summary.status, summary.pass_count, summary.total
    );
    if let Some(reason) = &summary.failure_reason {
        warn!("⚠️  批次失败原因: {}", reason);
    }
    info!("{}", "─".repeat(60));
}

/// 打印最终统计信息
///
/// # 参数
/// - `summary`: 批次汇总
/// - `health`: 判定来源计数
/// - `report_path`: 报告文件路径
pub fn print_final_stats(summary: &BatchSummary, health: &JudgmentHealth, report_path: &str) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 通过: {}/{}", summary.pass_count, summary.total);
    info!("❌ 失败: {}", summary.fail_count);
    info!("⚠️  警告: {}", summary.warning_count);
    info!("📈 成功率: {:.1}%", summary.success_rate * 100.0);
    info!(
        "⏱️  平均耗时: {:.3}秒",
        summary.average_execution_time.as_secs_f64()
    );
    info!(
        "🤖 语义判定 {} 次 / 兜底规则 {} 次",
        health.semantic_verdicts(),
        health.fallback_verdicts()
    );
    info!("{}", "=".repeat(60));
    info!("\n报告已保存至: {}", report_path);
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
