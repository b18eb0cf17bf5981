use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;

use lab_validation::models::load_all_toml_files;
use lab_validation::utils::logging::{self, log_items_loaded, log_startup, print_final_stats};
use lab_validation::{
    BatchOrchestrator, CancellationToken, Config, EquipmentSimulator, JudgmentService, LlmClient,
    LoggingProgress, ReportWriter, ResultAnalyzer, RunContext, SeedPolicy, TestItem,
    ValidationBatch,
};

#[tokio::main]
async fn main() -> Result<()> {
    // 第一个参数为可选的配置文件路径
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = Config::load(config_path.as_deref()).context("加载配置失败")?;

    // 初始化日志
    logging::init(config.verbose_logging);
    log_startup(&config);

    // 加载测试项
    let items: Vec<Arc<TestItem>> = load_all_toml_files(&config.test_items_folder)
        .await
        .with_context(|| format!("加载测试项失败: {}", config.test_items_folder))?
        .into_iter()
        .map(Arc::new)
        .collect();

    if items.is_empty() {
        warn!("⚠️ 没有找到测试项，程序结束");
        return Ok(());
    }
    log_items_loaded(items.len(), BatchOrchestrator::expand(&items).len());

    let ctx = Arc::new(RunContext::new(config));
    let config = ctx.config();

    let simulator = Arc::new(EquipmentSimulator::new(
        config.latency_unit(),
        SeedPolicy::from_option(config.simulator_seed),
    ));
    let judgment: Option<Arc<dyn JudgmentService>> = if config.judgment_configured() {
        Some(Arc::new(LlmClient::new(config)))
    } else {
        None
    };
    let analyzer = Arc::new(ResultAnalyzer::new(Arc::clone(&ctx), judgment));
    let orchestrator = BatchOrchestrator::new(Arc::clone(&ctx), simulator, analyzer);

    // Ctrl-C：不再派发新任务，等待进行中的任务完成
    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("⚠️  收到 Ctrl-C，停止派发新任务，等待进行中的任务完成...");
            on_ctrl_c.cancel();
        }
    });

    let mut batch = ValidationBatch::with_default_name();
    let summary = orchestrator
        .execute_with_cancel(
            &mut batch,
            &items,
            config.max_concurrent_tasks,
            &LoggingProgress,
            &cancel,
        )
        .await?;

    let writer = ReportWriter::with_path(&config.output_report_file);
    writer
        .write(&batch, &summary)
        .await
        .context("写入报告失败")?;

    print_final_stats(&summary, ctx.judgment_health(), writer.path());

    Ok(())
}
