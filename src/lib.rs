//! # Lab Validation
//!
//! 实验室设备验证批次的编排引擎
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 只暴露能力，不认识测试项和批次
//! - `EquipmentSimulator` - 模拟基站设备执行命令，返回遥测或错误
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单次响应
//! - `ResultAnalyzer` - 语义判定 + 兜底规则
//! - `JudgmentService` - 外部判定服务接口（`clients::LlmClient` 实现）
//! - `ReportWriter` - 写 JSON 报告
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一个任务"的完整处理流程
//! - `TaskUnit` - 任务上下文（测试项 + 场景 + 设备类型）
//! - `TaskFlow` - 流程编排（分类映射 → 模拟执行 → 判定 → 结果）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/batch_orchestrator` - 展开任务、控制并发、汇总结果
//! - `orchestrator/summary` - 批次与设备统计
//!
//! 运行期共享状态只有 `RunContext`（配置 + 判定服务健康记录），没有全局变量。
//!
//! ## 模块结构

pub mod clients;
pub mod config;
pub mod context;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use clients::LlmClient;
pub use config::Config;
pub use context::RunContext;
pub use error::{AppError, AppResult};
pub use infrastructure::{EquipmentSimulator, SeedPolicy};
pub use models::{
    EquipmentType, TestCategory, TestCondition, TestItem, ValidationBatch, ValidationResult,
    Verdict, VerdictKind,
};
pub use orchestrator::{
    BatchOrchestrator, BatchSummary, CancellationToken, LoggingProgress, NoProgress, ProgressSink,
};
pub use services::{JudgmentService, ReportWriter, ResultAnalyzer};
pub use workflow::{TaskFlow, TaskUnit};
