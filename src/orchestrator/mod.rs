//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责批次执行和并发调度，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `batch_orchestrator` - 批次编排器
//! - 展开测试项为任务（测试项 × 场景 × 设备类型）
//! - 控制并发数量（Semaphore）
//! - 按完成顺序汇总结果、回调进度
//! - 驱动批次状态迁移
//!
//! ### `summary` - 批次统计
//! ### `progress` - 进度回调
//! ### `cancel` - 取消信号
//!
//! ## 层次关系
//!
//! ```text
//! batch_orchestrator (处理 Vec<TestItem>)
//!     ↓
//! workflow::TaskFlow (处理单个 TaskUnit)
//!     ↓
//! services (能力层：analyzer / fallback rules / judgment)
//!     ↓
//! infrastructure (基础设施：EquipmentSimulator)
//! ```

pub mod batch_orchestrator;
pub mod cancel;
pub mod progress;
pub mod summary;

pub use batch_orchestrator::{BatchOrchestrator, CANCELLED_REASON};
pub use cancel::CancellationToken;
pub use progress::{LoggingProgress, NoProgress, ProgressSink};
pub use summary::{equipment_summary, summarize, BatchSummary, EquipmentStats};
