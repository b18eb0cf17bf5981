//! 判定服务接口
//!
//! 第一层语义判定通过这个接口调用外部服务（通常是 LLM）。
//! 实现方只负责"把提示词发出去、把文本拿回来"，解析由分析器完成。

use crate::error::JudgmentError;
use async_trait::async_trait;

/// 发送给判定服务的提示词
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JudgmentPrompt {
    pub system: String,
    pub user: String,
}

/// 外部判定服务
#[async_trait]
pub trait JudgmentService: Send + Sync {
    /// 服务名称（日志用）
    fn name(&self) -> &str;

    /// 发送提示词，返回原始回复文本
    async fn judge(&self, prompt: &JudgmentPrompt) -> Result<String, JudgmentError>;
}
