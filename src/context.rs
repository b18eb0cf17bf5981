//! 运行上下文
//!
//! 每次运行创建一次，传入分析器和编排器，运行结束后丢弃。
//! 判定服务的可用性缓存和判定来源计数都放在这里，不使用全局状态。

use crate::config::Config;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// 判定服务在本次运行中的健康记录
#[derive(Debug, Default)]
pub struct JudgmentHealth {
    unreachable: AtomicBool,
    semantic_verdicts: AtomicUsize,
    fallback_verdicts: AtomicUsize,
}

impl JudgmentHealth {
    /// 记录一次连接层面的失败
    pub fn mark_unreachable(&self) {
        self.unreachable.store(true, Ordering::Release);
    }

    pub fn is_unreachable(&self) -> bool {
        self.unreachable.load(Ordering::Acquire)
    }

    pub fn record_semantic(&self) {
        self.semantic_verdicts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fallback(&self) {
        self.fallback_verdicts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn semantic_verdicts(&self) -> usize {
        self.semantic_verdicts.load(Ordering::Relaxed)
    }

    pub fn fallback_verdicts(&self) -> usize {
        self.fallback_verdicts.load(Ordering::Relaxed)
    }
}

/// 运行上下文
#[derive(Debug)]
pub struct RunContext {
    config: Config,
    judgment_health: JudgmentHealth,
}

impl RunContext {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            judgment_health: JudgmentHealth::default(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn judgment_health(&self) -> &JudgmentHealth {
        &self.judgment_health
    }

    /// 是否应当跳过第一层判定
    pub fn should_skip_judgment(&self) -> bool {
        self.config.skip_judgment_after_unreachable && self.judgment_health.is_unreachable()
    }
}
