//! 批次取消信号
//!
//! 取消后，尚未拿到并发许可的任务不再执行；已在执行的任务照常完成，
//! 结果保留在批次中。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// 可跨任务共享的取消信号
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// 请求取消，可重复调用
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_state() {
        let token = CancellationToken::new();
        let observer = token.clone();
        assert!(!observer.is_cancelled());
        token.cancel();
        token.cancel();
        assert!(observer.is_cancelled());
    }
}
