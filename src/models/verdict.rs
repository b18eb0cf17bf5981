use serde::{Deserialize, Serialize};
use std::fmt;

/// 兜底规则的固定置信度，低于语义判定以表示确定性较弱
pub const FALLBACK_CONFIDENCE: f64 = 0.5;

/// 判定类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VerdictKind {
    Pass,
    Fail,
    Warning,
}

impl VerdictKind {
    /// 解析 `PASS` / `FAIL` / `WARNING`（忽略大小写）
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PASS" => Some(VerdictKind::Pass),
            "FAIL" => Some(VerdictKind::Fail),
            "WARNING" => Some(VerdictKind::Warning),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            VerdictKind::Pass => "PASS",
            VerdictKind::Fail => "FAIL",
            VerdictKind::Warning => "WARNING",
        }
    }
}

impl fmt::Display for VerdictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 判定来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JudgmentSource {
    /// 第一层：语义判定服务
    Semantic,
    /// 第二层：确定性兜底规则
    Fallback,
    /// 任务本身出错（配置错误、panic）
    TaskError,
}

/// 判定结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub kind: VerdictKind,
    /// 置信度，范围 [0, 1]
    pub confidence: f64,
    pub rationale: Option<String>,
    pub source: JudgmentSource,
}

impl Verdict {
    pub fn semantic(kind: VerdictKind, confidence: f64, rationale: Option<String>) -> Self {
        Self {
            kind,
            confidence: confidence.clamp(0.0, 1.0),
            rationale,
            source: JudgmentSource::Semantic,
        }
    }

    pub fn fallback(kind: VerdictKind, rationale: impl Into<String>) -> Self {
        Self {
            kind,
            confidence: FALLBACK_CONFIDENCE,
            rationale: Some(rationale.into()),
            source: JudgmentSource::Fallback,
        }
    }

    pub fn task_error(kind: VerdictKind, rationale: impl Into<String>) -> Self {
        Self {
            kind,
            confidence: 0.0,
            rationale: Some(rationale.into()),
            source: JudgmentSource::TaskError,
        }
    }

    pub fn is_pass(&self) -> bool {
        self.kind == VerdictKind::Pass
    }
}

/// 复核状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    NotRequired,
    NeedsReview,
}

impl ReviewStatus {
    /// FAIL 与 WARNING 需要人工复核
    pub fn for_verdict(kind: VerdictKind) -> Self {
        match kind {
            VerdictKind::Pass => ReviewStatus::NotRequired,
            VerdictKind::Fail | VerdictKind::Warning => ReviewStatus::NeedsReview,
        }
    }
}
