//! 确定性兜底规则
//!
//! 判定服务不可用时使用。输入只有 `condition.thresholds` 和
//! `response.parsed`（以及响应状态），相同输入永远得到相同判定。
//!
//! 规则：
//! 1. 设备返回失败 → FAIL，与阈值无关
//! 2. 有阈值：`min_<字段>` 要求 字段 ≥ 值，`max_<字段>` 要求 字段 ≤ 值，
//!    不带前缀视同 `min_`；任一不满足 → FAIL，否则有字段缺失 → WARNING，否则 PASS
//! 3. 无阈值：信号强度 > -100 dBm 且误码率 < 10% → PASS，否则 WARNING

use crate::models::{EquipmentResponse, TestCondition, Verdict, VerdictKind};
use std::fmt::Write;

const DEFAULT_MIN_SIGNAL_DBM: f64 = -100.0;
const DEFAULT_MAX_ERROR_RATE: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bound {
    AtLeast,
    AtMost,
}

/// 阈值名 → (字段名, 比较方向)
fn split_threshold(name: &str) -> (&str, Bound) {
    if let Some(field) = name.strip_prefix("min_") {
        (field, Bound::AtLeast)
    } else if let Some(field) = name.strip_prefix("max_") {
        (field, Bound::AtMost)
    } else {
        (name, Bound::AtLeast)
    }
}

/// 用兜底规则给出判定
pub fn evaluate(condition: &TestCondition, response: &EquipmentResponse) -> Verdict {
    if !response.is_success() {
        let message = response
            .error_message
            .as_deref()
            .unwrap_or("未知错误");
        return Verdict::fallback(
            VerdictKind::Fail,
            format!("规则判定: 设备返回错误应答 | 问题: {}", message),
        );
    }

    if condition.thresholds.is_empty() {
        return default_performance_rule(response);
    }

    let mut violations = Vec::new();
    let mut missing = Vec::new();

    for (name, &threshold) in &condition.thresholds {
        let (field, bound) = split_threshold(name);
        match response.parsed_f64(field) {
            None => missing.push(field.to_string()),
            Some(value) => {
                let ok = match bound {
                    Bound::AtLeast => value >= threshold,
                    Bound::AtMost => value <= threshold,
                };
                if !ok {
                    let op = if bound == Bound::AtLeast { "≥" } else { "≤" };
                    violations.push(format!("{} = {} (要求 {} {})", field, value, op, threshold));
                }
            }
        }
    }

    if !violations.is_empty() {
        let mut rationale = format!(
            "规则判定: {} 项阈值未满足 | 问题: {}",
            violations.len(),
            violations.join("; ")
        );
        if !missing.is_empty() {
            let _ = write!(rationale, " | 缺失字段: {}", missing.join(", "));
        }
        return Verdict::fallback(VerdictKind::Fail, rationale);
    }

    if !missing.is_empty() {
        return Verdict::fallback(
            VerdictKind::Warning,
            format!("规则判定: 应答中缺少可比较的字段 | 缺失字段: {}", missing.join(", ")),
        );
    }

    Verdict::fallback(
        VerdictKind::Pass,
        format!("规则判定: {} 项阈值全部满足", condition.thresholds.len()),
    )
}

fn default_performance_rule(response: &EquipmentResponse) -> Verdict {
    let signal = response.parsed_f64("signal_strength_dbm");
    let error_rate = response.parsed_f64("error_rate_percent");

    match (signal, error_rate) {
        (Some(signal), Some(error_rate))
            if signal > DEFAULT_MIN_SIGNAL_DBM && error_rate < DEFAULT_MAX_ERROR_RATE =>
        {
            Verdict::fallback(VerdictKind::Pass, "规则判定: 满足基本条件")
        }
        (Some(signal), Some(error_rate)) => Verdict::fallback(
            VerdictKind::Warning,
            format!(
                "规则判定: 性能可能存在问题 | 问题: 信号强度 {}dBm; 误码率 {}% | 建议: 请确认设备设置",
                signal, error_rate
            ),
        ),
        _ => Verdict::fallback(
            VerdictKind::Warning,
            "规则判定: 应答中缺少信号强度或误码率字段",
        ),
    }
}
