//! 结果分析服务 - 业务能力层
//!
//! 只负责"给一次设备响应下判定"，不关心流程。
//!
//! 两层判定：
//! 1. 语义判定：把测试条件和设备响应发给 [`JudgmentService`]，解析返回的 JSON
//! 2. 兜底规则：第一层任何失败都转入 [`fallback_rules::evaluate`]
//!
//! `analyze` 永远返回一个判定，不会失败。

use regex::Regex;
use serde::Deserialize;
use std::sync::{Arc, LazyLock};
use std::time::Duration;
use tracing::{debug, warn};

use crate::context::RunContext;
use crate::error::JudgmentError;
use crate::models::{EquipmentResponse, TestCondition, Verdict, VerdictKind};
use crate::services::fallback_rules;
use crate::services::judgment::{JudgmentPrompt, JudgmentService};
use crate::utils::truncate_text;

const SYSTEM_MESSAGE: &str = "你是一个专业的实验室测试结果分析专家，擅长根据测试条件判断设备响应是否合格。\
                              你只返回 JSON，不返回任何其他内容。";

static FENCED_JSON: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```(?:json)?\s*(\{.*\})\s*```").expect("fenced JSON pattern is valid")
});

/// 语义判定服务返回的 JSON 结构
#[derive(Debug, Deserialize)]
struct JudgmentReply {
    #[serde(alias = "result")]
    verdict: String,
    confidence: f64,
    #[serde(default)]
    analysis: Option<String>,
    #[serde(default)]
    issues: Vec<String>,
    #[serde(default)]
    recommendations: Vec<String>,
}

/// 结果分析服务
pub struct ResultAnalyzer {
    judgment: Option<Arc<dyn JudgmentService>>,
    ctx: Arc<RunContext>,
    timeout: Duration,
}

impl ResultAnalyzer {
    /// 创建分析器，`judgment` 为 `None` 时只使用兜底规则
    pub fn new(ctx: Arc<RunContext>, judgment: Option<Arc<dyn JudgmentService>>) -> Self {
        let timeout = ctx.config().judgment_timeout();
        Self {
            judgment,
            ctx,
            timeout,
        }
    }

    /// 只使用兜底规则的分析器
    pub fn fallback_only(ctx: Arc<RunContext>) -> Self {
        Self::new(ctx, None)
    }

    pub fn has_judgment_service(&self) -> bool {
        self.judgment.is_some()
    }

    /// 给出判定
    pub async fn analyze(
        &self,
        condition: &TestCondition,
        response: &EquipmentResponse,
    ) -> Verdict {
        if let Some(service) = self.judgment.as_deref() {
            match self.semantic_judgment(service, condition, response).await {
                Ok(verdict) => {
                    self.ctx.judgment_health().record_semantic();
                    return enforce_response_failure(verdict, response);
                }
                Err(JudgmentError::Skipped) => {
                    debug!("判定服务已标记为不可用，直接使用兜底规则");
                }
                Err(e) => {
                    if e.is_connectivity() {
                        self.ctx.judgment_health().mark_unreachable();
                    }
                    warn!("⚠️  语义判定失败，使用兜底规则: {}", e);
                }
            }
        }

        self.ctx.judgment_health().record_fallback();
        fallback_rules::evaluate(condition, response)
    }

    async fn semantic_judgment(
        &self,
        service: &dyn JudgmentService,
        condition: &TestCondition,
        response: &EquipmentResponse,
    ) -> Result<Verdict, JudgmentError> {
        if self.ctx.should_skip_judgment() {
            return Err(JudgmentError::Skipped);
        }

        let prompt = build_prompt(condition, response)?;
        debug!(
            "调用判定服务 {}，提示词长度: {} 字符",
            service.name(),
            prompt.user.len()
        );

        let reply = tokio::time::timeout(self.timeout, service.judge(&prompt))
            .await
            .map_err(|_| JudgmentError::Timeout {
                timeout_secs: self.timeout.as_secs(),
            })??;
        debug!("判定服务回复: {}", truncate_text(&reply, 120));

        parse_judgment_reply(&reply)
    }
}

/// 设备返回失败时判定只能是 FAIL，保留语义判定的置信度和说明
fn enforce_response_failure(mut verdict: Verdict, response: &EquipmentResponse) -> Verdict {
    if !response.is_success() && verdict.kind != VerdictKind::Fail {
        warn!(
            "⚠️  设备 {} 返回失败，语义判定 {} 改为 FAIL",
            response.equipment_id, verdict.kind
        );
        verdict.kind = VerdictKind::Fail;
    }
    verdict
}

/// 构建判定提示词
fn build_prompt(
    condition: &TestCondition,
    response: &EquipmentResponse,
) -> Result<JudgmentPrompt, JudgmentError> {
    let response_json = serde_json::to_string_pretty(response)
        .map_err(|e| JudgmentError::malformed(format!("设备响应序列化失败: {}", e)))?;

    let thresholds = if condition.thresholds.is_empty() {
        "无".to_string()
    } else {
        condition
            .thresholds
            .iter()
            .map(|(name, value)| format!("  {} = {}", name, value))
            .collect::<Vec<_>>()
            .join("\n")
    };

    let user = format!(
        r#"请根据测试条件判断设备响应是否合格。

测试条件：
  条件描述：{}
  期望件数：{}
  阈值：
{}

设备响应（JSON）：
{}

【判断标准】
- PASS：响应成功且满足测试条件
- FAIL：响应失败或明显不满足测试条件
- WARNING：基本满足但存在需要人工确认的问题

请只返回如下格式的 JSON：
{{
  "result": "PASS|FAIL|WARNING",
  "confidence": 0.0-1.0,
  "analysis": "分析说明",
  "issues": ["问题1"],
  "recommendations": ["建议1"]
}}"#,
        condition.condition_text, condition.expected_count, thresholds, response_json
    );

    Ok(JudgmentPrompt {
        system: SYSTEM_MESSAGE.to_string(),
        user,
    })
}

/// 从回复中取出 JSON 文本：优先 ```json 代码块，其次第一个 `{` 到最后一个 `}`
fn extract_json(reply: &str) -> Result<&str, JudgmentError> {
    if let Some(body) = FENCED_JSON.captures(reply).and_then(|c| c.get(1)) {
        return Ok(body.as_str());
    }

    match (reply.find('{'), reply.rfind('}')) {
        (Some(start), Some(end)) if start < end => Ok(&reply[start..=end]),
        _ => Err(JudgmentError::malformed("回复中没有 JSON 对象")),
    }
}

/// 解析语义判定回复
fn parse_judgment_reply(reply: &str) -> Result<Verdict, JudgmentError> {
    let json = extract_json(reply)?;
    let parsed: JudgmentReply = serde_json::from_str(json)
        .map_err(|e| JudgmentError::malformed(format!("JSON 解析失败: {}", e)))?;

    let kind = VerdictKind::parse(&parsed.verdict)
        .ok_or_else(|| JudgmentError::malformed(format!("未知判定: {}", parsed.verdict)))?;

    if !(0.0..=1.0).contains(&parsed.confidence) {
        return Err(JudgmentError::malformed(format!(
            "置信度超出范围: {}",
            parsed.confidence
        )));
    }

    let mut parts = Vec::new();
    if let Some(analysis) = parsed.analysis.filter(|a| !a.trim().is_empty()) {
        parts.push(analysis);
    }
    if !parsed.issues.is_empty() {
        parts.push(format!("问题: {}", parsed.issues.join("; ")));
    }
    if !parsed.recommendations.is_empty() {
        parts.push(format!("建议: {}", parsed.recommendations.join("; ")));
    }
    let rationale = (!parts.is_empty()).then(|| parts.join(" | "));

    Ok(Verdict::semantic(kind, parsed.confidence, rationale))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::models::{
        EquipmentCommand, EquipmentType, JudgmentSource, ResponseStatus, FALLBACK_CONFIDENCE,
    };
    use async_trait::async_trait;
    use chrono::Local;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// 固定回复的判定服务
    struct ScriptedService {
        reply: Result<String, fn() -> JudgmentError>,
        delay: Duration,
        calls: AtomicUsize,
    }

    impl ScriptedService {
        fn replying(reply: &str) -> Self {
            Self {
                reply: Ok(reply.to_string()),
                delay: Duration::ZERO,
                calls: AtomicUsize::new(0),
            }
        }

        fn failing(err: fn() -> JudgmentError) -> Self {
            Self {
                reply: Err(err),
                delay: Duration::ZERO,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl JudgmentService for ScriptedService {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn judge(&self, _prompt: &JudgmentPrompt) -> Result<String, JudgmentError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            match &self.reply {
                Ok(reply) => Ok(reply.clone()),
                Err(make) => Err(make()),
            }
        }
    }

    fn unreachable() -> JudgmentError {
        JudgmentError::Unreachable {
            model: "scripted".to_string(),
            reason: "connection refused".to_string(),
        }
    }

    fn ctx() -> Arc<RunContext> {
        Arc::new(RunContext::new(Config::default()))
    }

    fn good_response() -> EquipmentResponse {
        let mut parsed = BTreeMap::new();
        parsed.insert("signal_strength_dbm".to_string(), (-72.5).into());
        parsed.insert("error_rate_percent".to_string(), 0.8.into());
        EquipmentResponse {
            status: ResponseStatus::Success,
            equipment_id: "Samsung-AUv1-001".to_string(),
            vendor: "Samsung".to_string(),
            model: "AUv1".to_string(),
            command: EquipmentCommand::GetCmData,
            raw: BTreeMap::new(),
            parsed,
            latency: Duration::ZERO,
            error_code: None,
            error_message: None,
            timestamp: Local::now(),
        }
    }

    fn condition() -> TestCondition {
        TestCondition::new("CM数据获取成功", vec![EquipmentType::SamsungAuV1]).with_expected_count(1)
    }

    #[test]
    fn test_parse_plain_reply() {
        let verdict = parse_judgment_reply(
            r#"{"result": "FAIL", "confidence": 0.85, "analysis": "信号偏弱", "issues": ["信号强度低"], "recommendations": ["检查天线"]}"#,
        )
        .unwrap();
        assert_eq!(verdict.kind, VerdictKind::Fail);
        assert_eq!(verdict.confidence, 0.85);
        assert_eq!(verdict.source, JudgmentSource::Semantic);
        assert_eq!(
            verdict.rationale.as_deref(),
            Some("信号偏弱 | 问题: 信号强度低 | 建议: 检查天线")
        );
    }

    #[test]
    fn test_parse_fenced_reply_with_verdict_key() {
        let reply = "分析如下：\n```json\n{\"verdict\": \"warning\", \"confidence\": 0.6}\n```\n";
        let verdict = parse_judgment_reply(reply).unwrap();
        assert_eq!(verdict.kind, VerdictKind::Warning);
        assert_eq!(verdict.rationale, None);
    }

    #[test]
    fn test_parse_rejects_malformed_replies() {
        for reply in [
            "PASS",
            r#"{"result": "MAYBE", "confidence": 0.9}"#,
            r#"{"result": "PASS", "confidence": 1.5}"#,
            r#"{"result": "PASS"}"#,
            r#"{"result": "PASS", "confidence": "high"}"#,
        ] {
            let err = parse_judgment_reply(reply).unwrap_err();
            assert!(matches!(err, JudgmentError::Malformed { .. }), "{reply}: {err}");
        }
    }

    #[test]
    fn test_prompt_embeds_condition_and_response() {
        let cond = condition().with_threshold("min_signal_strength_dbm", -90.0);
        let prompt = build_prompt(&cond, &good_response()).unwrap();
        assert!(prompt.user.contains("CM数据获取成功"));
        assert!(prompt.user.contains("min_signal_strength_dbm = -90"));
        assert!(prompt.user.contains("Samsung-AUv1-001"));
        assert_eq!(prompt.system, SYSTEM_MESSAGE);
    }

    #[tokio::test]
    async fn test_semantic_verdict_is_used() {
        let ctx = ctx();
        let service = Arc::new(ScriptedService::replying(
            r#"{"result": "PASS", "confidence": 0.95, "analysis": "满足条件"}"#,
        ));
        let analyzer = ResultAnalyzer::new(ctx.clone(), Some(service));

        let verdict = analyzer.analyze(&condition(), &good_response()).await;
        assert_eq!(verdict.kind, VerdictKind::Pass);
        assert_eq!(verdict.confidence, 0.95);
        assert_eq!(verdict.source, JudgmentSource::Semantic);
        assert_eq!(ctx.judgment_health().semantic_verdicts(), 1);
    }

    #[tokio::test]
    async fn test_malformed_reply_falls_back() {
        let ctx = ctx();
        let analyzer = ResultAnalyzer::new(
            ctx.clone(),
            Some(Arc::new(ScriptedService::replying("看起来没问题"))),
        );

        let verdict = analyzer.analyze(&condition(), &good_response()).await;
        assert_eq!(verdict.source, JudgmentSource::Fallback);
        assert_eq!(verdict.confidence, FALLBACK_CONFIDENCE);
        assert_eq!(verdict.kind, VerdictKind::Pass);
        assert!(!ctx.judgment_health().is_unreachable());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_falls_back() {
        let ctx = ctx();
        let mut service = ScriptedService::replying(r#"{"result": "PASS", "confidence": 0.9}"#);
        service.delay = ctx.config().judgment_timeout() + Duration::from_secs(5);
        let analyzer = ResultAnalyzer::new(ctx.clone(), Some(Arc::new(service)));

        let verdict = analyzer.analyze(&condition(), &good_response()).await;
        assert_eq!(verdict.source, JudgmentSource::Fallback);
        assert_eq!(ctx.judgment_health().fallback_verdicts(), 1);
    }

    #[tokio::test]
    async fn test_unreachable_service_is_skipped_afterwards() {
        let ctx = ctx();
        let service = Arc::new(ScriptedService::failing(unreachable));
        let analyzer = ResultAnalyzer::new(ctx.clone(), Some(service.clone()));

        for _ in 0..3 {
            let verdict = analyzer.analyze(&condition(), &good_response()).await;
            assert_eq!(verdict.source, JudgmentSource::Fallback);
        }
        assert_eq!(service.calls.load(Ordering::SeqCst), 1);
        assert!(ctx.should_skip_judgment());
        assert_eq!(ctx.judgment_health().fallback_verdicts(), 3);
    }

    #[tokio::test]
    async fn test_unreachable_service_retried_when_skip_disabled() {
        let ctx = Arc::new(RunContext::new(Config {
            skip_judgment_after_unreachable: false,
            ..Config::default()
        }));
        let service = Arc::new(ScriptedService::failing(unreachable));
        let analyzer = ResultAnalyzer::new(ctx, Some(service.clone()));

        for _ in 0..3 {
            analyzer.analyze(&condition(), &good_response()).await;
        }
        assert_eq!(service.calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_fallback_only_analyzer() {
        let analyzer = ResultAnalyzer::fallback_only(ctx());
        assert!(!analyzer.has_judgment_service());

        let mut response = good_response();
        response.status = ResponseStatus::Failure;
        response.parsed.clear();
        response.error_message = Some("Cell not found".to_string());

        let verdict = tokio_test::block_on(analyzer.analyze(&condition(), &response));
        assert_eq!(verdict.kind, VerdictKind::Fail);
        assert_eq!(verdict.confidence, FALLBACK_CONFIDENCE);
    }

    /// 第一次调用返回服务错误，之后正常回复
    struct FlakyService {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl JudgmentService for FlakyService {
        fn name(&self) -> &str {
            "flaky"
        }

        async fn judge(&self, _prompt: &JudgmentPrompt) -> Result<String, JudgmentError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                return Err(JudgmentError::ServiceError {
                    model: "flaky".to_string(),
                    reason: "429 Too Many Requests".to_string(),
                });
            }
            Ok(r#"{"result": "PASS", "confidence": 0.9}"#.to_string())
        }
    }

    fn failed_response() -> EquipmentResponse {
        let mut response = good_response();
        response.status = ResponseStatus::Failure;
        response.parsed.clear();
        response.error_code = Some("AU_001".to_string());
        response.error_message = Some("Cell not found".to_string());
        response
    }

    #[tokio::test]
    async fn test_semantic_pass_on_failed_response_becomes_fail() {
        let ctx = ctx();
        let service = Arc::new(ScriptedService::replying(
            r#"{"result": "PASS", "confidence": 0.8, "analysis": "看起来正常"}"#,
        ));
        let analyzer = ResultAnalyzer::new(ctx.clone(), Some(service));

        let verdict = analyzer.analyze(&condition(), &failed_response()).await;
        assert_eq!(verdict.kind, VerdictKind::Fail);
        assert_eq!(verdict.source, JudgmentSource::Semantic);
        assert_eq!(verdict.confidence, 0.8);
        assert_eq!(verdict.rationale.as_deref(), Some("看起来正常"));
        assert_eq!(ctx.judgment_health().semantic_verdicts(), 1);
    }

    #[tokio::test]
    async fn test_service_error_does_not_disable_judgment() {
        let ctx = ctx();
        let service = Arc::new(FlakyService {
            calls: AtomicUsize::new(0),
        });
        let analyzer = ResultAnalyzer::new(ctx.clone(), Some(service.clone()));

        let first = analyzer.analyze(&condition(), &good_response()).await;
        assert_eq!(first.source, JudgmentSource::Fallback);
        assert!(!ctx.should_skip_judgment());

        let second = analyzer.analyze(&condition(), &good_response()).await;
        assert_eq!(second.source, JudgmentSource::Semantic);
        assert_eq!(second.confidence, 0.9);
        assert_eq!(service.calls.load(Ordering::SeqCst), 2);
        assert_eq!(ctx.judgment_health().semantic_verdicts(), 1);
    }
}
