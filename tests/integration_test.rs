use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use lab_validation::error::JudgmentError;
use lab_validation::models::{
    parse_test_items, BatchStatus, JudgmentSource, ResponseStatus, FALLBACK_CONFIDENCE,
};
use lab_validation::services::JudgmentPrompt;
use lab_validation::{
    BatchOrchestrator, Config, EquipmentSimulator, EquipmentType, JudgmentService, NoProgress,
    ResultAnalyzer, RunContext, SeedPolicy, TestCategory, TestCondition, TestItem,
    ValidationBatch, ValidationResult, VerdictKind,
};

const TEST_ITEMS_TOML: &str = r#"
[[test_items]]
id = "TI-001"
test_block = "CM数据获取"
category = "CM数据获取"
scenarios = ["标准", "高负载"]

[test_items.condition]
condition_text = "CM数据获取成功且信号正常"
expected_count = 1
equipment_types = ["Ericsson-MMU", "Samsung-AUv1"]

[test_items.condition.thresholds]
min_signal_strength_dbm = -100.0
max_error_rate_percent = 5.0

[[test_items]]
id = "TI-002"
test_block = "ESG选定"
category = "esg_selection"
scenarios = ["夜间"]

[test_items.condition]
condition_text = "休眠模式生效"
equipment_types = ["Ericsson-RRU", "Samsung-AUv2", "Ericsson-RRU"]
"#;

/// 连接总是失败的判定服务
struct UnreachableService {
    calls: AtomicUsize,
}

#[async_trait]
impl JudgmentService for UnreachableService {
    fn name(&self) -> &str {
        "unreachable"
    }

    async fn judge(&self, _prompt: &JudgmentPrompt) -> Result<String, JudgmentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(JudgmentError::Unreachable {
            model: "unreachable".to_string(),
            reason: "connection refused".to_string(),
        })
    }
}

/// 总是返回 WARNING 的判定服务
struct CautiousService;

#[async_trait]
impl JudgmentService for CautiousService {
    fn name(&self) -> &str {
        "cautious"
    }

    async fn judge(&self, _prompt: &JudgmentPrompt) -> Result<String, JudgmentError> {
        Ok(concat!(
            "```json\n",
            r#"{"result": "WARNING", "confidence": 0.7, "analysis": "需要人工确认"}"#,
            "\n```"
        )
        .to_string())
    }
}

/// 不看设备状态、总是返回 PASS 的判定服务
struct OptimisticService;

#[async_trait]
impl JudgmentService for OptimisticService {
    fn name(&self) -> &str {
        "optimistic"
    }

    async fn judge(&self, _prompt: &JudgmentPrompt) -> Result<String, JudgmentError> {
        Ok(r#"{"result": "PASS", "confidence": 0.95, "analysis": "一切正常"}"#.to_string())
    }
}

fn load_items() -> Vec<Arc<TestItem>> {
    parse_test_items(TEST_ITEMS_TOML, "inline")
        .unwrap()
        .into_iter()
        .map(Arc::new)
        .collect()
}

fn build_orchestrator(
    simulator: EquipmentSimulator,
    judgment: Option<Arc<dyn JudgmentService>>,
) -> (Arc<RunContext>, BatchOrchestrator) {
    let ctx = Arc::new(RunContext::new(Config::default()));
    let analyzer = Arc::new(ResultAnalyzer::new(Arc::clone(&ctx), judgment));
    let orchestrator = BatchOrchestrator::new(Arc::clone(&ctx), Arc::new(simulator), analyzer);
    (ctx, orchestrator)
}

fn seeded_simulator(seed: u64) -> EquipmentSimulator {
    EquipmentSimulator::new(Duration::ZERO, SeedPolicy::Fixed(seed))
}

type OutcomeKey = (String, String, EquipmentType, VerdictKind, Option<ResponseStatus>);

fn outcomes(results: &[ValidationResult]) -> Vec<OutcomeKey> {
    let mut keys: Vec<_> = results
        .iter()
        .map(|r| {
            (
                r.test_item_id.clone(),
                r.scenario.clone(),
                r.equipment_type,
                r.verdict.kind,
                r.response.as_ref().map(|resp| resp.status),
            )
        })
        .collect();
    keys.sort_by(|a, b| (&a.0, &a.1, a.2).cmp(&(&b.0, &b.1, b.2)));
    keys
}

#[tokio::test]
async fn test_toml_items_run_end_to_end() {
    let items = load_items();
    assert_eq!(items.len(), 2);
    assert_eq!(items[1].condition.equipment_types.len(), 2);

    let expected = BatchOrchestrator::expand(&items).len();
    assert_eq!(expected, 6);

    let (_ctx, orchestrator) = build_orchestrator(seeded_simulator(1), None);
    let mut batch = ValidationBatch::new("端到端");
    let fractions = Mutex::new(Vec::new());
    let sink = |fraction: f64, _latest: &ValidationResult| fractions.lock().unwrap().push(fraction);

    let summary = orchestrator.execute(&mut batch, &items, 3, &sink).await.unwrap();

    assert_eq!(batch.status(), BatchStatus::Completed);
    assert_eq!(batch.results().len(), expected);
    assert_eq!(
        summary.pass_count + summary.fail_count + summary.warning_count,
        expected
    );
    assert!(batch.started_at().is_some() && batch.finished_at().is_some());

    let fractions = fractions.into_inner().unwrap();
    assert_eq!(fractions.len(), expected);
    assert!(fractions.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(fractions.last().copied(), Some(1.0));

    for result in batch.results() {
        assert_eq!(result.batch_id, batch.id());
        assert_eq!(result.verdict.source, JudgmentSource::Fallback);
    }
}

#[tokio::test]
async fn test_concurrency_does_not_change_outcomes() {
    let items = load_items();

    let (_, sequential) = build_orchestrator(seeded_simulator(2024), None);
    let mut first = ValidationBatch::new("并发 1");
    sequential.execute(&mut first, &items, 1, &NoProgress).await.unwrap();

    let (_, parallel) = build_orchestrator(seeded_simulator(2024), None);
    let mut second = ValidationBatch::new("并发 8");
    parallel.execute(&mut second, &items, 8, &NoProgress).await.unwrap();

    assert_eq!(outcomes(first.results()), outcomes(second.results()));
}

#[tokio::test]
async fn test_unreachable_judgment_falls_back_for_every_task() {
    let items = vec![Arc::new(TestItem::new(
        "TI-100",
        "CM数据获取",
        TestCategory::CmDataAcquisition,
        TestCondition::new("CM数据获取成功", EquipmentType::ALL.to_vec()),
        vec!["标准".to_string()],
    ))];
    let service = Arc::new(UnreachableService {
        calls: AtomicUsize::new(0),
    });
    let (ctx, orchestrator) = build_orchestrator(seeded_simulator(7), Some(service.clone()));

    let mut batch = ValidationBatch::new("判定服务不可用");
    orchestrator.execute(&mut batch, &items, 4, &NoProgress).await.unwrap();

    assert_eq!(batch.status(), BatchStatus::Completed);
    assert_eq!(batch.results().len(), 4);
    for result in batch.results() {
        assert_eq!(result.verdict.confidence, FALLBACK_CONFIDENCE);
        assert_eq!(result.verdict.source, JudgmentSource::Fallback);
    }
    assert!(ctx.judgment_health().is_unreachable());
    assert_eq!(ctx.judgment_health().fallback_verdicts(), 4);
    assert!(service.calls.load(Ordering::SeqCst) >= 1);
}

#[tokio::test]
async fn test_always_failing_equipment_fails_every_task() {
    let items = load_items();
    let (_, orchestrator) = build_orchestrator(seeded_simulator(3).with_success_rate(0.0), None);

    let mut batch = ValidationBatch::new("全部失败");
    let summary = orchestrator.execute(&mut batch, &items, 4, &NoProgress).await.unwrap();

    assert_eq!(summary.fail_count, summary.total);
    assert_eq!(summary.success_rate, 0.0);
    for result in batch.results() {
        assert_eq!(result.verdict.kind, VerdictKind::Fail);
        assert!(result.error_message.is_some());
    }
}

#[tokio::test]
async fn test_semantic_verdicts_are_used_when_available() {
    let items = load_items();
    let simulator = seeded_simulator(5).with_success_rate(1.0);
    let (ctx, orchestrator) = build_orchestrator(simulator, Some(Arc::new(CautiousService)));

    let mut batch = ValidationBatch::new("语义判定");
    let summary = orchestrator.run(&mut batch, &items, &NoProgress).await.unwrap();

    assert_eq!(summary.warning_count, summary.total);
    assert_eq!(ctx.judgment_health().semantic_verdicts(), summary.total);
    for result in batch.results() {
        assert_eq!(result.verdict.source, JudgmentSource::Semantic);
        assert_eq!(result.verdict.confidence, 0.7);
        assert_eq!(result.verdict.rationale.as_deref(), Some("需要人工确认"));
    }
}

#[tokio::test]
async fn test_failed_equipment_overrides_semantic_pass() {
    let items = load_items();
    let simulator = seeded_simulator(11).with_success_rate(0.0);
    let (ctx, orchestrator) = build_orchestrator(simulator, Some(Arc::new(OptimisticService)));

    let mut batch = ValidationBatch::new("设备失败");
    let summary = orchestrator.execute(&mut batch, &items, 3, &NoProgress).await.unwrap();

    assert_eq!(batch.status(), BatchStatus::Completed);
    assert_eq!(summary.fail_count, summary.total);
    assert_eq!(summary.pass_count, 0);
    assert_eq!(ctx.judgment_health().semantic_verdicts(), summary.total);
    for result in batch.results() {
        assert_eq!(result.verdict.kind, VerdictKind::Fail);
        assert_eq!(result.verdict.source, JudgmentSource::Semantic);
        assert_eq!(
            result.response.as_ref().map(|r| r.status),
            Some(ResponseStatus::Failure)
        );
    }
}

#[tokio::test]
async fn test_unmapped_category_fails_only_its_own_tasks() {
    let mut items = load_items();
    items.insert(
        1,
        Arc::new(TestItem::new(
            "TI-900",
            "性能测试",
            TestCategory::Other("性能测试".to_string()),
            TestCondition::new("吞吐量达标", vec![EquipmentType::SamsungAuV2]),
            vec!["标准".to_string()],
        )),
    );
    let expected = BatchOrchestrator::expand(&items).len();
    assert_eq!(expected, 7);

    let (_, orchestrator) = build_orchestrator(seeded_simulator(13), None);
    let mut batch = ValidationBatch::new("混合类别");
    let summary = orchestrator.execute(&mut batch, &items, 4, &NoProgress).await.unwrap();

    assert_eq!(batch.status(), BatchStatus::Completed);
    assert_eq!(summary.total, expected);

    let (unmapped, mapped): (Vec<_>, Vec<_>) = batch
        .results()
        .iter()
        .partition(|r| r.test_item_id == "TI-900");
    assert_eq!(unmapped.len(), 1);
    let task_error = unmapped[0];
    assert_eq!(task_error.verdict.kind, VerdictKind::Fail);
    assert_eq!(task_error.verdict.source, JudgmentSource::TaskError);
    assert!(task_error.response.is_none());
    assert!(task_error.error_message.as_deref().unwrap().contains("性能测试"));

    assert_eq!(mapped.len(), 6);
    for result in mapped {
        assert_eq!(result.verdict.source, JudgmentSource::Fallback);
        assert!(result.response.is_some());
    }
}

#[tokio::test]
async fn test_every_expanded_task_reports_exactly_once() {
    let items = load_items();
    let expected: BTreeSet<_> = BatchOrchestrator::expand(&items)
        .iter()
        .map(|u| (u.item.id.clone(), u.scenario.clone(), u.equipment_type))
        .collect();
    assert_eq!(expected.len(), 6);

    let (_, orchestrator) = build_orchestrator(seeded_simulator(17), None);
    let mut batch = ValidationBatch::new("唯一性");
    orchestrator.execute(&mut batch, &items, 6, &NoProgress).await.unwrap();

    let reported: BTreeSet<_> = batch
        .results()
        .iter()
        .map(|r| (r.test_item_id.clone(), r.scenario.clone(), r.equipment_type))
        .collect();
    assert_eq!(batch.results().len(), expected.len());
    assert_eq!(reported, expected);
}
