//! 批次统计

use chrono::{DateTime, Local};
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;

use crate::models::response::duration_secs;
use crate::models::{BatchStatus, EquipmentType, ValidationBatch, ValidationResult, VerdictKind};

/// 批次汇总
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchSummary {
    pub batch_id: String,
    pub batch_name: String,
    pub total: usize,
    pub pass_count: usize,
    pub fail_count: usize,
    pub warning_count: usize,
    /// PASS 占比，范围 [0, 1]
    pub success_rate: f64,
    #[serde(with = "duration_secs")]
    pub average_execution_time: Duration,
    pub status: BatchStatus,
    pub started_at: Option<DateTime<Local>>,
    pub finished_at: Option<DateTime<Local>>,
    pub failure_reason: Option<String>,
}

/// 单个设备类型的统计
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EquipmentStats {
    pub total: usize,
    pub pass_count: usize,
    pub fail_count: usize,
    pub warning_count: usize,
    pub success_rate: f64,
    #[serde(with = "duration_secs")]
    pub average_execution_time: Duration,
    pub average_confidence: f64,
}

#[derive(Default)]
struct Tally {
    total: usize,
    pass: usize,
    fail: usize,
    warning: usize,
    execution_time: Duration,
    confidence: f64,
}

impl Tally {
    fn add(&mut self, result: &ValidationResult) {
        self.total += 1;
        match result.verdict.kind {
            VerdictKind::Pass => self.pass += 1,
            VerdictKind::Fail => self.fail += 1,
            VerdictKind::Warning => self.warning += 1,
        }
        self.execution_time += result.execution_time;
        self.confidence += result.verdict.confidence;
    }

    fn ratio(&self, value: f64) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            value / self.total as f64
        }
    }

    fn average_execution_time(&self) -> Duration {
        if self.total == 0 {
            Duration::ZERO
        } else {
            Duration::from_nanos((self.execution_time.as_nanos() / self.total as u128) as u64)
        }
    }
}

/// 汇总批次结果；没有结果时各项为 0
pub fn summarize(batch: &ValidationBatch) -> BatchSummary {
    let mut tally = Tally::default();
    batch.results().iter().for_each(|r| tally.add(r));

    BatchSummary {
        batch_id: batch.id().to_string(),
        batch_name: batch.name().to_string(),
        total: tally.total,
        pass_count: tally.pass,
        fail_count: tally.fail,
        warning_count: tally.warning,
        success_rate: tally.ratio(tally.pass as f64),
        average_execution_time: tally.average_execution_time(),
        status: batch.status(),
        started_at: batch.started_at(),
        finished_at: batch.finished_at(),
        failure_reason: batch.failure_reason().map(str::to_string),
    }
}

/// 按设备类型汇总
pub fn equipment_summary(batch: &ValidationBatch) -> BTreeMap<EquipmentType, EquipmentStats> {
    let mut tallies: BTreeMap<EquipmentType, Tally> = BTreeMap::new();
    for result in batch.results() {
        tallies.entry(result.equipment_type).or_default().add(result);
    }

    tallies
        .into_iter()
        .map(|(equipment_type, tally)| {
            let stats = EquipmentStats {
                total: tally.total,
                pass_count: tally.pass,
                fail_count: tally.fail,
                warning_count: tally.warning,
                success_rate: tally.ratio(tally.pass as f64),
                average_execution_time: tally.average_execution_time(),
                average_confidence: tally.ratio(tally.confidence),
            };
            (equipment_type, stats)
        })
        .collect()
}
