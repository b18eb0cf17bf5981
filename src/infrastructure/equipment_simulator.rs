//! 设备模拟器 - 基础设施层
//!
//! 只暴露"对设备执行一条命令"的能力，不认识测试项和批次。
//!
//! - 延迟：按型号范围采样 1–3 个延迟单位，并真正等待这段时间
//! - 成败：固定 90% 成功率，每次调用独立采样
//! - 成功：填充原始 OID 遥测和解析字段
//! - 失败：状态为失败，附型号相关的错误码和信息，遥测为空
//!
//! 任何结果都能用 `EquipmentResponse` 表示，所以 `respond` 不返回错误。

use crate::error::ConfigError;
use crate::infrastructure::equipment_profile::{profile, EquipmentProfile};
use crate::models::{
    EquipmentCommand, EquipmentResponse, EquipmentType, ResponseStatus, TelemetryValue,
    TestCategory,
};
use chrono::Local;
use fastrand::Rng;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;

/// 模拟器的成功率
pub const SUCCESS_RATE: f64 = 0.90;

// MIB-II system 组
const OID_SYS_DESCR: &str = "1.3.6.1.2.1.1.1.0";
const OID_SYS_OBJECT_ID: &str = "1.3.6.1.2.1.1.2.0";
const OID_SYS_UPTIME: &str = "1.3.6.1.2.1.1.3.0";
const OID_SYS_NAME: &str = "1.3.6.1.2.1.1.5.0";

/// 测试分类 → 设备命令
///
/// 过滤类与 CM 数据获取都读取 CM 数据，ESG 相关分类驱动休眠模式。
pub fn command_for(category: &TestCategory) -> Result<EquipmentCommand, ConfigError> {
    match category {
        TestCategory::CmDataAcquisition
        | TestCategory::IndoorFilter
        | TestCategory::BandFilter
        | TestCategory::WhitelistFilter
        | TestCategory::BlacklistFilter
        | TestCategory::WorkDataFilter => Ok(EquipmentCommand::GetCmData),
        TestCategory::EsgCreation | TestCategory::EsgSelection => {
            Ok(EquipmentCommand::ExecuteSleepMode)
        }
        TestCategory::Other(label) => Err(ConfigError::UnknownCategory {
            category: label.clone(),
        }),
    }
}

/// 随机源策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedPolicy {
    /// 进程级随机源
    Entropy,
    /// 固定种子；每个任务的随机源由 (种子, 任务序号) 派生，与调度顺序无关
    Fixed(u64),
}

impl SeedPolicy {
    pub fn from_option(seed: Option<u64>) -> Self {
        seed.map(SeedPolicy::Fixed).unwrap_or(SeedPolicy::Entropy)
    }

    /// 为第 `task_index` 个任务生成随机源
    pub fn rng_for(self, task_index: usize) -> Rng {
        match self {
            SeedPolicy::Entropy => Rng::new(),
            SeedPolicy::Fixed(seed) => {
                Rng::with_seed(splitmix64(seed ^ splitmix64(task_index as u64)))
            }
        }
    }
}

fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    x = (x ^ (x >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    x ^ (x >> 31)
}

/// 设备状态概要
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct EquipmentStatus {
    pub equipment_type: EquipmentType,
    pub equipment_id: String,
    pub vendor: String,
    pub model: String,
    pub success_rate: f64,
}

/// 设备模拟器
pub struct EquipmentSimulator {
    latency_unit: Duration,
    seed_policy: SeedPolicy,
    success_rate: f64,
}

impl EquipmentSimulator {
    /// 创建模拟器
    pub fn new(latency_unit: Duration, seed_policy: SeedPolicy) -> Self {
        Self {
            latency_unit,
            seed_policy,
            success_rate: SUCCESS_RATE,
        }
    }

    /// 覆盖成功率（用于演练全部失败、全部成功等场景）
    pub fn with_success_rate(mut self, success_rate: f64) -> Self {
        self.success_rate = success_rate.clamp(0.0, 1.0);
        self
    }

    pub fn seed_policy(&self) -> SeedPolicy {
        self.seed_policy
    }

    /// 为任务生成随机源
    pub fn rng_for(&self, task_index: usize) -> Rng {
        self.seed_policy.rng_for(task_index)
    }

    /// 执行一条命令：采样延迟并等待，然后返回响应
    pub async fn respond(
        &self,
        command: EquipmentCommand,
        equipment_type: EquipmentType,
        rng: &mut Rng,
    ) -> EquipmentResponse {
        let response = self.sample(command, equipment_type, rng);
        if !response.latency.is_zero() {
            tokio::time::sleep(response.latency).await;
        }
        debug!(
            "模拟设备 {} 执行 {}: {:?}，延迟 {:?}",
            response.equipment_id, command, response.status, response.latency
        );
        response
    }

    /// 只生成响应，不等待
    pub fn sample(
        &self,
        command: EquipmentCommand,
        equipment_type: EquipmentType,
        rng: &mut Rng,
    ) -> EquipmentResponse {
        let p = profile(equipment_type);
        let units = uniform(rng, p.latency_units.0, p.latency_units.1);
        let latency = self.latency_unit.mul_f64(units);
        let success = rng.f64() < self.success_rate;

        let mut response = EquipmentResponse {
            status: ResponseStatus::Success,
            equipment_id: p.equipment_id.to_string(),
            vendor: p.vendor.to_string(),
            model: p.model.to_string(),
            command,
            raw: BTreeMap::new(),
            parsed: BTreeMap::new(),
            latency,
            error_code: None,
            error_message: None,
            timestamp: Local::now(),
        };

        if !success {
            let (code, message) = match command {
                EquipmentCommand::GetCmData => p.cm_failure,
                EquipmentCommand::ExecuteSleepMode => p.sleep_failure,
            };
            response.status = ResponseStatus::Failure;
            response.error_code = Some(code.to_string());
            response.error_message = Some(message.to_string());
            return response;
        }

        fill_common(p, rng, &mut response);
        if command == EquipmentCommand::ExecuteSleepMode {
            fill_sleep_mode(p, rng, &mut response);
        }
        response
    }

    /// 支持的设备类型
    pub fn available_equipment(&self) -> &'static [EquipmentType] {
        &EquipmentType::ALL
    }

    /// 设备状态概要
    pub fn equipment_status(&self, equipment_type: EquipmentType) -> EquipmentStatus {
        let p = profile(equipment_type);
        EquipmentStatus {
            equipment_type,
            equipment_id: p.equipment_id.to_string(),
            vendor: p.vendor.to_string(),
            model: p.model.to_string(),
            success_rate: self.success_rate,
        }
    }
}

fn fill_common(p: &EquipmentProfile, rng: &mut Rng, response: &mut EquipmentResponse) {
    let signal = round_to(uniform(rng, p.signal_dbm.0, p.signal_dbm.1), 1);
    let users = rng.i64(p.active_users.0..=p.active_users.1);
    let throughput = round_to(uniform(rng, 50.0, 1000.0) * p.throughput_factor, 2);
    let error_rate = round_to(uniform(rng, 0.0, 5.0) * p.error_rate_factor, 3);
    let uptime_ticks = rng.i64(3_600..=86_400 * 30) * 100;

    let raw = &mut response.raw;
    raw.insert(OID_SYS_DESCR.to_string(), format!("{} {}", p.vendor, p.model).into());
    raw.insert(OID_SYS_OBJECT_ID.to_string(), p.sys_object_id.into());
    raw.insert(OID_SYS_UPTIME.to_string(), uptime_ticks.into());
    raw.insert(OID_SYS_NAME.to_string(), p.equipment_id.into());
    raw.insert(p.oid("1.1"), p.cell_id.into());
    raw.insert(p.oid("1.2"), p.frequency_mhz.to_string().into());
    raw.insert(p.oid("1.3"), p.bandwidth_mhz.to_string().into());
    raw.insert(p.oid("2.1"), signal.into());
    raw.insert(p.oid("2.2"), users.into());
    raw.insert(p.oid("2.3"), throughput.into());
    raw.insert(p.oid("2.4"), error_rate.into());

    let parsed = &mut response.parsed;
    parsed.insert("cell_id".to_string(), p.cell_id.into());
    parsed.insert("frequency_mhz".to_string(), p.frequency_mhz.into());
    parsed.insert("bandwidth_mhz".to_string(), p.bandwidth_mhz.into());
    parsed.insert("signal_strength_dbm".to_string(), signal.into());
    parsed.insert("active_users".to_string(), users.into());
    parsed.insert("throughput_mbps".to_string(), throughput.into());
    parsed.insert("error_rate_percent".to_string(), error_rate.into());
}

fn fill_sleep_mode(p: &EquipmentProfile, rng: &mut Rng, response: &mut EquipmentResponse) {
    let savings = round_to(uniform(rng, p.power_savings_percent.0, p.power_savings_percent.1), 1);
    let minutes = rng.i64(p.sleep_minutes.0..=p.sleep_minutes.1);

    response.raw.insert(p.oid("3.1"), "1".into());
    response.raw.insert(p.oid("3.2"), savings.to_string().into());

    let parsed = &mut response.parsed;
    parsed.insert("sleep_mode_enabled".to_string(), true.into());
    parsed.insert("power_savings_percent".to_string(), savings.into());
    parsed.insert("sleep_duration_minutes".to_string(), minutes.into());
}

fn uniform(rng: &mut Rng, low: f64, high: f64) -> f64 {
    low + (high - low) * rng.f64()
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
