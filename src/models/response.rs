//! 设备响应数据模型
//!
//! 原始遥测（OID → 标量）与解析后字段（字段名 → 类型化值）两份并存，
//! 下游的分析与展示都依赖这种双重表示。

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// 设备命令
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquipmentCommand {
    /// 获取 CM 数据
    GetCmData,
    /// 执行休眠模式
    ExecuteSleepMode,
}

impl EquipmentCommand {
    pub fn name(self) -> &'static str {
        match self {
            EquipmentCommand::GetCmData => "get_cm_data",
            EquipmentCommand::ExecuteSleepMode => "execute_sleep_mode",
        }
    }
}

impl fmt::Display for EquipmentCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// 响应状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    Success,
    Failure,
}

/// 遥测标量值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TelemetryValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl TelemetryValue {
    /// 数值视图；文本若能解析为数字也算
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            TelemetryValue::Int(v) => Some(*v as f64),
            TelemetryValue::Float(v) => Some(*v),
            TelemetryValue::Text(s) => s.trim().parse().ok(),
            TelemetryValue::Bool(_) => None,
        }
    }
}

impl From<i64> for TelemetryValue {
    fn from(v: i64) -> Self {
        TelemetryValue::Int(v)
    }
}

impl From<f64> for TelemetryValue {
    fn from(v: f64) -> Self {
        TelemetryValue::Float(v)
    }
}

impl From<bool> for TelemetryValue {
    fn from(v: bool) -> Self {
        TelemetryValue::Bool(v)
    }
}

impl From<&str> for TelemetryValue {
    fn from(v: &str) -> Self {
        TelemetryValue::Text(v.to_string())
    }
}

impl From<String> for TelemetryValue {
    fn from(v: String) -> Self {
        TelemetryValue::Text(v)
    }
}

/// 设备响应
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquipmentResponse {
    pub status: ResponseStatus,
    pub equipment_id: String,
    pub vendor: String,
    pub model: String,
    pub command: EquipmentCommand,
    /// 原始遥测：OID → 值
    pub raw: BTreeMap<String, TelemetryValue>,
    /// 解析后字段：字段名 → 值
    pub parsed: BTreeMap<String, TelemetryValue>,
    /// 模拟延迟
    #[serde(with = "duration_secs")]
    pub latency: Duration,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
    pub timestamp: DateTime<Local>,
}

impl EquipmentResponse {
    pub fn is_success(&self) -> bool {
        self.status == ResponseStatus::Success
    }

    /// 读取解析字段的数值
    pub fn parsed_f64(&self, field: &str) -> Option<f64> {
        self.parsed.get(field).and_then(TelemetryValue::as_f64)
    }
}

/// `Duration` 以浮点秒序列化
pub(crate) mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}
