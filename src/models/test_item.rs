//! 测试项数据模型
//!
//! 测试项由调用方提供，创建后不可变；任务通过 `Arc<TestItem>` 引用它。

use crate::error::ConfigError;
use phf::phf_map;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// 测试分类
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TestCategory {
    /// CM 数据获取
    CmDataAcquisition,
    /// 室内对策站过滤
    IndoorFilter,
    /// 对策频段过滤
    BandFilter,
    /// ESG 创建
    EsgCreation,
    /// ESG 选定
    EsgSelection,
    /// 白名单站过滤
    WhitelistFilter,
    /// 黑名单站过滤
    BlacklistFilter,
    /// 作业数据过滤
    WorkDataFilter,
    /// 来源数据中出现、但没有命令映射的分类
    Other(String),
}

/// 分类代码与显示名 → 分类
static CATEGORY_LABELS: phf::Map<&'static str, TestCategory> = phf_map! {
    "cm_data_acquisition" => TestCategory::CmDataAcquisition,
    "indoor_filter" => TestCategory::IndoorFilter,
    "band_filter" => TestCategory::BandFilter,
    "esg_creation" => TestCategory::EsgCreation,
    "esg_selection" => TestCategory::EsgSelection,
    "whitelist_filter" => TestCategory::WhitelistFilter,
    "blacklist_filter" => TestCategory::BlacklistFilter,
    "work_data_filter" => TestCategory::WorkDataFilter,
    "CM数据获取" => TestCategory::CmDataAcquisition,
    "室内对策站过滤" => TestCategory::IndoorFilter,
    "对策频段过滤" => TestCategory::BandFilter,
    "ESG创建" => TestCategory::EsgCreation,
    "ESG选定" => TestCategory::EsgSelection,
    "白名单站过滤" => TestCategory::WhitelistFilter,
    "黑名单站过滤" => TestCategory::BlacklistFilter,
    "作业数据过滤" => TestCategory::WorkDataFilter,
};

impl TestCategory {
    /// 从代码或显示名解析，无法识别时得到 `Other`
    pub fn from_label(label: &str) -> Self {
        let label = label.trim();
        CATEGORY_LABELS
            .get(label)
            .cloned()
            .unwrap_or_else(|| TestCategory::Other(label.to_string()))
    }

    /// 稳定的分类代码
    pub fn code(&self) -> &str {
        match self {
            TestCategory::CmDataAcquisition => "cm_data_acquisition",
            TestCategory::IndoorFilter => "indoor_filter",
            TestCategory::BandFilter => "band_filter",
            TestCategory::EsgCreation => "esg_creation",
            TestCategory::EsgSelection => "esg_selection",
            TestCategory::WhitelistFilter => "whitelist_filter",
            TestCategory::BlacklistFilter => "blacklist_filter",
            TestCategory::WorkDataFilter => "work_data_filter",
            TestCategory::Other(label) => label,
        }
    }

    /// 显示名
    pub fn name(&self) -> &str {
        match self {
            TestCategory::CmDataAcquisition => "CM数据获取",
            TestCategory::IndoorFilter => "室内对策站过滤",
            TestCategory::BandFilter => "对策频段过滤",
            TestCategory::EsgCreation => "ESG创建",
            TestCategory::EsgSelection => "ESG选定",
            TestCategory::WhitelistFilter => "白名单站过滤",
            TestCategory::BlacklistFilter => "黑名单站过滤",
            TestCategory::WorkDataFilter => "作业数据过滤",
            TestCategory::Other(label) => label,
        }
    }
}

impl fmt::Display for TestCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl Serialize for TestCategory {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.code())
    }
}

impl<'de> Deserialize<'de> for TestCategory {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        Ok(TestCategory::from_label(&label))
    }
}

/// 设备类型（厂商 + 型号）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EquipmentType {
    #[serde(rename = "Ericsson-MMU")]
    EricssonMmu,
    #[serde(rename = "Ericsson-RRU")]
    EricssonRru,
    #[serde(rename = "Samsung-AUv1")]
    SamsungAuV1,
    #[serde(rename = "Samsung-AUv2")]
    SamsungAuV2,
}

impl EquipmentType {
    pub const ALL: [EquipmentType; 4] = [
        EquipmentType::EricssonMmu,
        EquipmentType::EricssonRru,
        EquipmentType::SamsungAuV1,
        EquipmentType::SamsungAuV2,
    ];

    pub fn label(self) -> &'static str {
        match self {
            EquipmentType::EricssonMmu => "Ericsson-MMU",
            EquipmentType::EricssonRru => "Ericsson-RRU",
            EquipmentType::SamsungAuV1 => "Samsung-AUv1",
            EquipmentType::SamsungAuV2 => "Samsung-AUv2",
        }
    }

    /// 从标签解析设备类型
    pub fn from_label(label: &str) -> Result<Self, ConfigError> {
        Self::ALL
            .into_iter()
            .find(|t| t.label().eq_ignore_ascii_case(label.trim()))
            .ok_or_else(|| ConfigError::UnknownEquipment {
                label: label.to_string(),
            })
    }
}

impl fmt::Display for EquipmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// 测试条件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCondition {
    /// 条件描述
    pub condition_text: String,
    /// 期望件数
    #[serde(default)]
    pub expected_count: u32,
    /// 目标设备类型（有序，去重）
    pub equipment_types: Vec<EquipmentType>,
    /// 命名数值阈值，例如 `min_signal_strength_dbm = -100.0`
    #[serde(default)]
    pub thresholds: BTreeMap<String, f64>,
}

impl TestCondition {
    pub fn new(condition_text: impl Into<String>, equipment_types: Vec<EquipmentType>) -> Self {
        let mut condition = Self {
            condition_text: condition_text.into(),
            expected_count: 0,
            equipment_types,
            thresholds: BTreeMap::new(),
        };
        condition.dedup_equipment();
        condition
    }

    pub fn with_expected_count(mut self, expected_count: u32) -> Self {
        self.expected_count = expected_count;
        self
    }

    pub fn with_threshold(mut self, name: impl Into<String>, value: f64) -> Self {
        self.thresholds.insert(name.into(), value);
        self
    }

    /// 去掉重复的设备类型，保留首次出现的顺序
    pub(crate) fn dedup_equipment(&mut self) {
        let mut seen = Vec::with_capacity(self.equipment_types.len());
        self.equipment_types.retain(|t| {
            if seen.contains(t) {
                false
            } else {
                seen.push(*t);
                true
            }
        });
    }
}

/// 测试项
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestItem {
    pub id: String,
    /// 试验块名称
    pub test_block: String,
    pub category: TestCategory,
    pub condition: TestCondition,
    /// 场景标签
    #[serde(default)]
    pub scenarios: Vec<String>,
}

impl TestItem {
    pub fn new(
        id: impl Into<String>,
        test_block: impl Into<String>,
        category: TestCategory,
        condition: TestCondition,
        scenarios: Vec<String>,
    ) -> Self {
        Self {
            id: id.into(),
            test_block: test_block.into(),
            category,
            condition,
            scenarios,
        }
    }

    /// 展开后会产生的任务数
    pub fn task_count(&self) -> usize {
        self.scenarios.len() * self.condition.equipment_types.len()
    }
}
