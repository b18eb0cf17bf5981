//! 任务上下文
//!
//! 封装"我正在对哪个测试项、哪个场景、哪台设备做验证"这一信息

use std::fmt::Display;
use std::sync::Arc;

use crate::models::{EquipmentType, TaskOrigin, TestItem};

/// 单个验证任务
///
/// 由编排层展开测试项得到，`index` 是派发顺序（从0开始）
#[derive(Debug, Clone)]
pub struct TaskUnit {
    /// 派发序号，同时用于派生模拟器的随机数种子
    pub index: usize,

    /// 所属测试项（只读共享）
    pub item: Arc<TestItem>,

    /// 场景标签
    pub scenario: String,

    /// 目标设备类型
    pub equipment_type: EquipmentType,
}

impl TaskUnit {
    pub fn new(
        index: usize,
        item: Arc<TestItem>,
        scenario: String,
        equipment_type: EquipmentType,
    ) -> Self {
        Self {
            index,
            item,
            scenario,
            equipment_type,
        }
    }

    /// 结果归属信息
    pub fn origin(&self, batch_id: &str) -> TaskOrigin {
        TaskOrigin {
            test_item_id: self.item.id.clone(),
            batch_id: batch_id.to_string(),
            equipment_type: self.equipment_type,
            scenario: self.scenario.clone(),
        }
    }
}

impl Display for TaskUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[任务 {} 测试项#{} 场景#{} 设备#{}]",
            self.index + 1,
            self.item.id,
            self.scenario,
            self.equipment_type
        )
    }
}
