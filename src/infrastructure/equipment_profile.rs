//! 设备型号参数表
//!
//! 每种设备类型一份静态参数，模拟器按设备类型取用；
//! 各型号的响应结构完全一致，只是数值范围和 OID 前缀不同。

use crate::models::EquipmentType;

/// 单个设备型号的模拟参数
#[derive(Debug)]
pub struct EquipmentProfile {
    pub equipment_type: EquipmentType,
    pub vendor: &'static str,
    pub model: &'static str,
    pub equipment_id: &'static str,
    /// 厂商企业 OID（sysObjectID）
    pub sys_object_id: &'static str,
    /// 厂商私有 MIB 的前缀
    pub oid_prefix: &'static str,
    pub cell_id: &'static str,
    pub frequency_mhz: i64,
    pub bandwidth_mhz: i64,
    /// 信号强度范围（dBm）
    pub signal_dbm: (f64, f64),
    pub active_users: (i64, i64),
    /// 吞吐量倍率（基准 50–1000 Mbps）
    pub throughput_factor: f64,
    /// 误码率倍率（基准 0–5 %）
    pub error_rate_factor: f64,
    /// 延迟范围（单位数）
    pub latency_units: (f64, f64),
    /// 休眠模式节电比例范围（%）
    pub power_savings_percent: (f64, f64),
    pub sleep_minutes: (i64, i64),
    /// CM 数据获取失败时的错误码与信息
    pub cm_failure: (&'static str, &'static str),
    /// 休眠模式失败时的错误码与信息
    pub sleep_failure: (&'static str, &'static str),
}

static PROFILES: [EquipmentProfile; 4] = [
    EquipmentProfile {
        equipment_type: EquipmentType::EricssonMmu,
        vendor: "Ericsson",
        model: "MMU",
        equipment_id: "Ericsson-MMU-001",
        sys_object_id: "1.3.6.1.4.1.193",
        oid_prefix: "1.3.6.1.4.1.193.183.4",
        cell_id: "Cell_12345",
        frequency_mhz: 2100,
        bandwidth_mhz: 20,
        signal_dbm: (-105.0, -45.0),
        active_users: (20, 80),
        throughput_factor: 1.0,
        error_rate_factor: 1.0,
        latency_units: (1.0, 3.0),
        power_savings_percent: (25.0, 35.0),
        sleep_minutes: (30, 120),
        cm_failure: ("SNMP_TIMEOUT", "SNMP request timeout - equipment may be unreachable"),
        sleep_failure: ("SLEEP_MODE_FAILED", "Failed to enable sleep mode - hardware limitation"),
    },
    EquipmentProfile {
        equipment_type: EquipmentType::EricssonRru,
        vendor: "Ericsson",
        model: "RRU",
        equipment_id: "Ericsson-RRU-001",
        sys_object_id: "1.3.6.1.4.1.193",
        oid_prefix: "1.3.6.1.4.1.193.183.5",
        cell_id: "RRU_67890",
        frequency_mhz: 3500,
        bandwidth_mhz: 100,
        signal_dbm: (-115.0, -60.0),
        active_users: (10, 120),
        throughput_factor: 2.0,
        error_rate_factor: 1.0,
        latency_units: (1.5, 3.0),
        power_savings_percent: (15.0, 25.0),
        sleep_minutes: (15, 60),
        cm_failure: ("RRU_COMMUNICATION_ERROR", "RRU communication interface error"),
        sleep_failure: ("SLEEP_NOT_SUPPORTED", "Sleep mode not supported on this RRU model"),
    },
    EquipmentProfile {
        equipment_type: EquipmentType::SamsungAuV1,
        vendor: "Samsung",
        model: "AU-v1",
        equipment_id: "Samsung-AUv1-001",
        sys_object_id: "1.3.6.1.4.1.20858",
        oid_prefix: "1.3.6.1.4.1.20858.10",
        cell_id: "SAMSUNG_CELL_001",
        frequency_mhz: 2100,
        bandwidth_mhz: 20,
        signal_dbm: (-110.0, -50.0),
        active_users: (15, 70),
        throughput_factor: 1.0,
        error_rate_factor: 1.0,
        latency_units: (1.0, 2.5),
        power_savings_percent: (20.0, 30.0),
        sleep_minutes: (45, 90),
        cm_failure: ("SAMSUNG_API_ERROR", "Samsung API authentication failed"),
        sleep_failure: ("SLEEP_CONFIG_ERROR", "Sleep mode configuration validation failed"),
    },
    EquipmentProfile {
        equipment_type: EquipmentType::SamsungAuV2,
        vendor: "Samsung",
        model: "AU-v2",
        equipment_id: "Samsung-AUv2-001",
        sys_object_id: "1.3.6.1.4.1.20858",
        oid_prefix: "1.3.6.1.4.1.20858.11",
        cell_id: "SAMSUNG_CELL_V2_001",
        frequency_mhz: 2100,
        bandwidth_mhz: 20,
        signal_dbm: (-100.0, -40.0),
        active_users: (25, 90),
        throughput_factor: 1.2,
        error_rate_factor: 0.8,
        latency_units: (1.0, 2.0),
        power_savings_percent: (30.0, 40.0),
        sleep_minutes: (60, 120),
        cm_failure: ("NETWORK_TIMEOUT", "Network communication timeout"),
        sleep_failure: ("FIRMWARE_ERROR", "Firmware update required for sleep mode"),
    },
];

/// 取设备类型对应的参数
pub fn profile(equipment_type: EquipmentType) -> &'static EquipmentProfile {
    match equipment_type {
        EquipmentType::EricssonMmu => &PROFILES[0],
        EquipmentType::EricssonRru => &PROFILES[1],
        EquipmentType::SamsungAuV1 => &PROFILES[2],
        EquipmentType::SamsungAuV2 => &PROFILES[3],
    }
}

impl EquipmentProfile {
    /// 私有 MIB 下的完整 OID
    pub fn oid(&self, suffix: &str) -> String {
        format!("{}.{}", self.oid_prefix, suffix)
    }
}
