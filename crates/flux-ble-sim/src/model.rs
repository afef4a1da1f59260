use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

use crate::error::{Result, SimulatorError};

/// 传感器读数集合（传感器名称 -> 读数）
///
/// 使用 `BTreeMap` 保证键按升序排列，规范编码直接依赖这一顺序。
pub type SensorReadings = BTreeMap<String, f64>;

/// 环境传感服务（Bluetooth SIG 0x181A）
pub const SENSOR_SERVICE_UUID: Uuid = Uuid::from_u128(0x0000_181a_0000_1000_8000_0080_5f9b_34fb);

/// 传感器数据特征值
pub const SENSOR_DATA_CHARACTERISTIC_UUID: Uuid =
    Uuid::from_u128(0x8c1f_2d0a_5b1e_4e3b_9a64_3f0c_5d2e_7a01);

/// 默认广播名称
pub const DEFAULT_LOCAL_NAME: &str = "IoT Device Simulator";

/// 设备身份，构造后不可变
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceIdentity {
    device_id: String,
    device_type: String,
}

impl DeviceIdentity {
    pub fn new(device_id: impl Into<String>, device_type: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            device_type: device_type.into(),
        }
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn device_type(&self) -> &str {
        &self.device_type
    }
}

impl fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.device_id, self.device_type)
    }
}

/// 传感器取值范围（闭区间）
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SensorRange {
    min: f64,
    max: f64,
}

impl SensorRange {
    /// 创建取值范围
    ///
    /// # 错误
    /// * `RangeConfig` - 边界非有限值、`min > max`，或 `max - min` 溢出
    pub fn new(sensor: &str, min: f64, max: f64) -> Result<Self> {
        // 区间宽度必须可表示，否则无法均匀采样
        if !min.is_finite() || !max.is_finite() || min > max || !(max - min).is_finite() {
            return Err(SimulatorError::RangeConfig {
                sensor: sensor.to_string(),
                min,
                max,
            });
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// 广播服务描述，交给传输层用于广播
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceDescriptor {
    /// 广播名称
    pub local_name: String,

    /// 服务 UUID
    pub service_uuid: Uuid,

    /// 传感器数据特征值 UUID
    pub characteristic_uuid: Uuid,

    /// 设备身份
    pub identity: DeviceIdentity,
}

impl ServiceDescriptor {
    pub fn new(identity: DeviceIdentity) -> Self {
        Self {
            local_name: DEFAULT_LOCAL_NAME.to_string(),
            service_uuid: SENSOR_SERVICE_UUID,
            characteristic_uuid: SENSOR_DATA_CHARACTERISTIC_UUID,
            identity,
        }
    }

    pub fn with_local_name(mut self, local_name: impl Into<String>) -> Self {
        self.local_name = local_name.into();
        self
    }

    pub fn with_service_uuid(mut self, service_uuid: Uuid) -> Self {
        self.service_uuid = service_uuid;
        self
    }
}

/// 外设（传输层）状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PeripheralState {
    /// 未知
    Unknown,
    /// 重置中
    Resetting,
    /// 平台不支持
    Unsupported,
    /// 未授权
    Unauthorized,
    /// 已关闭
    PoweredOff,
    /// 已开启，可以广播
    PoweredOn,
}

impl fmt::Display for PeripheralState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PeripheralState::Unknown => "unknown",
            PeripheralState::Resetting => "resetting",
            PeripheralState::Unsupported => "unsupported",
            PeripheralState::Unauthorized => "unauthorized",
            PeripheralState::PoweredOff => "powered off",
            PeripheralState::PoweredOn => "powered on",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sensor_range_validation() {
        let range = SensorRange::new("temperature", 23.0, 25.0).unwrap();
        assert!(range.contains(23.0));
        assert!(range.contains(25.0));
        assert!(!range.contains(25.01));

        assert!(SensorRange::new("humidity", 65.0, 55.0).is_err());
        assert!(SensorRange::new("humidity", f64::NAN, 55.0).is_err());
        assert!(SensorRange::new("humidity", 0.0, f64::INFINITY).is_err());

        // 退化区间是合法的
        assert!(SensorRange::new("pressure", 1.0, 1.0).is_ok());
    }

    #[test]
    fn test_sensor_range_rejects_overflowing_span() {
        let err = SensorRange::new("pressure", -1e308, 1e308).unwrap_err();
        assert!(matches!(err, SimulatorError::RangeConfig { ref sensor, .. } if sensor == "pressure"));

        assert!(SensorRange::new("pressure", f64::MIN, f64::MAX).is_err());
        // 接近上限但宽度仍可表示
        assert!(SensorRange::new("pressure", 0.0, f64::MAX).is_ok());
    }

    #[test]
    fn test_service_descriptor_defaults() {
        let identity = DeviceIdentity::new("device-001", "Temperature Sensor");
        let descriptor = ServiceDescriptor::new(identity.clone());

        assert_eq!(descriptor.local_name, "IoT Device Simulator");
        assert_eq!(descriptor.service_uuid, SENSOR_SERVICE_UUID);
        assert_eq!(descriptor.identity, identity);
        assert_eq!(identity.to_string(), "device-001 (Temperature Sensor)");
    }
}
