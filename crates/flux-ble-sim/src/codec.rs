//! 传感器数据负载编码
//!
//! 负载是一个 JSON 对象：键按升序排列，数值为十进制形式。
//! 相同的输入总是得到逐字节相同的输出，订阅端按同一格式解码。

use crate::error::BroadcastError;
use crate::model::SensorReadings;

/// 把读数编码为规范 JSON
///
/// # 错误
/// * `EncodingFailed` - 任何读数为 NaN 或无穷大
pub fn encode_readings(readings: &SensorReadings) -> Result<Vec<u8>, BroadcastError> {
    if let Some((name, value)) = readings.iter().find(|(_, v)| !v.is_finite()) {
        return Err(BroadcastError::EncodingFailed(format!(
            "sensor '{}' has non-finite value {}",
            name, value
        )));
    }

    serde_json::to_vec(readings).map_err(|e| BroadcastError::EncodingFailed(e.to_string()))
}

/// 解码订阅端收到的负载
pub fn decode_readings(payload: &[u8]) -> serde_json::Result<SensorReadings> {
    serde_json::from_slice(payload)
}
