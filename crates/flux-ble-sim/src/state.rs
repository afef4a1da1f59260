use crate::model::SensorReadings;
use tokio::sync::RwLock;
use tracing::trace;

/// 传感器状态
///
/// 内存中的读数表。更新采用“后写者胜”合并：新值覆盖旧值，
/// 未出现在更新中的键保持不变，键永远不会被删除。
pub struct SensorState {
    readings: RwLock<SensorReadings>,
}

impl SensorState {
    /// 使用初始快照创建状态
    pub fn new(initial: SensorReadings) -> Self {
        Self {
            readings: RwLock::new(initial),
        }
    }

    /// 合并新的读数
    ///
    /// 非有限数值按原样保存，由编码阶段拒绝。
    pub async fn update(&self, new_values: &SensorReadings) {
        if new_values.is_empty() {
            return;
        }

        let mut readings = self.readings.write().await;
        for (name, value) in new_values {
            readings.insert(name.clone(), *value);
        }
        trace!(updated = new_values.len(), total = readings.len(), "Sensor state updated");
    }

    /// 获取当前状态的副本
    pub async fn snapshot(&self) -> SensorReadings {
        self.readings.read().await.clone()
    }

    /// 读取单个传感器
    pub async fn get(&self, name: &str) -> Option<f64> {
        self.readings.read().await.get(name).copied()
    }

    pub async fn len(&self) -> usize {
        self.readings.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.readings.read().await.is_empty()
    }
}

impl Default for SensorState {
    fn default() -> Self {
        Self::new(SensorReadings::new())
    }
}
