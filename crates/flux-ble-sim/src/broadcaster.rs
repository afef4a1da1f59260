use crate::codec::encode_readings;
use crate::error::BroadcastError;
use crate::model::SensorReadings;
use crate::transport::PeripheralTransport;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// 广播统计
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BroadcastStats {
    /// 成功发送次数
    pub sent: u64,

    /// 失败次数（编码 + 传输）
    pub failed: u64,

    /// 最后一次成功发送时间
    pub last_success_at: Option<DateTime<Utc>>,
}

/// 广播器
///
/// 把读数编码为规范负载并交给传输层。失败不会影响传感器状态，
/// 也不会重试，下一次 tick 会用新数据覆盖。
pub struct Broadcaster {
    transport: Arc<dyn PeripheralTransport>,
    sent: AtomicU64,
    failed: AtomicU64,
    last_success_at: RwLock<Option<DateTime<Utc>>>,
}

impl Broadcaster {
    pub fn new(transport: Arc<dyn PeripheralTransport>) -> Self {
        Self {
            transport,
            sent: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            last_success_at: RwLock::new(None),
        }
    }

    /// 编码并发送读数
    ///
    /// # 错误
    /// * `EncodingFailed` - 读数包含非有限数值
    /// * `TransportUnavailable` - 传输层当前不能接收数据
    /// * `TransportFailed` - 传输层的其他错误
    pub async fn notify(&self, state: &SensorReadings) -> Result<(), BroadcastError> {
        let payload = match encode_readings(state) {
            Ok(payload) => payload,
            Err(e) => {
                self.failed.fetch_add(1, Ordering::Relaxed);
                return Err(e);
            }
        };

        if let Err(e) = self.transport.send_notification(&payload).await {
            self.failed.fetch_add(1, Ordering::Relaxed);
            return Err(e.into());
        }

        self.sent.fetch_add(1, Ordering::Relaxed);
        *self.last_success_at.write().await = Some(Utc::now());

        debug!(
            transport = self.transport.name(),
            bytes = payload.len(),
            sensors = state.len(),
            "Sensor data broadcast"
        );
        Ok(())
    }

    /// 发送并记录失败，用于周期任务
    pub async fn notify_logged(&self, state: &SensorReadings) -> bool {
        match self.notify(state).await {
            Ok(()) => true,
            Err(e) => {
                warn!(transport = self.transport.name(), error = %e, "Broadcast failed, dropping notification");
                false
            }
        }
    }

    pub fn transport(&self) -> &Arc<dyn PeripheralTransport> {
        &self.transport
    }

    /// 获取统计信息
    pub async fn stats(&self) -> BroadcastStats {
        BroadcastStats {
            sent: self.sent.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            last_success_at: *self.last_success_at.read().await,
        }
    }
}
