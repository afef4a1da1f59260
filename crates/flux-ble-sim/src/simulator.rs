use crate::broadcaster::{BroadcastStats, Broadcaster};
use crate::error::{BroadcastError, Result, TransportError};
use crate::model::{DeviceIdentity, SensorReadings, ServiceDescriptor};
use crate::scheduler::{Scheduler, SchedulerState};
use crate::settings::SimulatorConfig;
use crate::state::SensorState;
use crate::transport::{PeripheralDelegate, PeripheralTransport};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// IoT 设备模拟器
///
/// 持有设备身份、传感器状态、广播器和调度器。传输层在构造前就必须
/// 存在；配置错误在构造时直接失败，调度器不会启动。
pub struct DeviceSimulator {
    identity: DeviceIdentity,
    descriptor: ServiceDescriptor,
    interval: Duration,
    state: Arc<SensorState>,
    broadcaster: Arc<Broadcaster>,
    scheduler: Scheduler,
    transport: Arc<dyn PeripheralTransport>,
    advertising: AtomicBool,
}

impl DeviceSimulator {
    /// 创建模拟器
    ///
    /// # 错误
    /// * `RangeConfig` - 传感器范围非法
    /// * `InvalidConfig` - 其他配置错误
    pub fn new(config: &SimulatorConfig, transport: Arc<dyn PeripheralTransport>) -> Result<Self> {
        config.validate()?;

        let generator = config.generator()?;
        let state = Arc::new(SensorState::new(config.initial_readings()));
        let broadcaster = Arc::new(Broadcaster::new(transport.clone()));
        let scheduler = Scheduler::new(state.clone(), generator, broadcaster.clone());

        let identity = config.identity();
        info!(device = %identity, transport = transport.name(), "Device simulator created");

        Ok(Self {
            identity,
            descriptor: config.descriptor(),
            interval: config.interval(),
            state,
            broadcaster,
            scheduler,
            transport,
            advertising: AtomicBool::new(false),
        })
    }

    pub fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }

    pub fn descriptor(&self) -> &ServiceDescriptor {
        &self.descriptor
    }

    pub fn state(&self) -> &Arc<SensorState> {
        &self.state
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// 当前读数
    pub async fn snapshot(&self) -> SensorReadings {
        self.state.snapshot().await
    }

    /// 开始广播服务
    pub async fn start_advertising(&self) -> Result<()> {
        self.transport.advertise(&self.descriptor).await?;
        self.advertising.store(true, Ordering::SeqCst);
        info!(
            device = %self.identity,
            local_name = %self.descriptor.local_name,
            "Device advertising"
        );
        Ok(())
    }

    pub fn is_advertising(&self) -> bool {
        self.advertising.load(Ordering::SeqCst)
    }

    /// 合并新读数并通知订阅者
    ///
    /// 广播失败不影响已合并的状态。
    pub async fn update_sensor_data(
        &self,
        new_values: &SensorReadings,
    ) -> std::result::Result<(), BroadcastError> {
        self.state.update(new_values).await;
        self.broadcaster.notify(&self.state.snapshot().await).await
    }

    /// 按配置的间隔启动周期更新
    pub async fn start(&self) -> Result<()> {
        self.scheduler.start(self.interval).await?;
        Ok(())
    }

    /// 停止周期更新
    pub async fn stop(&self) -> Result<()> {
        self.scheduler.stop().await?;
        Ok(())
    }

    pub async fn scheduler_state(&self) -> SchedulerState {
        self.scheduler.state().await
    }

    pub async fn broadcast_stats(&self) -> BroadcastStats {
        self.broadcaster.stats().await
    }
}

#[async_trait]
impl PeripheralDelegate for DeviceSimulator {
    async fn on_ready(&self) {
        if let Err(e) = self.start_advertising().await {
            error!(device = %self.identity, error = %e, "Failed to start advertising");
        }
    }

    async fn on_error(&self, error: TransportError) {
        if matches!(error, TransportError::Unavailable(_)) {
            self.advertising.store(false, Ordering::SeqCst);
        }
        warn!(device = %self.identity, error = %error, "Peripheral reported error");
    }
}
