use crate::broadcaster::Broadcaster;
use crate::error::SchedulerError;
use crate::generator::SensorGenerator;
use crate::model::SensorReadings;
use crate::state::SensorState;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// 调度器生命周期：Idle -> Running -> Stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
    Stopped,
}

impl fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SchedulerState::Idle => "idle",
            SchedulerState::Running => "running",
            SchedulerState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

struct Lifecycle {
    state: SchedulerState,
    stop_tx: Option<watch::Sender<bool>>,
    ticker: Option<JoinHandle<()>>,
    delivery: Option<JoinHandle<()>>,
}

/// 周期调度器
///
/// 每个 tick 为每个传感器生成一个随机值，合并进状态，然后把快照交给
/// 投递任务。投递任务只保留最新的快照，慢速传输不会拖住 tick。
pub struct Scheduler {
    state: Arc<SensorState>,
    generator: Arc<SensorGenerator>,
    broadcaster: Arc<Broadcaster>,
    ticks: Arc<AtomicU64>,
    lifecycle: Mutex<Lifecycle>,
}

impl Scheduler {
    pub fn new(
        state: Arc<SensorState>,
        generator: SensorGenerator,
        broadcaster: Arc<Broadcaster>,
    ) -> Self {
        Self {
            state,
            generator: Arc::new(generator),
            broadcaster,
            ticks: Arc::new(AtomicU64::new(0)),
            lifecycle: Mutex::new(Lifecycle {
                state: SchedulerState::Idle,
                stop_tx: None,
                ticker: None,
                delivery: None,
            }),
        }
    }

    /// 启动调度器
    ///
    /// 第一次 tick 在 `interval` 之后触发；错过的 tick 直接跳过，不会补发。
    ///
    /// # 错误
    /// * `InvalidInterval` - `interval` 为 0
    /// * `InvalidTransition` - 调度器不处于 Idle 状态
    pub async fn start(&self, interval: Duration) -> Result<(), SchedulerError> {
        if interval.is_zero() {
            return Err(SchedulerError::InvalidInterval);
        }

        let mut lifecycle = self.lifecycle.lock().await;
        if lifecycle.state != SchedulerState::Idle {
            return Err(SchedulerError::InvalidTransition {
                action: "start",
                state: lifecycle.state,
            });
        }

        let (stop_tx, mut stop_rx) = watch::channel(false);
        let (outbox_tx, mut outbox_rx) = watch::channel::<Option<SensorReadings>>(None);

        // 投递任务：只处理最新快照，失败记录后丢弃
        let broadcaster = self.broadcaster.clone();
        let delivery = tokio::spawn(async move {
            while outbox_rx.changed().await.is_ok() {
                let snapshot = outbox_rx.borrow_and_update().clone();
                if let Some(snapshot) = snapshot {
                    broadcaster.notify_logged(&snapshot).await;
                }
            }
            debug!("Delivery worker exited");
        });

        let state = self.state.clone();
        let generator = self.generator.clone();
        let ticks = self.ticks.clone();
        let ticker = tokio::spawn(async move {
            let mut timer = interval_at(Instant::now() + interval, interval);
            timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    biased;
                    _ = stop_rx.changed() => break,
                    _ = timer.tick() => {
                        Self::apply_tick(&state, &generator).await;
                        ticks.fetch_add(1, Ordering::SeqCst);
                        outbox_tx.send_replace(Some(state.snapshot().await));
                    }
                }
            }
            debug!("Ticker exited");
        });

        lifecycle.state = SchedulerState::Running;
        lifecycle.stop_tx = Some(stop_tx);
        lifecycle.ticker = Some(ticker);
        lifecycle.delivery = Some(delivery);

        info!(interval = ?interval, sensors = self.generator.sensors().count(), "Scheduler started");
        Ok(())
    }

    /// 停止调度器
    ///
    /// 返回后不会再有 tick 或通知。对已停止的调度器调用是空操作。
    ///
    /// # 错误
    /// * `InvalidTransition` - 调度器从未启动
    pub async fn stop(&self) -> Result<(), SchedulerError> {
        let mut lifecycle = self.lifecycle.lock().await;
        match lifecycle.state {
            SchedulerState::Idle => {
                return Err(SchedulerError::InvalidTransition {
                    action: "stop",
                    state: SchedulerState::Idle,
                })
            }
            SchedulerState::Stopped => return Ok(()),
            SchedulerState::Running => {}
        }

        info!("Scheduler stopping...");

        if let Some(stop_tx) = lifecycle.stop_tx.take() {
            let _ = stop_tx.send(true);
        }
        if let Some(ticker) = lifecycle.ticker.take() {
            if let Err(e) = ticker.await {
                warn!(error = %e, "Ticker task ended abnormally");
            }
        }
        // 尚未投递的通知直接丢弃
        if let Some(delivery) = lifecycle.delivery.take() {
            delivery.abort();
            let _ = delivery.await;
        }

        lifecycle.state = SchedulerState::Stopped;
        info!(ticks = self.tick_count(), "Scheduler stopped");
        Ok(())
    }

    /// 手动执行一次 tick：生成、合并、广播
    ///
    /// 返回本次生成的值；广播失败只记录日志。
    pub async fn tick(&self) -> SensorReadings {
        let values = Self::apply_tick(&self.state, &self.generator).await;
        self.ticks.fetch_add(1, Ordering::SeqCst);
        self.broadcaster.notify_logged(&self.state.snapshot().await).await;
        values
    }

    pub async fn state(&self) -> SchedulerState {
        self.lifecycle.lock().await.state
    }

    /// 已执行的 tick 数
    pub fn tick_count(&self) -> u64 {
        self.ticks.load(Ordering::SeqCst)
    }

    pub fn generator(&self) -> &SensorGenerator {
        &self.generator
    }

    async fn apply_tick(state: &SensorState, generator: &SensorGenerator) -> SensorReadings {
        let values = generator.generate(&mut rand::thread_rng());
        state.update(&values).await;
        values
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        let lifecycle = self.lifecycle.get_mut();
        if let Some(ticker) = lifecycle.ticker.take() {
            ticker.abort();
        }
        if let Some(delivery) = lifecycle.delivery.take() {
            delivery.abort();
        }
    }
}
