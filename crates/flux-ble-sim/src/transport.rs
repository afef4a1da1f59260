use crate::error::TransportError;
use crate::model::{PeripheralState, ServiceDescriptor};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info, warn};

/// 外设传输层接口
///
/// 由外部 BLE 协议栈（或等价的发布/订阅传输）实现。广播、GATT 定义、
/// 连接与配对都属于传输层，核心只调用这两个操作。
#[async_trait]
pub trait PeripheralTransport: Send + Sync {
    /// 开始广播服务
    async fn advertise(&self, descriptor: &ServiceDescriptor) -> Result<(), TransportError>;

    /// 向订阅者发送通知
    async fn send_notification(&self, payload: &[u8]) -> Result<(), TransportError>;

    /// 传输层名称
    fn name(&self) -> &str;
}

/// 外设状态回调
///
/// 由核心实现，由传输层在状态变化时调用。
#[async_trait]
pub trait PeripheralDelegate: Send + Sync {
    /// 传输层已就绪（已上电）
    async fn on_ready(&self);

    /// 传输层报告错误
    async fn on_error(&self, error: TransportError);

    /// 传输层状态变化
    async fn on_state_change(&self, state: PeripheralState) {
        match state {
            PeripheralState::PoweredOn => self.on_ready().await,
            other => info!(state = %other, "Peripheral state changed"),
        }
    }

    /// 服务添加结果
    async fn on_service_added(&self, result: Result<(), TransportError>) {
        if let Err(e) = result {
            self.on_error(e).await;
        }
    }
}

/// 一条发往订阅者的通知
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// 通知所属的特征值
    pub characteristic: uuid::Uuid,

    /// 负载
    pub payload: Vec<u8>,
}

/// 进程内传输
///
/// 基于 `tokio::sync::broadcast` 的发布/订阅通道，用于演示和测试。
/// 未广播、已断电或没有订阅者时，发送返回 `Unavailable`。
pub struct ChannelTransport {
    sender: broadcast::Sender<Notification>,
    advertised: RwLock<Option<ServiceDescriptor>>,
    powered: AtomicBool,
}

impl ChannelTransport {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            advertised: RwLock::new(None),
            powered: AtomicBool::new(true),
        }
    }

    /// 订阅通知
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }

    /// 当前订阅者数量
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// 当前广播的服务
    pub async fn advertised(&self) -> Option<ServiceDescriptor> {
        self.advertised.read().await.clone()
    }

    /// 停止广播
    pub async fn stop_advertising(&self) {
        let mut advertised = self.advertised.write().await;
        if advertised.take().is_some() {
            info!("Advertising stopped");
        }
    }

    /// 模拟上电 / 断电
    pub async fn set_powered(&self, powered: bool) {
        self.powered.store(powered, Ordering::SeqCst);
        if !powered {
            self.stop_advertising().await;
        }
    }

    pub fn state(&self) -> PeripheralState {
        if self.powered.load(Ordering::SeqCst) {
            PeripheralState::PoweredOn
        } else {
            PeripheralState::PoweredOff
        }
    }
}

impl Default for ChannelTransport {
    fn default() -> Self {
        Self::new(64)
    }
}

#[async_trait]
impl PeripheralTransport for ChannelTransport {
    async fn advertise(&self, descriptor: &ServiceDescriptor) -> Result<(), TransportError> {
        if !self.powered.load(Ordering::SeqCst) {
            return Err(TransportError::Unavailable("peripheral is powered off".into()));
        }

        let mut advertised = self.advertised.write().await;
        *advertised = Some(descriptor.clone());

        info!(
            local_name = %descriptor.local_name,
            service = %descriptor.service_uuid,
            device = %descriptor.identity,
            "Advertising started"
        );
        Ok(())
    }

    async fn send_notification(&self, payload: &[u8]) -> Result<(), TransportError> {
        if !self.powered.load(Ordering::SeqCst) {
            return Err(TransportError::Unavailable("peripheral is powered off".into()));
        }

        let characteristic = match self.advertised.read().await.as_ref() {
            Some(descriptor) => descriptor.characteristic_uuid,
            None => return Err(TransportError::Unavailable("not advertising".into())),
        };

        let notification = Notification {
            characteristic,
            payload: payload.to_vec(),
        };

        match self.sender.send(notification) {
            Ok(receivers) => {
                debug!(receivers, bytes = payload.len(), "Notification sent");
                Ok(())
            }
            Err(_) => {
                warn!("Notification dropped: no subscribers");
                Err(TransportError::Unavailable("no subscribers".into()))
            }
        }
    }

    fn name(&self) -> &str {
        "channel"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DeviceIdentity;
    use std::sync::atomic::AtomicUsize;
    use tokio::time::{timeout, Duration};

    fn descriptor() -> ServiceDescriptor {
        ServiceDescriptor::new(DeviceIdentity::new("device-001", "Temperature Sensor"))
    }

    #[tokio::test]
    async fn test_send_requires_advertising() {
        let transport = ChannelTransport::default();
        let _rx = transport.subscribe();

        let result = transport.send_notification(b"{}").await;
        assert!(matches!(result, Err(TransportError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_send_to_subscriber() {
        let transport = ChannelTransport::default();
        let mut rx = transport.subscribe();
        transport.advertise(&descriptor()).await.unwrap();

        transport.send_notification(br#"{"temperature":24.5}"#).await.unwrap();

        let notification = timeout(Duration::from_millis(100), rx.recv())
            .await
            .expect("Timeout waiting for notification")
            .expect("Failed to receive notification");
        assert_eq!(notification.payload, br#"{"temperature":24.5}"#.to_vec());
        assert_eq!(notification.characteristic, descriptor().characteristic_uuid);
    }

    #[tokio::test]
    async fn test_no_subscribers_is_unavailable() {
        let transport = ChannelTransport::default();
        transport.advertise(&descriptor()).await.unwrap();
        assert_eq!(transport.subscriber_count(), 0);

        let result = transport.send_notification(b"{}").await;
        assert!(matches!(result, Err(TransportError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_power_off_stops_advertising() {
        let transport = ChannelTransport::default();
        let _rx = transport.subscribe();
        transport.advertise(&descriptor()).await.unwrap();

        transport.set_powered(false).await;
        assert_eq!(transport.state(), PeripheralState::PoweredOff);
        assert!(transport.advertised().await.is_none());
        assert!(transport.advertise(&descriptor()).await.is_err());
        assert!(transport.send_notification(b"{}").await.is_err());
    }

    struct CountingDelegate {
        ready: AtomicUsize,
        errors: AtomicUsize,
    }

    #[async_trait]
    impl PeripheralDelegate for CountingDelegate {
        async fn on_ready(&self) {
            self.ready.fetch_add(1, Ordering::SeqCst);
        }

        async fn on_error(&self, _error: TransportError) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn test_delegate_default_dispatch() {
        let delegate = CountingDelegate {
            ready: AtomicUsize::new(0),
            errors: AtomicUsize::new(0),
        };

        delegate.on_state_change(PeripheralState::PoweredOff).await;
        delegate.on_state_change(PeripheralState::PoweredOn).await;
        delegate.on_service_added(Ok(())).await;
        delegate
            .on_service_added(Err(TransportError::Failed("duplicate service".into())))
            .await;

        assert_eq!(delegate.ready.load(Ordering::SeqCst), 1);
        assert_eq!(delegate.errors.load(Ordering::SeqCst), 1);
    }
}
