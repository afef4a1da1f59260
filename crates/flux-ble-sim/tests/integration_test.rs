
use flux_ble_sim::{
    decode_readings, BroadcastError, Broadcaster, ChannelTransport, DeviceSimulator,
    PeripheralDelegate, PeripheralState, Scheduler, SchedulerState, SensorGenerator, SensorState,
    SimulatorConfig,
};
use std::sync::Arc;
use test_helpers::{readings, RecordingTransport};
use tokio::time::{timeout, Duration};

/// 场景 A：单个键更新，其余键保持不变
#[tokio::test]
async fn test_partial_update_keeps_other_keys() {
    let state = SensorState::new(readings(&[("temperature", 24.5), ("humidity", 60.0)]));

    state.update(&readings(&[("temperature", 23.9)])).await;

    assert_eq!(
        state.snapshot().await,
        readings(&[("temperature", 23.9), ("humidity", 60.0)])
    );
}

/// 场景 B：1000 次 tick 后所有温度值都在闭区间内
#[tokio::test]
async fn test_generated_temperatures_stay_in_range() {
    let transport = Arc::new(RecordingTransport::default());
    let state = Arc::new(SensorState::new(readings(&[("temperature", 24.5)])));
    let generator = SensorGenerator::from_bounds([("temperature", 23.0, 25.0)]).unwrap();
    let scheduler = Scheduler::new(
        state.clone(),
        generator,
        Arc::new(Broadcaster::new(transport.clone())),
    );

    for _ in 0..1000 {
        let values = scheduler.tick().await;
        let temperature = values["temperature"];
        assert!(
            (23.0..=25.0).contains(&temperature),
            "temperature {} out of range",
            temperature
        );
    }

    assert_eq!(scheduler.tick_count(), 1000);
    assert_eq!(transport.payloads().len(), 1000);
    for payload in transport.payloads() {
        let decoded = decode_readings(&payload).unwrap();
        assert!((23.0..=25.0).contains(&decoded["temperature"]));
    }
}

/// 场景 C：传输不可用时 notify 返回错误，状态操作不受影响
#[tokio::test]
async fn test_transport_unavailable_then_state_still_works() {
    let transport = Arc::new(RecordingTransport::default());
    transport.set_unavailable(true);
    let broadcaster = Broadcaster::new(transport.clone());
    let state = SensorState::new(readings(&[("temperature", 24.5), ("humidity", 60.0)]));

    let result = broadcaster.notify(&state.snapshot().await).await;
    assert!(matches!(result, Err(BroadcastError::TransportUnavailable(_))));

    state.update(&readings(&[("humidity", 62.0)])).await;
    assert_eq!(
        state.snapshot().await,
        readings(&[("temperature", 24.5), ("humidity", 62.0)])
    );

    // 链路恢复后正常发送
    transport.set_unavailable(false);
    broadcaster.notify(&state.snapshot().await).await.unwrap();
    assert_eq!(transport.payloads().len(), 1);
}

/// 场景 D：NaN 导致编码失败，状态保持原样
#[tokio::test]
async fn test_nan_reading_fails_encoding_but_is_stored() {
    let transport = Arc::new(RecordingTransport::default());
    let broadcaster = Broadcaster::new(transport.clone());
    let state = SensorState::new(readings(&[("temperature", 24.5), ("humidity", 60.0)]));

    state.update(&readings(&[("humidity", f64::NAN)])).await;

    let result = broadcaster.notify(&state.snapshot().await).await;
    assert!(matches!(result, Err(BroadcastError::EncodingFailed(_))));
    assert!(state.get("humidity").await.unwrap().is_nan());
    assert_eq!(state.get("temperature").await, Some(24.5));
    assert!(transport.payloads().is_empty());
}

/// 未变化的快照两次广播得到相同的字节
#[tokio::test]
async fn test_repeated_notify_is_byte_identical() {
    let transport = Arc::new(RecordingTransport::default());
    let broadcaster = Broadcaster::new(transport.clone());
    let state = SensorState::new(readings(&[("temperature", 24.5), ("humidity", 60.0)]));

    broadcaster.notify(&state.snapshot().await).await.unwrap();
    broadcaster.notify(&state.snapshot().await).await.unwrap();

    let payloads = transport.payloads();
    assert_eq!(payloads[0], payloads[1]);
}

/// 完整流程：上电 -> 广播 -> 周期更新 -> 订阅者收到通知 -> 停止
#[tokio::test(start_paused = true)]
async fn test_simulator_lifecycle() {
    let transport = Arc::new(ChannelTransport::default());
    let mut rx = transport.subscribe();

    let mut config = SimulatorConfig::default();
    config.interval_ms = 100;
    let simulator = DeviceSimulator::new(&config, transport.clone()).unwrap();

    simulator.on_state_change(PeripheralState::PoweredOn).await;
    assert!(simulator.is_advertising());

    simulator.start().await.unwrap();
    assert_eq!(simulator.scheduler_state().await, SchedulerState::Running);

    let notification = timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("Timeout waiting for notification")
        .expect("Failed to receive notification");
    let decoded = decode_readings(&notification.payload).unwrap();
    assert!((23.0..=25.0).contains(&decoded["temperature"]));
    assert!((55.0..=65.0).contains(&decoded["humidity"]));

    simulator.stop().await.unwrap();
    assert_eq!(simulator.scheduler_state().await, SchedulerState::Stopped);

    let ticks = simulator.scheduler().tick_count();
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(simulator.scheduler().tick_count(), ticks);
}

/// 没有订阅者时周期任务继续运行
#[tokio::test(start_paused = true)]
async fn test_ticks_continue_without_subscribers() {
    let transport = Arc::new(ChannelTransport::default());
    let mut config = SimulatorConfig::default();
    config.interval_ms = 50;
    let simulator = DeviceSimulator::new(&config, transport).unwrap();
    simulator.start_advertising().await.unwrap();

    simulator.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(525)).await;
    simulator.stop().await.unwrap();

    assert_eq!(simulator.scheduler().tick_count(), 10);
    let stats = simulator.broadcast_stats().await;
    assert_eq!(stats.sent, 0);
    assert!(stats.failed >= 1);
}
