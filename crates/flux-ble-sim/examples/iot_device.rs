//! IoT 设备模拟器示例
//!
//! 上电后开始广播，每个 tick 随机更新温湿度并通知订阅者，Ctrl+C 退出。

use flux_ble_sim::{
    decode_readings, init_logging, ChannelTransport, ConfigLoader, DeviceSimulator,
    PeripheralDelegate, PeripheralState,
};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 加载配置（目录中没有 simulator.toml 时使用默认配置）
    let config_dir = std::env::args().nth(1).unwrap_or_else(|| "config".to_string());
    let config = ConfigLoader::new(&config_dir).load()?;

    init_logging(&config.logging)?;
    tracing::info!("Loaded simulator config from {}", config_dir);

    // 传输层必须先于模拟器存在
    let transport = Arc::new(ChannelTransport::default());
    let simulator = DeviceSimulator::new(&config, transport.clone())?;

    // 模拟一个中心设备订阅通知
    let mut rx = transport.subscribe();
    let central = tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(notification) => match decode_readings(&notification.payload) {
                    Ok(readings) => println!("central <- {:?}", readings),
                    Err(e) => tracing::warn!("Undecodable payload: {}", e),
                },
                Err(RecvError::Lagged(n)) => tracing::warn!("Central lagged by {} notifications", n),
                Err(RecvError::Closed) => break,
            }
        }
    });

    // 平台回调：上电后开始广播
    simulator.on_state_change(PeripheralState::PoweredOn).await;
    simulator.start().await?;

    println!(
        "=== {} advertising as '{}' (Ctrl+C to stop) ===",
        simulator.identity(),
        simulator.descriptor().local_name
    );

    tokio::signal::ctrl_c().await?;

    simulator.stop().await?;
    central.abort();

    let stats = simulator.broadcast_stats().await;
    println!("sent={} failed={}", stats.sent, stats.failed);
    Ok(())
}
