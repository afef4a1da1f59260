use thiserror::Error;

/// 传输层错误（由外部 BLE 协议栈或等价的发布/订阅通道报告）
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// 当前无法接收数据（无订阅者、链路断开、尚未广播）
    #[error("Transport unavailable: {0}")]
    Unavailable(String),

    /// 其他传输失败
    #[error("Transport failed: {0}")]
    Failed(String),
}

/// 广播错误
///
/// 两种错误都是非致命的：调用方记录日志后继续，传感器状态不受影响。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BroadcastError {
    /// 读数包含非有限数值（NaN / Infinity）
    #[error("Encoding failed: {0}")]
    EncodingFailed(String),

    /// 传输层当前不能接收数据
    #[error("Transport unavailable: {0}")]
    TransportUnavailable(String),

    /// 传输层报告的其他错误
    #[error("Transport failed: {0}")]
    TransportFailed(String),
}

impl From<TransportError> for BroadcastError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Unavailable(msg) => BroadcastError::TransportUnavailable(msg),
            TransportError::Failed(msg) => BroadcastError::TransportFailed(msg),
        }
    }
}

/// 调度器错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    /// 非法状态迁移
    #[error("Invalid scheduler transition: cannot {action} while {state}")]
    InvalidTransition {
        action: &'static str,
        state: crate::scheduler::SchedulerState,
    },

    /// 周期必须大于 0
    #[error("Invalid tick interval: interval must be greater than zero")]
    InvalidInterval,
}

/// 模拟器错误类型
#[derive(Error, Debug)]
pub enum SimulatorError {
    /// 传感器范围配置错误（min > max 或非有限边界）
    #[error("Invalid range for sensor '{sensor}': min={min}, max={max}")]
    RangeConfig { sensor: String, min: f64, max: f64 },

    /// 其他配置校验错误
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// 配置加载错误
    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    /// 调度器错误
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),

    /// 广播错误
    #[error(transparent)]
    Broadcast(#[from] BroadcastError),

    /// 传输错误
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// 日志初始化错误
    #[error("Logging error: {0}")]
    Logging(String),
}

/// 模拟器结果类型
pub type Result<T> = std::result::Result<T, SimulatorError>;

impl SimulatorError {
    /// 创建配置校验错误
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        SimulatorError::InvalidConfig(msg.into())
    }

    /// 是否为启动期的配置错误
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            SimulatorError::RangeConfig { .. }
                | SimulatorError::InvalidConfig(_)
                | SimulatorError::Config(_)
        )
    }
}
