use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use uuid::Uuid;

use crate::error::{Result, SimulatorError};
use crate::generator::SensorGenerator;
use crate::model::{
    DeviceIdentity, SensorRange, SensorReadings, ServiceDescriptor, DEFAULT_LOCAL_NAME,
};

/// 模拟器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulatorConfig {
    #[serde(default)]
    pub device: DeviceConfig,

    /// tick 间隔（毫秒）
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// 传感器配置（`[[sensors]]` 数组，名称作为值保存以保留大小写）
    #[serde(default = "default_sensors")]
    pub sensors: Vec<SensorConfig>,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    #[serde(default = "default_device_id")]
    pub device_id: String,

    #[serde(default = "default_device_type")]
    pub device_type: String,

    /// 广播名称
    #[serde(default = "default_local_name")]
    pub local_name: String,

    /// 自定义服务 UUID，缺省使用环境传感服务
    #[serde(default)]
    pub service_uuid: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorConfig {
    pub name: String,
    pub initial: f64,
    pub min: f64,
    pub max: f64,
}

impl SensorConfig {
    pub fn new(name: impl Into<String>, initial: f64, min: f64, max: f64) -> Self {
        Self {
            name: name.into(),
            initial,
            min,
            max,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// 输出 JSON 格式日志
    #[serde(default)]
    pub json: bool,
}

// 默认值函数
fn default_interval_ms() -> u64 {
    1000
}

fn default_device_id() -> String {
    "device-001".to_string()
}

fn default_device_type() -> String {
    "Temperature Sensor".to_string()
}

fn default_local_name() -> String {
    DEFAULT_LOCAL_NAME.to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_sensors() -> Vec<SensorConfig> {
    vec![
        SensorConfig::new("temperature", 24.5, 23.0, 25.0),
        SensorConfig::new("humidity", 60.0, 55.0, 65.0),
    ]
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            device_id: default_device_id(),
            device_type: default_device_type(),
            local_name: default_local_name(),
            service_uuid: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            device: DeviceConfig::default(),
            interval_ms: default_interval_ms(),
            sensors: default_sensors(),
            logging: LoggingConfig::default(),
        }
    }
}

impl SimulatorConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn identity(&self) -> DeviceIdentity {
        DeviceIdentity::new(&self.device.device_id, &self.device.device_type)
    }

    /// 广播服务描述
    pub fn descriptor(&self) -> ServiceDescriptor {
        let descriptor = ServiceDescriptor::new(self.identity())
            .with_local_name(&self.device.local_name);
        match self.device.service_uuid {
            Some(uuid) => descriptor.with_service_uuid(uuid),
            None => descriptor,
        }
    }

    /// 按名称查找传感器配置
    pub fn sensor(&self, name: &str) -> Option<&SensorConfig> {
        self.sensors.iter().find(|sensor| sensor.name == name)
    }

    /// 初始读数快照
    pub fn initial_readings(&self) -> SensorReadings {
        self.sensors
            .iter()
            .map(|sensor| (sensor.name.clone(), sensor.initial))
            .collect()
    }

    /// 按配置的范围构建生成器
    pub fn generator(&self) -> Result<SensorGenerator> {
        SensorGenerator::from_bounds(
            self.sensors
                .iter()
                .map(|sensor| (sensor.name.clone(), sensor.min, sensor.max)),
        )
    }

    /// 验证配置
    pub fn validate(&self) -> Result<()> {
        if self.device.device_id.trim().is_empty() {
            return Err(SimulatorError::invalid_config("device_id must not be empty"));
        }

        if self.interval_ms == 0 {
            return Err(SimulatorError::invalid_config(
                "interval_ms must be greater than 0",
            ));
        }

        if self.sensors.is_empty() {
            return Err(SimulatorError::invalid_config(
                "at least one sensor must be configured",
            ));
        }

        let mut names = BTreeSet::new();
        for sensor in &self.sensors {
            if sensor.name.trim().is_empty() {
                return Err(SimulatorError::invalid_config("sensor name must not be empty"));
            }
            if !names.insert(sensor.name.as_str()) {
                return Err(SimulatorError::invalid_config(format!(
                    "sensor '{}' is configured more than once",
                    sensor.name
                )));
            }
            SensorRange::new(&sensor.name, sensor.min, sensor.max)?;
            if !sensor.initial.is_finite() {
                return Err(SimulatorError::invalid_config(format!(
                    "initial value of sensor '{}' must be finite",
                    sensor.name
                )));
            }
        }

        Ok(())
    }
}

/// 配置加载器
///
/// 从目录中的 `simulator.toml` 读取配置，再叠加 `FLUX_SIM__*` 环境变量。
pub struct ConfigLoader {
    config_dir: PathBuf,
}

impl ConfigLoader {
    pub const FILE_NAME: &'static str = "simulator.toml";

    pub fn new<P: AsRef<Path>>(config_dir: P) -> Self {
        Self {
            config_dir: config_dir.as_ref().to_path_buf(),
        }
    }

    /// 加载并验证配置
    ///
    /// 配置文件不存在时使用默认配置。
    pub fn load(&self) -> Result<SimulatorConfig> {
        let config_path = self.config_dir.join(Self::FILE_NAME);
        let path = config_path
            .to_str()
            .ok_or_else(|| SimulatorError::invalid_config("Invalid config path"))?;

        let config = Config::builder()
            .add_source(File::new(path, FileFormat::Toml).required(false))
            .add_source(
                Environment::with_prefix("FLUX_SIM")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: SimulatorConfig = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }
}
