pub mod broadcaster;
pub mod codec;
pub mod error;
pub mod generator;
pub mod logging;
pub mod model;
pub mod scheduler;
pub mod settings;
pub mod simulator;
pub mod state;
pub mod transport;

pub use broadcaster::{BroadcastStats, Broadcaster};
pub use codec::{decode_readings, encode_readings};
pub use error::{BroadcastError, Result, SchedulerError, SimulatorError, TransportError};
pub use generator::SensorGenerator;
pub use logging::init_logging;
pub use model::{
    DeviceIdentity, PeripheralState, SensorRange, SensorReadings, ServiceDescriptor,
    SENSOR_DATA_CHARACTERISTIC_UUID, SENSOR_SERVICE_UUID,
};
pub use scheduler::{Scheduler, SchedulerState};
pub use settings::{ConfigLoader, DeviceConfig, LoggingConfig, SensorConfig, SimulatorConfig};
pub use simulator::DeviceSimulator;
pub use state::SensorState;
pub use transport::{ChannelTransport, Notification, PeripheralDelegate, PeripheralTransport};
