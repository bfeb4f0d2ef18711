//! Prelude - 常用类型的便捷导入
//!
//! ```rust
//! use parkpilot_sdk::prelude::*;
//! ```

// 驱动层
pub use crate::driver::{
    AccelSource, CloudLink, DisplaySink, MotorLink, MotorLog, Producers, SnapshotReader, Vehicle,
    VehicleBuilder, VehicleSnapshot, run_self_test,
};

// 控制层
pub use crate::control::{Controller, GuidanceSource, Mode, MotionCommand, ParkState};

// 协议层
pub use crate::protocol::{AccelSample, Button, SensorFrame};

// 客户端层
pub use crate::client::{ShadowClient, ShadowConfig, ShadowReport};

// 配置
pub use crate::tools::VehicleConfig;

// 错误类型
pub use crate::client::CloudError;
pub use crate::driver::DriverError;
pub use crate::protocol::ProtocolError;
pub use crate::tools::ConfigError;
pub use crate::transport::TransportError;
