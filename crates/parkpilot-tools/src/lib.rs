//! # ParkPilot Tools - 共享配置
//!
//! **依赖原则**: 只依赖纯逻辑层 `parkpilot-control`，不引入任何运行时/网络依赖
//!
//! ## 包含模块
//!
//! - `config` - 车辆配置（TOML 文件，`[control]` / `[schedule]` / `[cloud]` 三节）

pub mod config;

// 重新导出常用类型
pub use config::{CloudSettings, ConfigError, ControlSettings, ScheduleSettings, VehicleConfig};
