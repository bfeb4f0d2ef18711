//! 驱动层模块
//!
//! 本模块提供小车的控制主循环及其外围，包括：
//! - 中断侧邮箱（红外按键：背压丢弃；传感器行：覆盖丢弃）
//! - 控制周期调度（电机、碰撞、显示、上报、统计）
//! - 状态发布（ArcSwap 无锁读取）
//! - 状态屏布局
//! - 离线自检脚本
//!
//! # 使用场景
//!
//! 通过 [`VehicleBuilder`] 接入电机、加速度计、屏幕和云端链路，
//! 把 [`Producers`] 交给串口/红外读取线程，然后在主线程调用 [`Vehicle::run`]。

mod builder;
pub mod display;
mod error;
pub mod link;
pub mod mailbox;
pub mod metrics;
pub mod selftest;
pub mod state;
mod vehicle;

#[cfg(feature = "tls")]
pub use builder::tls_shadow_client;
pub use builder::{Producers, VehicleBuilder, shadow_config};
pub use display::{Color, DisplaySink, DrawCommand, DrawList, NullDisplay, TextDisplay, layout};
pub use error::DriverError;
pub use link::{AccelSource, CloudLink, MotorLink, MotorLog, RegisterAccel, RestingAccel};
pub use mailbox::{CommandMailbox, IrReceiver, LineMailbox, SensorUart, ir_mailbox, line_mailbox};
pub use metrics::{DriverMetrics, MetricsSnapshot};
pub use selftest::{SELF_TEST_CYCLES, SelfTestReport, SelfTestScript, run_self_test};
pub use state::{SnapshotReader, VehicleSnapshot};
pub use vehicle::Vehicle;
