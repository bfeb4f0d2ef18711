//! ParkPilot SDK - 智能泊车小车控制核心
//!
//! 红外遥控、超声波测距、碰撞检测、自动泊车和云端影子同步的 Rust 实现。
//!
//! # 架构设计
//!
//! 本 SDK 采用分层架构，从底层到高层：
//!
//! - **协议层** (`protocol`): 红外脉冲解码、传感器行协议、电机行协议
//! - **传输层** (`transport`): 安全连接抽象（rustls / mock）
//! - **控制层** (`control`): 模式、避障策略、泊车状态机、碰撞检测
//! - **客户端层** (`client`): 设备影子 HTTP 协议、泊车引导下载
//! - **驱动层** (`driver`): 中断邮箱、控制主循环、状态发布、自检
//! - **工具层** (`tools`): TOML 配置
//!
//! # 快速开始
//!
//! ```rust,no_run
//! use parkpilot_sdk::prelude::*;
//!
//! parkpilot_sdk::init_logger();
//!
//! let (mut vehicle, mut producers) = VehicleBuilder::new(VehicleConfig::default())
//!     .motor(MotorLog::new())
//!     .build()
//!     .unwrap();
//!
//! producers.uart.feed(b"$S,090,040,045,080\n");
//! let snapshot = vehicle.tick().unwrap();
//! assert_eq!(snapshot.mode, Mode::Idle);
//! ```

pub use parkpilot_client as client;
pub use parkpilot_control as control;
pub use parkpilot_driver as driver;
pub use parkpilot_protocol as protocol;
pub use parkpilot_tools as tools;
pub use parkpilot_transport as transport;

// Prelude 模块
pub mod prelude;

// --- 用户以此为界 ---

// 错误类型
pub use parkpilot_client::CloudError;
pub use parkpilot_driver::DriverError;
pub use parkpilot_protocol::ProtocolError;
pub use parkpilot_tools::ConfigError;
pub use parkpilot_transport::TransportError;

// 常用入口
pub use parkpilot_driver::{Vehicle, VehicleBuilder, VehicleSnapshot};
pub use parkpilot_tools::VehicleConfig;

use tracing_subscriber::EnvFilter;

/// 默认日志过滤规则（`RUST_LOG` 未设置时使用）
pub const DEFAULT_LOG_FILTER: &str = "parkpilot=info";

/// 初始化日志
///
/// `tracing-subscriber` 输出到 stderr，过滤规则取 `RUST_LOG`，未设置时为 [`DEFAULT_LOG_FILTER`]。
/// 同时安装 `tracing-log` 桥接，依赖中 `log` 宏的输出也会被收集。
///
/// 重复调用是安全的：已经安装过的全局 subscriber 不会被替换。
pub fn init_logger() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();

    if tracing::subscriber::set_global_default(subscriber).is_ok() {
        let _ = tracing_log::LogTracer::init();
    }
}
