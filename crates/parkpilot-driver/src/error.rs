//! 驱动层错误类型定义

use parkpilot_tools::ConfigError;
use parkpilot_transport::TransportError;
use std::io;
use thiserror::Error;

/// 驱动层错误类型
#[derive(Error, Debug)]
pub enum DriverError {
    /// 连接建立失败（证书加载、握手）
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// 配置无效
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// 电机串口写入失败
    #[error("Motor link error: {0}")]
    Motor(#[source] io::Error),

    /// 加速度计读取失败
    #[error("Accelerometer error: {0}")]
    Accel(String),

    /// 显示屏输出失败
    #[error("Display error: {0}")]
    Display(String),
}
