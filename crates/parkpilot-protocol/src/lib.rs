//! # ParkPilot Protocol
//!
//! 小车各条外部链路的协议定义（无硬件依赖、无 IO）
//!
//! ## 模块
//!
//! - `ir`: 红外遥控下降沿间隔解码、按键码表
//! - `sensor`: 超声波传感器行协议（`$S,<front>,<right>,<left>,<rear>`）
//! - `motor`: 电机控制行协议（`$M,<speed:03>,<steer:+03>`）
//! - `accel`: 加速度计寄存器解码
//!
//! 所有解析均为纯函数或小型状态机，由驱动层在中断/主循环中调用。

pub mod accel;
pub mod ir;
pub mod motor;
pub mod sensor;

// 重新导出常用类型
pub use accel::AccelSample;
pub use ir::{Button, PulseDecoder, RemoteCommand, code_to_button, encode_pulse_train};
pub use motor::encode_motor_line;
pub use sensor::{LineAssembler, LineStats, SensorFrame, SensorState, parse_sensor_frame};

use thiserror::Error;

/// 协议解析错误类型
///
/// 仅用于传感器行解析；红外噪声和未知按键码不视为错误（静默丢弃）。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Invalid frame header: {0:?}")]
    InvalidHeader(String),

    #[error("Invalid field count: expected {expected}, got {actual}")]
    InvalidFieldCount { expected: usize, actual: usize },

    #[error("Invalid value for field {field}: {value:?}")]
    InvalidValue { field: &'static str, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_error_display() {
        let err = ProtocolError::InvalidFieldCount {
            expected: 4,
            actual: 3,
        };
        assert_eq!(
            format!("{}", err),
            "Invalid field count: expected 4, got 3"
        );

        let err = ProtocolError::InvalidValue {
            field: "front",
            value: "x".to_string(),
        };
        assert!(format!("{}", err).contains("front"));
    }
}
