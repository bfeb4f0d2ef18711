//! 外部执行器与传感器接口
//!
//! - [`MotorLink`]：电机控制板串口（行协议）
//! - [`AccelSource`]：加速度计
//! - [`CloudLink`]：云端状态上报 + 泊车引导

use crate::error::DriverError;
use parkpilot_client::{CloudError, ShadowClient, ShadowReport};
use parkpilot_control::GuidanceSource;
use parkpilot_protocol::AccelSample;
use parkpilot_transport::Connector;
use std::io;
use std::sync::{Arc, Mutex, PoisonError};

/// 电机控制板链路
pub trait MotorLink {
    /// 发送一整行（含结尾换行）
    fn send_line(&mut self, line: &str) -> Result<(), DriverError>;
}

impl<W: io::Write> MotorLink for W {
    fn send_line(&mut self, line: &str) -> Result<(), DriverError> {
        self.write_all(line.as_bytes()).map_err(DriverError::Motor)?;
        self.flush().map_err(DriverError::Motor)
    }
}

/// 记录发送内容的电机链路（自检、测试）
#[derive(Debug, Clone, Default)]
pub struct MotorLog {
    lines: Arc<Mutex<Vec<String>>>,
}

impl MotorLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl io::Write for MotorLog {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(String::from_utf8_lossy(buf).into_owned());
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// 加速度计
pub trait AccelSource {
    fn read(&mut self) -> Result<AccelSample, DriverError>;
}

impl<F> AccelSource for F
where
    F: FnMut() -> Result<AccelSample, DriverError>,
{
    fn read(&mut self) -> Result<AccelSample, DriverError> {
        self()
    }
}

/// 静止状态（Z 轴约 1g）
#[derive(Debug, Clone, Copy, Default)]
pub struct RestingAccel;

impl AccelSource for RestingAccel {
    fn read(&mut self) -> Result<AccelSample, DriverError> {
        Ok(AccelSample::new(0, 0, 64))
    }
}

/// 按寄存器块读取的 BMA222
///
/// `read_block` 返回从 0x02 起的 6 个数据寄存器，总线错误转为 [`DriverError::Accel`]。
pub struct RegisterAccel<F> {
    read_block: F,
}

impl<F> RegisterAccel<F>
where
    F: FnMut() -> io::Result<[u8; 6]>,
{
    pub fn new(read_block: F) -> Self {
        Self { read_block }
    }
}

impl<F> AccelSource for RegisterAccel<F>
where
    F: FnMut() -> io::Result<[u8; 6]>,
{
    fn read(&mut self) -> Result<AccelSample, DriverError> {
        let data = (self.read_block)().map_err(|e| DriverError::Accel(e.to_string()))?;
        Ok(AccelSample::from_bma222_registers(data))
    }
}

/// 云端链路
pub trait CloudLink: GuidanceSource {
    fn report_state(&mut self, report: &ShadowReport) -> Result<(), CloudError>;
}

impl<C: Connector> CloudLink for ShadowClient<C> {
    fn report_state(&mut self, report: &ShadowReport) -> Result<(), CloudError> {
        ShadowClient::report_state(self, report)
    }
}
