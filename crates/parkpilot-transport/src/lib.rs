//! # ParkPilot Transport Layer
//!
//! 安全连接抽象层：上层只依赖 [`Connector`] / [`SecureStream`] 两个 trait，
//! 具体实现为 rustls（[`tls::TlsConnector`]）或测试用的 [`mock::MockConnector`]。
//!
//! 所有接收操作都是阻塞的，并受接收超时约束。

use std::fmt;
use std::io;
use std::time::Duration;
use thiserror::Error;

#[cfg(feature = "tls")]
pub mod tls;

#[cfg(feature = "tls")]
pub use tls::{TlsConnector, TlsIdentity, TlsStream};

#[cfg(any(test, feature = "mock"))]
pub mod mock;

#[cfg(any(test, feature = "mock"))]
pub use mock::{MockConnector, MockReply, MockStream};

/// 传输层统一错误类型
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("IO Error: {0}")]
    Io(#[from] io::Error),
    #[error("TLS Error: {0}")]
    Tls(#[from] rustls::Error),
    #[error("Receive timeout")]
    Timeout,
    #[error("Connection closed by peer")]
    Closed,
    #[error("Connection reset")]
    Reset,
    #[error("Failed to resolve host: {0}")]
    Resolve(String),
    #[error("Invalid server name: {0}")]
    InvalidServerName(String),
    #[error("Certificate error: {0}")]
    Certificate(String),
}

impl TransportError {
    /// 将 IO 错误归类为超时/复位/关闭
    pub fn from_io(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => Self::Timeout,
            io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe => Self::Reset,
            io::ErrorKind::UnexpectedEof => Self::Closed,
            _ => Self::Io(err),
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }
}

/// 远端地址（主机名 + 端口）
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// 已建立的安全字节流
pub trait SecureStream {
    /// 发送全部数据
    fn send(&mut self, data: &[u8]) -> Result<(), TransportError>;

    /// 接收一次；对端关闭返回 `Closed`，超时返回 `Timeout`，成功时返回值总是大于 0
    fn receive(&mut self, buf: &mut [u8]) -> Result<usize, TransportError>;

    fn set_receive_timeout(&mut self, _timeout: Duration) -> Result<(), TransportError> {
        Ok(())
    }

    fn receive_timeout(
        &mut self,
        buf: &mut [u8],
        timeout: Duration,
    ) -> Result<usize, TransportError> {
        self.set_receive_timeout(timeout)?;
        self.receive(buf)
    }
}

/// 安全连接工厂
pub trait Connector {
    type Stream: SecureStream;

    /// 建立连接（含握手），返回的流已设置接收超时
    fn connect(
        &mut self,
        endpoint: &Endpoint,
        receive_timeout: Duration,
    ) -> Result<Self::Stream, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_io_classification() {
        let e = TransportError::from_io(io::Error::from(io::ErrorKind::WouldBlock));
        assert!(e.is_timeout());

        let e = TransportError::from_io(io::Error::from(io::ErrorKind::ConnectionReset));
        assert!(matches!(e, TransportError::Reset));

        let e = TransportError::from_io(io::Error::from(io::ErrorKind::UnexpectedEof));
        assert!(matches!(e, TransportError::Closed));

        let e = TransportError::from_io(io::Error::from(io::ErrorKind::PermissionDenied));
        assert!(matches!(e, TransportError::Io(_)));
    }

    #[test]
    fn test_endpoint_display() {
        let ep = Endpoint::new("example.com", 8443);
        assert_eq!(ep.to_string(), "example.com:8443");
    }
}
