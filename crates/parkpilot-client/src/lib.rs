//! # ParkPilot Cloud Client
//!
//! 设备影子（device shadow）客户端：
//!
//! - 周期性上报车辆状态（POST，失败时重连并重试一次）
//! - 泊车请求（POST，尽力而为）
//! - 轮询泊车引导：GET 影子文档 → 提取引导 URL → 通过独立连接下载引导内容
//!
//! HTTP 报文与 JSON 字段提取都是手写的最小实现：只需要一个字段和一种 URL 格式。
//! 所有网络操作都是阻塞的，受接收超时约束。

pub mod http;
pub mod json;
pub mod report;
mod shadow;
pub mod url;

pub use json::{FieldExtraction, extract_string_field};
pub use report::{GuidancePlan, GuidanceStep, PARK_REQUEST_JSON, ShadowReport};
pub use shadow::{GUIDANCE_PORT, ShadowClient, ShadowConfig};
pub use url::{FixedSchemeUrl, parse_fixed_scheme_url};

use parkpilot_transport::TransportError;
use thiserror::Error;

/// 云端操作错误
///
/// 每一类错误都有稳定的负数诊断码（见 [`CloudError::code`]），用于日志和上报。
#[derive(Error, Debug)]
pub enum CloudError {
    /// 服务器返回 4xx/5xx
    #[error("Server error: {status_line}")]
    Server { status_line: String },

    #[error("Invalid guidance URL: {0:?}")]
    BadUrl(String),

    #[error("Request too large: {len} bytes (limit {limit})")]
    RequestTooLarge { len: usize, limit: usize },

    #[error("Receive timeout")]
    Timeout,

    #[error("Unexpected response: {preview:?}")]
    UnexpectedResponse { preview: String },

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Not connected")]
    NotConnected,

    #[error("Encode error: {0}")]
    Encode(#[from] serde_json::Error),
}

impl CloudError {
    /// 诊断码
    pub fn code(&self) -> i32 {
        match self {
            CloudError::Encode(_) => -1,
            CloudError::Server { .. } => -2,
            CloudError::BadUrl(_) => -10,
            CloudError::RequestTooLarge { .. } => -11,
            CloudError::Timeout => -12,
            CloudError::UnexpectedResponse { .. } => -13,
            CloudError::Transport(_) => -20,
            CloudError::NotConnected => -21,
        }
    }

    /// 连接层失败（连接、发送、接收出错或连接不存在）
    pub fn is_transport(&self) -> bool {
        matches!(self, CloudError::Transport(_) | CloudError::NotConnected)
    }

    /// 服务器明确拒绝
    pub fn is_server(&self) -> bool {
        matches!(self, CloudError::Server { .. })
    }
}
