//! 设备影子客户端

use crate::http::{self, GUIDANCE_RESPONSE_CAPACITY, POST_RESPONSE_CAPACITY, SHADOW_RESPONSE_CAPACITY};
use crate::json::{FieldExtraction, extract_string_field};
use crate::report::{GuidancePlan, PARK_REQUEST_JSON, ShadowReport};
use crate::url::{MAX_PATH_LEN, parse_fixed_scheme_url};
use crate::CloudError;
use parkpilot_control::GuidanceSource;
use parkpilot_transport::{Connector, Endpoint, SecureStream, TransportError};
use std::time::Duration;
use tracing::{debug, error, info, trace, warn};

/// 引导对象服务端口
pub const GUIDANCE_PORT: u16 = 443;

/// 下载失败时日志中响应预览的长度
const PREVIEW_CHARS: usize = 96;

/// 影子客户端配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShadowConfig {
    /// 设备影子服务地址
    pub endpoint: Endpoint,
    pub thing_name: String,
    /// 影子文档中引导 URL 的字段名
    pub guidance_key: String,
    /// 影子文档中表示引导已就绪的标记子串
    pub guidance_marker: String,
    /// 影子连接的接收超时
    pub receive_timeout: Duration,
    /// 引导对象下载的接收超时
    pub fetch_timeout: Duration,
}

impl ShadowConfig {
    pub fn new(host: impl Into<String>, port: u16, thing_name: impl Into<String>) -> Self {
        Self {
            endpoint: Endpoint::new(host, port),
            thing_name: thing_name.into(),
            guidance_key: "park_guidance_url".to_string(),
            guidance_marker: "park_guidance".to_string(),
            receive_timeout: Duration::from_secs(2),
            fetch_timeout: Duration::from_secs(2),
        }
    }
}

/// 当前泊车尝试的引导缓存
#[derive(Debug, Default)]
struct GuidanceCache {
    /// 最近一次成功下载的 URL
    last_url: Option<String>,
    plan: Option<GuidancePlan>,
}

impl GuidanceCache {
    fn fetched(&self) -> bool {
        self.last_url.is_some()
    }
}

/// 设备影子客户端
///
/// 持有一条 keep-alive 连接（懒连接）。影子 POST/GET 走这条连接，
/// 引导对象下载每次新建独立连接，用完即关。
pub struct ShadowClient<C: Connector> {
    connector: C,
    config: ShadowConfig,
    stream: Option<C::Stream>,
    guidance: GuidanceCache,
}

impl<C: Connector> ShadowClient<C> {
    pub fn new(connector: C, config: ShadowConfig) -> Self {
        Self {
            connector,
            config,
            stream: None,
            guidance: GuidanceCache::default(),
        }
    }

    pub fn config(&self) -> &ShadowConfig {
        &self.config
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// 已有连接时直接返回
    pub fn connect(&mut self) -> Result<(), CloudError> {
        if self.stream.is_none() {
            debug!(endpoint = %self.config.endpoint, "Connecting to shadow service");
            let stream = self
                .connector
                .connect(&self.config.endpoint, self.config.receive_timeout)?;
            info!(endpoint = %self.config.endpoint, "Shadow connection established");
            self.stream = Some(stream);
        }
        Ok(())
    }

    pub fn disconnect(&mut self) {
        if self.stream.take().is_some() {
            debug!("Shadow connection closed");
        }
    }

    /// 上报车辆状态
    ///
    /// 没有连接时先建立连接；发送失败（包括服务器返回错误）时关闭连接、重连并重试一次。
    /// 返回最后一次尝试的错误。
    pub fn report_state(&mut self, report: &ShadowReport) -> Result<(), CloudError> {
        let body = report.to_json()?;
        self.connect()?;

        let first = match self.post(&body) {
            Ok(()) => return Ok(()),
            Err(e) => e,
        };
        warn!(code = first.code(), error = %first, "Shadow POST failed, reconnecting");

        self.disconnect();
        self.connect()?;
        self.post(&body).inspect_err(|e| {
            error!(code = e.code(), error = %e, "Shadow POST retry failed");
        })
    }

    /// 请求云端泊车（只在已有连接时发送，不重试）
    pub fn request_parking(&mut self) -> Result<(), CloudError> {
        if self.stream.is_none() {
            return Err(CloudError::NotConnected);
        }
        self.post(PARK_REQUEST_JSON)
    }

    /// 读取影子文档
    pub fn fetch_shadow(&mut self) -> Result<String, CloudError> {
        let request = http::shadow_get(&self.config.endpoint.host, &self.config.thing_name);
        let stream = self.stream.as_mut().ok_or(CloudError::NotConnected)?;

        stream.send(request.as_bytes())?;
        let mut response = Vec::new();
        match http::receive_append(stream, &mut response, SHADOW_RESPONSE_CAPACITY) {
            Ok(_) => {},
            Err(TransportError::Timeout) => return Err(CloudError::Timeout),
            Err(e) => return Err(e.into()),
        }
        trace!(len = response.len(), "Shadow document received");
        Ok(String::from_utf8_lossy(&response).into_owned())
    }

    /// 查询泊车引导是否就绪
    ///
    /// 影子文档中出现新的引导 URL 时下载一次（同一 URL 成功后不再下载）。
    /// 本轮泊车已成功下载过引导，或文档中包含引导标记时返回 `true`。
    pub fn poll_guidance(&mut self) -> bool {
        if self.stream.is_none() {
            return false;
        }
        let doc = match self.fetch_shadow() {
            Ok(doc) => doc,
            Err(e) => {
                debug!(code = e.code(), error = %e, "Shadow GET failed");
                return false;
            },
        };

        match extract_string_field(&doc, &self.config.guidance_key, MAX_PATH_LEN) {
            FieldExtraction::Present(url) => {
                if self.guidance.last_url.as_deref() != Some(url.as_str()) {
                    self.download_guidance(url);
                }
            },
            FieldExtraction::Truncated(_) => {
                warn!(key = %self.config.guidance_key, "Guidance URL truncated");
            },
            FieldExtraction::Absent => {},
        }

        self.guidance.fetched() || doc.contains(self.config.guidance_marker.as_str())
    }

    fn download_guidance(&mut self, url: String) {
        match self.fetch_guidance(&url) {
            Ok(response) => {
                let plan = GuidancePlan::from_response(&response);
                info!(
                    %url,
                    steps = plan.as_ref().map_or(0, |p| p.steps.len()),
                    "Guidance fetched"
                );
                self.guidance.plan = plan;
                self.guidance.last_url = Some(url);
            },
            Err(e) => warn!(code = e.code(), error = %e, "Guidance fetch failed"),
        }
    }

    /// 通过独立连接下载引导对象
    ///
    /// 响应包含 `200 OK` 或 `"steps"` 即视为成功；否则再接收一次（响应可能被拆成多段）。
    pub fn fetch_guidance(&mut self, url: &str) -> Result<Vec<u8>, CloudError> {
        let target = parse_fixed_scheme_url(url)?;
        let request = http::object_get(&target.host, &target.path)?;
        let endpoint = Endpoint::new(target.host, GUIDANCE_PORT);

        debug!(%endpoint, path = %target.path, "Fetching guidance");
        let mut stream = self.connector.connect(&endpoint, self.config.fetch_timeout)?;
        stream.send(request.as_bytes())?;

        let mut response = Vec::new();
        match http::receive_append(&mut stream, &mut response, GUIDANCE_RESPONSE_CAPACITY) {
            Ok(_) => {},
            Err(TransportError::Timeout) => return Err(CloudError::Timeout),
            Err(e) => return Err(e.into()),
        }

        if !looks_like_guidance(&response) {
            // 第二段的任何错误都归入下面的“非预期响应”
            match http::receive_append(&mut stream, &mut response, GUIDANCE_RESPONSE_CAPACITY) {
                Ok(n) => trace!(len = n, "Second guidance segment received"),
                Err(e) => debug!(error = %e, "Second guidance receive failed"),
            }
        }

        if looks_like_guidance(&response) {
            Ok(response)
        } else {
            let preview = http::preview(&response, PREVIEW_CHARS);
            warn!(%preview, "Unexpected guidance response");
            Err(CloudError::UnexpectedResponse { preview })
        }
    }

    /// 清空引导缓存（新一轮泊车开始）
    pub fn reset_guidance(&mut self) {
        self.guidance = GuidanceCache::default();
    }

    /// 本轮已成功下载的引导 URL
    pub fn guidance_url(&self) -> Option<&str> {
        self.guidance.last_url.as_deref()
    }

    pub fn guidance_plan(&self) -> Option<&GuidancePlan> {
        self.guidance.plan.as_ref()
    }

    /// 发送一次 POST 并检查响应
    ///
    /// 接收超时视为成功：keep-alive 连接上服务器不一定立即回应。
    fn post(&mut self, body: &str) -> Result<(), CloudError> {
        let request = http::shadow_post(&self.config.endpoint.host, &self.config.thing_name, body);
        let stream = self.stream.as_mut().ok_or(CloudError::NotConnected)?;

        stream.send(request.as_bytes())?;
        let mut response = Vec::new();
        match http::receive_append(stream, &mut response, POST_RESPONSE_CAPACITY) {
            Ok(_) => {},
            Err(TransportError::Timeout) => {
                trace!("Shadow POST: no response before timeout");
                return Ok(());
            },
            Err(e) => return Err(e.into()),
        }

        match http::server_error(&response) {
            Some(status_line) => Err(CloudError::Server { status_line }),
            None => Ok(()),
        }
    }
}

fn looks_like_guidance(response: &[u8]) -> bool {
    http::contains(response, b"200 OK") || http::contains(response, b"\"steps\"")
}

impl<C: Connector> GuidanceSource for ShadowClient<C> {
    fn begin_attempt(&mut self) {
        self.reset_guidance();
    }

    fn request_parking(&mut self) {
        if let Err(e) = ShadowClient::request_parking(self) {
            warn!(code = e.code(), error = %e, "Park request not delivered");
        }
    }

    fn poll_guidance(&mut self) -> bool {
        ShadowClient::poll_guidance(self)
    }
}
