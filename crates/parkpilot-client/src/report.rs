//! 影子文档负载

use crate::CloudError;
use crate::http::contains;
use serde::{Deserialize, Serialize};

/// 泊车请求（写入 desired 状态）
pub const PARK_REQUEST_JSON: &str = r#"{"state":{"desired":{"var":"PARK_REQUEST"}}}"#;

/// 车辆状态上报（reported 状态）
///
/// 字段顺序即序列化顺序。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShadowReport {
    pub mode: u8,
    /// 巡航速度
    pub speed: i16,
    pub front: i32,
    pub right: i32,
    pub left: i32,
    pub rear: i32,
    pub collision: bool,
}

#[derive(Serialize)]
struct Update<'a> {
    state: Reported<'a>,
}

#[derive(Serialize)]
struct Reported<'a> {
    reported: &'a ShadowReport,
}

impl ShadowReport {
    /// `{"state":{"reported":{...}}}`
    pub fn to_json(&self) -> Result<String, CloudError> {
        Ok(serde_json::to_string(&Update {
            state: Reported { reported: self },
        })?)
    }
}

/// 引导内容中的一步动作
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuidanceStep {
    pub cmd: String,
    pub speed: i32,
    pub steer: i32,
    pub duration_ms: u32,
}

/// 云端生成的泊车引导
///
/// 只用于日志和诊断；实际机动仍由本地状态机按固定周期执行。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuidancePlan {
    #[serde(default)]
    pub source: Option<String>,
    pub steps: Vec<GuidanceStep>,
}

impl GuidancePlan {
    /// 从完整的 HTTP 响应中解析 body
    ///
    /// 分块编码或被截断的响应解析失败时返回 `None`。
    pub fn from_response(response: &[u8]) -> Option<Self> {
        let body_start = response
            .windows(4)
            .position(|w| w == b"\r\n\r\n")
            .map_or(0, |p| p + 4);
        let body = &response[body_start..];
        if !contains(body, b"\"steps\"") {
            return None;
        }
        let json_start = body.iter().position(|&b| b == b'{')?;
        serde_json::from_slice(&body[json_start..]).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_json_shape() {
        let report = ShadowReport {
            mode: 2,
            speed: 40,
            front: 90,
            right: 40,
            left: 45,
            rear: 80,
            collision: false,
        };
        assert_eq!(
            report.to_json().unwrap(),
            r#"{"state":{"reported":{"mode":2,"speed":40,"front":90,"right":40,"left":45,"rear":80,"collision":false}}}"#
        );
    }

    #[test]
    fn test_guidance_plan_from_response() {
        let response = b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\n\r\n\
            {\"source\":\"lambda\",\"steps\":[\
            {\"cmd\":\"FWD\",\"speed\":20,\"steer\":30,\"duration_ms\":1200},\
            {\"cmd\":\"STOP\",\"speed\":0,\"steer\":0,\"duration_ms\":300}]}";
        let plan = GuidancePlan::from_response(response).unwrap();
        assert_eq!(plan.source.as_deref(), Some("lambda"));
        assert_eq!(plan.steps.len(), 2);
        assert_eq!(plan.steps[0].steer, 30);
        assert_eq!(plan.steps[1].cmd, "STOP");
    }

    #[test]
    fn test_guidance_plan_rejects_partial() {
        assert!(GuidancePlan::from_response(b"HTTP/1.1 200 OK\r\n\r\n{\"steps\":[").is_none());
        assert!(GuidancePlan::from_response(b"HTTP/1.1 200 OK\r\n\r\n{}").is_none());
    }
}
