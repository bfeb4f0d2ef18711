//! 最小 HTTP/1.1 报文
//!
//! 只构造三种请求：影子 POST、影子 GET、引导对象 GET。响应不做完整解析，
//! 只按子串判断状态（响应可能只是 keep-alive 连接上的一段 body）。

use crate::CloudError;
use parkpilot_transport::{SecureStream, TransportError};

/// 影子 POST 响应缓冲区
pub const POST_RESPONSE_CAPACITY: usize = 512;

/// 影子 GET 响应缓冲区
pub const SHADOW_RESPONSE_CAPACITY: usize = 4096;

/// 引导对象响应缓冲区
pub const GUIDANCE_RESPONSE_CAPACITY: usize = 4096;

/// 引导对象请求的长度上限
pub const REQUEST_CAPACITY: usize = 3072;

const SERVER_ERROR_MARKERS: [&[u8]; 2] = [b"HTTP/1.1 4", b"HTTP/1.1 5"];

fn shadow_path(thing_name: &str) -> String {
    format!("/things/{}/shadow", thing_name)
}

/// 影子文档更新（keep-alive）
pub fn shadow_post(host: &str, thing_name: &str, body: &str) -> String {
    format!(
        "POST {} HTTP/1.1\r\n\
         Host: {}\r\n\
         Connection: Keep-Alive\r\n\
         Content-Type: application/json; charset=utf-8\r\n\
         Content-Length: {}\r\n\r\n{}",
        shadow_path(thing_name),
        host,
        body.len(),
        body
    )
}

/// 影子文档查询（keep-alive）
pub fn shadow_get(host: &str, thing_name: &str) -> String {
    format!(
        "GET {} HTTP/1.1\r\nHost: {}\r\nConnection: Keep-Alive\r\n\r\n",
        shadow_path(thing_name),
        host
    )
}

/// 引导对象下载（一次性连接）
pub fn object_get(host: &str, path: &str) -> Result<String, CloudError> {
    let request = format!(
        "GET {} HTTP/1.1\r\nHost: {}\r\nConnection: close\r\n\r\n",
        path, host
    );
    // 保留一个字节给结束符，与设备端缓冲区一致
    if request.len() >= REQUEST_CAPACITY {
        return Err(CloudError::RequestTooLarge {
            len: request.len(),
            limit: REQUEST_CAPACITY,
        });
    }
    Ok(request)
}

pub fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    !needle.is_empty() && haystack.windows(needle.len()).any(|w| w == needle)
}

/// 响应中任意位置出现 4xx/5xx 状态行时，返回该行
pub fn server_error(response: &[u8]) -> Option<String> {
    SERVER_ERROR_MARKERS.iter().find_map(|marker| {
        let start = response.windows(marker.len()).position(|w| w == *marker)?;
        let line = &response[start..];
        let end = line
            .iter()
            .position(|&b| b == b'\r' || b == b'\n')
            .unwrap_or(line.len());
        Some(String::from_utf8_lossy(&line[..end]).into_owned())
    })
}

/// 截取响应开头用于日志
pub fn preview(response: &[u8], max_chars: usize) -> String {
    String::from_utf8_lossy(response)
        .chars()
        .take(max_chars)
        .collect()
}

/// 接收一次并追加到 `buf`，总长度不超过 `capacity - 1`
///
/// 缓冲区已满时返回 `Ok(0)`。
pub fn receive_append<S: SecureStream + ?Sized>(
    stream: &mut S,
    buf: &mut Vec<u8>,
    capacity: usize,
) -> Result<usize, TransportError> {
    let room = capacity.saturating_sub(1).saturating_sub(buf.len());
    if room == 0 {
        return Ok(0);
    }
    let mut chunk = vec![0u8; room];
    let n = stream.receive(&mut chunk)?;
    buf.extend_from_slice(&chunk[..n]);
    Ok(n)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shadow_post_framing() {
        let body = r#"{"a":1}"#;
        let request = shadow_post("iot.example.com", "car", body);
        assert_eq!(
            request,
            "POST /things/car/shadow HTTP/1.1\r\n\
             Host: iot.example.com\r\n\
             Connection: Keep-Alive\r\n\
             Content-Type: application/json; charset=utf-8\r\n\
             Content-Length: 7\r\n\r\n{\"a\":1}"
        );
    }

    #[test]
    fn test_shadow_get_framing() {
        assert_eq!(
            shadow_get("h", "car"),
            "GET /things/car/shadow HTTP/1.1\r\nHost: h\r\nConnection: Keep-Alive\r\n\r\n"
        );
    }

    #[test]
    fn test_object_get_limit() {
        let request = object_get("bucket.example.com", "/plan.json").unwrap();
        assert!(request.starts_with("GET /plan.json HTTP/1.1\r\n"));
        assert!(request.ends_with("Connection: close\r\n\r\n"));

        let long_path = format!("/{}", "a".repeat(REQUEST_CAPACITY));
        assert!(matches!(
            object_get("h", &long_path),
            Err(CloudError::RequestTooLarge { .. })
        ));
    }

    #[test]
    fn test_server_error_detection() {
        assert_eq!(
            server_error(b"HTTP/1.1 503 Service Unavailable\r\n\r\n").as_deref(),
            Some("HTTP/1.1 503 Service Unavailable")
        );
        // 出现在 body 之后也能识别
        assert_eq!(
            server_error(b"{}\r\nHTTP/1.1 403 Forbidden").as_deref(),
            Some("HTTP/1.1 403 Forbidden")
        );
        assert!(server_error(b"HTTP/1.1 200 OK\r\n").is_none());
        assert!(server_error(b"{\"state\":{}}").is_none());
    }

    #[test]
    fn test_preview_truncates() {
        assert_eq!(preview(b"abcdef", 3), "abc");
        assert_eq!(preview(b"ab", 96), "ab");
    }
}
