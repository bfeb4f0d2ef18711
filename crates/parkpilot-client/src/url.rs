//! 引导对象 URL

use crate::CloudError;

pub const SCHEME: &str = "https://";

/// 主机名最大长度
pub const MAX_HOST_LEN: usize = 255;

/// 路径（含开头的 `/`）最大长度
pub const MAX_PATH_LEN: usize = 2047;

/// `https://<host>/<path>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedSchemeUrl {
    pub host: String,
    /// 以 `/` 开头，包含查询串
    pub path: String,
}

/// 只接受 `https://` 开头、主机名后带路径的 URL
///
/// 不处理端口、用户信息和百分号编码；预签名 URL 的查询串原样保留在 `path` 中。
pub fn parse_fixed_scheme_url(url: &str) -> Result<FixedSchemeUrl, CloudError> {
    let bad = || CloudError::BadUrl(url.to_string());

    let rest = url.strip_prefix(SCHEME).ok_or_else(bad)?;
    let slash = rest.find('/').ok_or_else(bad)?;
    let (host, path) = rest.split_at(slash);

    if host.is_empty() || host.len() > MAX_HOST_LEN || path.len() > MAX_PATH_LEN {
        return Err(bad());
    }

    Ok(FixedSchemeUrl {
        host: host.to_string(),
        path: path.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        let url = parse_fixed_scheme_url("https://bucket.s3.amazonaws.com/plans/p.json?X-Amz=1")
            .unwrap();
        assert_eq!(url.host, "bucket.s3.amazonaws.com");
        assert_eq!(url.path, "/plans/p.json?X-Amz=1");

        let root = parse_fixed_scheme_url("https://h/").unwrap();
        assert_eq!(root.path, "/");
    }

    #[test]
    fn test_rejects() {
        for url in [
            "http://h/p",
            "https://h",
            "https:///p",
            "ftp://h/p",
            "",
        ] {
            let err = parse_fixed_scheme_url(url).unwrap_err();
            assert_eq!(err.code(), -10, "{url}");
        }
    }

    #[test]
    fn test_length_limits() {
        let host = "h".repeat(MAX_HOST_LEN);
        assert!(parse_fixed_scheme_url(&format!("https://{host}/p")).is_ok());
        assert!(parse_fixed_scheme_url(&format!("https://{host}h/p")).is_err());

        let path = "p".repeat(MAX_PATH_LEN - 1);
        assert!(parse_fixed_scheme_url(&format!("https://h/{path}")).is_ok());
        assert!(parse_fixed_scheme_url(&format!("https://h/{path}p")).is_err());
    }
}
