//! JSON 字符串字段提取
//!
//! 按 `"key":"` 子串查找，不做完整 JSON 解析：影子文档里只需要读一个字段。
//! 冒号前后不允许空白，与设备影子服务的紧凑输出一致。

/// 提取结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldExtraction {
    /// 没有该字段，或值为空串
    Absent,
    /// 值超过上限；附带已提取的前缀
    Truncated(String),
    Present(String),
}

impl FieldExtraction {
    pub fn value(&self) -> Option<&str> {
        match self {
            FieldExtraction::Present(v) => Some(v),
            _ => None,
        }
    }
}

/// 提取字符串字段，值最多 `max_len` 字节
///
/// 反斜杠使下一个字符按原样写入（`\"` → `"`，`\/` → `/`），不解析 `\uXXXX`。
/// 只处理第一次出现的匹配。
pub fn extract_string_field(doc: &str, key: &str, max_len: usize) -> FieldExtraction {
    let pattern = format!("\"{}\":\"", key);
    let Some(start) = doc.find(&pattern) else {
        return FieldExtraction::Absent;
    };

    let mut value = String::new();
    let mut chars = doc[start + pattern.len()..].chars().peekable();

    while let Some(&c) = chars.peek() {
        if c == '"' {
            break;
        }
        let mut ch = c;
        if c == '\\' {
            chars.next();
            match chars.peek() {
                Some(&escaped) => ch = escaped,
                // 文档末尾的反斜杠按原样保留
                None => {
                    ch = '\\';
                    if value.len() + 1 > max_len {
                        return FieldExtraction::Truncated(value);
                    }
                    value.push(ch);
                    break;
                },
            }
        }
        if value.len() + ch.len_utf8() > max_len {
            return FieldExtraction::Truncated(value);
        }
        value.push(ch);
        chars.next();
    }

    if value.is_empty() {
        FieldExtraction::Absent
    } else {
        FieldExtraction::Present(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "park_guidance_url";

    #[test]
    fn test_present() {
        let doc = r#"{"state":{"reported":{"park_guidance_url":"https://b.s3.com/p.json","x":1}}}"#;
        assert_eq!(
            extract_string_field(doc, KEY, 2047),
            FieldExtraction::Present("https://b.s3.com/p.json".into())
        );
    }

    #[test]
    fn test_absent_and_empty() {
        assert_eq!(extract_string_field("{}", KEY, 2047), FieldExtraction::Absent);
        // 有空白时不匹配
        assert_eq!(
            extract_string_field(r#"{"park_guidance_url": "x"}"#, KEY, 2047),
            FieldExtraction::Absent
        );
        assert_eq!(
            extract_string_field(r#"{"park_guidance_url":""}"#, KEY, 2047),
            FieldExtraction::Absent
        );
    }

    #[test]
    fn test_escapes() {
        let doc = r#"{"park_guidance_url":"https:\/\/h\/a\"b"}"#;
        assert_eq!(
            extract_string_field(doc, KEY, 2047),
            FieldExtraction::Present("https://h/a\"b".into())
        );
    }

    #[test]
    fn test_truncated() {
        let doc = r#"{"park_guidance_url":"abcdefgh"}"#;
        assert_eq!(
            extract_string_field(doc, KEY, 4),
            FieldExtraction::Truncated("abcd".into())
        );
        // 恰好等于上限不算截断
        assert_eq!(
            extract_string_field(doc, KEY, 8),
            FieldExtraction::Present("abcdefgh".into())
        );
    }

    #[test]
    fn test_unterminated_value() {
        // 响应被截断、没有结束引号：按已读到的内容返回
        let doc = r#"{"park_guidance_url":"https://h/p"#;
        assert_eq!(
            extract_string_field(doc, KEY, 2047).value(),
            Some("https://h/p")
        );
    }
}
