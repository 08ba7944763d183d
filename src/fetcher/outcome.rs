//! 拉取结果模型

use serde::Serialize;

use crate::rule::SourceDescriptor;

/// 单个源的拉取状态
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FetchStatus {
    Ok,
    /// 非 2xx 响应（5xx 网关错误为重试耗尽后的最终状态）
    HttpStatus { code: u16 },
    /// 请求超时
    Timeout,
    /// 连接失败、读取失败等
    Unavailable { reason: String },
}

impl FetchStatus {
    pub fn is_ok(&self) -> bool {
        matches!(self, FetchStatus::Ok)
    }
}

/// 单个源的拉取结果，失败时正文为空
#[derive(Debug, Clone)]
pub struct FetchedSource {
    pub source: SourceDescriptor,
    pub status: FetchStatus,
    pub body: String,
}

impl FetchedSource {
    pub fn ok(source: SourceDescriptor, body: String) -> Self {
        // 去除 UTF-8 BOM，避免首行规则无法识别
        let body = match body.strip_prefix('\u{feff}') {
            Some(stripped) => stripped.to_string(),
            None => body,
        };
        Self {
            source,
            status: FetchStatus::Ok,
            body,
        }
    }

    pub fn failed(source: SourceDescriptor, status: FetchStatus) -> Self {
        Self {
            source,
            status,
            body: String::new(),
        }
    }

    pub fn lines(&self) -> std::str::Lines<'_> {
        self.body.lines()
    }

    pub fn line_count(&self) -> usize {
        self.body.lines().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bom_is_stripped() {
        let fetched = FetchedSource::ok(SourceDescriptor::local("a.txt"), "\u{feff}a.com\nb.com".to_string());
        assert_eq!(fetched.lines().next(), Some("a.com"));
        assert_eq!(fetched.line_count(), 2);
    }

    #[test]
    fn test_failed_source_is_empty() {
        let fetched = FetchedSource::failed(SourceDescriptor::local("a.txt"), FetchStatus::Timeout);
        assert!(!fetched.status.is_ok());
        assert_eq!(fetched.line_count(), 0);
    }
}
