//! 规则源定义
//! 负责解析源清单（sources.txt）与扫描本地规则目录，生成不可变的源描述列表

use std::fmt;
use std::path::{Path, PathBuf};

use rustc_hash::FxHashSet;
use serde::Serialize;
use tracing::{debug, warn};
use url::Url;
use walkdir::WalkDir;

use crate::error::{AdRulesError, AdrResult};

/// 清单中放宽 TLS 校验的选项
const INSECURE_FLAG: &str = "insecure";

/// 规则源位置
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceOrigin {
    /// 远程 HTTP(S) 源
    Remote {
        url: Url,
        /// 仅对该源接受不受信任的证书（显式开启，默认关闭）
        accept_invalid_certs: bool,
    },
    /// 本地规则文件
    Local { path: PathBuf },
}

/// 规则源描述（每次运行构建一次，之后不再修改）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceDescriptor {
    #[serde(flatten)]
    pub origin: SourceOrigin,
}

impl SourceDescriptor {
    pub fn remote(url: Url) -> Self {
        Self {
            origin: SourceOrigin::Remote {
                url,
                accept_invalid_certs: false,
            },
        }
    }

    /// 放宽证书校验的远程源
    pub fn remote_insecure(url: Url) -> Self {
        Self {
            origin: SourceOrigin::Remote {
                url,
                accept_invalid_certs: true,
            },
        }
    }

    pub fn local(path: impl Into<PathBuf>) -> Self {
        Self {
            origin: SourceOrigin::Local { path: path.into() },
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self.origin, SourceOrigin::Remote { .. })
    }
}

impl fmt::Display for SourceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.origin {
            SourceOrigin::Remote { url, .. } => write!(f, "{}", url),
            SourceOrigin::Local { path } => write!(f, "{}", path.display()),
        }
    }
}

/// 源清单
pub struct SourceManifest;

impl SourceManifest {
    /// 解析清单文本
    /// 每行格式：`URL [选项...]`，首个 token 不是 http/https 绝对地址的行一律忽略
    pub fn parse(text: &str) -> Vec<SourceDescriptor> {
        let mut seen = FxHashSet::default();
        let mut sources = Vec::new();

        for line in text.lines() {
            let mut tokens = line.split_whitespace();
            let Some(first) = tokens.next() else {
                continue;
            };
            if !first.starts_with("http") {
                continue;
            }

            let url = match Url::parse(first) {
                Ok(url) if matches!(url.scheme(), "http" | "https") => url,
                Ok(url) => {
                    debug!("忽略不支持的协议：{}", url);
                    continue;
                }
                Err(e) => {
                    warn!("清单中的 URL 无法解析，已忽略：{}，错误：{}", first, e);
                    continue;
                }
            };

            if !seen.insert(url.clone()) {
                debug!("清单中存在重复 URL，已忽略：{}", url);
                continue;
            }

            let insecure = tokens.any(|t| t.eq_ignore_ascii_case(INSECURE_FLAG));
            if insecure {
                warn!("规则源 {} 已显式关闭证书校验", url);
                sources.push(SourceDescriptor::remote_insecure(url));
            } else {
                sources.push(SourceDescriptor::remote(url));
            }
        }

        sources
    }

    /// 读取清单文件，文件不存在属于致命错误
    pub async fn load(path: &Path) -> AdrResult<Vec<SourceDescriptor>> {
        let text = match tokio::fs::read_to_string(path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(AdRulesError::MissingManifest(path.to_path_buf()));
            }
            Err(e) => return Err(e.into()),
        };

        let sources = Self::parse(&text);
        debug!("清单 {} 解析完成，远程源数：{}", path.display(), sources.len());
        Ok(sources)
    }

    /// 扫描本地规则目录（不递归，按文件名排序）
    /// 目录不存在时仅记录警告并返回空列表
    pub fn scan_local_dir(dir: &Path) -> Vec<SourceDescriptor> {
        if !dir.is_dir() {
            warn!("本地规则目录不存在，已跳过：{}", dir.display());
            return Vec::new();
        }

        let sources: Vec<SourceDescriptor> = WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!("读取本地规则目录条目失败：{}", e);
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| SourceDescriptor::local(entry.into_path()))
            .collect();

        debug!("本地规则目录 {} 共 {} 个文件", dir.display(), sources.len());
        sources
    }

    /// 组装本次运行的全部源：本地源在前，远程源在后
    pub async fn collect(
        manifest_path: &Path,
        local_rules_dir: Option<&Path>,
    ) -> AdrResult<Vec<SourceDescriptor>> {
        let remote = Self::load(manifest_path).await?;
        let mut sources = local_rules_dir.map(Self::scan_local_dir).unwrap_or_default();
        sources.extend(remote);
        Ok(sources)
    }
}
