//! 全局配置管理,存储所有可配置项
//! 配置值显式传入各组件，不存在全局单例

use std::path::PathBuf;
use std::time::Duration;

/// 单个源最多重试次数（加上首次请求共 3 次）
pub const MAX_RETRIES: u8 = 2;

/// 重试策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryPolicy {
    Never,     // 不重试
    Times(u8), // 固定次数重试（不含第一次）
}

impl RetryPolicy {
    /// 最大重试次数（不含第一次）
    pub fn max_retries(&self) -> usize {
        match self {
            RetryPolicy::Never => 0,
            RetryPolicy::Times(n) => *n as usize,
        }
    }
}

/// 全局配置
#[derive(Debug, Clone)]
pub struct GlobalConfig {
    // 规则源清单路径（每行一个 URL）
    pub manifest_path: PathBuf,
    // 本地规则目录（可选，先于远程源合并）
    pub local_rules_dir: Option<PathBuf>,
    // 产物输出目录
    pub output_dir: PathBuf,
    // 需要更新统计区的说明文档
    pub readme_path: PathBuf,
    // 是否更新说明文档统计区
    pub update_readme: bool,
    // 仓库标识 owner/name，设置后下载链接使用 raw.githubusercontent.com 绝对地址
    pub repo: Option<String>,
    // 下载链接使用的分支
    pub branch: String,
    // 单次请求超时
    pub http_timeout: Duration,
    // 远程拉取最大并发数
    pub max_concurrent: usize,
    // 重试策略
    pub retry: RetryPolicy,
    // 退避基准时长（每次重试翻倍，上限为基准的 8 倍）
    pub retry_base_delay: Duration,
    // HTTP User-Agent
    pub user_agent: String,
    // 是否启用详细日志
    pub verbose: bool,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            manifest_path: PathBuf::from("sources.txt"),
            local_rules_dir: None,
            output_dir: PathBuf::from("dist"),
            readme_path: PathBuf::from("README.md"),
            update_readme: true,
            repo: None,
            branch: "main".to_string(),
            http_timeout: Duration::from_secs(20),
            max_concurrent: 8,
            retry: RetryPolicy::Times(2),
            retry_base_delay: Duration::from_millis(500),
            user_agent: format!("rsadrules/{}", env!("CARGO_PKG_VERSION")),
            verbose: false,
        }
    }
}

impl GlobalConfig {
    /// 产物下载链接前缀（不含结尾斜杠）
    pub fn download_base(&self) -> String {
        let dir = self.output_dir.to_string_lossy().replace('\\', "/");
        let dir = dir.trim_matches('/');
        match &self.repo {
            Some(repo) => format!(
                "https://raw.githubusercontent.com/{}/{}/{}",
                repo.trim_matches('/'),
                self.branch,
                dir
            ),
            None => dir.to_string(),
        }
    }

    /// 仓库主页，未配置仓库时为 None
    pub fn homepage(&self) -> Option<String> {
        self.repo
            .as_ref()
            .map(|repo| format!("https://github.com/{}", repo.trim_matches('/')))
    }
}

/// 配置管理器
pub struct ConfigManager;

impl ConfigManager {
    /// 获取默认配置
    pub fn get_default() -> GlobalConfig {
        GlobalConfig::default()
    }

    /// 自定义配置
    pub fn custom() -> CustomConfigBuilder {
        CustomConfigBuilder::new()
    }
}

/// 配置构建器（便于自定义配置）
#[derive(Debug, Clone, Default)]
pub struct CustomConfigBuilder {
    config: GlobalConfig,
}

impl CustomConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: GlobalConfig::default(),
        }
    }

    pub fn manifest_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.manifest_path = path.into();
        self
    }

    pub fn local_rules_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.config.local_rules_dir = dir;
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    pub fn readme_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.readme_path = path.into();
        self
    }

    pub fn update_readme(mut self, update: bool) -> Self {
        self.config.update_readme = update;
        self
    }

    pub fn repo(mut self, repo: Option<String>) -> Self {
        self.config.repo = repo.filter(|r| !r.trim().is_empty());
        self
    }

    pub fn branch(mut self, branch: impl Into<String>) -> Self {
        self.config.branch = branch.into();
        self
    }

    pub fn http_timeout(mut self, timeout: Duration) -> Self {
        self.config.http_timeout = timeout;
        self
    }

    /// 并发数至少为 1
    pub fn max_concurrent(mut self, max: usize) -> Self {
        self.config.max_concurrent = max.max(1);
        self
    }

    /// 重试次数上限为 MAX_RETRIES
    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.config.retry = match retry {
            RetryPolicy::Times(0) => RetryPolicy::Never,
            RetryPolicy::Times(n) => RetryPolicy::Times(n.min(MAX_RETRIES)),
            RetryPolicy::Never => RetryPolicy::Never,
        };
        self
    }

    pub fn retry_base_delay(mut self, delay: Duration) -> Self {
        self.config.retry_base_delay = delay;
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.config.verbose = verbose;
        self
    }

    pub fn build(self) -> GlobalConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_download_base_relative_without_repo() {
        let config = ConfigManager::custom().output_dir("dist").build();
        assert_eq!(config.download_base(), "dist");
        assert_eq!(config.homepage(), None);
    }

    #[test]
    fn test_download_base_canonical_with_repo() {
        let config = ConfigManager::custom()
            .repo(Some("Wuming155/China-AdGuard-Rules".to_string()))
            .branch("main")
            .output_dir("dist/")
            .build();
        assert_eq!(
            config.download_base(),
            "https://raw.githubusercontent.com/Wuming155/China-AdGuard-Rules/main/dist"
        );
        assert_eq!(
            config.homepage().as_deref(),
            Some("https://github.com/Wuming155/China-AdGuard-Rules")
        );
    }

    #[test]
    fn test_blank_repo_is_ignored() {
        let config = ConfigManager::custom().repo(Some("  ".to_string())).build();
        assert!(config.repo.is_none());
    }

    #[test]
    fn test_retry_policy_counts() {
        assert_eq!(RetryPolicy::Never.max_retries(), 0);
        assert_eq!(RetryPolicy::Times(2).max_retries(), 2);
        assert_eq!(ConfigManager::custom().max_concurrent(0).build().max_concurrent, 1);
    }

    #[test]
    fn test_retry_is_capped() {
        let config = ConfigManager::custom().retry(RetryPolicy::Times(9)).build();
        assert_eq!(config.retry, RetryPolicy::Times(MAX_RETRIES));
        assert_eq!(config.retry.max_retries() + 1, 3);
        let config = ConfigManager::custom().retry(RetryPolicy::Times(0)).build();
        assert_eq!(config.retry, RetryPolicy::Never);
    }
}
