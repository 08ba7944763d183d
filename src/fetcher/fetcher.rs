//! 多源规则拉取器
//! 远程源受并发上限约束，本地文件不限并发
//! 单个源失败只会得到空结果，不会中断整批拉取

use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::OnceCell;
use reqwest::{Client, StatusCode};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};
use url::Url;

use super::outcome::{FetchStatus, FetchedSource};
use crate::config::GlobalConfig;
use crate::error::{AdRulesError, AdrResult};
use crate::rule::{SourceDescriptor, SourceOrigin};
use crate::utils::{Backoff, Transient, retry_with_backoff};

/// 单次请求失败原因
#[derive(Debug)]
enum AttemptError {
    Status(StatusCode),
    Transport(reqwest::Error),
}

impl fmt::Display for AttemptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptError::Status(status) => write!(f, "返回状态码 {}", status),
            AttemptError::Transport(e) => write!(f, "{}", e),
        }
    }
}

impl Transient for AttemptError {
    /// 网关类 5xx 与连接错误可重试；超时与其余状态码不重试
    fn is_transient(&self) -> bool {
        match self {
            AttemptError::Status(status) => matches!(
                *status,
                StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT
            ),
            AttemptError::Transport(e) => !e.is_timeout() && (e.is_connect() || e.is_request() || e.is_body()),
        }
    }
}

impl From<AttemptError> for FetchStatus {
    fn from(err: AttemptError) -> Self {
        match err {
            AttemptError::Status(status) => FetchStatus::HttpStatus {
                code: status.as_u16(),
            },
            AttemptError::Transport(e) if e.is_timeout() => FetchStatus::Timeout,
            AttemptError::Transport(e) => FetchStatus::Unavailable {
                reason: e.to_string(),
            },
        }
    }
}

/// 规则拉取器（克隆成本低，内部客户端共享连接池）
#[derive(Clone)]
pub struct RuleFetcher {
    client: Client,
    // 仅供显式声明 insecure 的源使用，首次需要时构建
    insecure_client: Arc<OnceCell<Client>>,
    http_timeout: Duration,
    user_agent: String,
    backoff: Backoff,
    max_concurrent: usize,
}

impl RuleFetcher {
    pub fn new(config: &GlobalConfig) -> AdrResult<Self> {
        if config.http_timeout.is_zero() {
            return Err(AdRulesError::InvalidInput("请求超时时长必须大于 0".to_string()));
        }
        let client = Self::build_client(config.http_timeout, &config.user_agent, false)?;
        Ok(Self {
            client,
            insecure_client: Arc::new(OnceCell::new()),
            http_timeout: config.http_timeout,
            user_agent: config.user_agent.clone(),
            backoff: Backoff::new(config.retry.max_retries(), config.retry_base_delay),
            max_concurrent: config.max_concurrent.max(1),
        })
    }

    fn build_client(timeout: Duration, user_agent: &str, accept_invalid_certs: bool) -> AdrResult<Client> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .danger_accept_invalid_certs(accept_invalid_certs)
            .build()?;
        Ok(client)
    }

    fn insecure_client(&self) -> AdrResult<&Client> {
        self.insecure_client
            .get_or_try_init(|| Self::build_client(self.http_timeout, &self.user_agent, true))
    }

    /// 并发拉取所有源
    /// 返回结果按输入顺序排列，仅用于报告；聚合不依赖顺序
    pub async fn fetch_all(&self, sources: &[SourceDescriptor]) -> Vec<FetchedSource> {
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let mut tasks = JoinSet::new();

        for (idx, source) in sources.iter().cloned().enumerate() {
            let fetcher = self.clone();
            let semaphore = Arc::clone(&semaphore);
            tasks.spawn(async move {
                let fetched = if source.is_remote() {
                    let _permit = semaphore.acquire_owned().await.ok();
                    fetcher.fetch_one(source).await
                } else {
                    fetcher.fetch_one(source).await
                };
                (idx, fetched)
            });
        }

        let mut slots: Vec<Option<FetchedSource>> = vec![None; sources.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((idx, fetched)) => slots[idx] = Some(fetched),
                Err(e) => error!("{}", AdRulesError::AsyncTaskError(e.to_string())),
            }
        }

        let results: Vec<FetchedSource> = slots
            .into_iter()
            .zip(sources)
            .map(|(slot, source)| {
                slot.unwrap_or_else(|| {
                    FetchedSource::failed(
                        source.clone(),
                        FetchStatus::Unavailable {
                            reason: "拉取任务异常终止".to_string(),
                        },
                    )
                })
            })
            .collect();

        let ok_count = results.iter().filter(|r| r.status.is_ok()).count();
        info!("规则源拉取完成：成功 {}/{}", ok_count, results.len());
        results
    }

    /// 拉取单个源，失败时返回空正文并记录日志
    pub async fn fetch_one(&self, source: SourceDescriptor) -> FetchedSource {
        let result = match &source.origin {
            SourceOrigin::Remote {
                url,
                accept_invalid_certs,
            } => self.fetch_remote(url, *accept_invalid_certs).await,
            SourceOrigin::Local { path } => Self::read_local(path).await,
        };

        match result {
            Ok(body) => {
                let fetched = FetchedSource::ok(source, body);
                debug!("[{}] 拉取成功，行数：{}", fetched.source, fetched.line_count());
                fetched
            }
            Err(status) => {
                let err = AdRulesError::SourceUnavailable(format!("{}（{:?}）", source, status));
                warn!("{}，按空源处理", err);
                FetchedSource::failed(source, status)
            }
        }
    }

    async fn fetch_remote(&self, url: &Url, accept_invalid_certs: bool) -> Result<String, FetchStatus> {
        let client = if accept_invalid_certs {
            self.insecure_client().map_err(|e| FetchStatus::Unavailable {
                reason: e.to_string(),
            })?
        } else {
            &self.client
        };

        let attempts = retry_with_backoff(self.backoff, url.as_str(), |_| {
            let request = client.get(url.clone());
            async move {
                let response = request.send().await.map_err(AttemptError::Transport)?;
                let status = response.status();
                if !status.is_success() {
                    return Err(AttemptError::Status(status));
                }
                response.text().await.map_err(AttemptError::Transport)
            }
        });

        // 超时针对整个源（含全部重试与退避），而非单次请求
        match tokio::time::timeout(self.http_timeout, attempts).await {
            Ok(result) => result.map_err(FetchStatus::from),
            Err(_) => {
                debug!("[{}] 超过 {:?} 仍未完成，放弃", url, self.http_timeout);
                Err(FetchStatus::Timeout)
            }
        }
    }

    async fn read_local(path: &Path) -> Result<String, FetchStatus> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
            Err(e) => Err(FetchStatus::Unavailable {
                reason: e.to_string(),
            }),
        }
    }
}
