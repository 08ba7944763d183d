//! 通用异步重试
//! 仅对可重试错误生效，指数退避（每次翻倍，上限为基准的 8 倍）

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::warn;

/// 退避倍数上限
const MAX_BACKOFF_FACTOR: u32 = 8;

/// 判断错误是否值得重试
pub trait Transient {
    fn is_transient(&self) -> bool;
}

/// 重试参数
#[derive(Debug, Clone, Copy)]
pub struct Backoff {
    /// 最大重试次数（不含第一次）
    pub max_retries: usize,
    /// 退避基准时长
    pub base_delay: Duration,
}

impl Backoff {
    pub fn new(max_retries: usize, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// 第 retry 次重试（从 0 计）前的等待时长
    pub fn delay_for(&self, retry: usize) -> Duration {
        let factor = 1u32
            .checked_shl(retry as u32)
            .unwrap_or(MAX_BACKOFF_FACTOR)
            .min(MAX_BACKOFF_FACTOR);
        self.base_delay.saturating_mul(factor)
    }
}

/// 执行异步操作，遇到可重试错误时按退避策略重试
/// 不可重试错误立即返回；重试耗尽返回最后一次错误
pub async fn retry_with_backoff<F, Fut, T, E>(backoff: Backoff, label: &str, mut func: F) -> Result<T, E>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Transient + Display,
{
    let mut attempt = 0;
    loop {
        match func(attempt).await {
            Ok(res) => return Ok(res),
            Err(e) if e.is_transient() && attempt < backoff.max_retries => {
                let delay = backoff.delay_for(attempt);
                warn!(
                    "[{}] 请求失败：{}，{:?} 后重试（{}/{}）",
                    label,
                    e,
                    delay,
                    attempt + 1,
                    backoff.max_retries
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
