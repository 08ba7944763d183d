//! 工具模块：与业务无关的通用能力
pub mod retry;

pub use self::retry::{Backoff, Transient, retry_with_backoff};
