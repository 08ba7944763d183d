//! 拉取模块：并发获取各规则源的原始文本
pub mod outcome;
pub mod fetcher;

// 导出核心接口
pub use self::fetcher::RuleFetcher;
pub use self::outcome::{FetchStatus, FetchedSource};
