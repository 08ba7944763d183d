//! rsadrules - 多源广告过滤规则聚合工具
//! 拉取多个规则源，逐行分类为 Hosts / AdGuard 语法 / 白名单，去重后按分类输出，并更新 README 统计区

// 导出全局错误类型
pub use self::error::{AdRulesError, AdrResult};

// 导出配置模块
pub use self::config::{ConfigManager, CustomConfigBuilder, GlobalConfig, MAX_RETRIES, RetryPolicy};

// 导出规则模块核心接口
pub use self::rule::{
    Aggregator, Category, ClassifiedRule, RuleResolver, RuleSet, SourceDescriptor, SourceManifest,
    SourceOrigin, StatsSnapshot,
};

// 导出拉取模块核心接口
pub use self::fetcher::{FetchStatus, FetchedSource, RuleFetcher};

// 导出输出模块核心接口
pub use self::output::{Emitter, ReadmePatcher, StatsRegion};

// 导出流程模块核心接口
pub use self::pipeline::{ReadmeOutcome, RulePipeline, RunReport, SourceReport};

// 声明所有子模块
pub mod config;
pub mod error;
pub mod rule;
pub mod fetcher;
pub mod output;
pub mod utils;
pub mod pipeline;
