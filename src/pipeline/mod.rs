//! 流程模块：串联拉取、分类、聚合、输出与 README 更新
pub mod report;
pub mod runner;

// 导出核心接口
pub use self::report::{ReadmeOutcome, RunReport, SourceReport};
pub use self::runner::RulePipeline;
