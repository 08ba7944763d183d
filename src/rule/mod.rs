//! 规则模块：负责规则的数据模型、分类、规则源与聚合
pub mod model;
pub mod resolver;
pub mod source;
pub mod aggregator;

// 导出核心接口
pub use self::model::{Category, ClassifiedRule, RuleSet, StatsSnapshot};
pub use self::resolver::RuleResolver;
pub use self::source::{SourceDescriptor, SourceManifest, SourceOrigin};
pub use self::aggregator::Aggregator;
