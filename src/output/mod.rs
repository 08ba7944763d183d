//! 输出模块：分类产物文件与 README 统计区
pub mod emitter;
pub mod readme;

/// 产物头部与统计区共用的时间格式
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

// 导出核心接口
pub use self::emitter::Emitter;
pub use self::readme::{BEGIN_SENTINEL, END_SENTINEL, ReadmePatcher, STATS_HEADING, StatsRegion};
