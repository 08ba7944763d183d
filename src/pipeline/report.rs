//! 运行报告模型（可序列化为 JSON）

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::AdrResult;
use crate::fetcher::FetchStatus;
use crate::rule::{SourceDescriptor, StatsSnapshot};

/// 单个源的处理结果
#[derive(Debug, Clone, Serialize)]
pub struct SourceReport {
    #[serde(flatten)]
    pub source: SourceDescriptor,
    pub status: FetchStatus,
    /// 原始行数
    pub lines: usize,
    /// 该源去重后识别出的规则数（跨源去重前）
    pub rules: usize,
}

/// README 统计区更新结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ReadmeOutcome {
    Updated,
    Unchanged,
    Skipped { reason: String },
    Failed { error: String },
}

/// 一次完整运行的报告
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub generated_at: DateTime<Utc>,
    pub stats: StatsSnapshot,
    pub sources: Vec<SourceReport>,
    pub artifacts: Vec<PathBuf>,
    pub readme: ReadmeOutcome,
}

impl RunReport {
    pub fn failed_sources(&self) -> impl Iterator<Item = &SourceReport> {
        self.sources.iter().filter(|s| !s.status.is_ok())
    }

    pub fn to_json_pretty(&self) -> AdrResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
