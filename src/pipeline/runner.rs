//! 聚合流程：源清单 → 并发拉取 → 逐源分类 → 合并去重 → 输出产物 → 更新 README
//! 除拉取外全部为确定性的顺序处理

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use super::report::{ReadmeOutcome, RunReport, SourceReport};
use crate::config::GlobalConfig;
use crate::error::{AdRulesError, AdrResult};
use crate::fetcher::RuleFetcher;
use crate::output::{Emitter, ReadmePatcher};
use crate::rule::{Aggregator, Category, RuleSet, SourceManifest, StatsSnapshot};

/// 规则聚合流程
pub struct RulePipeline {
    config: GlobalConfig,
    fetcher: RuleFetcher,
    emitter: Emitter,
    patcher: ReadmePatcher,
}

impl RulePipeline {
    pub fn new(config: GlobalConfig) -> AdrResult<Self> {
        let fetcher = RuleFetcher::new(&config)?;
        let emitter = Emitter::new(&config);
        let patcher = ReadmePatcher::new(&config);
        Ok(Self {
            config,
            fetcher,
            emitter,
            patcher,
        })
    }

    /// 以当前时间执行一次完整流程
    pub async fn run(&self) -> AdrResult<RunReport> {
        self.run_at(Utc::now()).await
    }

    /// 以指定生成时间执行一次完整流程
    /// 仅源清单缺失会中断运行；README 失败只影响统计区，不影响产物
    pub async fn run_at(&self, generated_at: DateTime<Utc>) -> AdrResult<RunReport> {
        // 1. 组装规则源
        let sources = SourceManifest::collect(
            &self.config.manifest_path,
            self.config.local_rules_dir.as_deref(),
        )
        .await?;
        info!("本次运行共 {} 个规则源", sources.len());

        // 2. 并发拉取
        let fetched = self.fetcher.fetch_all(&sources).await;

        // 3. 逐源分类为独立批次
        let mut batches = Vec::with_capacity(fetched.len());
        let mut source_reports = Vec::with_capacity(fetched.len());
        for item in fetched {
            let batch = Aggregator::classify_text(&item.body);
            let report = SourceReport {
                lines: item.line_count(),
                rules: batch.total(),
                source: item.source,
                status: item.status,
            };
            if self.config.verbose {
                info!("[{}] 行数：{}，识别规则：{}", report.source, report.lines, report.rules);
            } else {
                debug!("[{}] 行数：{}，识别规则：{}", report.source, report.lines, report.rules);
            }
            source_reports.push(report);
            batches.push(batch);
        }

        // 4. 合并去重
        let rules = Aggregator::fold(batches);
        let stats = rules.stats();
        Self::log_stats(&rules);

        // 5. 输出产物
        let artifacts = self
            .emitter
            .write_all(&rules, &self.config.output_dir, generated_at)
            .await?;

        // 6. 更新 README 统计区
        let readme = self.update_readme(&stats, generated_at).await;

        let report = RunReport {
            generated_at,
            stats,
            sources: source_reports,
            artifacts,
            readme,
        };
        for failed in report.failed_sources() {
            warn!("规则源未贡献任何规则：{}（{:?}）", failed.source, failed.status);
        }
        Ok(report)
    }

    async fn update_readme(&self, stats: &StatsSnapshot, generated_at: DateTime<Utc>) -> ReadmeOutcome {
        if !self.config.update_readme {
            return ReadmeOutcome::Skipped {
                reason: "已禁用 README 更新".to_string(),
            };
        }

        match self
            .patcher
            .patch_file(&self.config.readme_path, stats, generated_at)
            .await
        {
            Ok(true) => ReadmeOutcome::Updated,
            Ok(false) => ReadmeOutcome::Unchanged,
            Err(e @ AdRulesError::MissingDocument(_)) => {
                warn!("{}，跳过统计区更新", e);
                ReadmeOutcome::Skipped {
                    reason: e.to_string(),
                }
            }
            Err(e) => {
                error!("README 统计区更新失败：{}", e);
                ReadmeOutcome::Failed {
                    error: e.to_string(),
                }
            }
        }
    }

    fn log_stats(rules: &RuleSet) {
        for category in Category::ALL {
            info!("{}：{} 条", category.title(), rules.len(category));
        }
    }
}
