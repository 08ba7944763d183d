//! 规则聚合器
//! 每个源的文本独立分类为局部集合，再由单一例程顺序合并（分区后合并，无需锁）

use tracing::debug;

use super::model::RuleSet;
use super::resolver::RuleResolver;

/// 规则聚合器
pub struct Aggregator;

impl Aggregator {
    /// 将单个源的原始文本分类为局部集合
    pub fn classify_text(text: &str) -> RuleSet {
        RuleResolver::resolve_all(text.lines()).collect()
    }

    /// 将多个局部集合合并为最终集合
    /// 合并为集合并集，与批次顺序无关
    pub fn fold<I>(batches: I) -> RuleSet
    where
        I: IntoIterator<Item = RuleSet>,
    {
        let mut merged = RuleSet::new();
        for (idx, batch) in batches.into_iter().enumerate() {
            debug!("合并第 {} 个批次，规则数：{}", idx + 1, batch.total());
            merged.merge(batch);
        }
        merged
    }
}
