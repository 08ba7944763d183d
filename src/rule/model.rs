//! 规则数据模型定义
//! 分类枚举、分类结果、分类集合与统计快照，无任何 IO

use std::fmt;

use rustc_hash::FxHashSet;
use serde::Serialize;

/// 规则分类（互斥）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// AdGuard / Adblock 高级语法（含元素隐藏、脚本注入）
    AdGuardSyntax,
    /// Hosts 屏蔽规则，统一为 `0.0.0.0 domain`
    HostsBlock,
    /// 白名单放行规则（`@@` 开头）
    Whitelist,
}

impl Category {
    /// 固定输出顺序（产物与统计表格均按此顺序）
    pub const ALL: [Category; 3] = [Category::AdGuardSyntax, Category::HostsBlock, Category::Whitelist];

    pub(crate) fn index(self) -> usize {
        match self {
            Category::AdGuardSyntax => 0,
            Category::HostsBlock => 1,
            Category::Whitelist => 2,
        }
    }

    /// 产物文件名
    pub fn file_name(self) -> &'static str {
        match self {
            Category::AdGuardSyntax => "adguard_rules.txt",
            Category::HostsBlock => "hosts_rules.txt",
            Category::Whitelist => "whitelist.txt",
        }
    }

    /// 展示标题
    pub fn title(self) -> &'static str {
        match self {
            Category::AdGuardSyntax => "AdGuard 过滤规则",
            Category::HostsBlock => "Hosts 屏蔽规则",
            Category::Whitelist => "白名单放行规则",
        }
    }

    /// 产物头部注释前缀：hosts 文件只认 `#`
    pub fn comment_prefix(self) -> &'static str {
        match self {
            Category::HostsBlock => "#",
            Category::AdGuardSyntax | Category::Whitelist => "!",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Category::AdGuardSyntax => "adguard",
            Category::HostsBlock => "hosts",
            Category::Whitelist => "whitelist",
        };
        write!(f, "{}", name)
    }
}

/// 单行规则的分类结果，仅由 RuleResolver 产出
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClassifiedRule {
    pub category: Category,
    pub text: String,
}

impl ClassifiedRule {
    pub fn new(category: Category, text: impl Into<String>) -> Self {
        Self {
            category,
            text: text.into(),
        }
    }
}

/// 按分类去重的规则集合
/// 同一条规则只会落入一个分类，集合间天然互斥
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleSet {
    buckets: [FxHashSet<String>; 3],
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// 插入一条分类结果，返回是否为新规则
    pub fn insert(&mut self, rule: ClassifiedRule) -> bool {
        self.buckets[rule.category.index()].insert(rule.text)
    }

    /// 合并另一个集合（并集，满足交换律与结合律）
    pub fn merge(&mut self, other: RuleSet) {
        for (bucket, incoming) in self.buckets.iter_mut().zip(other.buckets) {
            if bucket.len() < incoming.len() {
                let mut incoming = incoming;
                incoming.extend(bucket.drain());
                *bucket = incoming;
            } else {
                bucket.extend(incoming);
            }
        }
    }

    pub fn get(&self, category: Category) -> &FxHashSet<String> {
        &self.buckets[category.index()]
    }

    pub fn len(&self, category: Category) -> usize {
        self.buckets[category.index()].len()
    }

    pub fn total(&self) -> usize {
        self.buckets.iter().map(|b| b.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.iter().all(|b| b.is_empty())
    }

    /// 某分类规则按字典序排序
    pub fn sorted(&self, category: Category) -> Vec<&str> {
        let mut rules: Vec<&str> = self.get(category).iter().map(String::as_str).collect();
        rules.sort_unstable();
        rules
    }

    pub fn stats(&self) -> StatsSnapshot {
        StatsSnapshot {
            adguard: self.len(Category::AdGuardSyntax),
            hosts: self.len(Category::HostsBlock),
            whitelist: self.len(Category::Whitelist),
        }
    }
}

impl Extend<ClassifiedRule> for RuleSet {
    fn extend<T: IntoIterator<Item = ClassifiedRule>>(&mut self, iter: T) {
        for rule in iter {
            self.insert(rule);
        }
    }
}

impl FromIterator<ClassifiedRule> for RuleSet {
    fn from_iter<T: IntoIterator<Item = ClassifiedRule>>(iter: T) -> Self {
        let mut set = RuleSet::new();
        set.extend(iter);
        set
    }
}

/// 分类统计快照（仅供产物头部与 README 统计表使用）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub adguard: usize,
    pub hosts: usize,
    pub whitelist: usize,
}

impl StatsSnapshot {
    pub fn get(&self, category: Category) -> usize {
        match category {
            Category::AdGuardSyntax => self.adguard,
            Category::HostsBlock => self.hosts,
            Category::Whitelist => self.whitelist,
        }
    }

    pub fn total(&self) -> usize {
        self.adguard + self.hosts + self.whitelist
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_dedup() {
        let mut set = RuleSet::new();
        assert!(set.insert(ClassifiedRule::new(Category::HostsBlock, "0.0.0.0 a.com")));
        assert!(!set.insert(ClassifiedRule::new(Category::HostsBlock, "0.0.0.0 a.com")));
        assert!(set.insert(ClassifiedRule::new(Category::Whitelist, "@@||a.com^")));
        assert_eq!(set.len(Category::HostsBlock), 1);
        assert_eq!(set.total(), 2);
    }

    #[test]
    fn test_merge_is_union() {
        let mut left: RuleSet = vec![
            ClassifiedRule::new(Category::AdGuardSyntax, "||a.com^"),
            ClassifiedRule::new(Category::HostsBlock, "0.0.0.0 b.com"),
        ]
        .into_iter()
        .collect();
        let right: RuleSet = vec![
            ClassifiedRule::new(Category::AdGuardSyntax, "||a.com^"),
            ClassifiedRule::new(Category::AdGuardSyntax, "||c.com^"),
            ClassifiedRule::new(Category::HostsBlock, "0.0.0.0 d.com"),
            ClassifiedRule::new(Category::HostsBlock, "0.0.0.0 e.com"),
        ]
        .into_iter()
        .collect();

        left.merge(right);
        assert_eq!(left.sorted(Category::AdGuardSyntax), vec!["||a.com^", "||c.com^"]);
        assert_eq!(
            left.sorted(Category::HostsBlock),
            vec!["0.0.0.0 b.com", "0.0.0.0 d.com", "0.0.0.0 e.com"]
        );
        assert!(left.get(Category::Whitelist).is_empty());
    }

    #[test]
    fn test_stats_snapshot() {
        let set: RuleSet = vec![
            ClassifiedRule::new(Category::AdGuardSyntax, "example.com##.ad"),
            ClassifiedRule::new(Category::Whitelist, "@@||ok.com^"),
            ClassifiedRule::new(Category::Whitelist, "@@||fine.com^"),
        ]
        .into_iter()
        .collect();
        let stats = set.stats();
        assert_eq!(stats.get(Category::AdGuardSyntax), 1);
        assert_eq!(stats.get(Category::HostsBlock), 0);
        assert_eq!(stats.get(Category::Whitelist), 2);
        assert_eq!(stats.total(), 3);
    }
}
