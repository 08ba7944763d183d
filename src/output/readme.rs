//! README 统计区更新
//! 统计区通过一对哨兵注释或固定标题定位，仅替换区域正文
//! 标题模式下只替换表格与更新时间行，小节里的说明文字原样保留
//! 找不到或找到多个区域时直接报错，不做追加也不做猜测

use std::ops::Range;
use std::path::Path;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use super::TIMESTAMP_FORMAT;
use crate::config::GlobalConfig;
use crate::error::{AdRulesError, AdrResult};
use crate::rule::{Category, StatsSnapshot};

/// 统计区开始哨兵
pub const BEGIN_SENTINEL: &str = "<!-- ADRULES-STATS:BEGIN -->";
/// 统计区结束哨兵
pub const END_SENTINEL: &str = "<!-- ADRULES-STATS:END -->";
/// 无哨兵时使用的统计区标题
pub const STATS_HEADING: &str = "## 规则统计";
/// 更新时间行前缀
const TIMESTAMP_MARK: &str = "⏰";

/// 定位到的统计区（字节范围）
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatsRegion {
    /// 两个哨兵之间的全部内容
    Sentinel(Range<usize>),
    /// 标题小节内的表格块及更新时间行，小节中的其余文字不在范围内
    Heading(Range<usize>),
}

/// README 统计区更新器
#[derive(Debug, Clone)]
pub struct ReadmePatcher {
    download_base: String,
}

impl ReadmePatcher {
    pub fn new(config: &GlobalConfig) -> Self {
        Self {
            download_base: config.download_base(),
        }
    }

    /// 渲染统计表格与更新时间（以换行结尾）
    pub fn render_block(&self, stats: &StatsSnapshot, generated_at: DateTime<Utc>) -> String {
        let mut out = String::new();
        out.push_str("| 规则类型 | 规则数量 | 下载链接 |\n");
        out.push_str("| :--- | :--- | :--- |\n");
        for category in Category::ALL {
            let link = if self.download_base.is_empty() {
                category.file_name().to_string()
            } else {
                format!("{}/{}", self.download_base, category.file_name())
            };
            out.push_str(&format!(
                "| {} | {} | [点击下载]({}) |\n",
                category.title(),
                stats.get(category),
                link
            ));
        }
        out.push_str(&format!(
            "\n{} 最后更新时间: {}\n",
            TIMESTAMP_MARK,
            generated_at.format(TIMESTAMP_FORMAT)
        ));
        out
    }

    /// 定位统计区：有哨兵时只认哨兵，否则按标题定位
    pub fn locate(document: &str) -> AdrResult<StatsRegion> {
        let begins: Vec<usize> = document.match_indices(BEGIN_SENTINEL).map(|(i, _)| i).collect();
        let ends: Vec<usize> = document.match_indices(END_SENTINEL).map(|(i, _)| i).collect();

        if !begins.is_empty() || !ends.is_empty() {
            return match (begins.as_slice(), ends.as_slice()) {
                ([begin], [end]) if begin < end => {
                    Ok(StatsRegion::Sentinel(begin + BEGIN_SENTINEL.len()..*end))
                }
                ([_], [_]) => Err(AdRulesError::AmbiguousMarker(
                    "结束哨兵位于开始哨兵之前".to_string(),
                )),
                _ => Err(AdRulesError::AmbiguousMarker(format!(
                    "开始哨兵 {} 个，结束哨兵 {} 个，应各有且仅有 1 个",
                    begins.len(),
                    ends.len()
                ))),
            };
        }

        Self::locate_heading(document)
    }

    /// 标题模式：只认标题所在小节内唯一的表格块及紧随其后的更新时间行
    fn locate_heading(document: &str) -> AdrResult<StatsRegion> {
        // (字节偏移, 含换行的行文本)
        let mut lines: Vec<(usize, &str)> = Vec::new();
        let mut offset = 0;
        for line in document.split_inclusive('\n') {
            lines.push((offset, line));
            offset += line.len();
        }

        // 1. 唯一的统计标题
        let headings: Vec<usize> = lines
            .iter()
            .enumerate()
            .filter(|(_, (_, line))| line.trim_end() == STATS_HEADING)
            .map(|(idx, _)| idx)
            .collect();
        let heading = match headings.as_slice() {
            [] => {
                return Err(AdRulesError::MarkerNotFound(format!(
                    "文档中既没有 {} / {} 哨兵，也没有 `{}` 标题",
                    BEGIN_SENTINEL, END_SENTINEL, STATS_HEADING
                )));
            }
            [idx] => *idx,
            many => {
                return Err(AdRulesError::AmbiguousMarker(format!(
                    "`{}` 标题出现 {} 次",
                    STATS_HEADING,
                    many.len()
                )));
            }
        };

        // 2. 标题所在小节，到下一个一级/二级标题为止
        let rest = &lines[heading + 1..];
        let section_len = rest
            .iter()
            .position(|(_, line)| Self::is_section_heading(line.trim_end()))
            .unwrap_or(rest.len());
        let section = &rest[..section_len];

        // 3. 小节内连续的表格行
        let mut tables: Vec<Range<usize>> = Vec::new();
        let mut idx = 0;
        while idx < section.len() {
            if Self::is_table_line(section[idx].1) {
                let start = idx;
                while idx < section.len() && Self::is_table_line(section[idx].1) {
                    idx += 1;
                }
                tables.push(start..idx);
            } else {
                idx += 1;
            }
        }
        let table = match tables.as_slice() {
            [] => {
                return Err(AdRulesError::MarkerNotFound(format!(
                    "`{}` 小节中没有统计表格",
                    STATS_HEADING
                )));
            }
            [table] => table.clone(),
            many => {
                return Err(AdRulesError::AmbiguousMarker(format!(
                    "`{}` 小节中有 {} 个表格",
                    STATS_HEADING,
                    many.len()
                )));
            }
        };

        // 4. 表格后（允许隔空行）的更新时间行归入统计区
        let mut last = table.end - 1;
        let mut next = table.end;
        while next < section.len() && section[next].1.trim().is_empty() {
            next += 1;
        }
        if next < section.len() && section[next].1.trim_start().starts_with(TIMESTAMP_MARK) {
            last = next;
        }

        let start = section[table.start].0;
        let end = section[last].0 + section[last].1.len();
        Ok(StatsRegion::Heading(start..end))
    }

    /// 一级、二级标题作为统计小节的结束边界
    fn is_section_heading(line: &str) -> bool {
        line.starts_with("# ") || line.starts_with("## ") || line == "#" || line == "##"
    }

    fn is_table_line(line: &str) -> bool {
        line.trim_start().starts_with('|')
    }

    /// 替换统计区正文，返回新文档
    /// 相同统计数据重复执行只会改变时间戳
    pub fn patch(&self, document: &str, stats: &StatsSnapshot, generated_at: DateTime<Utc>) -> AdrResult<String> {
        let region = Self::locate(document)?;
        let block = self.render_block(stats, generated_at);

        let (range, replacement) = match region {
            StatsRegion::Sentinel(range) => (range, format!("\n{}", block)),
            StatsRegion::Heading(range) => (range, block),
        };

        let mut patched = String::with_capacity(document.len() + replacement.len());
        patched.push_str(&document[..range.start]);
        patched.push_str(&replacement);
        patched.push_str(&document[range.end..]);
        Ok(patched)
    }

    /// 更新文档文件，文档不存在时返回 MissingDocument
    /// 返回文件内容是否发生变化
    pub async fn patch_file(
        &self,
        path: &Path,
        stats: &StatsSnapshot,
        generated_at: DateTime<Utc>,
    ) -> AdrResult<bool> {
        let document = match tokio::fs::read_to_string(path).await {
            Ok(document) => document,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(AdRulesError::MissingDocument(path.to_path_buf()));
            }
            Err(e) => return Err(e.into()),
        };

        let patched = self.patch(&document, stats, generated_at)?;
        if patched == document {
            debug!("{} 统计区无变化", path.display());
            return Ok(false);
        }

        tokio::fs::write(path, patched).await?;
        info!("{} 统计区已更新", path.display());
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigManager;
    use chrono::TimeZone;

    const README: &str = "\
# China-AdGuard-Rules

中国地区实用的AdGuard过滤规则。

## 规则统计

| 规则类型 | 规则数量 | 下载链接 |
| :--- | :--- | :--- |
| AdGuard 语法 | 163737 | [点击下载](dist/adguard_rules.txt) |

⏰ 最后更新: 2026-01-17 13:32:03

## 使用说明

1. 下载所需的规则文件
";

    fn patcher() -> ReadmePatcher {
        ReadmePatcher::new(
            &ConfigManager::custom()
                .repo(Some("Wuming155/China-AdGuard-Rules".to_string()))
                .build(),
        )
    }

    fn stats() -> StatsSnapshot {
        StatsSnapshot {
            adguard: 1000,
            hosts: 200,
            whitelist: 50,
        }
    }

    fn time(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 17, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_patch_heading_region_in_place() {
        let patched = patcher().patch(README, &stats(), time(14)).unwrap();

        assert!(patched.starts_with("# China-AdGuard-Rules\n\n中国地区实用的AdGuard过滤规则。\n\n## 规则统计\n\n| 规则类型"));
        assert!(patched.contains(
            "| Hosts 屏蔽规则 | 200 | [点击下载](https://raw.githubusercontent.com/Wuming155/China-AdGuard-Rules/main/dist/hosts_rules.txt) |"
        ));
        assert!(patched.contains("⏰ 最后更新时间: 2026-01-17 14:00:00 UTC\n\n## 使用说明\n"));
        assert!(!patched.contains("163737"));
        assert!(patched.ends_with("## 使用说明\n\n1. 下载所需的规则文件\n"));
        assert_eq!(patched.matches("| 规则类型 | 规则数量 | 下载链接 |").count(), 1);
    }

    #[test]
    fn test_repeated_patch_only_changes_timestamp() {
        let first = patcher().patch(README, &stats(), time(14)).unwrap();
        let second = patcher().patch(&first, &stats(), time(15)).unwrap();

        let first_lines: Vec<&str> = first.lines().collect();
        let second_lines: Vec<&str> = second.lines().collect();
        assert_eq!(first_lines.len(), second_lines.len());

        let diffs: Vec<(&str, &str)> = first_lines
            .iter()
            .zip(&second_lines)
            .filter(|(a, b)| a != b)
            .map(|(a, b)| (*a, *b))
            .collect();
        assert_eq!(
            diffs,
            vec![(
                "⏰ 最后更新时间: 2026-01-17 14:00:00 UTC",
                "⏰ 最后更新时间: 2026-01-17 15:00:00 UTC"
            )]
        );

        // 相同时间戳完全幂等
        let third = patcher().patch(&second, &stats(), time(15)).unwrap();
        assert_eq!(second, third);
    }

    #[test]
    fn test_patch_table_at_end_of_document() {
        let doc = "# Title\n\n## 规则统计\n\n| a | b |\n| :--- | :--- |\n| x | 1 |";
        let first = patcher().patch(doc, &stats(), time(1)).unwrap();
        assert!(first.starts_with("# Title\n\n## 规则统计\n\n| 规则类型"));
        assert!(first.ends_with("UTC\n"));
        assert!(!first.contains("| x | 1 |"));
        let second = patcher().patch(&first, &stats(), time(1)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_heading_mode_keeps_section_prose() {
        let doc = "\
## 规则统计

以下数据每日自动更新。

| 规则类型 | 规则数量 | 下载链接 |
| :--- | :--- | :--- |
| AdGuard 语法 | 1 | [点击下载](dist/adguard_rules.txt) |

⏰ 最后更新: 2026-01-17 13:32:03

### 说明

注意事项

## 使用说明
";
        let patched = patcher().patch(doc, &stats(), time(9)).unwrap();
        assert!(patched.starts_with("## 规则统计\n\n以下数据每日自动更新。\n\n| 规则类型"));
        assert!(patched.contains("⏰ 最后更新时间: 2026-01-17 09:00:00 UTC\n\n### 说明\n\n注意事项\n\n## 使用说明\n"));
        assert!(!patched.contains("| AdGuard 语法 | 1 |"));
        assert_eq!(patched.matches('⏰').count(), 1);

        let again = patcher().patch(&patched, &stats(), time(9)).unwrap();
        assert_eq!(patched, again);
    }

    #[test]
    fn test_heading_without_table_fails() {
        let doc = "# Title\n\n## 规则统计\n\n暂无数据\n\n## 使用说明\n\n| 不属于统计区 |\n";
        let err = patcher().patch(doc, &stats(), time(1)).unwrap_err();
        assert!(matches!(err, AdRulesError::MarkerNotFound(_)));
    }

    #[test]
    fn test_heading_with_two_tables_fails() {
        let doc = "## 规则统计\n\n| a |\n\n中间说明\n\n| b |\n";
        let err = patcher().patch(doc, &stats(), time(1)).unwrap_err();
        assert!(matches!(err, AdRulesError::AmbiguousMarker(_)));
    }

    #[test]
    fn test_patch_sentinel_region() {
        let doc = format!(
            "# Rules\n\nintro\n{}\nstale\n{}\n\nfooter\n",
            BEGIN_SENTINEL, END_SENTINEL
        );
        let patched = patcher().patch(&doc, &stats(), time(2)).unwrap();
        assert!(patched.starts_with(&format!("# Rules\n\nintro\n{}\n| 规则类型", BEGIN_SENTINEL)));
        assert!(patched.ends_with(&format!("UTC\n{}\n\nfooter\n", END_SENTINEL)));
        assert!(!patched.contains("stale"));

        let again = patcher().patch(&patched, &stats(), time(2)).unwrap();
        assert_eq!(patched, again);
    }

    #[test]
    fn test_sentinels_take_priority_over_heading() {
        let doc = format!("## 规则统计\n\nkeep me\n\n{}\nold\n{}\n", BEGIN_SENTINEL, END_SENTINEL);
        let patched = patcher().patch(&doc, &stats(), time(3)).unwrap();
        assert!(patched.contains("keep me"));
        assert!(!patched.contains("old"));
    }

    #[test]
    fn test_missing_marker_fails() {
        let err = patcher().patch("# Title\n\nno stats here\n", &stats(), time(4)).unwrap_err();
        assert!(matches!(err, AdRulesError::MarkerNotFound(_)));
    }

    #[test]
    fn test_duplicate_heading_fails() {
        let doc = "## 规则统计\n\na\n\n## 规则统计\n\nb\n";
        let err = patcher().patch(doc, &stats(), time(5)).unwrap_err();
        assert!(matches!(err, AdRulesError::AmbiguousMarker(_)));
    }

    #[test]
    fn test_unbalanced_or_reversed_sentinels_fail() {
        let unbalanced = format!("{}\nx\n{}\n{}\n", BEGIN_SENTINEL, END_SENTINEL, BEGIN_SENTINEL);
        assert!(matches!(
            ReadmePatcher::locate(&unbalanced),
            Err(AdRulesError::AmbiguousMarker(_))
        ));

        let reversed = format!("{}\nx\n{}\n", END_SENTINEL, BEGIN_SENTINEL);
        assert!(matches!(
            ReadmePatcher::locate(&reversed),
            Err(AdRulesError::AmbiguousMarker(_))
        ));

        let only_begin = format!("## 规则统计\n{}\n", BEGIN_SENTINEL);
        assert!(matches!(
            ReadmePatcher::locate(&only_begin),
            Err(AdRulesError::AmbiguousMarker(_))
        ));
    }

    #[test]
    fn test_relative_links_without_repo() {
        let patcher = ReadmePatcher::new(&ConfigManager::get_default());
        let block = patcher.render_block(&stats(), time(6));
        assert!(block.contains("[点击下载](dist/adguard_rules.txt)"));
        assert_eq!(block.lines().filter(|l| l.starts_with("| ")).count(), 5);
    }

    #[tokio::test]
    async fn test_patch_file_missing_document() {
        let dir = tempfile::tempdir().unwrap();
        let err = patcher()
            .patch_file(&dir.path().join("README.md"), &stats(), time(7))
            .await
            .unwrap_err();
        assert!(matches!(err, AdRulesError::MissingDocument(_)));
    }

    #[tokio::test]
    async fn test_patch_file_leaves_document_untouched_on_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("README.md");
        std::fs::write(&path, "# Title\n").unwrap();

        assert!(patcher().patch_file(&path, &stats(), time(8)).await.is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# Title\n");
    }
}
