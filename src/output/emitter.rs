//! 产物输出
//! 每个分类固定输出一个文件：注释头 + 空行 + 排序后的规则正文
//! 空分类同样输出（计数为 0、正文为空），调用方无需通过文件是否存在判断

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use super::TIMESTAMP_FORMAT;
use crate::config::GlobalConfig;
use crate::error::AdrResult;
use crate::rule::{Category, RuleSet};

/// 头部分隔线
const HEADER_RULE: &str = "------------------------------------";

/// 产物输出器
#[derive(Debug, Clone)]
pub struct Emitter {
    homepage: Option<String>,
}

impl Emitter {
    pub fn new(config: &GlobalConfig) -> Self {
        Self {
            homepage: config.homepage(),
        }
    }

    /// 渲染单个分类的完整文件内容
    pub fn render(&self, category: Category, rules: &RuleSet, generated_at: DateTime<Utc>) -> String {
        let sorted = rules.sorted(category);
        let prefix = category.comment_prefix();
        let body_len: usize = sorted.iter().map(|r| r.len() + 1).sum();
        let mut out = String::with_capacity(body_len + 256);

        // 1. 头部
        out.push_str(&format!("{} Title: {}\n", prefix, category.title()));
        out.push_str(&format!(
            "{} Generated: {}\n",
            prefix,
            generated_at.format(TIMESTAMP_FORMAT)
        ));
        out.push_str(&format!("{} Total: {}\n", prefix, sorted.len()));
        if let Some(homepage) = &self.homepage {
            out.push_str(&format!("{} Homepage: {}\n", prefix, homepage));
        }
        out.push_str(&format!("{} {}\n", prefix, HEADER_RULE));
        out.push('\n');

        // 2. 正文（字典序，保证逐字节可复现）
        for rule in sorted {
            out.push_str(rule);
            out.push('\n');
        }

        out
    }

    /// 输出全部分类文件，返回写入的路径（顺序同 Category::ALL）
    pub async fn write_all(
        &self,
        rules: &RuleSet,
        output_dir: &Path,
        generated_at: DateTime<Utc>,
    ) -> AdrResult<Vec<PathBuf>> {
        tokio::fs::create_dir_all(output_dir).await?;

        let mut written = Vec::with_capacity(Category::ALL.len());
        for category in Category::ALL {
            let path = output_dir.join(category.file_name());
            let content = self.render(category, rules, generated_at);
            tokio::fs::write(&path, content).await?;
            debug!("已写入 {}，规则数：{}", path.display(), rules.len(category));
            written.push(path);
        }

        info!("产物输出完成：{}", output_dir.display());
        Ok(written)
    }
}
