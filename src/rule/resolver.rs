//! 规则分类器
//! 单行原始文本 → (分类, 规范化文本) 或丢弃
//! 纯函数：无 IO、无共享状态，结果只取决于行内容
//!
//! 判定顺序（先命中者生效）：
//! 1. 去除首尾空白，空行丢弃
//! 2. 注释过滤：`!` 开头（`!!` 除外）丢弃；`#` 开头丢弃，但 `##` / `#%#` 是元素隐藏与脚本规则前缀
//! 3. `@@` 开头 → 白名单
//! 4. 含高级语法标记且不以锚点 IP 开头 → AdGuard 语法
//! 5. `0.0.0.0` / `127.0.0.1` + 域名 → Hosts（环回名、IP 字面量丢弃）
//! 6. 纯域名 → 补全为 Hosts
//! 7. 其余丢弃

use std::net::IpAddr;

use once_cell::sync::Lazy;
use regex::Regex;

use super::model::{Category, ClassifiedRule};

/// 高级语法标记
const ADVANCED_MARKERS: [&str; 6] = ["||", "*", "^", "$", "##", "#%#"];

/// Hosts 行锚点 IP
const ANCHOR_IPS: [&str; 2] = ["0.0.0.0", "127.0.0.1"];

/// 保留的环回主机名
const RESERVED_HOSTS: [&str; 3] = ["localhost", "localhost.localdomain", "broadcasthost"];

/// 纯域名中禁止出现的字符
const BARE_DOMAIN_FORBIDDEN: [char; 6] = ['#', '[', '>', '*', ':', ' '];

/// 规范化后的 Hosts 前缀
const HOSTS_PREFIX: &str = "0.0.0.0 ";

// Hosts 行：锚点 IP + 空白 + 域名 token（后续内容如行尾注释一律忽略）
static HOSTS_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:0\.0\.0\.0|127\.0\.0\.1)\s+([A-Za-z0-9._-]+)").unwrap()
});

// 完整域名：字母数字与连字符组成的标签，点分隔，末级标签为 ≥2 位字母
static FULL_DOMAIN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[A-Za-z0-9-]+\.)+[A-Za-z]{2,}$").unwrap()
});

/// 规则分类器
pub struct RuleResolver;

impl RuleResolver {
    /// 分类单行规则，无法识别的行返回 None
    pub fn resolve(line: &str) -> Option<ClassifiedRule> {
        // 1. 空行
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        // 2. 注释
        if Self::is_comment(line) {
            return None;
        }

        // 3. 白名单（必须先于高级语法判断，`@@||a.com^$important` 仍属白名单）
        if line.starts_with("@@") {
            return Some(ClassifiedRule::new(Category::Whitelist, line));
        }

        // 4. 高级语法
        if Self::has_advanced_marker(line) && !Self::starts_with_anchor_ip(line) {
            return Some(ClassifiedRule::new(Category::AdGuardSyntax, line));
        }

        // 5. Hosts 格式（命中前缀即终止判定）
        if let Some(caps) = HOSTS_LINE.captures(line) {
            let domain = caps[1].to_ascii_lowercase();
            return Self::hosts_entry(&domain);
        }

        // 6. 纯域名补全
        if Self::is_bare_domain(line) {
            return Self::hosts_entry(&line.to_ascii_lowercase());
        }

        None
    }

    /// 批量分类，丢弃无法识别的行
    pub fn resolve_all<'a, I>(lines: I) -> impl Iterator<Item = ClassifiedRule>
    where
        I: IntoIterator<Item = &'a str>,
    {
        lines.into_iter().filter_map(Self::resolve)
    }

    fn is_comment(line: &str) -> bool {
        if line.starts_with('!') {
            return !line.starts_with("!!");
        }
        if line.starts_with('#') {
            return !(line.starts_with("##") || line.starts_with("#%#"));
        }
        false
    }

    fn has_advanced_marker(line: &str) -> bool {
        ADVANCED_MARKERS.iter().any(|marker| line.contains(marker))
    }

    fn starts_with_anchor_ip(line: &str) -> bool {
        ANCHOR_IPS.iter().any(|ip| line.starts_with(ip))
    }

    fn is_bare_domain(line: &str) -> bool {
        !line.contains(BARE_DOMAIN_FORBIDDEN) && FULL_DOMAIN.is_match(line)
    }

    /// 已小写的域名 → Hosts 规则；环回名与 IP 字面量丢弃
    fn hosts_entry(domain: &str) -> Option<ClassifiedRule> {
        if RESERVED_HOSTS.contains(&domain) || domain.parse::<IpAddr>().is_ok() {
            return None;
        }
        Some(ClassifiedRule::new(
            Category::HostsBlock,
            format!("{}{}", HOSTS_PREFIX, domain),
        ))
    }
}
