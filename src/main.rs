//! rsadrules 命令行入口

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use rsadrules::{ConfigManager, MAX_RETRIES, ReadmeOutcome, RetryPolicy, RulePipeline};

/// 多源广告过滤规则聚合工具
#[derive(Debug, Parser)]
#[command(name = "rsadrules", version, about)]
struct Cli {
    /// 规则源清单（每行一个 URL，行尾可加 insecure 放宽证书校验）
    #[arg(short, long, default_value = "sources.txt")]
    sources: PathBuf,

    /// 本地规则目录（先于远程源合并）
    #[arg(short, long)]
    local_dir: Option<PathBuf>,

    /// 产物输出目录
    #[arg(short, long, default_value = "dist")]
    output: PathBuf,

    /// 需要更新统计区的说明文档
    #[arg(long, default_value = "README.md")]
    readme: PathBuf,

    /// 跳过 README 统计区更新
    #[arg(long)]
    no_readme: bool,

    /// README 更新失败时以非零状态退出
    #[arg(long)]
    strict: bool,

    /// 仓库标识 owner/name，用于生成下载链接
    #[arg(long, env = "ADRULES_REPO")]
    repo: Option<String>,

    /// 下载链接使用的分支
    #[arg(long, default_value = "main")]
    branch: String,

    /// 单次请求超时（秒）
    #[arg(long, default_value_t = 20)]
    timeout: u64,

    /// 远程拉取最大并发数
    #[arg(short = 'j', long, default_value_t = 8)]
    concurrency: usize,

    /// 失败重试次数（不含第一次，最多 2 次）
    #[arg(
        long,
        default_value_t = MAX_RETRIES,
        value_parser = clap::value_parser!(u8).range(0..=i64::from(MAX_RETRIES))
    )]
    retries: u8,

    /// 将运行报告以 JSON 写入指定文件
    #[arg(long)]
    report: Option<PathBuf>,

    /// 输出详细日志
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!("运行失败：{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let retry = match cli.retries {
        0 => RetryPolicy::Never,
        n => RetryPolicy::Times(n),
    };

    let config = ConfigManager::custom()
        .manifest_path(cli.sources)
        .local_rules_dir(cli.local_dir)
        .output_dir(cli.output)
        .readme_path(cli.readme)
        .update_readme(!cli.no_readme)
        .repo(cli.repo)
        .branch(cli.branch)
        .http_timeout(Duration::from_secs(cli.timeout))
        .max_concurrent(cli.concurrency)
        .retry(retry)
        .verbose(cli.verbose)
        .build();

    let pipeline = RulePipeline::new(config).context("初始化聚合流程失败")?;
    let report = pipeline.run().await?;

    info!(
        "完成：AdGuard {} 条，Hosts {} 条，白名单 {} 条",
        report.stats.adguard, report.stats.hosts, report.stats.whitelist
    );

    if let Some(path) = &cli.report {
        let json = report.to_json_pretty()?;
        tokio::fs::write(path, json)
            .await
            .with_context(|| format!("写入运行报告失败：{}", path.display()))?;
        info!("运行报告已写入 {}", path.display());
    }

    if cli.strict && matches!(report.readme, ReadmeOutcome::Failed { .. }) {
        return Ok(ExitCode::from(2));
    }
    Ok(ExitCode::SUCCESS)
}
