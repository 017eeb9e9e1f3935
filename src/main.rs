//! Build Notifier CLI
//!
//! 读取构建历史快照，为指定构建发送 Slack 通知

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use build_notifier::notification::channels::{LocalFileChannel, SlackConfig, SlackWebhookChannel};
use build_notifier::notification::{classify_build, status_word};
use build_notifier::{
    BuildColor, BuildEnvironmentResolver, BuildHistory, LifecycleEvent, NotificationDispatcher,
    NotifierConfig, SendResult,
};

#[derive(Parser)]
#[command(name = "bnotify")]
#[command(about = "Build Notifier - 构建生命周期的 Slack 通知")]
#[command(version)]
struct Cli {
    /// 配置文件路径（默认 ~/.config/build-notifier/config.json）
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Dry-run 模式（只打印不发送）
    #[arg(long, global = true)]
    dry_run: bool,
    /// 覆盖 Slack webhook URL
    #[arg(long, global = true)]
    webhook_url: Option<String>,
    /// 同时写入本地 JSONL 记录
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct BuildArgs {
    /// 构建历史 JSON 文件
    #[arg(long)]
    history: PathBuf,
    /// 项目名
    #[arg(long)]
    project: String,
    /// 构建号
    #[arg(long)]
    build: u64,
}

#[derive(Subcommand)]
enum Commands {
    /// 发送构建开始通知
    Started(BuildArgs),
    /// 发送构建完成通知
    Completed(BuildArgs),
    /// 打印分类结果，不发送
    Classify(BuildArgs),
}

impl Commands {
    fn build_args(&self) -> &BuildArgs {
        match self {
            Commands::Started(args) | Commands::Completed(args) | Commands::Classify(args) => args,
        }
    }
}

fn build_dispatcher(cli: &Cli, config: &NotifierConfig) -> Result<NotificationDispatcher> {
    let prefs = config.preferences.clone();
    let resolver = Arc::new(
        BuildEnvironmentResolver::new(prefs.build_server_url.clone()).with_process_env(true),
    );
    let mut dispatcher = NotificationDispatcher::new(prefs, resolver).with_dry_run(cli.dry_run);

    let webhook_url = cli.webhook_url.clone().or_else(|| config.webhook_url.clone());
    if let Some(url) = webhook_url {
        let slack = SlackWebhookChannel::new(SlackConfig {
            channel: config.channel.clone(),
            username: config.username.clone(),
            icon_emoji: config.icon_emoji.clone(),
            ..SlackConfig::new(url)
        })?;
        dispatcher.register_channel(Arc::new(slack));
    }

    if let Some(path) = cli.log_file.clone().or_else(|| config.log_file.clone()) {
        dispatcher.register_channel(Arc::new(LocalFileChannel::new(path)));
    }

    if dispatcher.channel_count() == 0 {
        warn!("No notification channel configured (set webhook_url or --log-file)");
    }

    Ok(dispatcher)
}

fn report(results: &[(String, SendResult)]) {
    for (channel, result) in results {
        match result {
            SendResult::Sent => println!("{}: sent", channel),
            SendResult::Skipped(reason) => println!("{}: skipped ({})", channel, reason),
            SendResult::Failed(reason) => println!("{}: failed ({})", channel, reason),
        }
    }
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("build_notifier=info,bnotify=info"));

    fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .init();

    let cli = Cli::parse();
    let config = NotifierConfig::auto_load(cli.config.as_deref())?;

    let args = cli.command.build_args();
    let history = BuildHistory::load(&args.history)?;
    let build = history
        .get(&args.project, args.build)
        .ok_or_else(|| anyhow!("Build {} #{} not found", args.project, args.build))?;

    match &cli.command {
        Commands::Classify(_) => {
            let kind = classify_build(build, &history, &config.preferences);
            println!("type:   {}", kind);
            println!("status: {}", status_word(build, &history));
            println!("color:  {}", BuildColor::for_result(build.result));
        }
        Commands::Started(_) => {
            let dispatcher = build_dispatcher(&cli, &config)?;
            info!(project = %build.project, build = build.number, "Build started");
            let results = dispatcher.dispatch(LifecycleEvent::Started(build), &history)?;
            report(&results);
        }
        Commands::Completed(_) => {
            let dispatcher = build_dispatcher(&cli, &config)?;
            let results = dispatcher
                .dispatch(LifecycleEvent::Completed(build), &history)
                .with_context(|| format!("Failed to notify {} #{}", build.project, build.number))?;
            if results.is_empty() {
                println!("no notification for this result");
            }
            report(&results);
        }
    }

    Ok(())
}
