//! 消息格式化模块 - 生成启动消息和完成状态消息
//!
//! 所有消息以 `{项目} - {构建显示名} ` 开头。
//! 来自项目名、显示名、提交、作者、触发原因、PR 变量和自定义消息的文本一律转义；
//! 格式化器自己插入的链接 `<url|text>` 不转义。

use std::sync::Arc;
use tracing::error;

use super::classifier::{status_word, ResultMessageType, StatusWord};
use super::escape::escape;
use crate::build::{time_span_string, BuildHistory, BuildRecord};
use crate::config::NotificationPreferences;
use crate::env::{EnvVars, EnvironmentResolver};

/// Pull request 插件写入的构建变量
pub mod pr_vars {
    pub const SOURCE_BRANCH: &str = "ghprbSourceBranch";
    pub const PULL_ID: &str = "ghprbPullId";
    pub const PULL_LINK: &str = "ghprbPullLink";
    pub const COMMIT_AUTHOR: &str = "ghprbActualCommitAuthor";
}

/// 消息前缀 `{项目} - {显示名} `
pub fn message_prefix(build: &BuildRecord) -> String {
    format!("{} - {} ", escape(&build.project), escape(&build.display_name()))
}

/// Slack 链接语法
fn link(url: &str, text: &str) -> String {
    format!("<{}|{}>", url, text)
}

/// 构建持续时间，运行中追加 ` and counting`
pub fn duration_string(build: &BuildRecord) -> String {
    let span = time_span_string(i64::try_from(build.duration_ms).unwrap_or(i64::MAX));
    if build.building {
        format!("{} and counting", span)
    } else {
        span
    }
}

/// 启动消息的主体
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartLine {
    /// 变更摘要（`Started by changes from ...`）
    Changes(String),
    /// 非 SCM 触发原因的描述
    Cause(String),
    /// 状态词 + 持续时间
    Generic,
}

/// 消息格式化器
pub struct MessageFormatter {
    prefs: NotificationPreferences,
    resolver: Arc<dyn EnvironmentResolver>,
}

impl MessageFormatter {
    pub fn new(prefs: NotificationPreferences, resolver: Arc<dyn EnvironmentResolver>) -> Self {
        Self { prefs, resolver }
    }

    pub fn preferences(&self) -> &NotificationPreferences {
        &self.prefs
    }

    fn build_url(&self, build: &BuildRecord) -> String {
        format!("{}{}", self.prefs.build_server_url, build.url)
    }

    /// ` (<url|Open>)`
    pub fn open_link(&self, build: &BuildRecord) -> String {
        format!(" ({})", link(&self.build_url(build), "Open"))
    }

    /// `<url|#number>`
    pub fn build_link(&self, build: &BuildRecord) -> String {
        link(&self.build_url(build), &format!("#{}", build.number))
    }

    /// 恢复正常的持续时间：上次成功构建结束 → 本次构建结束
    ///
    /// 没有上次成功构建时回退到构建自身的持续时间。
    pub fn back_to_normal_duration(&self, build: &BuildRecord, history: &BuildHistory) -> String {
        let ends = history
            .previous_successful_build(build)
            .and_then(|last_success| Some((build.end_time()?, last_success.end_time()?)));
        match ends {
            Some((end, last_end)) => time_span_string((end - last_end).num_milliseconds()),
            None => duration_string(build),
        }
    }

    /// 测试汇总块
    pub fn test_summary_block(&self, build: &BuildRecord) -> String {
        match &build.test_summary {
            Some(summary) => format!(
                "\nTest Status:\n\tPassed: {}, Failed: {}, Skipped: {}",
                summary.passed(),
                summary.failed,
                summary.skipped
            ),
            None => "\nNo Tests found.".to_string(),
        }
    }

    /// 自定义消息块，环境解析失败时记录错误并使用空环境
    pub fn custom_message_block(&self, build: &BuildRecord) -> String {
        let env = self.resolver.resolve(build).unwrap_or_else(|e| {
            error!(
                project = %build.project,
                build = build.number,
                error = %e,
                "Failed to resolve build environment"
            );
            EnvVars::new()
        });
        format!("\n{}", escape(&env.expand(&self.prefs.custom_message_template)))
    }

    fn trailers(&self, build: &BuildRecord, include_test_summary: bool) -> String {
        let mut text = String::new();
        if include_test_summary {
            text.push_str(&self.test_summary_block(build));
        }
        if self.prefs.include_custom_message {
            text.push_str(&self.custom_message_block(build));
        }
        text
    }

    /// 启动消息
    pub fn start_message(
        &self,
        build: &BuildRecord,
        history: &BuildHistory,
        line: &StartLine,
        include_test_summary: bool,
    ) -> String {
        let body = match line {
            StartLine::Changes(summary) => escape(summary),
            StartLine::Cause(description) => escape(description),
            StartLine::Generic => {
                let word = status_word(build, history);
                let duration = if word == StatusWord::BackToNormal {
                    self.back_to_normal_duration(build, history)
                } else {
                    duration_string(build)
                };
                format!("{} after {}", word, duration)
            }
        };

        format!(
            "{}{}{}{}",
            message_prefix(build),
            body,
            self.open_link(build),
            self.trailers(build, include_test_summary)
        )
    }

    /// 完成状态消息
    ///
    /// `Build <url|#N> of {项目或 PR 源分支}[ triggered by ...][ in PR <link|#id> by author] {verb} after {duration}`
    pub fn status_message(
        &self,
        kind: ResultMessageType,
        build: &BuildRecord,
        history: &BuildHistory,
    ) -> String {
        let vars = &build.variables;
        let mut message = format!("Build {}", self.build_link(build));

        match vars.get(pr_vars::SOURCE_BRANCH) {
            Some(branch) => {
                message.push_str(&format!(" of {}", escape(branch)));
            }
            None => {
                message.push_str(&format!(" of {}", escape(&build.project)));
                let causes: Vec<String> = build
                    .causes
                    .iter()
                    .map(|c| c.short_description())
                    .filter(|d| !d.is_empty())
                    .collect();
                if !causes.is_empty() {
                    message.push_str(&format!(" triggered by {}", escape(&causes.join(", "))));
                }
            }
        }

        if let Some(pull_id) = vars.get(pr_vars::PULL_ID) {
            let pull_link = vars.get(pr_vars::PULL_LINK).map(String::as_str).unwrap_or("");
            let author = vars.get(pr_vars::COMMIT_AUTHOR).map(String::as_str).unwrap_or("");
            message.push_str(&format!(
                " in PR {} by {}",
                link(pull_link, &format!("#{}", escape(pull_id))),
                escape(author)
            ));
        }

        let duration = if kind == ResultMessageType::BackToNormal {
            self.back_to_normal_duration(build, history)
        } else {
            duration_string(build)
        };
        message.push_str(&format!(" {} after {}", kind.verb(), duration));
        message.push_str(&self.trailers(build, self.prefs.include_test_summary));
        message
    }
}
