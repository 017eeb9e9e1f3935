//! 通知配置 - 用户偏好与 Slack 渠道设置
//!
//! 配置读取优先级：
//! 1. 显式指定的配置文件（`--config`）
//! 2. `~/.config/build-notifier/config.json`
//! 3. 默认值
//!
//! 之后环境变量 `BUILD_NOTIFIER_WEBHOOK_URL`、`BUILD_NOTIFIER_CHANNEL`、
//! `BUILD_NOTIFIER_SERVER_URL` 覆盖对应字段。

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// 提交信息展示方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitInfoChoice {
    /// 不展示提交
    #[default]
    None,
    /// 仅作者
    Authors,
    /// 提交标题 + 作者
    AuthorsAndTitles,
}

impl CommitInfoChoice {
    pub fn show_author(&self) -> bool {
        matches!(self, CommitInfoChoice::Authors | CommitInfoChoice::AuthorsAndTitles)
    }

    pub fn show_title(&self) -> bool {
        matches!(self, CommitInfoChoice::AuthorsAndTitles)
    }

    pub fn show_anything(&self) -> bool {
        self.show_author() || self.show_title()
    }

    pub fn description(&self) -> &'static str {
        match self {
            CommitInfoChoice::None => "nothing about commits",
            CommitInfoChoice::Authors => "commit list with authors only",
            CommitInfoChoice::AuthorsAndTitles => "commit list with authors and titles",
        }
    }
}

/// 通知偏好（每次通知读取一次，只读）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationPreferences {
    pub notify_aborted: bool,
    pub notify_failure: bool,
    pub notify_repeated_failure: bool,
    pub notify_not_built: bool,
    pub notify_back_to_normal: bool,
    pub notify_success: bool,
    pub notify_unstable: bool,
    pub commit_info_choice: CommitInfoChoice,
    pub include_test_summary: bool,
    pub include_custom_message: bool,
    /// 自定义消息模板，支持 `$VAR` / `${VAR}`
    pub custom_message_template: String,
    /// 构建服务器根 URL（以 `/` 结尾）
    pub build_server_url: String,
}

impl Default for NotificationPreferences {
    fn default() -> Self {
        Self {
            notify_aborted: false,
            notify_failure: true,
            notify_repeated_failure: false,
            notify_not_built: false,
            notify_back_to_normal: true,
            notify_success: false,
            notify_unstable: false,
            commit_info_choice: CommitInfoChoice::None,
            include_test_summary: false,
            include_custom_message: false,
            custom_message_template: String::new(),
            build_server_url: String::new(),
        }
    }
}

impl NotificationPreferences {
    /// 所有结果都通知（用于调试和测试）
    pub fn notify_all() -> Self {
        Self {
            notify_aborted: true,
            notify_failure: true,
            notify_repeated_failure: true,
            notify_not_built: true,
            notify_back_to_normal: true,
            notify_success: true,
            notify_unstable: true,
            ..Self::default()
        }
    }

    pub fn with_build_server_url(mut self, url: impl Into<String>) -> Self {
        self.build_server_url = url.into();
        self
    }

    pub fn with_commit_info(mut self, choice: CommitInfoChoice) -> Self {
        self.commit_info_choice = choice;
        self
    }

    pub fn with_custom_message(mut self, template: impl Into<String>) -> Self {
        self.include_custom_message = true;
        self.custom_message_template = template.into();
        self
    }
}

/// 完整配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifierConfig {
    pub preferences: NotificationPreferences,
    /// Slack incoming webhook URL
    pub webhook_url: Option<String>,
    /// 覆盖 webhook 默认频道
    pub channel: Option<String>,
    pub username: Option<String>,
    pub icon_emoji: Option<String>,
    /// 本地 JSONL 通知记录
    pub log_file: Option<PathBuf>,
}

impl NotifierConfig {
    /// 默认配置文件路径
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".config/build-notifier/config.json"))
    }

    /// 按优先级加载配置，并应用环境变量覆盖
    pub fn auto_load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::load_from(path)?,
            None => match Self::default_path().filter(|p| p.exists()) {
                Some(path) => Self::load_from(&path)?,
                None => {
                    debug!("No config file found, using defaults");
                    Self::default()
                }
            },
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// 从 JSON 文件加载
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Invalid config {}", path.display()))?;
        debug!(path = %path.display(), "Loaded notifier config");
        Ok(config)
    }

    /// 应用环境变量覆盖（空值忽略）
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(url) = get("BUILD_NOTIFIER_WEBHOOK_URL") {
            self.webhook_url = Some(url);
        }
        if let Some(channel) = get("BUILD_NOTIFIER_CHANNEL") {
            self.channel = Some(channel);
        }
        if let Some(server) = get("BUILD_NOTIFIER_SERVER_URL") {
            self.preferences.build_server_url = server;
        }
    }
}
