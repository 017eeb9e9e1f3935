//! 通知渠道 trait 定义

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::build::BuildResult;

/// 附件颜色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildColor {
    Good,
    Danger,
    Warning,
}

impl BuildColor {
    /// SUCCESS → good，FAILURE → danger，其他（含未知）→ warning
    pub fn for_result(result: Option<BuildResult>) -> Self {
        match result {
            Some(BuildResult::Success) => BuildColor::Good,
            Some(BuildResult::Failure) => BuildColor::Danger,
            _ => BuildColor::Warning,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BuildColor::Good => "good",
            BuildColor::Danger => "danger",
            BuildColor::Warning => "warning",
        }
    }
}

impl std::fmt::Display for BuildColor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 通知消息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationMessage {
    /// 消息内容（已格式化、已转义）
    pub text: String,
    /// 附件颜色
    pub color: BuildColor,
    /// 项目名（用于日志和本地记录）
    pub project: Option<String>,
    /// 构建号
    pub build: Option<u64>,
}

impl NotificationMessage {
    pub fn new(text: impl Into<String>, color: BuildColor) -> Self {
        Self {
            text: text.into(),
            color,
            project: None,
            build: None,
        }
    }

    /// 设置来源构建
    pub fn for_build(mut self, project: impl Into<String>, build: u64) -> Self {
        self.project = Some(project.into());
        self.build = Some(build);
        self
    }
}

/// 发送结果
#[derive(Debug, Clone, PartialEq)]
pub enum SendResult {
    /// 发送成功
    Sent,
    /// 跳过（dry-run 等）
    Skipped(String),
    /// 发送失败
    Failed(String),
}

/// 通知渠道 - 投递格式化后的文本，重试由渠道自己负责
pub trait NotificationSink: Send + Sync {
    /// 渠道名称（用于日志）
    fn name(&self) -> &str;

    /// 发送消息
    fn publish(&self, message: &NotificationMessage) -> Result<SendResult>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_for_result() {
        assert_eq!(BuildColor::for_result(Some(BuildResult::Success)), BuildColor::Good);
        assert_eq!(BuildColor::for_result(Some(BuildResult::Failure)), BuildColor::Danger);
        assert_eq!(BuildColor::for_result(Some(BuildResult::Unstable)), BuildColor::Warning);
        assert_eq!(BuildColor::for_result(Some(BuildResult::Aborted)), BuildColor::Warning);
        assert_eq!(BuildColor::for_result(None), BuildColor::Warning);
    }

    #[test]
    fn test_message_serializes_color_lowercase() {
        let msg = NotificationMessage::new("hi", BuildColor::Danger).for_build("app", 3);
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["color"], "danger");
        assert_eq!(json["build"], 3);
    }
}
