//! 本地文件渠道 - 将所有通知追加写入 JSONL 文件

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::notification::channel::{BuildColor, NotificationMessage, NotificationSink, SendResult};

/// 通知记录（JSONL 格式）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationRecord {
    /// ISO8601 时间戳
    pub ts: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build: Option<u64>,
    pub color: BuildColor,
    pub text: String,
}

/// 本地文件渠道
pub struct LocalFileChannel {
    path: PathBuf,
}

impl LocalFileChannel {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 追加一条记录（带文件锁）
    fn append(&self, record: &NotificationRecord) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open {}", self.path.display()))?;

        file.lock_exclusive()?;
        let mut file = file;
        writeln!(file, "{}", serde_json::to_string(record)?)?;
        file.unlock()?;
        Ok(())
    }
}

impl NotificationSink for LocalFileChannel {
    fn name(&self) -> &str {
        "local_file"
    }

    fn publish(&self, message: &NotificationMessage) -> Result<SendResult> {
        let record = NotificationRecord {
            ts: Utc::now(),
            project: message.project.clone(),
            build: message.build,
            color: message.color,
            text: message.text.clone(),
        };

        match self.append(&record) {
            Ok(()) => {
                debug!(channel = "local_file", path = %self.path.display(), "Notification recorded");
                Ok(SendResult::Sent)
            }
            Err(e) => Ok(SendResult::Failed(e.to_string())),
        }
    }
}
