//! Build Notifier - 构建生命周期的 Slack 通知

pub mod build;
pub mod config;
pub mod env;
pub mod notification;

pub use build::{BuildHistory, BuildRecord, BuildResult, Cause, ChangeEntry, ChangeSet, TestSummary};
pub use config::{CommitInfoChoice, NotificationPreferences, NotifierConfig};
pub use env::{BuildEnvironmentResolver, EnvVars, EnvironmentResolver};
pub use notification::{
    BuildColor, LifecycleEvent, NotificationDispatcher, NotificationMessage, NotificationSink,
    ResultMessageType, SendResult,
};
