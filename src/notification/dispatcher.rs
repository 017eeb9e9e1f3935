//! 通知分发器 - 将构建生命周期事件转换为消息并发送到所有渠道

use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::changes::ChangeSummarizer;
use super::channel::{BuildColor, NotificationMessage, NotificationSink, SendResult};
use super::classifier::{classify_build, ResultMessageType};
use super::formatter::{MessageFormatter, StartLine};
use crate::build::{BuildHistory, BuildRecord};
use crate::config::NotificationPreferences;
use crate::env::EnvironmentResolver;

/// 构建生命周期事件
#[derive(Debug, Clone, Copy)]
pub enum LifecycleEvent<'a> {
    Started(&'a BuildRecord),
    Completed(&'a BuildRecord),
}

/// 每个渠道的发送结果
pub type DispatchResults = Vec<(String, SendResult)>;

/// 通知分发器
///
/// 只持有不可变配置和渠道，可通过 `Arc` 在线程间共享。
pub struct NotificationDispatcher {
    /// 所有注册的渠道
    channels: Vec<Arc<dyn NotificationSink>>,
    formatter: MessageFormatter,
    summarizer: ChangeSummarizer,
    /// 是否为 dry-run 模式
    dry_run: bool,
}

impl NotificationDispatcher {
    /// 创建新的分发器
    pub fn new(prefs: NotificationPreferences, resolver: Arc<dyn EnvironmentResolver>) -> Self {
        let summarizer = ChangeSummarizer::new(prefs.commit_info_choice);
        Self {
            channels: Vec::new(),
            formatter: MessageFormatter::new(prefs, resolver),
            summarizer,
            dry_run: false,
        }
    }

    /// 设置 dry-run 模式
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// 注册渠道
    pub fn register_channel(&mut self, channel: Arc<dyn NotificationSink>) {
        info!(channel = channel.name(), "Registering notification channel");
        self.channels.push(channel);
    }

    /// 获取已注册的渠道数量
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// 获取已注册的渠道名称
    pub fn channel_names(&self) -> Vec<&str> {
        self.channels.iter().map(|c| c.name()).collect()
    }

    pub fn preferences(&self) -> &NotificationPreferences {
        self.formatter.preferences()
    }

    /// 分发一个生命周期事件
    pub fn dispatch(&self, event: LifecycleEvent<'_>, history: &BuildHistory) -> Result<DispatchResults> {
        match event {
            LifecycleEvent::Started(build) => Ok(self.on_started(build, history)),
            LifecycleEvent::Completed(build) => self.on_completed(build, history),
        }
    }

    /// 构建开始：每个构建最多一条启动通知
    pub fn on_started(&self, build: &BuildRecord, history: &BuildHistory) -> DispatchResults {
        let line = self.start_line(build);
        let text = self.formatter.start_message(build, history, &line, false);

        let color = history
            .previous_completed_build(build)
            .map(|previous| BuildColor::for_result(previous.result))
            .unwrap_or(BuildColor::Good);

        self.publish(&NotificationMessage::new(text, color).for_build(&build.project, build.number))
    }

    /// 非 SCM 原因优先，其次变更摘要，最后通用状态行
    fn start_line(&self, build: &BuildRecord) -> StartLine {
        if !build.causes.is_empty() && !build.causes.iter().any(|c| c.is_scm()) {
            let description = build
                .causes
                .iter()
                .map(|c| c.short_description())
                .find(|d| !d.is_empty());
            if let Some(description) = description {
                return StartLine::Cause(description);
            }
        }

        match self.summarizer.summarize_for_start(build) {
            Some(summary) => StartLine::Changes(summary),
            None => StartLine::Generic,
        }
    }

    /// 构建完成：分类后发送状态消息，按需再发送提交列表
    ///
    /// 上游构建缺失时返回错误，此时状态消息已发送。
    pub fn on_completed(&self, build: &BuildRecord, history: &BuildHistory) -> Result<DispatchResults> {
        let kind = classify_build(build, history, self.preferences());
        if kind == ResultMessageType::NoMessage {
            debug!(
                project = %build.project,
                build = build.number,
                result = ?build.result,
                "Notification suppressed"
            );
            return Ok(Vec::new());
        }

        info!(project = %build.project, build = build.number, kind = %kind, "Build completed");
        let color = BuildColor::for_result(build.result);

        let status = self.formatter.status_message(kind, build, history);
        let mut results =
            self.publish(&NotificationMessage::new(status, color).for_build(&build.project, build.number));

        if self.preferences().commit_info_choice.show_anything() {
            let commits = self.summarizer.commit_list(build, history)?;
            results.extend(
                self.publish(&NotificationMessage::new(commits, color).for_build(&build.project, build.number)),
            );
        }

        Ok(results)
    }

    /// 发送消息到所有渠道，单个渠道失败不影响其他渠道
    fn publish(&self, message: &NotificationMessage) -> DispatchResults {
        let mut results = Vec::new();

        for channel in &self.channels {
            let name = channel.name().to_string();

            if self.dry_run {
                info!(channel = %name, color = %message.color, text = %message.text, "[DRY-RUN] Would publish");
                results.push((name, SendResult::Skipped("dry-run".to_string())));
                continue;
            }

            let result = match channel.publish(message) {
                Ok(SendResult::Failed(reason)) => {
                    warn!(channel = %name, error = %reason, "Channel rejected notification");
                    SendResult::Failed(reason)
                }
                Ok(r) => r,
                Err(e) => {
                    warn!(channel = %name, error = %e, "Channel send failed");
                    SendResult::Failed(e.to_string())
                }
            };

            results.push((name, result));
        }

        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::{BuildResult, Cause, ChangeEntry};
    use crate::config::CommitInfoChoice;
    use crate::env::BuildEnvironmentResolver;
    use chrono::{TimeZone, Utc};
    use std::sync::Mutex;

    /// 测试用的 mock 渠道
    #[derive(Default)]
    struct MockChannel {
        sent: Mutex<Vec<NotificationMessage>>,
    }

    impl MockChannel {
        fn messages(&self) -> Vec<NotificationMessage> {
            self.sent.lock().unwrap().clone()
        }
    }

    impl NotificationSink for MockChannel {
        fn name(&self) -> &str {
            "mock"
        }

        fn publish(&self, message: &NotificationMessage) -> Result<SendResult> {
            self.sent.lock().unwrap().push(message.clone());
            Ok(SendResult::Sent)
        }
    }

    fn dispatcher(prefs: NotificationPreferences) -> (NotificationDispatcher, Arc<MockChannel>) {
        let resolver = Arc::new(BuildEnvironmentResolver::new(""));
        let mut dispatcher = NotificationDispatcher::new(prefs, resolver);
        let channel = Arc::new(MockChannel::default());
        dispatcher.register_channel(channel.clone());
        (dispatcher, channel)
    }

    fn build(number: u64, result: BuildResult) -> BuildRecord {
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        BuildRecord::new("app", number, start).with_result(result)
    }

    #[test]
    fn test_dispatcher_register_channel() {
        let (dispatcher, _) = dispatcher(NotificationPreferences::default());
        assert_eq!(dispatcher.channel_count(), 1);
        assert_eq!(dispatcher.channel_names(), vec!["mock"]);
    }

    #[test]
    fn test_start_with_non_scm_cause_uses_description() {
        let (dispatcher, channel) = dispatcher(NotificationPreferences::default());
        let current = build(2, BuildResult::Success)
            .running()
            .with_cause(Cause::User { name: "alice".into() })
            .with_changes(vec![ChangeEntry::new("bob", "x")]);
        let history = BuildHistory::from_builds(vec![build(1, BuildResult::Failure), current.clone()]);

        dispatcher.on_started(&current, &history);

        let sent = channel.messages();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].text.starts_with("app - #2 Started by user alice (<"));
        assert_eq!(sent[0].color, BuildColor::Danger);
    }

    #[test]
    fn test_start_with_scm_cause_uses_changes() {
        let (dispatcher, channel) = dispatcher(NotificationPreferences::default());
        let current = build(1, BuildResult::Success)
            .running()
            .with_cause(Cause::ScmChange)
            .with_changes(vec![ChangeEntry::new("bob", "x").with_paths(["a", "b"])]);
        let history = BuildHistory::from_builds(vec![current.clone()]);

        dispatcher.on_started(&current, &history);

        let sent = channel.messages();
        assert_eq!(sent[0].text, "app - #1 Started by changes from bob (2 file(s) changed) (<job/app/1/|Open>)");
        assert_eq!(sent[0].color, BuildColor::Good);
    }

    #[test]
    fn test_completed_no_message_publishes_nothing() {
        let (dispatcher, channel) = dispatcher(NotificationPreferences::default());
        let current = build(2, BuildResult::Success);
        let history = BuildHistory::from_builds(vec![build(1, BuildResult::Success), current.clone()]);

        let results = dispatcher.on_completed(&current, &history).unwrap();
        assert!(results.is_empty());
        assert!(channel.messages().is_empty());
    }

    #[test]
    fn test_completed_sends_status_then_commits() {
        let prefs = NotificationPreferences::default().with_commit_info(CommitInfoChoice::AuthorsAndTitles);
        let (dispatcher, channel) = dispatcher(prefs);
        let current = build(2, BuildResult::Failure).with_changes(vec![ChangeEntry::new("bob", "Break it")]);
        let history = BuildHistory::from_builds(vec![build(1, BuildResult::Success), current.clone()]);

        dispatcher.on_completed(&current, &history).unwrap();

        let sent = channel.messages();
        assert_eq!(sent.len(), 2);
        assert!(sent[0].text.starts_with("Build <job/app/2/|#2> of app failed after"));
        assert_eq!(sent[1].text, "app - #2 Changes:\n- Break it [bob]");
        assert!(sent.iter().all(|m| m.color == BuildColor::Danger));
    }

    #[test]
    fn test_dry_run_skips_delivery() {
        let (dispatcher, channel) = dispatcher(NotificationPreferences::default());
        let dispatcher = dispatcher.with_dry_run(true);
        let current = build(1, BuildResult::Failure);
        let history = BuildHistory::from_builds(vec![current.clone()]);

        let results = dispatcher
            .dispatch(LifecycleEvent::Completed(&current), &history)
            .unwrap();
        assert_eq!(results, vec![("mock".to_string(), SendResult::Skipped("dry-run".to_string()))]);
        assert!(channel.messages().is_empty());
    }
}
