//! 构建数据模型 - 由宿主作业系统提供，本 crate 只读
//!
//! - `BuildRecord`: 一次构建执行
//! - `BuildHistory`: 所有项目的构建快照，派生 previous 链接
//! - `duration`: 人类可读的时间跨度

pub mod duration;
pub mod history;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub use duration::time_span_string;
pub use history::BuildHistory;

/// 构建结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BuildResult {
    Success,
    Failure,
    Unstable,
    Aborted,
    NotBuilt,
}

impl BuildResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildResult::Success => "SUCCESS",
            BuildResult::Failure => "FAILURE",
            BuildResult::Unstable => "UNSTABLE",
            BuildResult::Aborted => "ABORTED",
            BuildResult::NotBuilt => "NOT_BUILT",
        }
    }
}

impl std::fmt::Display for BuildResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 构建触发原因
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Cause {
    /// SCM 轮询/推送触发
    ScmChange,
    /// 上游构建触发
    Upstream { project: String, build: u64 },
    /// 用户手动触发
    User { name: String },
    /// 定时触发
    Timer,
    /// 远程 API 触发
    Remote {
        host: String,
        #[serde(default)]
        note: Option<String>,
    },
    /// 其他插件提供的原因
    Other {
        #[serde(default)]
        description: String,
    },
}

impl Cause {
    /// 简短描述（可能为空）
    pub fn short_description(&self) -> String {
        match self {
            Cause::ScmChange => "Started by an SCM change".to_string(),
            Cause::Upstream { project, build } => {
                format!("Started by upstream project \"{}\" build number {}", project, build)
            }
            Cause::User { name } => format!("Started by user {}", name),
            Cause::Timer => "Started by timer".to_string(),
            Cause::Remote { host, note } => match note {
                Some(note) if !note.is_empty() => {
                    format!("Started by remote host {} with note: {}", host, note)
                }
                _ => format!("Started by remote host {}", host),
            },
            Cause::Other { description } => description.clone(),
        }
    }

    pub fn is_scm(&self) -> bool {
        matches!(self, Cause::ScmChange)
    }
}

/// 变更集中的单条提交
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEntry {
    /// 作者显示名
    pub author: String,
    /// 提交信息
    #[serde(default)]
    pub message: String,
    /// 受影响的文件路径
    #[serde(default)]
    pub affected_paths: Vec<String>,
}

impl ChangeEntry {
    pub fn new(author: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            author: author.into(),
            message: message.into(),
            affected_paths: Vec::new(),
        }
    }

    pub fn with_paths<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.affected_paths = paths.into_iter().map(Into::into).collect();
        self
    }
}

/// 变更集（有序，可为空）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangeSet {
    pub entries: Vec<ChangeEntry>,
}

impl ChangeSet {
    pub fn new(entries: Vec<ChangeEntry>) -> Self {
        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// 测试结果汇总
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestSummary {
    pub total: u32,
    pub failed: u32,
    pub skipped: u32,
}

impl TestSummary {
    pub fn passed(&self) -> u32 {
        self.total.saturating_sub(self.failed).saturating_sub(self.skipped)
    }
}

/// 一次构建执行
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildRecord {
    /// 构建号
    pub number: u64,
    /// 显示名（默认 `#<number>`）
    #[serde(default)]
    pub display_name: String,
    /// 项目完整显示名
    pub project: String,
    /// 开始时间
    pub start_time: DateTime<Utc>,
    /// 持续时间（毫秒），运行中的构建为已耗时
    #[serde(default)]
    pub duration_ms: u64,
    /// 是否仍在运行
    #[serde(default)]
    pub building: bool,
    /// 结果，`None` 表示未知或进行中
    #[serde(default)]
    pub result: Option<BuildResult>,
    /// 构建变量
    #[serde(default)]
    pub variables: HashMap<String, String>,
    /// 触发原因
    #[serde(default)]
    pub causes: Vec<Cause>,
    /// 测试汇总
    #[serde(default)]
    pub test_summary: Option<TestSummary>,
    /// 相对于构建服务器的 URL 后缀
    #[serde(default)]
    pub url: String,
    /// 变更集，`None` 表示未计算
    #[serde(default)]
    pub change_set: Option<ChangeSet>,
}

impl BuildRecord {
    pub fn new(project: impl Into<String>, number: u64, start_time: DateTime<Utc>) -> Self {
        let project = project.into();
        let url = format!("job/{}/{}/", project, number);
        Self {
            number,
            display_name: format!("#{}", number),
            project,
            start_time,
            duration_ms: 0,
            building: false,
            result: None,
            variables: HashMap::new(),
            causes: Vec::new(),
            test_summary: None,
            url,
            change_set: None,
        }
    }

    pub fn with_result(mut self, result: BuildResult) -> Self {
        self.result = Some(result);
        self.building = false;
        self
    }

    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    pub fn running(mut self) -> Self {
        self.building = true;
        self.result = None;
        self
    }

    pub fn with_cause(mut self, cause: Cause) -> Self {
        self.causes.push(cause);
        self
    }

    pub fn with_changes(mut self, entries: Vec<ChangeEntry>) -> Self {
        self.change_set = Some(ChangeSet::new(entries));
        self
    }

    pub fn with_variable(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.insert(key.into(), value.into());
        self
    }

    pub fn with_test_summary(mut self, total: u32, failed: u32, skipped: u32) -> Self {
        self.test_summary = Some(TestSummary { total, failed, skipped });
        self
    }

    /// 显示名，反序列化时缺省则回退到 `#<number>`
    pub fn display_name(&self) -> String {
        if self.display_name.is_empty() {
            format!("#{}", self.number)
        } else {
            self.display_name.clone()
        }
    }

    /// 结束时间 = 开始时间 + 持续时间，超出时间范围时为 None
    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        let duration = Duration::milliseconds(i64::try_from(self.duration_ms).ok()?);
        self.start_time.checked_add_signed(duration)
    }

    /// 变更条目（未计算时为空）
    pub fn changes(&self) -> &[ChangeEntry] {
        self.change_set
            .as_ref()
            .map(|c| c.entries.as_slice())
            .unwrap_or(&[])
    }

    /// 第一个上游构建原因
    pub fn upstream_cause(&self) -> Option<(&str, u64)> {
        self.causes.iter().find_map(|c| match c {
            Cause::Upstream { project, build } => Some((project.as_str(), *build)),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_cause_descriptions() {
        assert_eq!(Cause::ScmChange.short_description(), "Started by an SCM change");
        assert_eq!(
            Cause::Upstream { project: "core".into(), build: 7 }.short_description(),
            "Started by upstream project \"core\" build number 7"
        );
        assert_eq!(
            Cause::User { name: "alice".into() }.short_description(),
            "Started by user alice"
        );
        assert_eq!(
            Cause::Remote { host: "10.0.0.1".into(), note: Some("nightly".into()) }.short_description(),
            "Started by remote host 10.0.0.1 with note: nightly"
        );
        assert_eq!(Cause::Other { description: String::new() }.short_description(), "");
    }

    #[test]
    fn test_end_time_adds_duration() {
        let build = BuildRecord::new("app", 1, t0()).with_duration_ms(90_000);
        assert_eq!(build.end_time(), Some(Utc.with_ymd_and_hms(2024, 5, 1, 12, 1, 30).unwrap()));
    }

    #[test]
    fn test_end_time_out_of_range_is_none() {
        assert_eq!(BuildRecord::new("app", 1, t0()).with_duration_ms(1 << 62).end_time(), None);
        assert_eq!(BuildRecord::new("app", 1, t0()).with_duration_ms(u64::MAX).end_time(), None);
    }

    #[test]
    fn test_display_name_fallback() {
        let mut build = BuildRecord::new("app", 12, t0());
        build.display_name.clear();
        assert_eq!(build.display_name(), "#12");
    }

    #[test]
    fn test_test_summary_passed_saturates() {
        let summary = TestSummary { total: 3, failed: 2, skipped: 4 };
        assert_eq!(summary.passed(), 0);
    }

    #[test]
    fn test_deserialize_minimal_record() {
        let json = r#"{
            "number": 3,
            "project": "app",
            "start_time": "2024-05-01T12:00:00Z",
            "result": "NOT_BUILT",
            "causes": [{"type": "upstream", "project": "core", "build": 9}],
            "change_set": [{"author": "bob", "message": "fix", "affected_paths": ["a.rs"]}]
        }"#;
        let build: BuildRecord = serde_json::from_str(json).unwrap();
        assert_eq!(build.result, Some(BuildResult::NotBuilt));
        assert_eq!(build.upstream_cause(), Some(("core", 9)));
        assert_eq!(build.changes().len(), 1);
        assert_eq!(build.display_name(), "#3");
    }
}
