//! 变更摘要 - 启动消息的“N 个文件由谁修改”和完成后的提交列表
//!
//! 构建自身没有变更时，提交列表回退到上游构建（只看第一个上游原因）。

use anyhow::{anyhow, Result};
use std::collections::HashSet;
use tracing::{debug, info, warn};

use super::escape::escape;
use super::formatter::message_prefix;
use crate::build::{BuildHistory, BuildRecord};
use crate::config::CommitInfoChoice;

/// 构建没有变更且没有上游原因时的提交列表
pub const NO_CHANGES: &str = "No Changes.";

/// 变更摘要器
#[derive(Debug, Clone, Copy)]
pub struct ChangeSummarizer {
    commit_info: CommitInfoChoice,
}

impl ChangeSummarizer {
    pub fn new(commit_info: CommitInfoChoice) -> Self {
        Self { commit_info }
    }

    /// 启动消息摘要，变更集为空时返回 None
    ///
    /// 文件数为所有条目受影响路径的并集大小，跨条目重复的路径只计一次。
    pub fn summarize_for_start(&self, build: &BuildRecord) -> Option<String> {
        let entries = build.changes();
        if entries.is_empty() {
            debug!(project = %build.project, build = build.number, "Empty change set");
            return None;
        }

        let mut authors: Vec<&str> = Vec::new();
        let mut files: HashSet<&str> = HashSet::new();
        for entry in entries {
            debug!(author = %entry.author, message = %entry.message, "Change entry");
            if !authors.contains(&entry.author.as_str()) {
                authors.push(&entry.author);
            }
            files.extend(entry.affected_paths.iter().map(String::as_str));
        }

        Some(format!(
            "Started by changes from {} ({} file(s) changed)",
            authors.join(", "),
            files.len()
        ))
    }

    /// 单条提交的展示文本
    fn render_entry(&self, message: &str, author: &str) -> String {
        let mut commit = String::new();
        if self.commit_info.show_title() {
            commit.push_str(message);
        }
        if self.commit_info.show_author() {
            commit.push_str(&format!(" [{}]", author));
        }
        commit
    }

    /// 提交列表（带消息前缀，已转义）；没有变更也没有上游原因时为 `No Changes.`
    ///
    /// 渲染结果相同的提交合并为一条，保留首次出现的顺序。
    /// 上游构建在历史中不存在时返回错误；上游链回到已访问过的构建时返回 `No Changes.`。
    pub fn commit_list(&self, build: &BuildRecord, history: &BuildHistory) -> Result<String> {
        let mut visited = HashSet::new();
        self.commit_list_from(build, history, &mut visited)
    }

    fn commit_list_from<'a>(
        &self,
        build: &'a BuildRecord,
        history: &'a BuildHistory,
        visited: &mut HashSet<(&'a str, u64)>,
    ) -> Result<String> {
        visited.insert((build.project.as_str(), build.number));

        let entries = build.changes();
        if entries.is_empty() {
            info!(project = %build.project, build = build.number, "No changes in build");
            let Some((project, number)) = build.upstream_cause() else {
                return Ok(NO_CHANGES.to_string());
            };
            if visited.contains(&(project, number)) {
                warn!(upstream = %project, build = number, "Upstream cause loops back, stopping");
                return Ok(NO_CHANGES.to_string());
            }
            let upstream = history.get(project, number).ok_or_else(|| {
                anyhow!("Upstream build {} #{} not found in history", project, number)
            })?;
            debug!(upstream = %project, build = number, "Using upstream changes");
            return self.commit_list_from(upstream, history, visited);
        }

        let mut commits: Vec<String> = Vec::new();
        for entry in entries {
            let commit = self.render_entry(&entry.message, &entry.author);
            if !commits.contains(&commit) {
                commits.push(commit);
            }
        }

        Ok(format!(
            "{}{}",
            message_prefix(build),
            escape(&format!("Changes:\n- {}", commits.join("\n- ")))
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::{BuildResult, Cause, ChangeEntry};
    use chrono::{TimeZone, Utc};

    fn build(project: &str, number: u64) -> BuildRecord {
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        BuildRecord::new(project, number, start).with_result(BuildResult::Success)
    }

    #[test]
    fn test_start_summary_counts_union_of_files() {
        let b = build("app", 1).with_changes(vec![
            ChangeEntry::new("alice", "one").with_paths(["src/a.rs", "src/b.rs"]),
            ChangeEntry::new("bob", "two").with_paths(["src/b.rs", "README.md"]),
            ChangeEntry::new("alice", "three").with_paths(["src/a.rs"]),
        ]);

        let summary = ChangeSummarizer::new(CommitInfoChoice::None).summarize_for_start(&b);
        assert_eq!(
            summary.as_deref(),
            Some("Started by changes from alice, bob (3 file(s) changed)")
        );
    }

    #[test]
    fn test_start_summary_none_without_changes() {
        let summarizer = ChangeSummarizer::new(CommitInfoChoice::None);
        assert!(summarizer.summarize_for_start(&build("app", 1)).is_none());
        assert!(summarizer
            .summarize_for_start(&build("app", 1).with_changes(vec![]))
            .is_none());
    }

    #[test]
    fn test_commit_list_titles_and_authors_escaped() {
        let b = build("app", 2).with_changes(vec![
            ChangeEntry::new("alice", "Fix <script> & stuff"),
            ChangeEntry::new("bob", "Bump deps"),
        ]);
        let history = BuildHistory::from_builds(vec![b.clone()]);

        let list = ChangeSummarizer::new(CommitInfoChoice::AuthorsAndTitles)
            .commit_list(&b, &history)
            .unwrap();
        assert_eq!(
            list,
            "app - #2 Changes:\n- Fix &lt;script&gt; &amp; stuff [alice]\n- Bump deps [bob]"
        );
    }

    #[test]
    fn test_commit_list_authors_only_collapses_duplicates() {
        let b = build("app", 2).with_changes(vec![
            ChangeEntry::new("alice", "one"),
            ChangeEntry::new("bob", "two"),
            ChangeEntry::new("alice", "three"),
        ]);
        let history = BuildHistory::from_builds(vec![b.clone()]);

        let list = ChangeSummarizer::new(CommitInfoChoice::Authors)
            .commit_list(&b, &history)
            .unwrap();
        assert_eq!(list, "app - #2 Changes:\n-  [alice]\n-  [bob]");
    }

    #[test]
    fn test_commit_list_without_changes_or_upstream() {
        let b = build("app", 3).with_cause(Cause::User { name: "alice".into() });
        let history = BuildHistory::from_builds(vec![b.clone()]);

        let list = ChangeSummarizer::new(CommitInfoChoice::AuthorsAndTitles)
            .commit_list(&b, &history)
            .unwrap();
        assert_eq!(list, "No Changes.");
    }

    #[test]
    fn test_commit_list_falls_back_to_upstream() {
        let upstream = build("core", 41).with_changes(vec![ChangeEntry::new("carol", "Refactor parser")]);
        let downstream = build("app", 4).with_cause(Cause::Upstream { project: "core".into(), build: 41 });
        let history = BuildHistory::from_builds(vec![upstream, downstream.clone()]);

        let list = ChangeSummarizer::new(CommitInfoChoice::AuthorsAndTitles)
            .commit_list(&downstream, &history)
            .unwrap();
        assert_eq!(list, "core - #41 Changes:\n- Refactor parser [carol]");
    }

    #[test]
    fn test_commit_list_self_upstream_stops() {
        let b = build("app", 4).with_cause(Cause::Upstream { project: "app".into(), build: 4 });
        let history = BuildHistory::from_builds(vec![b.clone()]);

        let list = ChangeSummarizer::new(CommitInfoChoice::Authors)
            .commit_list(&b, &history)
            .unwrap();
        assert_eq!(list, NO_CHANGES);
    }

    #[test]
    fn test_commit_list_mutual_upstream_stops() {
        let a = build("app", 4).with_cause(Cause::Upstream { project: "lib".into(), build: 9 });
        let b = build("lib", 9).with_cause(Cause::Upstream { project: "app".into(), build: 4 });
        let history = BuildHistory::from_builds(vec![a.clone(), b]);

        let list = ChangeSummarizer::new(CommitInfoChoice::Authors)
            .commit_list(&a, &history)
            .unwrap();
        assert_eq!(list, NO_CHANGES);
    }

    #[test]
    fn test_commit_list_follows_upstream_chain() {
        let core = build("core", 1).with_changes(vec![ChangeEntry::new("carol", "Tune cache")]);
        let lib = build("lib", 2).with_cause(Cause::Upstream { project: "core".into(), build: 1 });
        let app = build("app", 3).with_cause(Cause::Upstream { project: "lib".into(), build: 2 });
        let history = BuildHistory::from_builds(vec![core, lib, app.clone()]);

        let list = ChangeSummarizer::new(CommitInfoChoice::AuthorsAndTitles)
            .commit_list(&app, &history)
            .unwrap();
        assert_eq!(list, "core - #1 Changes:\n- Tune cache [carol]");
    }

    #[test]
    fn test_commit_list_missing_upstream_is_error() {
        let downstream = build("app", 4).with_cause(Cause::Upstream { project: "core".into(), build: 41 });
        let history = BuildHistory::from_builds(vec![downstream.clone()]);

        let err = ChangeSummarizer::new(CommitInfoChoice::Authors)
            .commit_list(&downstream, &history)
            .unwrap_err();
        assert!(err.to_string().contains("core #41"));
    }
}
