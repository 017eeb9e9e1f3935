//! 构建历史快照 - 派生 previous / previous-completed / previous-successful 链接
//!
//! 链接按构建号严格递减，因此链必然更早、无环并以 `None` 结束。

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use super::{BuildRecord, BuildResult};

/// 所有项目的构建快照
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BuildHistory {
    builds: Vec<BuildRecord>,
}

impl BuildHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_builds(builds: Vec<BuildRecord>) -> Self {
        Self { builds }
    }

    /// 从 JSON 文件加载
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read build history {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Invalid build history {}", path.display()))
    }

    /// 添加或替换构建（按项目 + 构建号）
    pub fn insert(&mut self, build: BuildRecord) {
        self.builds
            .retain(|b| !(b.project == build.project && b.number == build.number));
        self.builds.push(build);
    }

    pub fn get(&self, project: &str, number: u64) -> Option<&BuildRecord> {
        self.builds
            .iter()
            .find(|b| b.project == project && b.number == number)
    }

    pub fn len(&self) -> usize {
        self.builds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.builds.is_empty()
    }

    /// 项目的最新构建
    pub fn last_build(&self, project: &str) -> Option<&BuildRecord> {
        self.builds
            .iter()
            .filter(|b| b.project == project)
            .max_by_key(|b| b.number)
    }

    /// 同项目中构建号更小且满足条件的最新构建
    fn newest_before<F>(&self, build: &BuildRecord, pred: F) -> Option<&BuildRecord>
    where
        F: Fn(&BuildRecord) -> bool,
    {
        self.builds
            .iter()
            .filter(|b| b.project == build.project && b.number < build.number)
            .filter(|b| pred(b))
            .max_by_key(|b| b.number)
    }

    pub fn previous_build(&self, build: &BuildRecord) -> Option<&BuildRecord> {
        self.newest_before(build, |_| true)
    }

    pub fn previous_completed_build(&self, build: &BuildRecord) -> Option<&BuildRecord> {
        self.newest_before(build, |b| !b.building)
    }

    pub fn previous_successful_build(&self, build: &BuildRecord) -> Option<&BuildRecord> {
        self.newest_before(build, |b| b.result == Some(BuildResult::Success))
    }
}
