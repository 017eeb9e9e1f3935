//! 环境变量解析 - 用于展开自定义消息模板
//!
//! 模板支持 `$NAME` 和 `${NAME}`；未知变量原样保留。

use anyhow::Result;
use regex::{Captures, Regex};
use std::collections::HashMap;
use std::sync::OnceLock;

use crate::build::BuildRecord;

fn var_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_.]*)\}|\$([A-Za-z_][A-Za-z0-9_]*)")
            .expect("valid variable pattern")
    })
}

/// 变量集合
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvVars {
    vars: HashMap<String, String>,
}

impl EnvVars {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// 展开模板中的变量引用
    pub fn expand(&self, template: &str) -> String {
        var_pattern()
            .replace_all(template, |caps: &Captures| {
                let name = caps
                    .get(1)
                    .or_else(|| caps.get(2))
                    .map(|m| m.as_str())
                    .unwrap_or_default();
                match self.vars.get(name) {
                    Some(value) => value.clone(),
                    None => caps[0].to_string(),
                }
            })
            .into_owned()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for EnvVars {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

/// 环境解析器 - 为一次构建生成模板变量，可能失败
pub trait EnvironmentResolver: Send + Sync {
    fn resolve(&self, build: &BuildRecord) -> Result<EnvVars>;
}

/// 基于构建记录的解析器
///
/// 提供 `BUILD_NUMBER`、`BUILD_DISPLAY_NAME`、`JOB_NAME`、`BUILD_URL`，
/// 可选合并进程环境，构建变量优先级最高。
#[derive(Debug, Clone, Default)]
pub struct BuildEnvironmentResolver {
    build_server_url: String,
    include_process_env: bool,
}

impl BuildEnvironmentResolver {
    pub fn new(build_server_url: impl Into<String>) -> Self {
        Self {
            build_server_url: build_server_url.into(),
            include_process_env: false,
        }
    }

    /// 是否合并当前进程的环境变量
    pub fn with_process_env(mut self, include: bool) -> Self {
        self.include_process_env = include;
        self
    }
}

impl EnvironmentResolver for BuildEnvironmentResolver {
    fn resolve(&self, build: &BuildRecord) -> Result<EnvVars> {
        let mut env = EnvVars::new();
        if self.include_process_env {
            for (key, value) in std::env::vars() {
                env.insert(key, value);
            }
        }
        env.insert("BUILD_NUMBER", build.number.to_string());
        env.insert("BUILD_DISPLAY_NAME", build.display_name());
        env.insert("JOB_NAME", build.project.clone());
        env.insert("BUILD_URL", format!("{}{}", self.build_server_url, build.url));
        for (key, value) in &build.variables {
            env.insert(key.clone(), value.clone());
        }
        Ok(env)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_expand_both_forms() {
        let env: EnvVars = [("JOB_NAME", "app"), ("BUILD_NUMBER", "7")].into_iter().collect();
        assert_eq!(env.expand("$JOB_NAME #${BUILD_NUMBER}"), "app #7");
    }

    #[test]
    fn test_expand_leaves_unknown_untouched() {
        let env = EnvVars::new();
        assert_eq!(env.expand("deploy $TARGET to ${REGION}"), "deploy $TARGET to ${REGION}");
        assert_eq!(env.expand("costs $5"), "costs $5");
    }

    #[test]
    fn test_build_resolver_prefers_build_variables() {
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        let build = BuildRecord::new("app", 9, start).with_variable("JOB_NAME", "overridden");
        let env = BuildEnvironmentResolver::new("https://ci/").resolve(&build).unwrap();

        assert_eq!(env.get("BUILD_NUMBER"), Some("9"));
        assert_eq!(env.get("BUILD_URL"), Some("https://ci/job/app/9/"));
        assert_eq!(env.get("JOB_NAME"), Some("overridden"));
    }
}
