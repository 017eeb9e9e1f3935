//! 构建结果分类 - 决定完成事件发送哪种通知
//!
//! 两个分类器：
//! - `classify`: 通知意图（受用户偏好抑制）
//! - `status_word`: 人类可读状态词，BACK_TO_NORMAL 要求项目曾经成功过
//!
//! ABORTED 构建从不作为“上一次结果”，避免打断 失败 → 成功 的转换。

use crate::build::{BuildHistory, BuildRecord, BuildResult};
use crate::config::NotificationPreferences;

/// 通知意图
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultMessageType {
    Aborted,
    Success,
    BackToNormal,
    Failure,
    RepeatedFailure,
    NotBuilt,
    Unstable,
    NoMessage,
}

impl ResultMessageType {
    /// 状态消息中的动词
    pub fn verb(&self) -> &'static str {
        match self {
            ResultMessageType::Success | ResultMessageType::BackToNormal => "passed",
            ResultMessageType::Failure | ResultMessageType::RepeatedFailure => "failed",
            ResultMessageType::Aborted => "aborted",
            ResultMessageType::NotBuilt => "failed to build",
            ResultMessageType::Unstable => "is unstable",
            ResultMessageType::NoMessage => "something weird happened",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ResultMessageType::Aborted => "ABORTED",
            ResultMessageType::Success => "SUCCESS",
            ResultMessageType::BackToNormal => "BACK_TO_NORMAL",
            ResultMessageType::Failure => "FAILURE",
            ResultMessageType::RepeatedFailure => "REPEATED_FAILURE",
            ResultMessageType::NotBuilt => "NOT_BUILT",
            ResultMessageType::Unstable => "UNSTABLE",
            ResultMessageType::NoMessage => "NO_MESSAGE",
        }
    }
}

impl std::fmt::Display for ResultMessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 人类可读状态词
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusWord {
    Starting,
    BackToNormal,
    StillFailing,
    Success,
    Failure,
    Aborted,
    NotBuilt,
    Unstable,
    Unknown,
}

impl StatusWord {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusWord::Starting => "Starting...",
            StatusWord::BackToNormal => "Back to normal",
            StatusWord::StillFailing => "Still Failing",
            StatusWord::Success => "Success",
            StatusWord::Failure => "Failure",
            StatusWord::Aborted => "Aborted",
            StatusWord::NotBuilt => "Not built",
            StatusWord::Unstable => "Unstable",
            StatusWord::Unknown => "Unknown",
        }
    }
}

impl std::fmt::Display for StatusWord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 沿 previous-completed 链回溯，跳过 ABORTED；链结束时默认 SUCCESS
pub fn effective_previous_result(build: &BuildRecord, history: &BuildHistory) -> BuildResult {
    let mut previous = history.previous_completed_build(build);
    while let Some(candidate) = previous {
        if candidate.result != Some(BuildResult::Aborted) {
            break;
        }
        previous = history.previous_completed_build(candidate);
    }
    previous
        .and_then(|b| b.result)
        .unwrap_or(BuildResult::Success)
}

/// 按规则顺序分类，首个匹配生效
pub fn classify(
    result: Option<BuildResult>,
    previous: BuildResult,
    prefs: &NotificationPreferences,
) -> ResultMessageType {
    use BuildResult::*;

    match result {
        Some(Aborted) if prefs.notify_aborted => ResultMessageType::Aborted,
        Some(Failure) if previous != Failure && prefs.notify_failure => ResultMessageType::Failure,
        Some(Failure) if prefs.notify_repeated_failure => ResultMessageType::RepeatedFailure,
        Some(NotBuilt) if prefs.notify_not_built => ResultMessageType::NotBuilt,
        Some(Success)
            if matches!(previous, Failure | Unstable) && prefs.notify_back_to_normal =>
        {
            ResultMessageType::BackToNormal
        }
        Some(Success) if prefs.notify_success => ResultMessageType::Success,
        Some(Unstable) if prefs.notify_unstable => ResultMessageType::Unstable,
        _ => ResultMessageType::NoMessage,
    }
}

/// 完成事件的分类入口
pub fn classify_build(
    build: &BuildRecord,
    history: &BuildHistory,
    prefs: &NotificationPreferences,
) -> ResultMessageType {
    classify(build.result, effective_previous_result(build, history), prefs)
}

/// 计算状态词
///
/// 与 `classify` 不同：沿 previous 链（含运行中的构建）回溯，
/// 且 BACK_TO_NORMAL 只在此前有过成功构建时出现。
pub fn status_word(build: &BuildRecord, history: &BuildHistory) -> StatusWord {
    use BuildResult::*;

    if build.building {
        return StatusWord::Starting;
    }

    let mut previous = history.previous_build(build);
    while let Some(candidate) = previous {
        if candidate.result != Some(Aborted) {
            break;
        }
        previous = history.previous_build(candidate);
    }
    // 运行中的上一构建没有结果，视为 SUCCESS
    let previous_result = previous.and_then(|b| b.result).unwrap_or(Success);
    let has_succeeded_before = history.previous_successful_build(build).is_some();

    match build.result {
        Some(Success)
            if matches!(previous_result, Failure | Unstable) && has_succeeded_before =>
        {
            StatusWord::BackToNormal
        }
        Some(Failure) if previous_result == Failure => StatusWord::StillFailing,
        Some(Success) => StatusWord::Success,
        Some(Failure) => StatusWord::Failure,
        Some(Aborted) => StatusWord::Aborted,
        Some(NotBuilt) => StatusWord::NotBuilt,
        Some(Unstable) => StatusWord::Unstable,
        None => StatusWord::Unknown,
    }
}
