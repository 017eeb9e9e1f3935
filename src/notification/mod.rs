//! 构建通知 - 分类、格式化并分发构建生命周期消息
//!
//! # 流程
//! 生命周期事件 → `NotificationDispatcher` → `classify_build`（仅完成事件）
//! → `MessageFormatter` → `NotificationSink::publish`
//!
//! # 使用示例
//! ```ignore
//! use build_notifier::notification::{LifecycleEvent, NotificationDispatcher};
//!
//! let mut dispatcher = NotificationDispatcher::new(prefs, resolver);
//! dispatcher.register_channel(slack);
//! dispatcher.dispatch(LifecycleEvent::Completed(&build), &history)?;
//! ```

pub mod changes;
pub mod channel;
pub mod channels;
pub mod classifier;
pub mod dispatcher;
pub mod escape;
pub mod formatter;

pub use changes::{ChangeSummarizer, NO_CHANGES};
pub use channel::{BuildColor, NotificationMessage, NotificationSink, SendResult};
pub use classifier::{
    classify, classify_build, effective_previous_result, status_word, ResultMessageType, StatusWord,
};
pub use dispatcher::{DispatchResults, LifecycleEvent, NotificationDispatcher};
pub use escape::escape;
pub use formatter::{message_prefix, pr_vars, MessageFormatter, StartLine};
