//! 具体渠道实现

pub mod local_file;
pub mod slack;

pub use local_file::LocalFileChannel;
pub use slack::{SlackConfig, SlackWebhookChannel};
