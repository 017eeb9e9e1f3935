//! Slack 标记转义
//!
//! 只转义 `&`、`<`、`>`，顺序固定；已转义的实体会被再次转义。
//! 格式化器自己插入的链接语法 `<url|text>` 不经过这里。

/// 转义用户或仓库来源的文本
pub fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
