use serde::Serialize;
use serde_json::Value;

/// One search hit, trimmed down to what the web client renders.
/// `play` and `danmaku` are passed through as-is; Bilibili returns them
/// as numbers or strings depending on the endpoint mood.
#[derive(Debug, Clone, Serialize)]
pub struct VideoSummary {
    pub bvid: String,
    pub title: String,
    pub author: String,
    pub pic: String,
    pub play: Value,
    pub danmaku: Value,
}
