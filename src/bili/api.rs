use crate::bili::models::VideoSummary;
use anyhow::Context;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE, COOKIE, REFERER, USER_AGENT};
use serde_json::{json, Value};
use thiserror::Error;

static HTML_TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").unwrap());

#[derive(Debug, Error)]
pub enum BiliError {
    /// Upstream rejected the search; the raw payload is kept so the client
    /// can surface what Bilibili actually said.
    #[error("search failed")]
    SearchRejected { raw: Value },
    #[error("failed to fetch video info")]
    VideoInfoRejected,
    #[error("failed to resolve audio url")]
    NoAudioStream,
    #[error("image request failed: {0}")]
    ImageStatus(u16),
    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),
}

#[derive(Debug, Clone)]
pub struct BiliClient {
    http: reqwest::Client,
    /// Same browser headers, no account cookie. Proxied image hosts are
    /// arbitrary and must never see the credential.
    image_http: reqwest::Client,
    api_base: String,
}

impl BiliClient {
    const API_BASE: &'static str = "https://api.bilibili.com";
    const USER_AGENT_VALUE: &'static str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

    pub fn new(cookie: Option<&str>) -> anyhow::Result<Self> {
        Self::with_api_base(cookie, Self::API_BASE)
    }

    pub fn with_api_base(cookie: Option<&str>, api_base: &str) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(Self::USER_AGENT_VALUE));
        headers.insert(REFERER, HeaderValue::from_static("https://www.bilibili.com"));

        let image_http = reqwest::Client::builder()
            .default_headers(headers.clone())
            .build()
            .context("build image client")?;

        if let Some(cookie) = cookie {
            headers.insert(
                COOKIE,
                HeaderValue::from_str(cookie).context("cookie header value")?,
            );
        }
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .context("build bilibili client")?;

        Ok(Self {
            http,
            image_http,
            api_base: api_base.trim_end_matches('/').to_string(),
        })
    }

    /// Search the music category for short videos, best match first.
    pub async fn search(&self, keyword: &str) -> Result<Vec<VideoSummary>, BiliError> {
        let url = format!(
            "{}/x/web-interface/search/type?keyword={}&search_type=video&order=totalrank&duration=1&tids=3",
            self.api_base,
            urlencoding::encode(keyword)
        );
        let data: Value = self.http.get(&url).send().await?.json().await?;

        if data.get("code").and_then(|c| c.as_i64()) != Some(0) {
            return Err(BiliError::SearchRejected { raw: data });
        }
        let items = match data.pointer("/data/result").and_then(|r| r.as_array()) {
            Some(items) => items,
            None => return Err(BiliError::SearchRejected { raw: data }),
        };

        let videos = items
            .iter()
            .take(20)
            .map(|item| {
                let title_raw = item.get("title").and_then(|t| t.as_str()).unwrap_or("");
                VideoSummary {
                    bvid: item
                        .get("bvid")
                        .and_then(|v| v.as_str())
                        .unwrap_or("")
                        .to_string(),
                    // Search titles come back with <em> markup around the
                    // matched keyword.
                    title: HTML_TAG_RE.replace_all(title_raw, "").into_owned(),
                    author: item
                        .get("author")
                        .and_then(|v| v.as_str())
                        .unwrap_or("")
                        .to_string(),
                    pic: item
                        .get("pic")
                        .and_then(|v| v.as_str())
                        .unwrap_or("")
                        .to_string(),
                    play: item.get("play").cloned().unwrap_or_else(|| json!("0")),
                    danmaku: item
                        .get("video_review")
                        .cloned()
                        .unwrap_or_else(|| json!("0")),
                }
            })
            .collect();
        Ok(videos)
    }

    /// Two hops: view gives the cid, playurl with fnval=16 gives the DASH
    /// streams; the first audio entry is the playable URL.
    pub async fn resolve_audio_url(&self, bvid: &str) -> Result<String, BiliError> {
        let url = format!(
            "{}/x/web-interface/view?bvid={}",
            self.api_base,
            urlencoding::encode(bvid)
        );
        let info: Value = self.http.get(&url).send().await?.json().await?;
        if info.get("code").and_then(|c| c.as_i64()) != Some(0) {
            return Err(BiliError::VideoInfoRejected);
        }
        let cid = info
            .pointer("/data/cid")
            .and_then(|c| c.as_i64())
            .ok_or(BiliError::VideoInfoRejected)?;

        let url = format!(
            "{}/x/player/playurl?bvid={}&cid={}&fnval=16",
            self.api_base,
            urlencoding::encode(bvid),
            cid
        );
        let play: Value = self.http.get(&url).send().await?.json().await?;
        if play.get("code").and_then(|c| c.as_i64()) != Some(0) {
            return Err(BiliError::NoAudioStream);
        }
        play.pointer("/data/dash/audio/0/baseUrl")
            .and_then(|u| u.as_str())
            .map(|s| s.to_string())
            .ok_or(BiliError::NoAudioStream)
    }

    /// Fetch an image on behalf of the browser (cover art hosts refuse
    /// requests without a Bilibili referer).
    pub async fn fetch_image(&self, url: &str) -> Result<(String, Vec<u8>), BiliError> {
        let url = normalize_image_url(url);
        let resp = self.image_http.get(&url).send().await?;
        if resp.status() != reqwest::StatusCode::OK {
            return Err(BiliError::ImageStatus(resp.status().as_u16()));
        }
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("image/jpeg")
            .to_string();
        let body = resp.bytes().await?.to_vec();
        Ok((content_type, body))
    }
}

/// Cover URLs arrive protocol-relative or bare from the search payload.
fn normalize_image_url(url: &str) -> String {
    if let Some(rest) = url.strip_prefix("//") {
        format!("https://{rest}")
    } else if !url.starts_with("http") {
        format!("https://{url}")
    } else {
        url.to_string()
    }
}
