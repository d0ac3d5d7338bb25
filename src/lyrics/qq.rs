//! QQ Music lyrics API client.
//!
//! Two unauthenticated endpoints: song search resolves a `songmid`, the
//! lyric endpoint turns it into LRC text. Both want a y.qq.com referer.

use reqwest::header::REFERER;
use serde_json::Value;

use crate::lyrics::LyricsError;

#[derive(Debug, Clone)]
pub struct QqMusicClient {
    client: reqwest::Client,
    base_url: String,
}

impl QqMusicClient {
    const DEFAULT_BASE_URL: &'static str = "https://c.y.qq.com";
    const USER_AGENT: &'static str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

    pub fn new() -> Self {
        Self::with_base_url(Self::DEFAULT_BASE_URL)
    }

    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent(Self::USER_AGENT)
                .timeout(std::time::Duration::from_secs(10))
                .build()
                .expect("failed to create reqwest client"),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Search by cleaned title and take the first hit's `mid`.
    pub async fn search_song_mid(&self, title: &str) -> Result<String, LyricsError> {
        let url = format!(
            "{}/soso/fcgi-bin/client_search_cp?w={}&format=json&p=1&n=20&aggr=1&lossless=1&cr=1&new_json=1",
            self.base_url,
            urlencoding::encode(title)
        );
        let resp = self
            .client
            .get(&url)
            .header(REFERER, "https://y.qq.com")
            .send()
            .await?;
        if resp.status() != reqwest::StatusCode::OK {
            return Err(LyricsError::SearchFailed);
        }

        let data: Value = resp.json().await?;
        let first = match data.pointer("/data/song/list").and_then(|l| l.as_array()) {
            Some(list) if !list.is_empty() => &list[0],
            _ => return Err(LyricsError::SongNotFound),
        };
        first
            .get("mid")
            .and_then(|m| m.as_str())
            .filter(|m| !m.is_empty())
            .map(|m| m.to_string())
            .ok_or(LyricsError::SongIdMissing)
    }

    /// Fetch LRC text for a `songmid`. The song-detail referer is required
    /// or the endpoint answers with an empty payload.
    pub async fn fetch_lyric(&self, songmid: &str) -> Result<String, LyricsError> {
        let url = format!(
            "{}/lyric/fcgi-bin/fcg_query_lyric_new.fcg?songmid={}&g_tk=5381&format=json&nobase64=1",
            self.base_url,
            urlencoding::encode(songmid)
        );
        let referer = format!("https://y.qq.com/n/ryqq/songDetail/{songmid}");
        let resp = self
            .client
            .get(&url)
            .header(REFERER, referer)
            .send()
            .await?;
        if resp.status() != reqwest::StatusCode::OK {
            return Err(LyricsError::FetchFailed);
        }

        let data: Value = resp.json().await?;
        data.get("lyric")
            .and_then(|l| l.as_str())
            .filter(|l| !l.is_empty())
            .map(|l| l.to_string())
            .ok_or(LyricsError::LyricsNotFound)
    }
}

impl Default for QqMusicClient {
    fn default() -> Self {
        Self::new()
    }
}
