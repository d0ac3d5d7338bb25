//! Lyrics pipeline: title cleanup, QQ Music two-hop lookup, LRC parsing,
//! and the flat-file cache keyed by bvid.

pub mod normalize;
pub mod parser;
pub mod qq;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;

use crate::storage::{LyricsCache, Storage};
use parser::LyricCue;
use qq::QqMusicClient;

#[derive(Debug, Error)]
pub enum LyricsError {
    #[error("search failed")]
    SearchFailed,
    #[error("song not found")]
    SongNotFound,
    #[error("song id not found")]
    SongIdMissing,
    #[error("lyric fetch failed")]
    FetchFailed,
    #[error("lyrics not found")]
    LyricsNotFound,
    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),
}

/// Cache record, write-once per bvid. Entries never expire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LyricsEntry {
    pub lyrics: Vec<LyricCue>,
    pub title: String,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize)]
pub struct LyricsOutcome {
    pub lyrics: Vec<LyricCue>,
    pub from_cache: bool,
}

pub struct LyricsService {
    provider: QqMusicClient,
    store: Storage,
    cache: Mutex<LyricsCache>,
}

impl LyricsService {
    pub fn new(provider: QqMusicClient, store: Storage) -> Self {
        let cache = store.load_lyrics_cache();
        Self {
            provider,
            store,
            cache: Mutex::new(cache),
        }
    }

    /// A cache hit short-circuits; a miss runs the full two-hop lookup.
    /// Failed lookups are never cached, so every retry asks the provider
    /// again.
    pub async fn lookup(&self, title: &str, bvid: &str) -> Result<LyricsOutcome, LyricsError> {
        {
            let cache = self.cache.lock();
            if let Some(entry) = cache.get(bvid) {
                return Ok(LyricsOutcome {
                    lyrics: entry.lyrics.clone(),
                    from_cache: true,
                });
            }
        }

        let clean_title = normalize::clean_title(title);
        let songmid = self.provider.search_song_mid(&clean_title).await?;
        let raw = self.provider.fetch_lyric(&songmid).await?;
        let cues = parser::parse_lrc(&raw);
        if cues.is_empty() {
            return Err(LyricsError::LyricsNotFound);
        }

        let mut cache = self.cache.lock();
        cache.insert(
            bvid.to_string(),
            LyricsEntry {
                lyrics: cues.clone(),
                title: clean_title,
                updated_at: OffsetDateTime::now_utc(),
            },
        );
        if let Err(err) = self.store.save_lyrics_cache(&cache) {
            tracing::warn!("save lyrics cache failed: {err:#}");
        }
        Ok(LyricsOutcome {
            lyrics: cues,
            from_cache: false,
        })
    }
}
