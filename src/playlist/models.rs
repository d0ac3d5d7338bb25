use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Track {
    pub bvid: String,
    pub title: String,
    pub author: String,
    pub pic: String,
    #[serde(with = "time::serde::rfc3339")]
    pub added_at: OffsetDateTime,
}

/// Track fields as submitted by the frontend; `added_at` is stamped server-side.
#[derive(Debug, Clone, Deserialize)]
pub struct NewTrack {
    pub bvid: String,
    pub title: String,
    pub author: String,
    pub pic: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Playlist {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tracks: Vec<Track>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Persisted shape of playlists.json. Ids come from the counter and are
/// never handed out twice, even after a delete.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistsDoc {
    pub next_id: u64,
    pub playlists: Vec<Playlist>,
}

impl Default for PlaylistsDoc {
    fn default() -> Self {
        Self {
            next_id: 1,
            playlists: Vec::new(),
        }
    }
}

impl PlaylistsDoc {
    /// Older deployments persisted a bare array of playlists. Recover the
    /// counter from the highest numeric id already in use.
    pub fn from_legacy(playlists: Vec<Playlist>) -> Self {
        let next_id = playlists
            .iter()
            .filter_map(|p| p.id.parse::<u64>().ok())
            .max()
            .map_or(1, |max| max + 1);
        Self { next_id, playlists }
    }
}
