use anyhow::Context;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::lyrics::LyricsEntry;
use crate::playlist::models::{Playlist, PlaylistsDoc};

pub type LyricsCache = HashMap<String, LyricsEntry>;

/// Flat-file store for the two JSON documents in the data dir. Only this
/// type touches the backing files; callers hold the parsed documents in
/// memory and snapshot them back after each mutation.
#[derive(Debug, Clone)]
pub struct Storage {
    data_dir: PathBuf,
}

impl Storage {
    pub fn open(data_dir: &Path) -> anyhow::Result<Self> {
        fs::create_dir_all(data_dir)
            .with_context(|| format!("create dir {}", data_dir.display()))?;

        let s = Self {
            data_dir: data_dir.to_path_buf(),
        };
        if !s.playlists_path().exists() {
            write_json(&s.playlists_path(), &PlaylistsDoc::default())?;
        }
        if !s.lyrics_cache_path().exists() {
            write_json(&s.lyrics_cache_path(), &LyricsCache::new())?;
        }
        tracing::info!("data dir: {}", data_dir.display());
        Ok(s)
    }

    pub fn playlists_path(&self) -> PathBuf {
        self.data_dir.join("playlists.json")
    }

    pub fn lyrics_cache_path(&self) -> PathBuf {
        self.data_dir.join("lyrics_cache.json")
    }

    /// An unreadable or corrupt file yields the empty document so the
    /// service keeps running; the warning is the only operator signal.
    pub fn load_playlists(&self) -> PlaylistsDoc {
        let path = self.playlists_path();
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(err) => {
                tracing::warn!("read {} failed, starting empty: {}", path.display(), err);
                return PlaylistsDoc::default();
            }
        };
        if let Ok(doc) = serde_json::from_str::<PlaylistsDoc>(&raw) {
            return doc;
        }
        // Older deployments persisted a bare array.
        match serde_json::from_str::<Vec<Playlist>>(&raw) {
            Ok(list) => PlaylistsDoc::from_legacy(list),
            Err(err) => {
                tracing::warn!("parse {} failed, starting empty: {}", path.display(), err);
                PlaylistsDoc::default()
            }
        }
    }

    pub fn load_lyrics_cache(&self) -> LyricsCache {
        let path = self.lyrics_cache_path();
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(err) => {
                tracing::warn!("read {} failed, starting empty: {}", path.display(), err);
                return LyricsCache::new();
            }
        };
        match serde_json::from_str(&raw) {
            Ok(cache) => cache,
            Err(err) => {
                tracing::warn!("parse {} failed, starting empty: {}", path.display(), err);
                LyricsCache::new()
            }
        }
    }

    pub fn save_playlists(&self, doc: &PlaylistsDoc) -> anyhow::Result<()> {
        write_json(&self.playlists_path(), doc)
    }

    pub fn save_lyrics_cache(&self, cache: &LyricsCache) -> anyhow::Result<()> {
        write_json(&self.lyrics_cache_path(), cache)
    }
}

/// Write through a temporary sibling and rename so a crash mid-write never
/// truncates the live document.
fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> anyhow::Result<()> {
    let raw = serde_json::to_string_pretty(value).context("serialize document")?;
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, raw).with_context(|| format!("write {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("rename into {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static DIR_SEQ: AtomicUsize = AtomicUsize::new(0);

    fn temp_data_dir() -> PathBuf {
        std::env::temp_dir().join(format!(
            "bilimusic-storage-test-{}-{}",
            std::process::id(),
            DIR_SEQ.fetch_add(1, Ordering::SeqCst)
        ))
    }

    #[test]
    fn open_seeds_both_files() {
        let dir = temp_data_dir();
        let store = Storage::open(&dir).unwrap();
        assert!(store.playlists_path().exists());
        assert!(store.lyrics_cache_path().exists());
        assert_eq!(store.load_playlists().next_id, 1);
        assert!(store.load_lyrics_cache().is_empty());
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn playlists_round_trip() {
        let dir = temp_data_dir();
        let store = Storage::open(&dir).unwrap();

        let mut doc = store.load_playlists();
        doc.next_id = 3;
        store.save_playlists(&doc).unwrap();

        let reloaded = store.load_playlists();
        assert_eq!(reloaded.next_id, 3);
        assert!(reloaded.playlists.is_empty());
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn corrupt_playlists_file_loads_empty() {
        let dir = temp_data_dir();
        let store = Storage::open(&dir).unwrap();
        fs::write(store.playlists_path(), "{not json").unwrap();

        let doc = store.load_playlists();
        assert_eq!(doc.next_id, 1);
        assert!(doc.playlists.is_empty());
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn legacy_array_file_still_loads() {
        let dir = temp_data_dir();
        let store = Storage::open(&dir).unwrap();
        let legacy = r#"[
            {"id": "2", "name": "old", "description": "", "tracks": [],
             "created_at": "2024-01-01T00:00:00Z",
             "updated_at": "2024-01-01T00:00:00Z"}
        ]"#;
        fs::write(store.playlists_path(), legacy).unwrap();

        let doc = store.load_playlists();
        assert_eq!(doc.playlists.len(), 1);
        assert_eq!(doc.playlists[0].name, "old");
        assert_eq!(doc.next_id, 3);
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn corrupt_lyrics_cache_loads_empty() {
        let dir = temp_data_dir();
        let store = Storage::open(&dir).unwrap();
        fs::write(store.lyrics_cache_path(), "[]").unwrap();

        assert!(store.load_lyrics_cache().is_empty());
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn save_leaves_no_temp_file() {
        let dir = temp_data_dir();
        let store = Storage::open(&dir).unwrap();
        store.save_playlists(&PlaylistsDoc::default()).unwrap();

        let leftovers: Vec<_> = fs::read_dir(&dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
        fs::remove_dir_all(&dir).unwrap();
    }
}
