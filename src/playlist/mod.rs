pub mod models;

use parking_lot::Mutex;
use thiserror::Error;
use time::OffsetDateTime;

use crate::storage::Storage;
use models::{NewTrack, Playlist, PlaylistsDoc, Track};

#[derive(Debug, Error)]
pub enum PlaylistError {
    #[error("playlist not found")]
    NotFound,
    #[error("track not found")]
    TrackNotFound,
    #[error("track already in playlist")]
    DuplicateTrack,
    #[error("storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

/// Playlist CRUD over the in-memory document. The document is loaded once
/// at construction and snapshotted to disk after every mutation while the
/// lock is still held, so concurrent writers cannot lose updates.
pub struct PlaylistService {
    store: Storage,
    doc: Mutex<PlaylistsDoc>,
}

impl PlaylistService {
    pub fn new(store: Storage) -> Self {
        let doc = store.load_playlists();
        Self {
            store,
            doc: Mutex::new(doc),
        }
    }

    pub fn list(&self) -> Vec<Playlist> {
        self.doc.lock().playlists.clone()
    }

    pub fn get(&self, id: &str) -> Result<Playlist, PlaylistError> {
        self.doc
            .lock()
            .playlists
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or(PlaylistError::NotFound)
    }

    pub fn create(&self, name: &str, description: &str) -> Result<Playlist, PlaylistError> {
        let now = OffsetDateTime::now_utc();
        let mut doc = self.doc.lock();
        let playlist = Playlist {
            id: doc.next_id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            tracks: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        doc.next_id += 1;
        doc.playlists.push(playlist.clone());
        self.store.save_playlists(&doc)?;
        Ok(playlist)
    }

    pub fn delete(&self, id: &str) -> Result<(), PlaylistError> {
        let mut doc = self.doc.lock();
        let idx = doc
            .playlists
            .iter()
            .position(|p| p.id == id)
            .ok_or(PlaylistError::NotFound)?;
        doc.playlists.remove(idx);
        self.store.save_playlists(&doc)?;
        Ok(())
    }

    pub fn add_track(&self, id: &str, new: NewTrack) -> Result<Playlist, PlaylistError> {
        let mut doc = self.doc.lock();
        let playlist = doc
            .playlists
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(PlaylistError::NotFound)?;
        if playlist.tracks.iter().any(|t| t.bvid == new.bvid) {
            return Err(PlaylistError::DuplicateTrack);
        }
        let now = OffsetDateTime::now_utc();
        playlist.tracks.push(Track {
            bvid: new.bvid,
            title: new.title,
            author: new.author,
            pic: new.pic,
            added_at: now,
        });
        playlist.updated_at = now;
        let snapshot = playlist.clone();
        self.store.save_playlists(&doc)?;
        Ok(snapshot)
    }

    pub fn remove_track(&self, id: &str, bvid: &str) -> Result<(), PlaylistError> {
        let mut doc = self.doc.lock();
        let playlist = doc
            .playlists
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(PlaylistError::NotFound)?;
        let idx = playlist
            .tracks
            .iter()
            .position(|t| t.bvid == bvid)
            .ok_or(PlaylistError::TrackNotFound)?;
        playlist.tracks.remove(idx);
        playlist.updated_at = OffsetDateTime::now_utc();
        self.store.save_playlists(&doc)?;
        Ok(())
    }
}
