use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::playlist::models::{NewTrack, Playlist};
use crate::server::AppState;
use crate::server::response::{ApiError, ok_data, ok_message};

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    keyword: String,
}

pub async fn search(
    State(state): State<AppState>,
    Query(q): Query<SearchQuery>,
) -> Result<Json<Value>, ApiError> {
    let videos = state.bili.search(&q.keyword).await?;
    Ok(ok_data(videos))
}

pub async fn audio_url(
    State(state): State<AppState>,
    Path(bvid): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let url = state.bili.resolve_audio_url(&bvid).await?;
    Ok(Json(json!({"code": 0, "url": url})))
}

#[derive(Debug, Deserialize)]
pub struct ImageQuery {
    #[serde(default)]
    url: String,
}

/// Stream an upstream image back to the browser. Cover hosts check the
/// referer, so the page cannot load them directly.
pub async fn proxy_image(
    State(state): State<AppState>,
    Query(q): Query<ImageQuery>,
) -> Result<Response, ApiError> {
    if q.url.is_empty() {
        return Err(ApiError::upstream("missing image url"));
    }
    let (content_type, body) = state.bili.fetch_image(&q.url).await?;
    let headers = [
        (header::CONTENT_TYPE, content_type),
        (
            header::CACHE_CONTROL,
            "public, max-age=31536000".to_string(),
        ),
    ];
    Ok((headers, body).into_response())
}

#[derive(Debug, Deserialize)]
pub struct LyricsQuery {
    #[serde(default)]
    title: String,
    #[serde(default)]
    bvid: String,
}

pub async fn lyrics(
    State(state): State<AppState>,
    Query(q): Query<LyricsQuery>,
) -> Result<Json<Value>, ApiError> {
    if q.title.is_empty() {
        return Err(ApiError::upstream("missing song title"));
    }
    if q.bvid.is_empty() {
        return Err(ApiError::upstream("missing video id"));
    }
    let outcome = state.lyrics.lookup(&q.title, &q.bvid).await?;
    Ok(ok_data(outcome))
}

/// The list endpoint answers with a bare array, no envelope. The web
/// client consumes it that way.
pub async fn list_playlists(State(state): State<AppState>) -> Json<Vec<Playlist>> {
    Json(state.playlists.list())
}

#[derive(Debug, Deserialize)]
pub struct CreatePlaylistBody {
    name: Option<String>,
    #[serde(default)]
    description: String,
}

pub async fn create_playlist(
    State(state): State<AppState>,
    body: Option<Json<CreatePlaylistBody>>,
) -> Result<Json<Value>, ApiError> {
    let Some(Json(body)) = body else {
        return Err(ApiError::bad_request("missing required parameters"));
    };
    let Some(name) = body.name else {
        return Err(ApiError::bad_request("missing required parameters"));
    };
    let playlist = state.playlists.create(&name, &body.description)?;
    Ok(ok_data(playlist))
}

pub async fn get_playlist(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Playlist>, ApiError> {
    Ok(Json(state.playlists.get(&id)?))
}

pub async fn delete_playlist(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state.playlists.delete(&id)?;
    Ok(ok_message("deleted"))
}

#[derive(Debug, Deserialize)]
pub struct AddTrackBody {
    track: Option<NewTrack>,
}

pub async fn add_track(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Option<Json<AddTrackBody>>,
) -> Result<Json<Value>, ApiError> {
    let track = body
        .and_then(|Json(b)| b.track)
        .ok_or_else(|| ApiError::bad_request("missing track payload"))?;
    let playlist = state.playlists.add_track(&id, track)?;
    Ok(Json(
        json!({"code": 0, "message": "track added", "data": playlist}),
    ))
}

pub async fn remove_track(
    State(state): State<AppState>,
    Path((id, bvid)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    state.playlists.remove_track(&id, &bvid)?;
    Ok(ok_message("deleted"))
}
