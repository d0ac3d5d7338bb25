//! The `{code, message?, data?}` envelope the web client expects.
//!
//! Most failures still answer HTTP 200 and carry `code: -1`; the client
//! switches on the code, not the status. Request-shape problems and
//! missing playlists/tracks are the only non-200 answers.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::{Value, json};

use crate::bili::api::BiliError;
use crate::lyrics::LyricsError;
use crate::playlist::PlaylistError;

pub fn ok_data<T: Serialize>(data: T) -> Json<Value> {
    Json(json!({"code": 0, "data": data}))
}

pub fn ok_message(message: &str) -> Json<Value> {
    Json(json!({"code": 0, "message": message}))
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub raw_response: Option<Value>,
}

impl ApiError {
    /// Upstream or internal failure reported inside a 200 body.
    pub fn upstream(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::OK,
            message: message.into(),
            raw_response: None,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
            raw_response: None,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
            raw_response: None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut body = json!({"code": -1, "message": self.message});
        if let Some(raw) = self.raw_response {
            body["raw_response"] = raw;
        }
        (self.status, Json(body)).into_response()
    }
}

impl From<BiliError> for ApiError {
    fn from(err: BiliError) -> Self {
        match err {
            BiliError::SearchRejected { raw } => Self {
                status: StatusCode::OK,
                message: "search failed".to_string(),
                raw_response: Some(raw),
            },
            other => Self::upstream(other.to_string()),
        }
    }
}

impl From<LyricsError> for ApiError {
    fn from(err: LyricsError) -> Self {
        Self::upstream(err.to_string())
    }
}

impl From<PlaylistError> for ApiError {
    fn from(err: PlaylistError) -> Self {
        match err {
            PlaylistError::NotFound => Self::not_found("playlist not found"),
            PlaylistError::TrackNotFound => Self::not_found("track not found"),
            PlaylistError::DuplicateTrack => Self::bad_request("track already in playlist"),
            PlaylistError::Storage(e) => Self::upstream(e.to_string()),
        }
    }
}
