pub mod handlers;
pub mod response;

use anyhow::Context;
use axum::Router;
use axum::routing::{delete, get, post};
use std::path::Path;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::bili::api::BiliClient;
use crate::config::Config;
use crate::lyrics::LyricsService;
use crate::lyrics::qq::QqMusicClient;
use crate::playlist::PlaylistService;
use crate::storage::Storage;

#[derive(Clone)]
pub struct AppState {
    pub bili: BiliClient,
    pub lyrics: Arc<LyricsService>,
    pub playlists: Arc<PlaylistService>,
}

/// API routes first; anything unmatched falls through to the bundled
/// frontend.
pub fn router(state: AppState, static_dir: &Path) -> Router {
    Router::new()
        .route("/api/search", get(handlers::search))
        .route("/api/audio/{bvid}", get(handlers::audio_url))
        .route("/api/proxy/image", get(handlers::proxy_image))
        .route("/api/lyrics", get(handlers::lyrics))
        .route(
            "/api/playlists",
            get(handlers::list_playlists).post(handlers::create_playlist),
        )
        .route(
            "/api/playlists/{id}",
            get(handlers::get_playlist).delete(handlers::delete_playlist),
        )
        .route("/api/playlists/{id}/tracks", post(handlers::add_track))
        .route(
            "/api/playlists/{id}/tracks/{bvid}",
            delete(handlers::remove_track),
        )
        .fallback_service(ServeDir::new(static_dir))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run(cfg: Config) -> anyhow::Result<()> {
    let store = Storage::open(&cfg.paths.data_dir).context("open data dir")?;
    let bili = BiliClient::new(cfg.bilibili.cookie.as_deref()).context("build bilibili client")?;
    let state = AppState {
        bili,
        lyrics: Arc::new(LyricsService::new(QqMusicClient::new(), store.clone())),
        playlists: Arc::new(PlaylistService::new(store)),
    };

    let app = router(state, &cfg.paths.static_dir);
    let addr = format!("{}:{}", cfg.server.host, cfg.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("bind {addr}"))?;
    tracing::info!("listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serve")?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!("ctrl-c handler failed: {err}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::ServiceExt;

    static DIR_SEQ: AtomicUsize = AtomicUsize::new(0);

    fn temp_dir(label: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "bilimusic-server-test-{label}-{}-{}",
            std::process::id(),
            DIR_SEQ.fetch_add(1, Ordering::SeqCst)
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    /// Router over fresh temp dirs, with all upstream calls pointed at
    /// `api_base`.
    fn app(api_base: &str) -> (Router, PathBuf, PathBuf) {
        let data_dir = temp_dir("data");
        let static_dir = temp_dir("static");
        std::fs::write(static_dir.join("index.html"), "<html>bilimusic</html>").unwrap();

        let store = Storage::open(&data_dir).unwrap();
        let state = AppState {
            bili: BiliClient::with_api_base(None, api_base).unwrap(),
            lyrics: Arc::new(LyricsService::new(
                QqMusicClient::with_base_url(api_base),
                store.clone(),
            )),
            playlists: Arc::new(PlaylistService::new(store)),
        };
        (router(state, &static_dir), data_dir, static_dir)
    }

    fn cleanup(data_dir: &PathBuf, static_dir: &PathBuf) {
        let _ = std::fs::remove_dir_all(data_dir);
        let _ = std::fs::remove_dir_all(static_dir);
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn delete_req(uri: &str) -> Request<Body> {
        Request::builder()
            .method("DELETE")
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn playlist_crud_round_trip() {
        let (app, data_dir, static_dir) = app("http://127.0.0.1:1");

        let resp = app
            .clone()
            .oneshot(post_json(
                "/api/playlists",
                r#"{"name": "driving", "description": "road trip"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let v = body_json(resp).await;
        assert_eq!(v["code"], json!(0));
        assert_eq!(v["data"]["id"], json!("1"));
        assert_eq!(v["data"]["name"], json!("driving"));

        let resp = app.clone().oneshot(get("/api/playlists")).await.unwrap();
        let v = body_json(resp).await;
        assert_eq!(v.as_array().map(|a| a.len()), Some(1));

        let resp = app.clone().oneshot(get("/api/playlists/1")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let v = body_json(resp).await;
        assert_eq!(v["id"], json!("1"));
        assert!(v.get("code").is_none());

        let track = r#"{"track": {"bvid": "BV1a", "title": "t", "author": "a", "pic": "p"}}"#;
        let resp = app
            .clone()
            .oneshot(post_json("/api/playlists/1/tracks", track))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let v = body_json(resp).await;
        assert_eq!(v["code"], json!(0));
        assert_eq!(v["message"], json!("track added"));
        assert_eq!(v["data"]["tracks"].as_array().map(|a| a.len()), Some(1));

        let resp = app
            .clone()
            .oneshot(post_json("/api/playlists/1/tracks", track))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let v = body_json(resp).await;
        assert_eq!(v["code"], json!(-1));
        assert_eq!(v["message"], json!("track already in playlist"));

        let resp = app
            .clone()
            .oneshot(delete_req("/api/playlists/1/tracks/BV1a"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let v = body_json(resp).await;
        assert_eq!(v["code"], json!(0));

        let resp = app
            .clone()
            .oneshot(delete_req("/api/playlists/1/tracks/BV1a"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = app
            .clone()
            .oneshot(delete_req("/api/playlists/1"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = app.clone().oneshot(get("/api/playlists/1")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let v = body_json(resp).await;
        assert_eq!(v["code"], json!(-1));
        assert_eq!(v["message"], json!("playlist not found"));

        cleanup(&data_dir, &static_dir);
    }

    #[tokio::test]
    async fn create_playlist_requires_a_name() {
        let (app, data_dir, static_dir) = app("http://127.0.0.1:1");

        let resp = app
            .clone()
            .oneshot(post_json("/api/playlists", r#"{"description": "no name"}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let v = body_json(resp).await;
        assert_eq!(v["code"], json!(-1));
        assert_eq!(v["message"], json!("missing required parameters"));

        let resp = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/playlists")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let v = body_json(resp).await;
        assert_eq!(v["message"], json!("missing required parameters"));

        cleanup(&data_dir, &static_dir);
    }

    #[tokio::test]
    async fn add_track_requires_a_track_payload() {
        let (app, data_dir, static_dir) = app("http://127.0.0.1:1");
        app.clone()
            .oneshot(post_json("/api/playlists", r#"{"name": "p"}"#))
            .await
            .unwrap();

        let resp = app
            .clone()
            .oneshot(post_json("/api/playlists/1/tracks", r#"{"other": 1}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let v = body_json(resp).await;
        assert_eq!(v["message"], json!("missing track payload"));

        cleanup(&data_dir, &static_dir);
    }

    #[tokio::test]
    async fn search_route_wraps_results_in_the_envelope() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/x/web-interface/search/type")
            .match_query(mockito::Matcher::Any)
            .with_header("content-type", "application/json")
            .with_body(
                json!({"code": 0, "data": {"result": [{
                    "bvid": "BV1a", "title": "<em>song</em>", "author": "up",
                    "pic": "//img", "play": 1, "video_review": 2
                }]}})
                .to_string(),
            )
            .create_async()
            .await;

        let (app, data_dir, static_dir) = app(&server.url());
        let resp = app
            .clone()
            .oneshot(get("/api/search?keyword=song"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let v = body_json(resp).await;
        assert_eq!(v["code"], json!(0));
        assert_eq!(v["data"][0]["title"], json!("song"));

        cleanup(&data_dir, &static_dir);
    }

    #[tokio::test]
    async fn search_route_echoes_the_raw_rejection() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/x/web-interface/search/type")
            .match_query(mockito::Matcher::Any)
            .with_header("content-type", "application/json")
            .with_body(r#"{"code": -412, "message": "blocked"}"#)
            .create_async()
            .await;

        let (app, data_dir, static_dir) = app(&server.url());
        let resp = app
            .clone()
            .oneshot(get("/api/search?keyword=song"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let v = body_json(resp).await;
        assert_eq!(v["code"], json!(-1));
        assert_eq!(v["message"], json!("search failed"));
        assert_eq!(v["raw_response"]["code"], json!(-412));

        cleanup(&data_dir, &static_dir);
    }

    #[tokio::test]
    async fn audio_route_returns_the_resolved_url() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/x/web-interface/view")
            .match_query(mockito::Matcher::Any)
            .with_header("content-type", "application/json")
            .with_body(r#"{"code": 0, "data": {"cid": 7}}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/x/player/playurl")
            .match_query(mockito::Matcher::Any)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"code": 0, "data": {"dash": {"audio": [{"baseUrl": "https://cdn/a.m4s"}]}}}"#,
            )
            .create_async()
            .await;

        let (app, data_dir, static_dir) = app(&server.url());
        let resp = app.clone().oneshot(get("/api/audio/BV1a")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let v = body_json(resp).await;
        assert_eq!(v["code"], json!(0));
        assert_eq!(v["url"], json!("https://cdn/a.m4s"));

        cleanup(&data_dir, &static_dir);
    }

    #[tokio::test]
    async fn lyrics_route_validates_its_params() {
        let (app, data_dir, static_dir) = app("http://127.0.0.1:1");

        let resp = app
            .clone()
            .oneshot(get("/api/lyrics?bvid=BV1a"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let v = body_json(resp).await;
        assert_eq!(v["code"], json!(-1));
        assert_eq!(v["message"], json!("missing song title"));

        let resp = app
            .clone()
            .oneshot(get("/api/lyrics?title=song"))
            .await
            .unwrap();
        let v = body_json(resp).await;
        assert_eq!(v["message"], json!("missing video id"));

        cleanup(&data_dir, &static_dir);
    }

    #[tokio::test]
    async fn unmatched_paths_fall_through_to_the_frontend() {
        let (app, data_dir, static_dir) = app("http://127.0.0.1:1");

        let resp = app.clone().oneshot(get("/")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        assert!(std::str::from_utf8(&bytes).unwrap().contains("bilimusic"));

        let resp = app.clone().oneshot(get("/missing.js")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        cleanup(&data_dir, &static_dir);
    }

    #[tokio::test]
    async fn responses_allow_any_origin() {
        let (app, data_dir, static_dir) = app("http://127.0.0.1:1");

        let resp = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/playlists")
                    .header(header::ORIGIN, "http://localhost:5173")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(
            resp.headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .and_then(|v| v.to_str().ok()),
            Some("*")
        );

        cleanup(&data_dir, &static_dir);
    }
}
