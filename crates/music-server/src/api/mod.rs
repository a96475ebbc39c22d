//! HTTP API handlers.
//!
//! Defines the Actix routes for the library page, track streaming, and
//! static assets.

pub mod assets;
pub mod health;
pub mod library;
pub mod play;

pub use assets::{icon_svg, style_css};
pub use health::HealthResponse;
pub use library::{index, list_tracks};
pub use play::play_track;

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::Arc;
    use std::time::{Duration, UNIX_EPOCH};

    use actix_web::dev::ServiceResponse;
    use actix_web::http::{Method, StatusCode, header};
    use actix_web::{App, test, web};
    use music_server_types::TracksResponse;

    use crate::api;
    use crate::library::FsTrackSource;
    use crate::state::AppState;
    use crate::stream::StreamOptions;

    struct Fixture {
        _dir: tempfile::TempDir,
        state: web::Data<AppState>,
    }

    impl Fixture {
        fn music(&self, rel: &str) -> std::path::PathBuf {
            self.state.library.root().join(rel)
        }
    }

    fn write(path: &Path, data: &[u8], secs: u64) {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, data).unwrap();
        let file = std::fs::File::options().write(true).open(path).unwrap();
        file.set_modified(UNIX_EPOCH + Duration::from_secs(secs)).unwrap();
    }

    fn make_state() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let music = dir.path().join("music");
        let assets = dir.path().join("assets");
        std::fs::create_dir_all(&music).unwrap();
        std::fs::create_dir_all(&assets).unwrap();
        std::fs::write(assets.join("style.css"), b"body { margin: 0; }").unwrap();
        std::fs::write(dir.path().join("secret.txt"), b"top secret").unwrap();

        let library = FsTrackSource::new(&music).unwrap();
        let state = AppState::new(Arc::new(library), assets, StreamOptions::default());
        Fixture {
            _dir: dir,
            state: web::Data::new(state),
        }
    }

    fn pattern(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 7 % 256) as u8).collect()
    }

    fn header_value<B>(resp: &ServiceResponse<B>, name: header::HeaderName) -> Option<String> {
        resp.headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }

    #[actix_web::test]
    async fn play_without_range_streams_whole_file() {
        let fx = make_state();
        let data = pattern(1000);
        write(&fx.music("Artist/song.mp3"), &data, 1);
        let app = test::init_service(App::new().app_data(fx.state.clone()).service(api::play_track)).await;

        let req = test::TestRequest::get().uri("/play/Artist/song.mp3").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(header_value(&resp, header::CONTENT_LENGTH).as_deref(), Some("1000"));
        assert_eq!(header_value(&resp, header::CONTENT_TYPE).as_deref(), Some("audio/mpeg"));
        let body = test::read_body(resp).await;
        assert_eq!(body.as_ref(), data.as_slice());
    }

    #[actix_web::test]
    async fn play_with_range_returns_partial_content() {
        let fx = make_state();
        let data = pattern(1000);
        write(&fx.music("song.flac"), &data, 1);
        let app = test::init_service(App::new().app_data(fx.state.clone()).service(api::play_track)).await;

        let req = test::TestRequest::get()
            .uri("/play/song.flac")
            .insert_header((header::RANGE, "bytes=100-199"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::PARTIAL_CONTENT);
        assert_eq!(
            header_value(&resp, header::CONTENT_RANGE).as_deref(),
            Some("bytes 100-199/1000")
        );
        assert_eq!(header_value(&resp, header::CONTENT_LENGTH).as_deref(), Some("100"));
        assert_eq!(header_value(&resp, header::ACCEPT_RANGES).as_deref(), Some("bytes"));
        let body = test::read_body(resp).await;
        assert_eq!(body.as_ref(), &data[100..=199]);
    }

    #[actix_web::test]
    async fn play_open_ended_range_runs_to_end_of_file() {
        let fx = make_state();
        write(&fx.music("song.ogg"), &pattern(1000), 1);
        let app = test::init_service(App::new().app_data(fx.state.clone()).service(api::play_track)).await;

        let req = test::TestRequest::get()
            .uri("/play/song.ogg")
            .insert_header((header::RANGE, "bytes=900-"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::PARTIAL_CONTENT);
        assert_eq!(
            header_value(&resp, header::CONTENT_RANGE).as_deref(),
            Some("bytes 900-999/1000")
        );
        assert_eq!(header_value(&resp, header::CONTENT_LENGTH).as_deref(), Some("100"));
        assert_eq!(test::read_body(resp).await.len(), 100);
    }

    #[actix_web::test]
    async fn play_range_past_end_is_not_satisfiable() {
        let fx = make_state();
        write(&fx.music("song.wav"), &pattern(1000), 1);
        let app = test::init_service(App::new().app_data(fx.state.clone()).service(api::play_track)).await;

        for range in ["bytes=2000-3000", "bytes=0-99,200-299", "bytes=x-y"] {
            let req = test::TestRequest::get()
                .uri("/play/song.wav")
                .insert_header((header::RANGE, range))
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::RANGE_NOT_SATISFIABLE, "{range}");
            assert_eq!(
                header_value(&resp, header::CONTENT_RANGE).as_deref(),
                Some("bytes */1000")
            );
        }
    }

    #[actix_web::test]
    async fn play_traversal_is_forbidden() {
        let fx = make_state();
        let app = test::init_service(App::new().app_data(fx.state.clone()).service(api::play_track)).await;

        for uri in ["/play/../secret.txt", "/play/a/../../secret.txt", "/play/x/./../../secret.txt"] {
            let req = test::TestRequest::get().uri(uri).to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::FORBIDDEN, "{uri}");
            let body = test::read_body(resp).await;
            assert!(!body.as_ref().windows(6).any(|w| w == b"secret"), "{uri}");
        }
    }

    #[actix_web::test]
    async fn play_head_reports_length_and_type() {
        let fx = make_state();
        write(&fx.music("song.mp3"), &pattern(1000), 1);
        let app = test::init_service(App::new().app_data(fx.state.clone()).service(api::play_track)).await;

        let req = test::TestRequest::default()
            .method(Method::HEAD)
            .uri("/play/song.mp3")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(header_value(&resp, header::CONTENT_LENGTH).as_deref(), Some("1000"));
        assert_eq!(header_value(&resp, header::CONTENT_TYPE).as_deref(), Some("audio/mpeg"));
        assert_eq!(header_value(&resp, header::ACCEPT_RANGES).as_deref(), Some("bytes"));

        let req = test::TestRequest::default()
            .method(Method::HEAD)
            .uri("/play/missing.mp3")
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn play_missing_file_is_not_found() {
        let fx = make_state();
        let app = test::init_service(App::new().app_data(fx.state.clone()).service(api::play_track)).await;

        let req = test::TestRequest::get().uri("/play/missing.mp3").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(test::read_body(resp).await.as_ref(), b"File not found.");
    }

    #[actix_web::test]
    async fn play_decodes_percent_encoded_names() {
        let fx = make_state();
        write(&fx.music("My Album/01 Intro.m4a"), b"m4a!", 1);
        let app = test::init_service(App::new().app_data(fx.state.clone()).service(api::play_track)).await;

        let req = test::TestRequest::get().uri("/play/My%20Album/01%20Intro.m4a").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(header_value(&resp, header::CONTENT_TYPE).as_deref(), Some("audio/mp4"));
    }

    #[actix_web::test]
    async fn list_tracks_returns_newest_first() {
        let fx = make_state();
        write(&fx.music("old.mp3"), b"a", 100);
        write(&fx.music("nested/dir/newest.flac"), b"b", 300);
        write(&fx.music("mid.wav"), b"c", 200);
        write(&fx.music("cover.jpg"), b"d", 400);
        let app = test::init_service(App::new().app_data(fx.state.clone()).service(api::list_tracks)).await;

        let req = test::TestRequest::get().uri("/api/tracks").to_request();
        let resp: TracksResponse = test::call_and_read_body_json(&app, req).await;
        let paths = resp.tracks.iter().map(|t| t.path.as_str()).collect::<Vec<_>>();
        assert_eq!(paths, vec!["nested/dir/newest.flac", "mid.wav", "old.mp3"]);
    }

    #[actix_web::test]
    async fn index_renders_listing_and_reflects_new_files() {
        let fx = make_state();
        write(&fx.music("first.mp3"), b"a", 100);
        let app = test::init_service(App::new().app_data(fx.state.clone()).service(api::index)).await;

        let req = test::TestRequest::get().uri("/").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let html = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
        assert!(html.contains("href=\"/play/first.mp3\""));

        write(&fx.music("second.ogg"), b"b", 200);
        let req = test::TestRequest::get().uri("/").to_request();
        let html = String::from_utf8(test::call_and_read_body(&app, req).await.to_vec()).unwrap();
        let second = html.find("second.ogg").unwrap();
        let first = html.find("first.mp3").unwrap();
        assert!(second < first);
    }

    #[actix_web::test]
    async fn index_fails_when_root_disappears() {
        let fx = make_state();
        let root = fx.state.library.root().to_path_buf();
        let app = test::init_service(App::new().app_data(fx.state.clone()).service(api::index)).await;
        std::fs::remove_dir_all(&root).unwrap();

        let req = test::TestRequest::get().uri("/").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[actix_web::test]
    async fn assets_served_or_not_found() {
        let fx = make_state();
        let app = test::init_service(
            App::new()
                .app_data(fx.state.clone())
                .service(api::style_css)
                .service(api::icon_svg),
        )
        .await;

        let req = test::TestRequest::get().uri("/style.css").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(test::read_body(resp).await.as_ref(), b"body { margin: 0; }");

        let req = test::TestRequest::get().uri("/icon.svg").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn health_reports_ok() {
        let app = test::init_service(App::new().service(api::health::health)).await;
        let req = test::TestRequest::get().uri("/health").to_request();
        let resp: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(resp["status"], "ok");
        assert_eq!(resp["version"], env!("CARGO_PKG_VERSION"));
    }
}
