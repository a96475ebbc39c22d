//! Actix server startup + app wiring.
//!
//! Resolves configuration, verifies the music root, and registers routes
//! and request logging.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready};
use actix_web::http::{Method, StatusCode, header};
use actix_web::{App, Error, HttpServer, web};
use anyhow::{Context as _, Result};
use futures_util::future::{LocalBoxFuture, Ready, ok};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api;
use crate::config;
use crate::library::{FsTrackSource, TrackSource};
use crate::openapi;
use crate::state::AppState;
use crate::stream::StreamOptions;

/// Build server state and start the Actix HTTP server.
pub(crate) async fn run(args: crate::Args) -> Result<()> {
    let base_dir = config::executable_dir();
    let cfg = config::load_config(args.config.as_deref(), &base_dir)?;
    let resolved = config::resolve(&cfg, args.overrides(), &base_dir)?;

    let library = FsTrackSource::new(&resolved.music_dir).with_context(|| {
        format!(
            "music directory not found at {:?}; set MUSIC_DIR or create the default ./music directory",
            resolved.music_dir
        )
    })?;

    let assets_dir = resolved
        .assets_dir
        .clone()
        .unwrap_or_else(|| locate_assets_dir(&base_dir));

    tracing::info!(
        bind = %resolved.bind,
        music_dir = %library.root().display(),
        assets_dir = %assets_dir.display(),
        version = env!("CARGO_PKG_VERSION"),
        git_sha = env!("GIT_SHA"),
        build_date = env!("BUILD_DATE"),
        "starting music-server"
    );
    if !assets_dir.is_dir() {
        tracing::warn!(
            path = %assets_dir.display(),
            "assets directory missing; /style.css and /icon.svg will return 404"
        );
    }

    let state = web::Data::new(AppState::new(
        Arc::new(library),
        assets_dir,
        StreamOptions {
            idle_timeout: resolved.stream_idle_timeout,
        },
    ));
    setup_shutdown();

    let server = HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(FilteredLogger)
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-doc/openapi.json", openapi::ApiDoc::openapi()),
            )
            .service(api::index)
            .service(api::list_tracks)
            .service(api::play_track)
            .service(api::style_css)
            .service(api::icon_svg)
            .service(api::health::health)
    })
    .keep_alive(resolved.keep_alive)
    .client_request_timeout(resolved.client_request_timeout)
    .bind(resolved.bind)
    .with_context(|| format!("bind {}", resolved.bind))?;

    tracing::info!(
        "music server is running at http://localhost:{}",
        resolved.bind.port()
    );
    server.run().await?;

    Ok(())
}

/// Return true when the request path should be logged.
///
/// Players issue a burst of range requests while seeking, so `/play/` is
/// left to the streamer's own debug output.
fn should_log_path(path: &str) -> bool {
    !(path.starts_with("/play/") || path == "/health")
}

/// Request fields captured before the handler consumes the request.
#[derive(Debug)]
struct RequestLog {
    method: Method,
    path: String,
    peer: String,
    user_agent: String,
    started: Instant,
}

impl RequestLog {
    /// `None` for paths filtered out by [`should_log_path`].
    fn capture(req: &ServiceRequest) -> Option<Self> {
        if !should_log_path(req.path()) {
            return None;
        }
        let peer = req
            .connection_info()
            .realip_remote_addr()
            .unwrap_or("-")
            .to_string();
        let user_agent = req
            .headers()
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("-")
            .to_string();
        Some(Self {
            method: req.method().clone(),
            path: req.path().to_string(),
            peer,
            user_agent,
            started: Instant::now(),
        })
    }

    fn finish(self, status: StatusCode) {
        tracing::info!(
            method = %self.method,
            path = %self.path,
            status = status.as_u16(),
            user_agent = %self.user_agent,
            peer = %self.peer,
            elapsed_ms = self.started.elapsed().as_millis() as u64,
            "http request"
        );
    }
}

/// Request logging middleware; skips streaming and health traffic.
struct FilteredLogger;

impl<S, B> Transform<S, ServiceRequest> for FilteredLogger
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = FilteredLoggerMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(FilteredLoggerMiddleware { service })
    }
}

struct FilteredLoggerMiddleware<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for FilteredLoggerMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let log = RequestLog::capture(&req);
        let fut = self.service.call(req);
        Box::pin(async move {
            let res = fut.await?;
            if let Some(log) = log {
                log.finish(res.status());
            }
            Ok(res)
        })
    }
}

/// First existing `assets` directory beside the executable, in the working
/// directory, or in the crate source tree; defaults to the executable's.
fn locate_assets_dir(base_dir: &Path) -> PathBuf {
    let mut candidates = vec![base_dir.join("assets")];
    if let Ok(dir) = std::env::current_dir() {
        candidates.push(dir.join("assets"));
    }
    candidates.push(Path::new(env!("CARGO_MANIFEST_DIR")).join("assets"));
    candidates
        .iter()
        .find(|path| path.is_dir())
        .cloned()
        .unwrap_or_else(|| base_dir.join("assets"))
}

/// Install Ctrl+C handler that stops the Actix system.
fn setup_shutdown() {
    let _ = ctrlc::set_handler(move || {
        if let Some(system) = actix_web::rt::System::try_current() {
            system.stop();
        } else {
            std::process::exit(0);
        }
    });
}
