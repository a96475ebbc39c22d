//! Library listing handlers.

use actix_web::{HttpResponse, Responder, get, web};
use music_server_types::{TrackEntry, TracksResponse};

use crate::render::render_index;
use crate::state::AppState;

/// Run a fresh scan on the blocking pool.
async fn scan_tracks(state: &AppState) -> Result<Vec<TrackEntry>, HttpResponse> {
    let library = state.library.clone();
    match web::block(move || library.tracks()).await {
        Ok(Ok(tracks)) => Ok(tracks),
        Ok(Err(err)) => {
            tracing::error!(error = %format!("{err:#}"), "library scan failed");
            Err(HttpResponse::InternalServerError().body(format!("scan failed: {err:#}")))
        }
        Err(err) => Err(HttpResponse::InternalServerError().body(err.to_string())),
    }
}

#[get("/")]
/// Render the library page, newest tracks first.
pub async fn index(state: web::Data<AppState>) -> impl Responder {
    match scan_tracks(&state).await {
        Ok(tracks) => HttpResponse::Ok()
            .content_type("text/html; charset=utf-8")
            .body(render_index(&tracks)),
        Err(resp) => resp,
    }
}

#[utoipa::path(
    get,
    path = "/api/tracks",
    responses(
        (status = 200, description = "Tracks ordered newest first", body = TracksResponse),
        (status = 500, description = "Library root could not be read")
    )
)]
#[get("/api/tracks")]
/// List every playable track under the library root.
pub async fn list_tracks(state: web::Data<AppState>) -> impl Responder {
    match scan_tracks(&state).await {
        Ok(tracks) => HttpResponse::Ok().json(TracksResponse { tracks }),
        Err(resp) => resp,
    }
}
