//! Track streaming handler.

use actix_web::http::header;
use actix_web::{HttpRequest, HttpResponse, route, web};

use crate::state::AppState;
use crate::stream;

#[utoipa::path(
    get,
    path = "/play/{path}",
    params(
        ("path" = String, Path, description = "Track path relative to the library root"),
        ("Range" = Option<String>, Header, description = "Single byte range, e.g. bytes=0-1023")
    ),
    responses(
        (status = 200, description = "Full file stream"),
        (status = 206, description = "Partial content"),
        (status = 403, description = "Path escapes the library root"),
        (status = 404, description = "Not found"),
        (status = 416, description = "Invalid range"),
        (status = 500, description = "I/O error")
    )
)]
#[route("/play/{path:.*}", method = "GET", method = "HEAD")]
/// Stream a track with HTTP range support.
///
/// HEAD gets the same headers; the HTTP layer drops the body.
pub async fn play_track(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
) -> HttpResponse {
    let requested = path.into_inner();
    // A non-ASCII header value cannot be a valid range; parse it as empty.
    let range = req
        .headers()
        .get(header::RANGE)
        .map(|v| v.to_str().unwrap_or_default());

    match stream::serve(state.library.root(), &requested, range, state.stream).await {
        Ok(resp) => resp,
        Err(err) => {
            tracing::debug!(path = %requested, error = ?err, "play request rejected");
            err.into_response()
        }
    }
}
