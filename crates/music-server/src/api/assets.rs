//! Static files used by the index page.

use std::io;

use actix_files::NamedFile;
use actix_web::{HttpRequest, HttpResponse, get, web};

use crate::state::AppState;

async fn serve_asset(state: &AppState, name: &str, req: &HttpRequest) -> HttpResponse {
    let path = state.assets_dir.join(name);
    match NamedFile::open_async(&path).await {
        Ok(file) => file.into_response(req),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            HttpResponse::NotFound().body("File not found.")
        }
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "asset read failed");
            HttpResponse::InternalServerError().body(err.to_string())
        }
    }
}

#[get("/style.css")]
pub async fn style_css(state: web::Data<AppState>, req: HttpRequest) -> HttpResponse {
    serve_asset(&state, "style.css", &req).await
}

#[get("/icon.svg")]
pub async fn icon_svg(state: web::Data<AppState>, req: HttpRequest) -> HttpResponse {
    serve_asset(&state, "icon.svg", &req).await
}
