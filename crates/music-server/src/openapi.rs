use utoipa::OpenApi;

use crate::api;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::library::list_tracks,
        api::play::play_track,
        api::health::health,
    ),
    components(
        schemas(
            music_server_types::TrackEntry,
            music_server_types::TracksResponse,
            api::HealthResponse,
        )
    ),
    tags(
        (name = "music-server", description = "Local music library and streaming API")
    )
)]
pub struct ApiDoc;
