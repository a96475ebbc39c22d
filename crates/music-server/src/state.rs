//! Shared application state.
//!
//! Read-only after startup; every request gets its own scan and file handle.

use std::path::PathBuf;
use std::sync::Arc;

use crate::library::TrackSource;
use crate::stream::StreamOptions;

pub struct AppState {
    /// Track listing source rooted at the canonical music directory.
    pub library: Arc<dyn TrackSource>,
    /// Directory holding the page's static assets.
    pub assets_dir: PathBuf,
    pub stream: StreamOptions,
}

impl AppState {
    pub fn new(library: Arc<dyn TrackSource>, assets_dir: PathBuf, stream: StreamOptions) -> Self {
        Self {
            library,
            assets_dir,
            stream,
        }
    }
}
