use serde::{Deserialize, Serialize};

/// A playable file discovered under the library root.
///
/// Entries are produced fresh by every scan and carry no identity beyond
/// their path.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct TrackEntry {
    /// Path relative to the library root, always `/`-separated.
    pub path: String,
    /// Last modification time in Unix milliseconds.
    pub modified_ms: i64,
}

impl TrackEntry {
    /// Final path segment, used as the display name.
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    /// Parent directory portion of the path, empty for top-level files.
    pub fn dir(&self) -> &str {
        self.path.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
    }
}

/// Listing returned by the JSON tracks endpoint, newest first.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct TracksResponse {
    /// Tracks ordered by modification time, most recent first.
    pub tracks: Vec<TrackEntry>,
}
