//! Configuration loading and parsing.
//!
//! Settings come from CLI flags / environment variables first, then an
//! optional TOML file, then built-in defaults.

use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

pub const DEFAULT_PORT: u16 = 8292;
pub const DEFAULT_BIND_HOST: &str = "0.0.0.0";
pub const DEFAULT_MUSIC_DIR: &str = "./music";
const DEFAULT_STREAM_IDLE_TIMEOUT_SECS: u64 = 30;
const DEFAULT_KEEP_ALIVE_SECS: u64 = 75;
const DEFAULT_CLIENT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Optional server configuration loaded from TOML.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Listen port.
    pub port: Option<u16>,
    /// Interface address to bind.
    pub bind_host: Option<String>,
    /// Music library root directory.
    pub music_dir: Option<String>,
    /// Directory holding `style.css` and `icon.svg`.
    pub assets_dir: Option<String>,
    /// Abort a stream when one disk read stalls this long.
    pub stream_idle_timeout_secs: Option<u64>,
    /// HTTP keep-alive for idle connections.
    pub keep_alive_secs: Option<u64>,
    /// Time allowed for a client to send request headers.
    pub client_request_timeout_secs: Option<u64>,
}

impl ServerConfig {
    /// Load configuration from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let raw =
            std::fs::read_to_string(path).with_context(|| format!("read config {:?}", path))?;
        let cfg = toml::from_str::<ServerConfig>(&raw)
            .with_context(|| format!("parse config {:?}", path))?;
        Ok(cfg)
    }
}

/// Values supplied on the command line or through the environment.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub port: Option<u16>,
    pub bind_host: Option<String>,
    pub music_dir: Option<PathBuf>,
    pub assets_dir: Option<PathBuf>,
}

/// Fully resolved settings used to start the server.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub bind: SocketAddr,
    pub music_dir: PathBuf,
    /// Explicit assets directory; `None` lets startup search the usual places.
    pub assets_dir: Option<PathBuf>,
    pub stream_idle_timeout: Duration,
    pub keep_alive: Duration,
    pub client_request_timeout: Duration,
}

/// Directory containing the running executable, or the working directory.
pub fn executable_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|path| path.parent().map(Path::to_path_buf))
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Load the explicit config file, or `config.toml` beside the executable if present.
pub fn load_config(path: Option<&Path>, base_dir: &Path) -> Result<ServerConfig> {
    match path {
        Some(path) => ServerConfig::load(path),
        None => {
            let auto_path = base_dir.join("config.toml");
            if auto_path.exists() {
                ServerConfig::load(&auto_path)
            } else {
                Ok(ServerConfig::default())
            }
        }
    }
}

/// Merge overrides, file config, and defaults.
///
/// Relative directories resolve against `base_dir` (the executable's
/// directory), not the working directory.
pub fn resolve(
    cfg: &ServerConfig,
    overrides: Overrides,
    base_dir: &Path,
) -> Result<ResolvedConfig> {
    let port = overrides.port.or(cfg.port).unwrap_or(DEFAULT_PORT);
    let host = overrides
        .bind_host
        .or_else(|| cfg.bind_host.clone())
        .unwrap_or_else(|| DEFAULT_BIND_HOST.to_string());
    let ip: IpAddr = host
        .trim()
        .parse()
        .with_context(|| format!("parse bind_host {host}"))?;

    let music_dir = overrides
        .music_dir
        .or_else(|| cfg.music_dir.as_deref().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_MUSIC_DIR));
    let assets_dir = overrides
        .assets_dir
        .or_else(|| cfg.assets_dir.as_deref().map(PathBuf::from));

    Ok(ResolvedConfig {
        bind: SocketAddr::new(ip, port),
        music_dir: anchor(base_dir, music_dir),
        assets_dir: assets_dir.map(|dir| anchor(base_dir, dir)),
        stream_idle_timeout: secs(cfg.stream_idle_timeout_secs, DEFAULT_STREAM_IDLE_TIMEOUT_SECS),
        keep_alive: secs(cfg.keep_alive_secs, DEFAULT_KEEP_ALIVE_SECS),
        client_request_timeout: secs(
            cfg.client_request_timeout_secs,
            DEFAULT_CLIENT_REQUEST_TIMEOUT_SECS,
        ),
    })
}

fn anchor(base_dir: &Path, dir: PathBuf) -> PathBuf {
    if dir.is_absolute() {
        dir
    } else {
        base_dir.join(dir)
    }
}

fn secs(value: Option<u64>, default: u64) -> Duration {
    Duration::from_secs(value.filter(|v| *v > 0).unwrap_or(default))
}
