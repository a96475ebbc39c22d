mod api;
mod config;
mod library;
mod media_types;
mod openapi;
mod render;
mod startup;
mod state;
mod stream;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "music-server", version)]
pub(crate) struct Args {
    /// HTTP listen port [default: 8292]
    #[arg(long, env = "PORT")]
    port: Option<u16>,

    /// Interface address to bind [default: 0.0.0.0]
    #[arg(long, env = "BIND_HOST")]
    bind_host: Option<String>,

    /// Music library root; relative paths resolve against the executable's directory [default: ./music]
    #[arg(long, env = "MUSIC_DIR")]
    music_dir: Option<PathBuf>,

    /// Directory containing style.css and icon.svg [default: assets]
    #[arg(long, env = "ASSETS_DIR")]
    assets_dir: Option<PathBuf>,

    /// Optional server config file (TOML)
    #[arg(long, env = "MUSIC_SERVER_CONFIG")]
    config: Option<PathBuf>,
}

impl Args {
    fn overrides(&self) -> config::Overrides {
        config::Overrides {
            port: self.port,
            bind_host: self.bind_host.clone(),
            music_dir: self.music_dir.clone(),
            assets_dir: self.assets_dir.clone(),
        }
    }
}

#[actix_web::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("info,actix_web=info,music_server=info")
        }))
        .init();

    startup::run(args).await
}
