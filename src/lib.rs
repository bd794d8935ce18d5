//! notion-blog: a personal blog server
//!
//! Posts live in a Notion workspace and are served through a TTL cache;
//! book reviews are local markdown files; Strava and MangaDex pages render
//! from JSON data files refreshed on a schedule. Pages are rendered
//! server-side with htmx filling the slow slots.

pub mod cache;
pub mod config;
pub mod error;
pub mod manga;
pub mod notion;
pub mod reviews;
pub mod server;
pub mod strava;
pub mod templates;

use anyhow::Result;
use std::path::{Path, PathBuf};

/// The blog application
#[derive(Clone)]
pub struct Blog {
    /// Site configuration
    pub config: config::SiteConfig,
    /// Base directory
    pub base_dir: PathBuf,
    /// Markdown reviews directory
    pub reviews_dir: PathBuf,
    /// Static assets directory
    pub static_dir: PathBuf,
    /// Mirrored images directory
    pub images_dir: PathBuf,
    /// Integration data files directory
    pub data_dir: PathBuf,
}

impl Blog {
    /// Create a new Blog instance from a directory
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        let config_path = base_dir.join("_config.yml");

        let config = if config_path.exists() {
            config::SiteConfig::load(&config_path)?
        } else {
            config::SiteConfig::default()
        };

        let reviews_dir = base_dir.join(&config.reviews_dir);
        let static_dir = base_dir.join(&config.static_dir);
        let images_dir = base_dir.join(&config.images_dir);
        let data_dir = base_dir.join(&config.data_dir);

        Ok(Self {
            config,
            base_dir,
            reviews_dir,
            static_dir,
            images_dir,
            data_dir,
        })
    }
}
