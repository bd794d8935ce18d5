//! Site configuration (_config.yml)

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Main site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    // Site
    pub title: String,
    pub description: String,
    pub author: String,
    pub url: String,

    // Serving
    pub server: ServerConfig,

    // Directory
    pub static_dir: String,
    pub images_dir: String,
    pub reviews_dir: String,
    pub data_dir: String,

    // Integrations
    pub notion: NotionConfig,
    pub strava: StravaConfig,
    pub manga: MangaConfig,

    // Caching
    pub cache: CacheConfig,

    /// Serve local images and skip prod-only behavior
    pub dev: bool,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "szhafir blog".to_string(),
            description: String::new(),
            author: "szhafir".to_string(),
            url: "http://localhost:3000".to_string(),

            server: ServerConfig::default(),

            static_dir: "static".to_string(),
            images_dir: "images".to_string(),
            reviews_dir: "reviews".to_string(),
            data_dir: "data".to_string(),

            notion: NotionConfig::default(),
            strava: StravaConfig::default(),
            manga: MangaConfig::default(),

            cache: CacheConfig::default(),

            dev: false,
        }
    }
}

impl SiteConfig {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: SiteConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }
}

/// Bind addresses for the public and internal listeners
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// The cron endpoints bind here, never exposed publicly
    pub internal_host: String,
    pub internal_port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            internal_host: "127.0.0.1".to_string(),
            internal_port: 8081,
        }
    }
}

/// Notion API settings (token comes from the environment)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotionConfig {
    pub api_url: String,
    pub api_version: String,
    pub database_id: String,
    pub reading_now_block_id: String,
}

impl Default for NotionConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.notion.com/v1".to_string(),
            api_version: "2022-06-28".to_string(),
            database_id: String::new(),
            reading_now_block_id: String::new(),
        }
    }
}

/// Strava API settings (credentials come from the environment)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StravaConfig {
    pub api_url: String,
    pub token_url: String,
    pub data_file: String,
    /// Only activities after this unix epoch are fetched
    pub after_epoch: i64,
}

impl Default for StravaConfig {
    fn default() -> Self {
        Self {
            api_url: "https://www.strava.com/api/v3".to_string(),
            token_url: "https://www.strava.com/oauth/token".to_string(),
            data_file: "activities.json".to_string(),
            after_epoch: 1735660800, // 2025-01-01
        }
    }
}

/// MangaDex API settings (credentials come from the environment)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MangaConfig {
    pub api_url: String,
    pub auth_url: String,
    pub covers_url: String,
    pub data_file: String,
}

impl Default for MangaConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.mangadex.org".to_string(),
            auth_url: "https://auth.mangadex.org/realms/mangadex/protocol/openid-connect/token"
                .to_string(),
            covers_url: "https://uploads.mangadex.org/covers".to_string(),
            data_file: "manga.json".to_string(),
        }
    }
}

/// Cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_secs: u64,
    pub snapshot_file: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 3600,
            snapshot_file: ".blog-cache/db.json".to_string(),
        }
    }
}

/// Secrets pulled from the environment, never from _config.yml
#[derive(Debug, Clone, Default)]
pub struct Secrets {
    pub notion_token: String,
    pub strava_client_id: Option<String>,
    pub strava_client_secret: Option<String>,
    pub strava_refresh_token: Option<String>,
    pub mangadex_client_id: Option<String>,
    pub mangadex_client_secret: Option<String>,
    pub mangadex_refresh_token: Option<String>,
}

impl Secrets {
    /// Read secrets from the environment. The Notion token is required to
    /// serve anything useful; the rest degrade to disabled integrations.
    pub fn from_env() -> Result<Self> {
        let notion_token = match std::env::var("NOTION_TOKEN") {
            Ok(token) if !token.is_empty() => token,
            _ => bail!("NOTION_TOKEN not set"),
        };

        Ok(Self {
            notion_token,
            strava_client_id: std::env::var("STRAVA_CLIENT_ID").ok(),
            strava_client_secret: std::env::var("STRAVA_CLIENT_SECRET").ok(),
            strava_refresh_token: std::env::var("STRAVA_REFRESH_TOKEN").ok(),
            mangadex_client_id: std::env::var("MANGADEX_CLIENT_ID").ok(),
            mangadex_client_secret: std::env::var("MANGADEX_CLIENT_SECRET").ok(),
            mangadex_refresh_token: std::env::var("MANGADEX_REFRESH_TOKEN").ok(),
        })
    }

    /// Database id override, handy when the config file leaves it blank
    pub fn database_id_from_env() -> Option<String> {
        std::env::var("NOTION_DATABASE_ID")
            .ok()
            .filter(|v| !v.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SiteConfig::default();
        assert_eq!(config.title, "szhafir blog");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.internal_port, 8081);
        assert_eq!(config.cache.ttl_secs, 3600);
        assert!(!config.dev);
    }

    #[test]
    fn test_parse_config() {
        let yaml = r#"
title: My Blog
author: Test User
dev: true
server:
  port: 4000
notion:
  database_id: abc123
cache:
  ttl_secs: 60
"#;
        let config: SiteConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.title, "My Blog");
        assert_eq!(config.author, "Test User");
        assert_eq!(config.server.port, 4000);
        // unspecified fields keep their defaults
        assert_eq!(config.server.internal_port, 8081);
        assert_eq!(config.notion.database_id, "abc123");
        assert_eq!(config.notion.api_version, "2022-06-28");
        assert_eq!(config.cache.ttl_secs, 60);
        assert!(config.dev);
    }

    #[test]
    fn test_parse_empty_config() {
        let config: SiteConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config.strava.after_epoch, 1735660800);
        assert_eq!(config.manga.data_file, "manga.json");
    }
}
