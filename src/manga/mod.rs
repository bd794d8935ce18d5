//! MangaDex integration
//!
//! The reading list is refreshed as a whole: regenerate the OAuth token,
//! fetch the user's read statuses, then per-manga info, and write the merged
//! result to a JSON data file the manga page reads. Covers are relayed
//! through a proxy endpoint because the uploads host rejects hotlinking.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use crate::config::{MangaConfig, Secrets};
use crate::error::{Result, ServiceError};

/// One manga on the reading list, reduced to the fields the page renders
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MangaEntry {
    pub id: String,
    pub title: String,
    pub author: String,
    pub cover_file: String,
    pub year: Option<i32>,
    pub status: String,
    pub read_status: String,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Clone, Deserialize)]
struct StatusResponse {
    #[serde(default)]
    statuses: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
struct MangaResponse {
    data: MangaData,
}

#[derive(Debug, Clone, Deserialize)]
struct MangaData {
    id: String,
    #[serde(default)]
    attributes: MangaAttributes,
    #[serde(default)]
    relationships: Vec<Relationship>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct MangaAttributes {
    title: HashMap<String, String>,
    year: Option<i32>,
    status: String,
    tags: Vec<TagEntry>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct TagEntry {
    attributes: TagAttributes,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct TagAttributes {
    name: HashMap<String, String>,
}

/// Relationship payloads vary per kind, so attributes stay raw
#[derive(Debug, Clone, Deserialize)]
struct Relationship {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    attributes: serde_json::Value,
}

/// Client for the MangaDex API
pub struct MangaClient {
    http: reqwest::Client,
    api_url: String,
    auth_url: String,
    covers_url: String,
    client_id: Option<String>,
    client_secret: Option<String>,
    refresh_token: Option<String>,
    access_token: RwLock<Option<String>>,
    data_path: PathBuf,
}

impl MangaClient {
    pub fn new(config: &MangaConfig, secrets: &Secrets, data_dir: &Path) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url: config.api_url.trim_end_matches('/').to_string(),
            auth_url: config.auth_url.clone(),
            covers_url: config.covers_url.trim_end_matches('/').to_string(),
            client_id: secrets.mangadex_client_id.clone(),
            client_secret: secrets.mangadex_client_secret.clone(),
            refresh_token: secrets.mangadex_refresh_token.clone(),
            access_token: RwLock::new(None),
            data_path: data_dir.join(&config.data_file),
        }
    }

    /// Whether OAuth credentials were provided at startup
    pub fn is_configured(&self) -> bool {
        self.client_id.is_some() && self.client_secret.is_some() && self.refresh_token.is_some()
    }

    async fn regenerate_access_token(&self) -> Result<()> {
        let client_id = self
            .client_id
            .as_deref()
            .ok_or(ServiceError::MissingCredential("MANGADEX_CLIENT_ID"))?;
        let client_secret = self
            .client_secret
            .as_deref()
            .ok_or(ServiceError::MissingCredential("MANGADEX_CLIENT_SECRET"))?;
        let refresh_token = self
            .refresh_token
            .as_deref()
            .ok_or(ServiceError::MissingCredential("MANGADEX_REFRESH_TOKEN"))?;

        let resp = self
            .http
            .post(&self.auth_url)
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
                ("client_id", client_id),
                ("client_secret", client_secret),
            ])
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(ServiceError::UnexpectedStatus {
                status: resp.status(),
                url: resp.url().to_string(),
            });
        }

        let token: TokenResponse = resp.json().await?;
        *self.access_token.write().expect("token lock poisoned") = Some(token.access_token);
        Ok(())
    }

    /// Refresh the whole reading list into the data file
    pub async fn update_data(&self) -> Result<()> {
        self.regenerate_access_token().await?;

        let statuses = self.user_statuses().await?;
        tracing::info!("Fetched {} manga statuses", statuses.len());

        let mut entries = Vec::new();
        for (manga_id, read_status) in statuses {
            match self.manga_info(&manga_id).await {
                Ok(mut entry) => {
                    entry.read_status = read_status;
                    entries.push(entry);
                }
                Err(e) => {
                    tracing::error!("Failed to get manga info for {}: {}", manga_id, e);
                }
            }
        }

        if let Some(parent) = self.data_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_vec_pretty(&entries)?;
        std::fs::write(&self.data_path, json)?;
        Ok(())
    }

    async fn user_statuses(&self) -> Result<HashMap<String, String>> {
        let token = self.bearer()?;
        let url = format!("{}/manga/status", self.api_url);

        let resp = self.http.get(&url).bearer_auth(&token).send().await?;
        if !resp.status().is_success() {
            return Err(ServiceError::UnexpectedStatus {
                status: resp.status(),
                url: resp.url().to_string(),
            });
        }

        let status: StatusResponse = resp.json().await?;
        Ok(status.statuses)
    }

    async fn manga_info(&self, manga_id: &str) -> Result<MangaEntry> {
        let url = format!(
            "{}/manga/{}?includes[]=author&includes[]=cover_art",
            self.api_url, manga_id
        );

        let resp = self.http.get(&url).send().await?;
        if !resp.status().is_success() {
            return Err(ServiceError::UnexpectedStatus {
                status: resp.status(),
                url: resp.url().to_string(),
            });
        }

        let manga: MangaResponse = resp.json().await?;
        Ok(reduce_manga(manga.data))
    }

    /// Fetch a cover image from the uploads host, with the headers it
    /// requires, and relay content type and body
    pub async fn fetch_cover(&self, path: &str) -> Result<(String, Vec<u8>)> {
        let url = format!("{}/{}", self.covers_url, path.trim_start_matches('/'));

        let resp = self
            .http
            .get(&url)
            .header("User-Agent", "notion-blog/0.3")
            .header("Referer", "https://mangadex.org/")
            .header("Accept", "image/*")
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(ServiceError::UnexpectedStatus {
                status: resp.status(),
                url: resp.url().to_string(),
            });
        }

        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("image/jpeg")
            .to_string();
        let bytes = resp.bytes().await?.to_vec();
        Ok((content_type, bytes))
    }

    /// Read the reading list from the data file
    pub fn load_manga(&self) -> Result<Vec<MangaEntry>> {
        let json = std::fs::read(&self.data_path)?;
        Ok(serde_json::from_slice(&json)?)
    }

    fn bearer(&self) -> Result<String> {
        self.access_token
            .read()
            .expect("token lock poisoned")
            .clone()
            .ok_or(ServiceError::MissingCredential("mangadex access token"))
    }
}

/// Flatten the API response into the entry the page renders
fn reduce_manga(data: MangaData) -> MangaEntry {
    let title = data
        .attributes
        .title
        .get("en")
        .cloned()
        .or_else(|| data.attributes.title.values().next().cloned())
        .unwrap_or_default();

    let author = data
        .relationships
        .iter()
        .find(|rel| rel.kind == "author")
        .and_then(|rel| rel.attributes.get("name"))
        .and_then(|name| name.as_str())
        .unwrap_or_default()
        .to_string();

    let cover_file = data
        .relationships
        .iter()
        .find(|rel| rel.kind == "cover_art")
        .and_then(|rel| rel.attributes.get("fileName"))
        .and_then(|name| name.as_str())
        .unwrap_or_default()
        .to_string();

    let tags = data
        .attributes
        .tags
        .iter()
        .filter_map(|tag| tag.attributes.name.get("en").cloned())
        .collect();

    MangaEntry {
        id: data.id,
        title,
        author,
        cover_file,
        year: data.attributes.year,
        status: data.attributes.status,
        read_status: String::new(),
        tags,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reduce_manga_flattens_relationships() {
        let data: MangaData = serde_json::from_value(serde_json::json!({
            "id": "m1",
            "attributes": {
                "title": {"en": "Vinland Saga"},
                "year": 2005,
                "status": "ongoing",
                "tags": [
                    {"attributes": {"name": {"en": "Action"}}},
                    {"attributes": {"name": {"en": "Historical"}}}
                ]
            },
            "relationships": [
                {"type": "author", "attributes": {"name": "Makoto Yukimura"}},
                {"type": "cover_art", "attributes": {"fileName": "cover.jpg"}}
            ]
        }))
        .unwrap();

        let entry = reduce_manga(data);
        assert_eq!(entry.title, "Vinland Saga");
        assert_eq!(entry.author, "Makoto Yukimura");
        assert_eq!(entry.cover_file, "cover.jpg");
        assert_eq!(entry.year, Some(2005));
        assert_eq!(entry.tags, vec!["Action", "Historical"]);
    }

    #[test]
    fn test_reduce_manga_falls_back_to_any_title() {
        let data: MangaData = serde_json::from_value(serde_json::json!({
            "id": "m2",
            "attributes": {"title": {"ja": "ベルセルク"}},
            "relationships": []
        }))
        .unwrap();

        let entry = reduce_manga(data);
        assert_eq!(entry.title, "ベルセルク");
        assert!(entry.author.is_empty());
    }
}
