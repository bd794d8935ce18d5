//! Notion API client

use reqwest::StatusCode;
use std::path::Path;

use super::model::{BlockChildrenResponse, PageEntry, QueryDatabaseResponse, SlugEntry};
use crate::config::NotionConfig;
use crate::error::{Result, ServiceError};

/// Client for the Notion REST API
#[derive(Debug, Clone)]
pub struct NotionClient {
    http: reqwest::Client,
    api_url: String,
    api_version: String,
    token: String,
    database_id: String,
}

impl NotionClient {
    pub fn new(config: &NotionConfig, token: &str) -> Self {
        let database_id = crate::config::Secrets::database_id_from_env()
            .unwrap_or_else(|| config.database_id.clone());

        Self {
            http: reqwest::Client::new(),
            api_url: config.api_url.trim_end_matches('/').to_string(),
            api_version: config.api_version.clone(),
            token: token.to_string(),
            database_id,
        }
    }

    pub fn database_id(&self) -> &str {
        &self.database_id
    }

    /// Map upstream failures to typed errors; 429 gets its own variant so
    /// callers can keep serving stale content
    fn check(&self, resp: reqwest::Response) -> Result<reqwest::Response> {
        match resp.status() {
            StatusCode::TOO_MANY_REQUESTS => {
                tracing::warn!("Notion rate limit hit");
                Err(ServiceError::RateLimited)
            }
            status if !status.is_success() => Err(ServiceError::UnexpectedStatus {
                status,
                url: resp.url().to_string(),
            }),
            _ => Ok(resp),
        }
    }

    /// Query a database, following pagination cursors
    pub async fn query_database(
        &self,
        database_id: &str,
        filter: Option<&str>,
    ) -> Result<Vec<PageEntry>> {
        let url = format!("{}/databases/{}/query", self.api_url, database_id);
        let mut entries = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut body = serde_json::json!({ "page_size": 100 });
            if let Some(category) = filter {
                body["filter"] = serde_json::json!({
                    "property": "category",
                    "select": { "equals": category }
                });
            }
            if let Some(ref start) = cursor {
                body["start_cursor"] = serde_json::json!(start);
            }

            let resp = self
                .http
                .post(&url)
                .bearer_auth(&self.token)
                .header("Content-Type", "application/json")
                .header("Notion-Version", &self.api_version)
                .json(&body)
                .send()
                .await?;
            let page: QueryDatabaseResponse = self.check(resp)?.json().await?;

            entries.extend(page.results);

            match (page.has_more, page.next_cursor) {
                (true, Some(next)) => cursor = Some(next),
                _ => break,
            }
        }

        Ok(entries)
    }

    /// Query a database and reduce the rows to listing entries.
    ///
    /// Rows without a slug or a title are skipped; an empty rich_text is a
    /// valid API response, not an error.
    pub async fn slug_entries(
        &self,
        database_id: &str,
        filter: Option<&str>,
    ) -> Result<Vec<SlugEntry>> {
        let entries = self.query_database(database_id, filter).await?;

        let slug_entries = entries
            .into_iter()
            .filter_map(|entry| {
                let slug = entry
                    .properties
                    .slug
                    .rich_text
                    .first()
                    .map(|rt| rt.plain_text.clone())?;
                let title = entry
                    .properties
                    .name
                    .title
                    .first()
                    .map(|rt| rt.plain_text.clone())?;
                if slug.is_empty() || title.is_empty() {
                    return None;
                }
                Some(SlugEntry {
                    id: entry.id,
                    title,
                    created_time: entry.created_time,
                    slug,
                })
            })
            .collect();

        Ok(slug_entries)
    }

    /// Fetch the child blocks of a block or page, following pagination.
    ///
    /// Results stay as raw JSON so they can be cached verbatim and parsed
    /// leniently at render time.
    pub async fn block_children(&self, block_id: &str) -> Result<Vec<serde_json::Value>> {
        let url = format!("{}/blocks/{}/children", self.api_url, block_id);
        let mut blocks = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut req = self
                .http
                .get(&url)
                .bearer_auth(&self.token)
                .header("Content-Type", "application/json")
                .header("Notion-Version", &self.api_version)
                .query(&[("page_size", "100")]);
            if let Some(ref start) = cursor {
                req = req.query(&[("start_cursor", start.as_str())]);
            }

            let resp = req.send().await?;
            let page: BlockChildrenResponse = self.check(resp)?.json().await?;

            blocks.extend(page.results);

            match (page.has_more, page.next_cursor) {
                (true, Some(next)) => cursor = Some(next),
                _ => break,
            }
        }

        Ok(blocks)
    }

    /// Fetch a page and pull its title out of the properties map
    pub async fn page_title(&self, page_id: &str) -> Result<Option<String>> {
        let url = format!("{}/pages/{}", self.api_url, page_id);
        let resp = self
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .header("Notion-Version", &self.api_version)
            .send()
            .await?;
        let page: serde_json::Value = self.check(resp)?.json().await?;

        let title = page
            .get("properties")
            .and_then(|props| props.as_object())
            .and_then(|props| {
                props
                    .values()
                    .find(|prop| prop.get("type").and_then(|t| t.as_str()) == Some("title"))
            })
            .and_then(|prop| prop.get("title"))
            .and_then(|title| title.get(0))
            .and_then(|span| span.get("plain_text"))
            .and_then(|text| text.as_str())
            .map(|text| text.to_string());

        Ok(title)
    }

    /// Mirror image blocks to the local images directory.
    ///
    /// Notion file URLs are AWS-signed and expire, so each cache refresh
    /// downloads the image and rewrites the block to a stable local URL.
    /// A failed download keeps the signed URL and moves on.
    pub async fn mirror_images(
        &self,
        blocks: &mut [serde_json::Value],
        images_dir: &Path,
        public_prefix: &str,
    ) -> Result<()> {
        std::fs::create_dir_all(images_dir)?;

        for block in blocks.iter_mut() {
            if block.get("type").and_then(|t| t.as_str()) != Some("image") {
                continue;
            }
            let Some(id) = block.get("id").and_then(|v| v.as_str()).map(String::from) else {
                continue;
            };
            let Some(url) = block
                .pointer("/image/file/url")
                .and_then(|v| v.as_str())
                .map(String::from)
            else {
                continue;
            };

            match self.download_image(&url).await {
                Ok(bytes) => {
                    let file_path = images_dir.join(format!("{}.png", id));
                    if let Err(e) = std::fs::write(&file_path, &bytes) {
                        tracing::error!("error writing image {:?}: {}", file_path, e);
                        continue;
                    }
                    let local_url = format!("{}/{}.png", public_prefix.trim_end_matches('/'), id);
                    if let Some(slot) = block.pointer_mut("/image/file/url") {
                        *slot = serde_json::json!(local_url);
                    }
                }
                Err(e) => {
                    tracing::error!("error mirroring image {}: {}", id, e);
                }
            }
        }

        Ok(())
    }

    async fn download_image(&self, url: &str) -> Result<Vec<u8>> {
        let resp = self.http.get(url).send().await?;
        let resp = self.check(resp)?;
        Ok(resp.bytes().await?.to_vec())
    }
}
