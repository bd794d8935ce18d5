//! Strava integration
//!
//! Activities are fetched only when the access token is refreshed (the cron
//! endpoint or the `refresh` command) and written to a JSON data file; the
//! activities page reads the file. This keeps request handling off the
//! Strava API entirely.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use crate::config::{Secrets, StravaConfig};
use crate::error::{Result, ServiceError};

/// One activity, reduced to the fields the page renders
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub id: i64,
    pub start_date_local: String,
    pub distance: f64,
    pub moving_time: i64,
}

/// Strava OAuth token response
#[derive(Debug, Clone, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Client for the Strava API
pub struct StravaClient {
    http: reqwest::Client,
    api_url: String,
    token_url: String,
    client_id: Option<String>,
    client_secret: Option<String>,
    refresh_token: Option<String>,
    /// Refreshed bearer token; never read from the environment after startup
    access_token: RwLock<Option<String>>,
    data_path: PathBuf,
    after_epoch: i64,
}

impl StravaClient {
    pub fn new(config: &StravaConfig, secrets: &Secrets, data_dir: &Path) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url: config.api_url.trim_end_matches('/').to_string(),
            token_url: config.token_url.clone(),
            client_id: secrets.strava_client_id.clone(),
            client_secret: secrets.strava_client_secret.clone(),
            refresh_token: secrets.strava_refresh_token.clone(),
            access_token: RwLock::new(None),
            data_path: data_dir.join(&config.data_file),
            after_epoch: config.after_epoch,
        }
    }

    /// Whether OAuth credentials were provided at startup
    pub fn is_configured(&self) -> bool {
        self.client_id.is_some() && self.client_secret.is_some() && self.refresh_token.is_some()
    }

    /// Exchange the refresh token for a fresh access token, then pull
    /// activities into the data file
    pub async fn refresh_and_update(&self) -> Result<()> {
        self.refresh_access_token().await?;
        self.update_data().await
    }

    async fn refresh_access_token(&self) -> Result<()> {
        let client_id = self
            .client_id
            .as_deref()
            .ok_or(ServiceError::MissingCredential("STRAVA_CLIENT_ID"))?;
        let client_secret = self
            .client_secret
            .as_deref()
            .ok_or(ServiceError::MissingCredential("STRAVA_CLIENT_SECRET"))?;
        let refresh_token = self
            .refresh_token
            .as_deref()
            .ok_or(ServiceError::MissingCredential("STRAVA_REFRESH_TOKEN"))?;

        let resp = self
            .http
            .post(&self.token_url)
            .form(&[
                ("client_id", client_id),
                ("client_secret", client_secret),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
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

        tracing::info!("Refreshed Strava access token");
        Ok(())
    }

    /// Fetch all activities and write them to the data file
    pub async fn update_data(&self) -> Result<()> {
        let activities = self.fetch_activities().await?;
        tracing::info!("Fetched {} Strava activities", activities.len());

        if let Some(parent) = self.data_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_vec_pretty(&activities)?;
        std::fs::write(&self.data_path, json)?;
        Ok(())
    }

    /// Paginated activity fetch, oldest cutoff from config
    async fn fetch_activities(&self) -> Result<Vec<Activity>> {
        let token = self
            .access_token
            .read()
            .expect("token lock poisoned")
            .clone()
            .ok_or(ServiceError::MissingCredential("strava access token"))?;

        let mut all = Vec::new();
        let mut page = 1u32;
        let per_page = 100usize;

        loop {
            let url = format!(
                "{}/athlete/activities?after={}&page={}&per_page={}",
                self.api_url, self.after_epoch, page, per_page
            );

            let resp = self.http.get(&url).bearer_auth(&token).send().await?;
            if !resp.status().is_success() {
                return Err(ServiceError::UnexpectedStatus {
                    status: resp.status(),
                    url: resp.url().to_string(),
                });
            }

            let batch: Vec<Activity> = resp.json().await?;
            if batch.is_empty() {
                break;
            }

            let short_page = batch.len() < per_page;
            all.extend(batch);
            if short_page {
                break;
            }
            page += 1;
        }

        Ok(all)
    }

    /// Read activities from the data file
    pub fn load_activities(&self) -> Result<Vec<Activity>> {
        let json = std::fs::read(&self.data_path)?;
        Ok(serde_json::from_slice(&json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unconfigured_without_credentials() {
        let secrets = Secrets::default();
        let dir = tempfile::tempdir().unwrap();
        let client = StravaClient::new(&StravaConfig::default(), &secrets, dir.path());
        assert!(!client.is_configured());
    }

    #[test]
    fn test_load_activities_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let secrets = Secrets::default();
        let client = StravaClient::new(&StravaConfig::default(), &secrets, dir.path());

        let activities = vec![Activity {
            id: 1,
            start_date_local: "2025-03-01T06:30:00Z".to_string(),
            distance: 5012.3,
            moving_time: 1800,
        }];
        std::fs::write(
            dir.path().join("activities.json"),
            serde_json::to_vec(&activities).unwrap(),
        )
        .unwrap();

        assert_eq!(client.load_activities().unwrap(), activities);
    }
}
