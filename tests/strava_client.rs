use httpmock::prelude::*;
use notion_blog::config::{Secrets, StravaConfig};
use notion_blog::strava::{Activity, StravaClient};

fn test_secrets() -> Secrets {
    Secrets {
        notion_token: "unused".to_string(),
        strava_client_id: Some("id1".to_string()),
        strava_client_secret: Some("secret1".to_string()),
        strava_refresh_token: Some("refresh1".to_string()),
        ..Secrets::default()
    }
}

fn test_config(server: &MockServer) -> StravaConfig {
    StravaConfig {
        api_url: server.url(""),
        token_url: server.url("/oauth/token"),
        after_epoch: 1735660800,
        ..StravaConfig::default()
    }
}

fn activity(id: i64) -> Activity {
    Activity {
        id,
        start_date_local: "2025-03-01T06:30:00Z".to_string(),
        distance: 5000.0,
        moving_time: 1800,
    }
}

#[tokio::test]
async fn test_refresh_and_update_writes_data_file() {
    let server = MockServer::start();
    let data_dir = tempfile::tempdir().unwrap();

    let token_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/oauth/token")
            .body_contains("grant_type=refresh_token")
            .body_contains("client_id=id1")
            .body_contains("refresh_token=refresh1");
        then.status(200)
            .json_body(serde_json::json!({"access_token": "fresh-token"}));
    });

    let activities_mock = server.mock(|when, then| {
        when.method(GET)
            .path("/athlete/activities")
            .query_param("after", "1735660800")
            .query_param("page", "1")
            .header("Authorization", "Bearer fresh-token");
        then.status(200)
            .json_body(serde_json::to_value(vec![activity(1), activity(2)]).unwrap());
    });

    let client = StravaClient::new(&test_config(&server), &test_secrets(), data_dir.path());
    client.refresh_and_update().await.unwrap();

    token_mock.assert();
    activities_mock.assert();

    let loaded = client.load_activities().unwrap();
    assert_eq!(loaded.len(), 2);
    assert_eq!(loaded[0].id, 1);
}

#[tokio::test]
async fn test_activity_fetch_paginates_until_short_page() {
    let server = MockServer::start();
    let data_dir = tempfile::tempdir().unwrap();

    server.mock(|when, then| {
        when.method(POST).path("/oauth/token");
        then.status(200)
            .json_body(serde_json::json!({"access_token": "fresh-token"}));
    });

    let full_page: Vec<Activity> = (0..100).map(activity).collect();
    let page1_mock = server.mock(|when, then| {
        when.method(GET)
            .path("/athlete/activities")
            .query_param("page", "1");
        then.status(200)
            .json_body(serde_json::to_value(&full_page).unwrap());
    });
    let page2_mock = server.mock(|when, then| {
        when.method(GET)
            .path("/athlete/activities")
            .query_param("page", "2");
        then.status(200)
            .json_body(serde_json::to_value(vec![activity(100)]).unwrap());
    });

    let client = StravaClient::new(&test_config(&server), &test_secrets(), data_dir.path());
    client.refresh_and_update().await.unwrap();

    page1_mock.assert();
    page2_mock.assert();
    assert_eq!(client.load_activities().unwrap().len(), 101);
}

#[tokio::test]
async fn test_refresh_without_credentials_fails() {
    let server = MockServer::start();
    let data_dir = tempfile::tempdir().unwrap();

    let client = StravaClient::new(&test_config(&server), &Secrets::default(), data_dir.path());
    assert!(client.refresh_and_update().await.is_err());
}

#[tokio::test]
async fn test_failed_token_refresh_is_an_error() {
    let server = MockServer::start();
    let data_dir = tempfile::tempdir().unwrap();

    server.mock(|when, then| {
        when.method(POST).path("/oauth/token");
        then.status(401);
    });

    let client = StravaClient::new(&test_config(&server), &test_secrets(), data_dir.path());
    assert!(client.refresh_and_update().await.is_err());
}
