//! HTTP client for end-to-end tests
//!
//! Wraps reqwest with one method per cleanup endpoint.

use super::constants::*;
use reqwest::Response;
use std::time::Duration;

pub struct TestClient {
    pub client: reqwest::Client,
    pub base_url: String,
}

impl TestClient {
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self { client, base_url }
    }

    /// POST /v1/history/cleanup, omitting `immediatelyDue` when `None`.
    pub async fn trigger_cleanup(&self, immediately_due: Option<bool>) -> Response {
        let mut url = format!("{}/v1/history/cleanup", self.base_url);
        if let Some(value) = immediately_due {
            url = format!("{}?immediatelyDue={}", url, value);
        }
        self.client
            .post(url)
            .send()
            .await
            .expect("Trigger request failed")
    }

    pub async fn get_job(&self) -> Response {
        self.client
            .get(format!("{}/v1/history/cleanup/job", self.base_url))
            .send()
            .await
            .expect("Get job request failed")
    }

    pub async fn get_configuration(&self) -> Response {
        self.client
            .get(format!("{}/v1/history/cleanup/configuration", self.base_url))
            .send()
            .await
            .expect("Get configuration request failed")
    }

    pub async fn get_runs(&self) -> Response {
        self.client
            .get(format!("{}/v1/history/cleanup/runs", self.base_url))
            .send()
            .await
            .expect("Get runs request failed")
    }
}
