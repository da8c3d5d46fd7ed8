//! Thin PostgREST client used by every cell for persistence.
//!
//! The active-slot invariant (at most one scheduled/confirmed appointment
//! per doctor/date/time) is enforced by the storage layer itself through a
//! partial unique index (see migrations/0001_init.sql). A violated insert
//! comes back as HTTP 409 and is mapped to [`PostgrestError::Conflict`], so
//! concurrent check-then-act creates cannot both succeed.

use std::time::Duration;

use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client, Method,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error};

use shared_config::AppConfig;

const STORAGE_TIMEOUT_SECS: u64 = 10;

#[derive(Error, Debug)]
pub enum PostgrestError {
    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("API error ({0}): {1}")]
    Api(u16, String),

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Failed to decode response: {0}")]
    Decode(String),
}

pub struct PostgrestClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl PostgrestClient {
    pub fn new(config: &AppConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(STORAGE_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: config.database_url.clone(),
            api_key: config.database_api_key.clone(),
        }
    }

    fn get_headers(&self, auth_token: Option<&str>) -> HeaderMap {
        let mut headers = HeaderMap::new();

        headers.insert("apikey", HeaderValue::from_str(&self.api_key).unwrap());
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(token) = auth_token {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
            );
        }

        headers
    }

    pub async fn request<T>(
        &self,
        method: Method,
        path: &str,
        auth_token: Option<&str>,
        body: Option<Value>,
    ) -> Result<T, PostgrestError>
    where
        T: DeserializeOwned,
    {
        self.request_with_headers(method, path, auth_token, body, None)
            .await
    }

    pub async fn request_with_headers<T>(
        &self,
        method: Method,
        path: &str,
        auth_token: Option<&str>,
        body: Option<Value>,
        extra_headers: Option<HeaderMap>,
    ) -> Result<T, PostgrestError>
    where
        T: DeserializeOwned,
    {
        let response = self
            .send(method, path, auth_token, body, extra_headers)
            .await?;

        response
            .json::<T>()
            .await
            .map_err(|e| PostgrestError::Decode(e.to_string()))
    }

    /// Sends a request without expecting a response body. PostgREST returns
    /// 204 with an empty body for plain DELETE and PATCH.
    pub async fn request_no_content(
        &self,
        method: Method,
        path: &str,
        auth_token: Option<&str>,
        body: Option<Value>,
    ) -> Result<(), PostgrestError> {
        self.send(method, path, auth_token, body, None).await?;
        Ok(())
    }

    /// Runs a GET with `Prefer: count=exact` and returns both the rows and
    /// the total row count parsed from the Content-Range header.
    pub async fn select_with_count<T>(
        &self,
        path: &str,
        auth_token: Option<&str>,
    ) -> Result<(T, i64), PostgrestError>
    where
        T: DeserializeOwned,
    {
        let mut extra = HeaderMap::new();
        extra.insert("Prefer", HeaderValue::from_static("count=exact"));

        let response = self
            .send(Method::GET, path, auth_token, None, Some(extra))
            .await?;

        let total = response
            .headers()
            .get("Content-Range")
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_range_total)
            .unwrap_or(0);

        let data = response
            .json::<T>()
            .await
            .map_err(|e| PostgrestError::Decode(e.to_string()))?;

        Ok((data, total))
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        auth_token: Option<&str>,
        body: Option<Value>,
        extra_headers: Option<HeaderMap>,
    ) -> Result<reqwest::Response, PostgrestError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making request to {}", url);

        let mut headers = self.get_headers(auth_token);
        if let Some(extra) = extra_headers {
            headers.extend(extra);
        }

        let mut req = self.client.request(method, &url).headers(headers);

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req.send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("API error ({}): {}", status, error_text);

            return Err(match status.as_u16() {
                401 | 403 => PostgrestError::Auth(error_text),
                404 | 406 => PostgrestError::NotFound(error_text),
                409 => PostgrestError::Conflict(error_text),
                code => PostgrestError::Api(code, error_text),
            });
        }

        Ok(response)
    }
}

// Content-Range comes back as "0-9/42" or "*/0".
fn parse_content_range_total(value: &str) -> Option<i64> {
    value.rsplit('/').next()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_content_range_total() {
        assert_eq!(parse_content_range_total("0-9/42"), Some(42));
        assert_eq!(parse_content_range_total("*/0"), Some(0));
        assert_eq!(parse_content_range_total("garbage"), None);
    }
}
