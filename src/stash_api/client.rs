/// Public stash feed client
///
/// Pages through the public stash tab feed using the `next_change_id`
/// cursor. Requests are spaced out to respect the upstream rate limit and
/// server errors are retried with exponential backoff.

use super::types::{ ApiStash, StashApiError, StashApiResult, StashTabsPage };
use crate::constants::{
    API_BACKOFF_BASE_MS,
    API_MAX_RETRIES,
    API_RATE_LIMIT_MS,
    STASH_API_ENDPOINT,
};
use crate::logger::{ self, LogTag };

use reqwest::Client;
use std::time::Duration;
use tokio::time::Instant;

pub struct StashClient {
    http_client: Client,
    api_root: String,
    next_id: Option<String>,
    last_request: Option<Instant>,
}

impl StashClient {
    /// Create a feed client, optionally resuming from a known cursor
    pub fn new(next_id: Option<String>) -> Self {
        Self {
            http_client: Client::new(),
            api_root: STASH_API_ENDPOINT.to_string(),
            next_id,
            last_request: None,
        }
    }

    /// Create a client against a different API root, e.g. a mock server
    pub fn with_api_root(api_root: &str, next_id: Option<String>) -> Self {
        Self {
            api_root: api_root.to_string(),
            ..Self::new(next_id)
        }
    }

    /// The cursor that will be used for the next request
    pub fn next_change_id(&self) -> Option<&str> {
        self.next_id.as_deref()
    }

    /// Fetch the next feed page and advance the cursor
    ///
    /// Returns the page's validated stashes; invalid entries are skipped.
    pub async fn get_next(&mut self) -> StashApiResult<Vec<ApiStash>> {
        self.rate_wait().await;

        let url = match &self.next_id {
            Some(id) => {
                logger::info(LogTag::Api, &format!("Requesting next stash set: {}", id));
                format!("{}?id={}", self.api_root, id)
            }
            None => {
                logger::info(LogTag::Api, "Requesting first stash set");
                self.api_root.clone()
            }
        };

        let body = self.get_with_retry(&url).await?;
        logger::debug(LogTag::Api, "Acquired stash data");

        let page: StashTabsPage = serde_json::from_str(&body)?;
        self.next_id = Some(page.next_change_id.clone());

        Ok(page.valid_stashes())
    }

    /// GET with exponential backoff on server errors
    async fn get_with_retry(&self, url: &str) -> StashApiResult<String> {
        let mut last_status = 0u16;
        for attempt in 0..API_MAX_RETRIES {
            if attempt > 0 {
                let delay = API_BACKOFF_BASE_MS * (1u64 << (attempt - 1).min(6));
                logger::warn(
                    LogTag::Api,
                    &format!("Feed request failed ({}), retry {} in {}ms", last_status, attempt, delay)
                );
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }

            let response = match self.http_client.get(url).send().await {
                Ok(response) => response,
                Err(e) => {
                    if attempt + 1 == API_MAX_RETRIES {
                        return Err(StashApiError::Http(e));
                    }
                    last_status = 0;
                    continue;
                }
            };

            let status = response.status();
            if status.is_server_error() {
                last_status = status.as_u16();
                continue;
            }
            if !status.is_success() {
                return Err(StashApiError::Status(status.as_u16(), attempt + 1));
            }

            return Ok(response.text().await?);
        }

        Err(StashApiError::Status(last_status, API_MAX_RETRIES))
    }

    /// Pause for the rest of the time left in our rate limiting window
    async fn rate_wait(&mut self) {
        if let Some(last) = self.last_request {
            let window = Duration::from_millis(API_RATE_LIMIT_MS);
            let elapsed = last.elapsed();
            if elapsed < window {
                tokio::time::sleep(window - elapsed).await;
            }
        }
        self.last_request = Some(Instant::now());
    }
}
