// src/integrations/scraper.rs

use std::time::Duration;

use crate::{common::error::AppError, config::settings::ScraperSettings};

/// Polite HTTP fetching for scraped sites: fixed user agent, a delay before
/// every request, and exponential backoff between retries.
pub struct ScraperHttp {
    http_client: reqwest::Client,
    delay: Duration,
    max_retries: u32,
}

impl ScraperHttp {
    pub fn new(settings: &ScraperSettings) -> Result<Self, AppError> {
        let http_client = reqwest::Client::builder()
            .user_agent(settings.user_agent.clone())
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;

        Ok(Self {
            http_client,
            delay: Duration::from_millis(settings.delay_ms),
            max_retries: settings.max_retries.max(1),
        })
    }

    pub fn backoff(&self, attempt: u32) -> Duration {
        self.delay.saturating_mul(2u32.saturating_pow(attempt))
    }

    pub async fn get_text(&self, url: &str) -> Result<String, AppError> {
        let mut last_error = String::new();

        for attempt in 0..self.max_retries {
            tokio::time::sleep(self.backoff(attempt)).await;
            tracing::debug!(url = %url, attempt, "Scraper request");

            match self.http_client.get(url).send().await {
                Ok(response) if response.status().is_success() => {
                    return response.text().await.map_err(|e| AppError::Scraping(e.to_string()));
                }
                Ok(response) => last_error = format!("status {}", response.status()),
                Err(e) => last_error = e.to_string(),
            }
            tracing::warn!(url = %url, attempt, error = %last_error, "Scraper request failed");
        }

        Err(AppError::Scraping(format!(
            "{url} failed after {} attempts: {last_error}",
            self.max_retries
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_each_attempt() {
        let http = ScraperHttp::new(&ScraperSettings { delay_ms: 100, ..ScraperSettings::default() }).unwrap();
        assert_eq!(http.backoff(0), Duration::from_millis(100));
        assert_eq!(http.backoff(1), Duration::from_millis(200));
        assert_eq!(http.backoff(3), Duration::from_millis(800));
    }
}
