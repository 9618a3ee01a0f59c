//! Canary service for periodic liveness check-ins

use crate::error::Result;
use crate::settings::CanarySettings;
use crate::tools::{Fetcher, HttpFetcher};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{error, info};

/// Timeout for one check-in request
pub const CANARY_TIMEOUT: Duration = Duration::from_secs(5);

/// Service that GETs a monitor URL on a fixed interval
#[derive(Clone)]
pub struct CanaryService {
    url: String,
    interval: Duration,
    enabled: bool,
    fetcher: Arc<dyn Fetcher>,
    running: Arc<RwLock<bool>>,
    task_handle: Arc<RwLock<Option<tokio::task::JoinHandle<()>>>>,
}

impl CanaryService {
    /// Create a canary service from settings
    pub fn from_settings(settings: &CanarySettings) -> Result<Self> {
        let fetcher = HttpFetcher::new(CANARY_TIMEOUT)?;
        Ok(Self::new(
            settings.url.clone().unwrap_or_default(),
            settings.interval,
            Arc::new(fetcher),
        )
        .with_enabled(settings.enabled))
    }

    pub fn new(url: impl Into<String>, interval: Duration, fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            url: url.into(),
            interval,
            enabled: true,
            fetcher,
            running: Arc::new(RwLock::new(false)),
            task_handle: Arc::new(RwLock::new(None)),
        }
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Start the check-in loop
    pub async fn start(&self) -> Result<()> {
        if !self.enabled {
            info!("Canary disabled");
            return Ok(());
        }

        *self.running.write().await = true;

        let interval = self.interval;
        let running = Arc::clone(&self.running);
        let fetcher = Arc::clone(&self.fetcher);
        let url = self.url.clone();

        let handle = tokio::spawn(async move {
            info!("Canary started (interval: {}s)", interval.as_secs());

            while *running.read().await {
                tokio::time::sleep(interval).await;

                if !*running.read().await {
                    break;
                }

                Self::check_in(fetcher.as_ref(), &url).await;
            }

            info!("Canary stopped");
        });

        *self.task_handle.write().await = Some(handle);

        Ok(())
    }

    /// Stop the check-in loop
    pub async fn stop(&self) {
        *self.running.write().await = false;

        if let Some(h) = self.task_handle.write().await.take() {
            h.abort();
        }
    }

    /// One check-in; returns whether it succeeded
    pub async fn check_in(fetcher: &dyn Fetcher, url: &str) -> bool {
        match fetcher.fetch(url).await {
            Ok(_) => {
                info!("Canary check-in succeeded");
                true
            }
            Err(e) => {
                error!("Canary check-in to {} failed: {}", url, e);
                false
            }
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::mock::MockFetcher;

    #[tokio::test]
    async fn test_check_in() {
        let fetcher = MockFetcher::with("http://monitor/ping", "ok");
        assert!(CanaryService::check_in(&fetcher, "http://monitor/ping").await);
        assert!(!CanaryService::check_in(&fetcher, "http://monitor/other").await);
    }

    #[tokio::test]
    async fn test_loop_checks_in_until_stopped() {
        let fetcher = Arc::new(MockFetcher::with("http://monitor/ping", "ok"));
        let service = CanaryService::new(
            "http://monitor/ping",
            Duration::from_millis(10),
            fetcher.clone(),
        );

        service.start().await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        service.stop().await;

        let count = fetcher.requested.lock().unwrap().len();
        assert!(count >= 1);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(fetcher.requested.lock().unwrap().len(), count);
    }

    #[tokio::test]
    async fn test_disabled_does_nothing() {
        let fetcher = Arc::new(MockFetcher::default());
        let service = CanaryService::new("http://monitor/ping", Duration::from_millis(5), fetcher.clone())
            .with_enabled(false);
        assert!(!service.is_enabled());
        service.start().await.unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(fetcher.requested.lock().unwrap().is_empty());
    }
}
