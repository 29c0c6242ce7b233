//! Count resolution and page fetching with bounded retry.

use crate::catalog::client::CatalogApi;
use crate::catalog::error::FetchError;
use crate::catalog::models::{CatalogItem, PageTask};
use crate::catalog::retry::RetryPolicy;
use tracing::{debug, info};

/// Result of fetching one page.
#[derive(Debug)]
pub enum FetchOutcome {
    /// The whole page was received.
    Fetched(Vec<CatalogItem>),
    /// Every allowed attempt failed.
    Exhausted { task: PageTask, attempts: u32, error: FetchError },
}

/// Resolves the total item count with a single, unretried request.
pub async fn resolve_count<A>(api: &A) -> Result<u64, FetchError>
where
    A: CatalogApi + ?Sized,
{
    let total = api.count().await?;
    info!("Catalog reports {} matching items", total);
    Ok(total)
}

/// Fetches pages under a retry policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct PageFetcher {
    policy: RetryPolicy,
}

impl PageFetcher {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Fetches one page, retrying failures until the policy gives up.
    ///
    /// Never fails: exhaustion is reported as [`FetchOutcome::Exhausted`].
    pub async fn fetch<A>(&self, api: &A, task: PageTask) -> FetchOutcome
    where
        A: CatalogApi + ?Sized,
    {
        let mut attempt = 0;

        loop {
            attempt += 1;

            let error = match api.page(task).await {
                Ok(items) => {
                    debug!("Page {} returned {} items (attempt {})", task, items.len(), attempt);
                    return FetchOutcome::Fetched(items);
                }
                Err(e) => e,
            };

            if !error.is_retryable() || !self.policy.should_retry(attempt) {
                return FetchOutcome::Exhausted { task, attempts: attempt, error };
            }

            let delay = self.policy.delay(attempt);
            debug!(
                "Page {} failed on attempt {}/{}: {}; retrying in {:?}",
                task, attempt, self.policy.max_attempts, error, delay
            );

            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }
    }
}
