//! Harvest command: the concurrent pagination and aggregation pipeline.

use crate::catalog::{
    resolve_count, CatalogApi, CatalogClient, FetchOutcome, OutputRecord, PageFetcher, PageTask,
};
use crate::config::Config;
use crate::filters::RecordMapper;
use crate::output::{spawn_writer, CsvSink};
use anyhow::{Context, Result};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Record batches buffered between page tasks and the writer.
const WRITER_CAPACITY: usize = 64;

/// Lifecycle of a harvest run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HarvestState {
    Idle,
    CountPending,
    Dispatching,
    Awaiting,
    /// All page tasks finished, whether or not some of them failed.
    Done,
    /// The count could not be resolved or the output could not be written.
    Failed,
}

impl fmt::Display for HarvestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HarvestState::Idle => "idle",
            HarvestState::CountPending => "count-pending",
            HarvestState::Dispatching => "dispatching",
            HarvestState::Awaiting => "awaiting",
            HarvestState::Done => "done",
            HarvestState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Summary of a finished run.
#[derive(Debug, Clone)]
pub struct HarvestReport {
    /// Item count reported by the catalog
    pub total: u64,
    /// Number of page tasks dispatched
    pub pages: usize,
    /// Data rows written to the output
    pub rows_written: usize,
    /// Pages whose items were not written, sorted by offset
    pub failed: Vec<PageTask>,
    pub elapsed: Duration,
}

impl HarvestReport {
    /// Returns true if every page was written.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

enum PageResult {
    Written,
    Failed(PageTask),
}

/// Fetches every catalog page concurrently and exports matching items.
pub struct HarvestCommand {
    config: Config,
    state: HarvestState,
}

impl HarvestCommand {
    /// Creates a new harvest command.
    pub fn new(config: Config) -> Self {
        Self { config, state: HarvestState::Idle }
    }

    pub fn state(&self) -> HarvestState {
        self.state
    }

    fn transition(&mut self, next: HarvestState) {
        debug!("Harvest state: {} -> {}", self.state, next);
        self.state = next;
    }

    /// Runs the harvest against the configured catalog endpoint.
    pub async fn execute(&mut self) -> Result<HarvestReport> {
        self.config.validate()?;
        let client = CatalogClient::new(&self.config).context("Failed to create HTTP client")?;

        self.execute_with_client(Arc::new(client)).await
    }

    /// Runs the harvest with a provided client (for testing).
    ///
    /// Fails only if the count cannot be resolved or the output cannot be
    /// written. Pages that exhaust their retries are logged and listed in
    /// [`HarvestReport::failed`].
    pub async fn execute_with_client<A>(&mut self, api: Arc<A>) -> Result<HarvestReport>
    where
        A: CatalogApi + 'static,
    {
        self.config.validate()?;
        let started = Instant::now();

        self.transition(HarvestState::CountPending);
        let total = match resolve_count(api.as_ref()).await {
            Ok(total) => total,
            Err(e) => {
                self.transition(HarvestState::Failed);
                return Err(anyhow::Error::new(e).context("Failed to connect host"));
            }
        };
        info!("Connections have been successfully created. {} products were found.", total);

        let (pages, rows_written, mut failed) = match self.dispatch(api, total).await {
            Ok(done) => done,
            Err(e) => {
                self.transition(HarvestState::Failed);
                return Err(e);
            }
        };
        self.transition(HarvestState::Done);

        failed.sort_by_key(|task| task.offset);
        let report = HarvestReport { total, pages, rows_written, failed, elapsed: started.elapsed() };

        info!(
            "Wrote {} rows from {} pages ({} failed) to {}",
            report.rows_written,
            report.pages,
            report.failed.len(),
            self.config.output.display()
        );

        Ok(report)
    }

    /// Fans out one task per page and waits for them and the writer.
    ///
    /// Returns the page count, rows written, and the pages that failed.
    async fn dispatch<A>(&mut self, api: Arc<A>, total: u64) -> Result<(usize, usize, Vec<PageTask>)>
    where
        A: CatalogApi + 'static,
    {
        self.transition(HarvestState::Dispatching);
        let sink = CsvSink::create(&self.config.output)?;
        let (tx, writer) = spawn_writer(sink, WRITER_CAPACITY);

        let tasks = PageTask::plan(total, self.config.page_size);
        let pages = tasks.len();
        let mapper = Arc::new(RecordMapper::for_regions(self.config.regions.clone()));
        let fetcher = PageFetcher::new(self.config.retry);
        let limiter = self.config.concurrency.map(|n| Arc::new(Semaphore::new(n)));

        debug!("Dispatching {} page tasks ({})", pages, mapper.description());

        let mut set = JoinSet::new();
        for task in tasks {
            // Blocks at the concurrency limit
            let permit = match &limiter {
                Some(semaphore) => Some(
                    semaphore.clone().acquire_owned().await.context("Concurrency limiter closed")?,
                ),
                None => None,
            };

            let api = Arc::clone(&api);
            let mapper = Arc::clone(&mapper);
            let tx = tx.clone();

            set.spawn(async move {
                let _permit = permit;

                // Inner task so a panic still maps back to its page
                let page = tokio::spawn(async move {
                    run_page(api.as_ref(), &fetcher, &mapper, &tx, task).await
                });

                match page.await {
                    Ok(result) => result,
                    Err(e) => {
                        warn!(
                            "Page task panicked ({}). Items from offset {} to {} not written",
                            e,
                            task.offset,
                            task.end()
                        );
                        PageResult::Failed(task)
                    }
                }
            });
        }
        drop(tx);

        self.transition(HarvestState::Awaiting);
        let mut failed = Vec::new();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(PageResult::Written) => {}
                Ok(PageResult::Failed(task)) => failed.push(task),
                Err(e) => warn!("Page dispatcher task failed: {}", e),
            }
        }

        let rows_written = writer.await.context("Output writer task panicked")??;
        Ok((pages, rows_written, failed))
    }
}

/// Fetches, maps, and forwards one page to the writer.
async fn run_page<A>(
    api: &A,
    fetcher: &PageFetcher,
    mapper: &RecordMapper,
    tx: &mpsc::Sender<Vec<OutputRecord>>,
    task: PageTask,
) -> PageResult
where
    A: CatalogApi + ?Sized,
{
    match fetcher.fetch(api, task).await {
        FetchOutcome::Fetched(items) => {
            let fetched = items.len();
            let records = mapper.map_page(items);
            debug!("Page {}: {} of {} items matched", task, records.len(), fetched);

            if !records.is_empty() && tx.send(records).await.is_err() {
                warn!(
                    "Output writer closed. Items from offset {} to {} not written",
                    task.offset,
                    task.end()
                );
                return PageResult::Failed(task);
            }
            PageResult::Written
        }
        FetchOutcome::Exhausted { task, attempts, error } => {
            warn!(
                "Failed to connect host after {} attempts ({}). Items from offset {} to {} not written",
                attempts,
                error,
                task.offset,
                task.end()
            );
            PageResult::Failed(task)
        }
    }
}
