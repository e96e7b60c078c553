//! Walks the project item list page by page.

use std::sync::Arc;

use crate::github::cursor::OuterCursor;
use crate::github::error::UpvoteError;
use crate::github::gateway::{FieldMutationGateway, ProjectGateway};
use crate::github::models::ProjectItem;
use crate::github::rate_limit::RateLimitGovernor;

use super::aggregator::{ItemOutcome, aggregate};
use super::mutator::{Mutator, WriteOutcome};
use super::orchestrator;

/// Default number of project items fetched per page.
pub const DEFAULT_PAGE_SIZE: u8 = 10;

/// Knobs for a single run, already validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSettings {
    /// Items fetched per outer page.
    pub page_size: u8,
    /// Score the items of a page concurrently.
    pub concurrency: bool,
    /// Where the run starts.
    pub start: OuterCursor,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            concurrency: false,
            start: OuterCursor::start(),
        }
    }
}

/// Terminal state of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every page was processed.
    Done,
    /// The rate limit reserve was reached; the run can resume later.
    RateLimited,
    /// A query or mutation failed.
    Failed(UpvoteError),
}

impl RunOutcome {
    /// Short label used in logs and telemetry.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Done => "done",
            Self::RateLimited => "rate_limited",
            Self::Failed(_) => "failed",
        }
    }

    /// Returns true unless the run failed.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        !matches!(self, Self::Failed(_))
    }
}

/// Per-run item counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunCounters {
    /// Items that received a score.
    pub scored: u64,
    /// Items skipped as archived, draft, redacted, or closed.
    pub skipped: u64,
    /// Scores written back.
    pub written: u64,
}

impl RunCounters {
    /// Records one item outcome and its write result, if any.
    pub fn record(&mut self, outcome: &ItemOutcome, write: Option<WriteOutcome>) {
        match outcome {
            ItemOutcome::Skipped { .. } => self.skipped += 1,
            ItemOutcome::Scored(_) => self.scored += 1,
        }
        if write == Some(WriteOutcome::Written) {
            self.written += 1;
        }
    }
}

/// Summary returned by [`Walker::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// How the run ended.
    pub outcome: RunOutcome,
    /// Cursor to resume from; the start position once the list is exhausted.
    pub cursor: OuterCursor,
    /// Item counters.
    pub counters: RunCounters,
    /// Rate limit points spent by the run.
    pub rate_limit_cost: u64,
}

/// Whether a page ran to completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PageProgress {
    Completed,
    Halted,
}

/// Drives a run over the project's items.
pub struct Walker<G, M: ?Sized> {
    gateway: Arc<G>,
    mutator: Mutator<M>,
    governor: Arc<RateLimitGovernor>,
    settings: RunSettings,
}

impl<G, M> Walker<G, M>
where
    G: ProjectGateway + 'static,
    M: FieldMutationGateway + ?Sized,
{
    /// Creates a walker; `governor` must be the one the mutator charges.
    #[must_use]
    pub const fn new(
        gateway: Arc<G>,
        mutator: Mutator<M>,
        governor: Arc<RateLimitGovernor>,
        settings: RunSettings,
    ) -> Self {
        Self {
            gateway,
            mutator,
            governor,
            settings,
        }
    }

    /// Runs until the list is exhausted, the budget reserve is reached, or an
    /// error occurs.
    ///
    /// The cursor only moves past a page once every item on it has been
    /// skipped or scored and written, so a halted run resumes at the first
    /// unfinished page.
    pub async fn run(&self) -> RunReport {
        let mut cursor = self.settings.start.clone();
        let mut counters = RunCounters::default();
        let outcome = self.walk(&mut cursor, &mut counters).await;

        match &outcome {
            RunOutcome::Done => tracing::info!("all project items processed"),
            RunOutcome::RateLimited => tracing::info!(
                remaining = ?self.governor.remaining(),
                cursor = cursor.output_value(),
                "rate limit reserve reached, halting"
            ),
            RunOutcome::Failed(error) => tracing::error!(
                %error,
                cursor = cursor.output_value(),
                "run failed"
            ),
        }

        RunReport {
            outcome,
            cursor,
            counters,
            rate_limit_cost: self.governor.spent(),
        }
    }

    async fn walk(&self, cursor: &mut OuterCursor, counters: &mut RunCounters) -> RunOutcome {
        let page_size = self.settings.page_size;
        loop {
            if self.governor.should_halt(u64::from(page_size)) {
                return RunOutcome::RateLimited;
            }

            tracing::debug!(cursor = cursor.output_value(), page_size, "fetching items page");
            let page = match self.gateway.project_items(cursor, page_size).await {
                Ok(page) => page,
                Err(error) => return RunOutcome::Failed(error),
            };
            self.governor.observe(page.rate_limit);
            let page_info = page.items.page_info;
            if page_info.has_next_page() && page_info.end_cursor().is_none() {
                return RunOutcome::Failed(UpvoteError::MalformedResponse {
                    operation: "project items".to_owned(),
                    message: "items page reports another page without an end cursor".to_owned(),
                });
            }

            let progress = if self.settings.concurrency {
                orchestrator::process_page(
                    &self.gateway,
                    &self.governor,
                    &self.mutator,
                    page.items.nodes,
                    counters,
                )
                .await
            } else {
                self.process_sequentially(&page.items.nodes, counters).await
            };

            match progress {
                Ok(PageProgress::Completed) => {}
                Ok(PageProgress::Halted) => return RunOutcome::RateLimited,
                Err(error) => return RunOutcome::Failed(error),
            }

            if page_info.is_last_page() {
                *cursor = OuterCursor::start();
                return RunOutcome::Done;
            }
            cursor.advance_past(&page_info);
        }
    }

    async fn process_sequentially(
        &self,
        items: &[ProjectItem],
        counters: &mut RunCounters,
    ) -> Result<PageProgress, UpvoteError> {
        for item in items {
            let outcome = aggregate(self.gateway.as_ref(), &self.governor, item).await?;
            let write = apply_outcome(&self.mutator, &outcome).await?;
            counters.record(&outcome, write);
        }
        Ok(PageProgress::Completed)
    }
}

/// Logs a skip or hands a score to the mutator.
pub(crate) async fn apply_outcome<M>(
    mutator: &Mutator<M>,
    outcome: &ItemOutcome,
) -> Result<Option<WriteOutcome>, UpvoteError>
where
    M: FieldMutationGateway + ?Sized,
{
    match outcome {
        ItemOutcome::Skipped { item_id, reason } => {
            tracing::info!(item = %item_id, reason = reason.as_str(), "skipped item");
            Ok(None)
        }
        ItemOutcome::Scored(score) => mutator.apply(score).await.map(Some),
    }
}
