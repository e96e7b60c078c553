//! Concurrent scoring of the items on one page.
//!
//! One task per eligible item runs the aggregator inside a [`JoinSet`].
//! Scores flow through a bounded channel to a single consumer that writes
//! them sequentially, so mutations never run in parallel. The first task
//! error aborts the remaining tasks of the page.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::github::error::UpvoteError;
use crate::github::gateway::{FieldMutationGateway, ProjectGateway};
use crate::github::models::ProjectItem;
use crate::github::rate_limit::RateLimitGovernor;

use super::aggregator::{ItemOutcome, aggregate};
use super::mutator::Mutator;
use super::walker::{PageProgress, RunCounters, apply_outcome};

/// Scores `items` concurrently and writes the results in arrival order.
///
/// Workers are only admitted when the budget covers every eligible item of
/// the page. Skipped items are recorded without spawning a task, once the
/// page has been admitted.
pub(crate) async fn process_page<G, M>(
    gateway: &Arc<G>,
    governor: &Arc<RateLimitGovernor>,
    mutator: &Mutator<M>,
    items: Vec<ProjectItem>,
    counters: &mut RunCounters,
) -> Result<PageProgress, UpvoteError>
where
    G: ProjectGateway + 'static,
    M: FieldMutationGateway + ?Sized,
{
    let mut skipped = Vec::new();
    let mut eligible = Vec::with_capacity(items.len());
    for item in items {
        let Some(reason) = item.skip_reason()? else {
            eligible.push(item);
            continue;
        };
        skipped.push(ItemOutcome::Skipped {
            item_id: item.id,
            reason,
        });
    }

    // A halted page is retried in full, so nothing on it is recorded yet.
    let in_flight = u64::try_from(eligible.len()).unwrap_or(u64::MAX);
    if !eligible.is_empty() && governor.should_halt(in_flight) {
        return Ok(PageProgress::Halted);
    }

    for outcome in &skipped {
        let write = apply_outcome(mutator, outcome).await?;
        counters.record(outcome, write);
    }
    if eligible.is_empty() {
        return Ok(PageProgress::Completed);
    }

    let (sender, receiver) = mpsc::channel(eligible.len());
    let mut tasks = JoinSet::new();
    for item in eligible {
        let task_gateway = Arc::clone(gateway);
        let task_governor = Arc::clone(governor);
        let task_sender = sender.clone();
        tasks.spawn(async move {
            let outcome = aggregate(task_gateway.as_ref(), &task_governor, &item).await?;
            task_sender
                .send(outcome)
                .await
                .map_err(|error| UpvoteError::Task {
                    message: format!("score consumer stopped: {error}"),
                })
        });
    }
    drop(sender);

    tokio::try_join!(supervise(tasks), consume(mutator, receiver, counters))?;
    Ok(PageProgress::Completed)
}

/// Waits for every worker, aborting the rest on the first failure.
async fn supervise(mut tasks: JoinSet<Result<(), UpvoteError>>) -> Result<(), UpvoteError> {
    while let Some(joined) = tasks.join_next().await {
        let result = joined.map_err(|error| UpvoteError::Task {
            message: error.to_string(),
        });
        if let Err(error) = result.and_then(|finished| finished) {
            tasks.abort_all();
            return Err(error);
        }
    }
    Ok(())
}

async fn consume<M>(
    mutator: &Mutator<M>,
    mut receiver: mpsc::Receiver<ItemOutcome>,
    counters: &mut RunCounters,
) -> Result<(), UpvoteError>
where
    M: FieldMutationGateway + ?Sized,
{
    while let Some(outcome) = receiver.recv().await {
        let write = apply_outcome(mutator, &outcome).await?;
        counters.record(&outcome, write);
    }
    Ok(())
}
