//! Per-item upvote aggregation.
//!
//! An item's score is the base score of its content plus the contribution of
//! every node on every page of its nested connections. The first page of each
//! connection arrives embedded in the project item list; further pages are
//! fetched by re-querying the item with advanced inner cursors until every
//! connection is exhausted.

use crate::github::cursor::InnerCursorSet;
use crate::github::error::UpvoteError;
use crate::github::gateway::ProjectGateway;
use crate::github::locator::ProjectItemId;
use crate::github::models::{ProjectItem, SkipReason};
use crate::github::rate_limit::RateLimitGovernor;

/// A computed score together with the value currently stored on the item.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemScore {
    /// Item the score belongs to.
    pub item_id: ProjectItemId,
    /// Freshly computed score.
    pub score: u64,
    /// Value of the upvote field before this run, if set.
    pub previous: Option<f64>,
}

impl ItemScore {
    /// Returns true when the stored value already equals the score.
    #[must_use]
    pub fn is_unchanged(&self) -> bool {
        let Some(previous) = self.previous else {
            return false;
        };
        u32::try_from(self.score)
            .map(f64::from)
            .is_ok_and(|score| previous.partial_cmp(&score) == Some(std::cmp::Ordering::Equal))
    }
}

/// Result of aggregating a single project item.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemOutcome {
    /// The item is not eligible for scoring.
    Skipped {
        /// Item that was skipped.
        item_id: ProjectItemId,
        /// Why it was skipped.
        reason: SkipReason,
    },
    /// The item was scored.
    Scored(ItemScore),
}

/// Computes the outcome for `item`, paging nested connections as needed.
///
/// # Errors
///
/// Returns the first gateway error, or [`UpvoteError::UnresolvableContent`]
/// when the item's content does not match its type.
pub async fn aggregate<G>(
    gateway: &G,
    governor: &RateLimitGovernor,
    item: &ProjectItem,
) -> Result<ItemOutcome, UpvoteError>
where
    G: ProjectGateway + ?Sized,
{
    if let Some(reason) = item.skip_reason()? {
        return Ok(ItemOutcome::Skipped {
            item_id: item.id.clone(),
            reason,
        });
    }

    let content = item.resolve()?;
    let mut cursors = InnerCursorSet::default();
    let mut score = content
        .base_score()
        .saturating_add(cursors.absorb(&content.connection_pages())?);

    while cursors.has_pending() {
        tracing::debug!(item = %item.id, ?cursors, "fetching further connection pages");
        let page = gateway.project_item(&item.id, &cursors).await?;
        governor.observe(page.rate_limit);
        let refreshed = page.item.resolve()?;
        score = score.saturating_add(cursors.absorb(&refreshed.connection_pages())?);
    }

    Ok(ItemOutcome::Scored(ItemScore {
        item_id: item.id.clone(),
        score,
        previous: item.current_upvotes(),
    }))
}
