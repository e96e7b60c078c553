//! Writes scores back to the project's upvote field.

use std::sync::Arc;
use std::time::Duration;

use crate::github::error::UpvoteError;
use crate::github::gateway::{FieldMutationGateway, FieldUpdate};
use crate::github::locator::{FieldId, ProjectId};
use crate::github::rate_limit::RateLimitGovernor;

use super::aggregator::ItemScore;

/// Default pause after each mutation, in milliseconds.
pub const DEFAULT_MUTATION_DELAY_MS: u64 = 200;

/// Project and field that receive scores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteTarget {
    /// Project owning the items.
    pub project_id: ProjectId,
    /// Number field storing the score.
    pub field_id: FieldId,
}

/// What happened to a score handed to the mutator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Writing is disabled; the score was only logged.
    DryRun,
    /// The field already holds the score.
    Unchanged,
    /// The mutation was issued.
    Written,
}

enum WriteMode<M: ?Sized> {
    DryRun,
    Live {
        gateway: Arc<M>,
        target: WriteTarget,
    },
}

/// Issues at most one mutation per scored item.
pub struct Mutator<M: ?Sized> {
    mode: WriteMode<M>,
    governor: Arc<RateLimitGovernor>,
    delay: Duration,
}

impl<M> Mutator<M>
where
    M: FieldMutationGateway + ?Sized,
{
    /// Mutator that never calls the gateway.
    #[must_use]
    pub const fn dry_run(governor: Arc<RateLimitGovernor>) -> Self {
        Self {
            mode: WriteMode::DryRun,
            governor,
            delay: Duration::ZERO,
        }
    }

    /// Mutator that writes through `gateway`, pausing `delay` after each write.
    #[must_use]
    pub const fn live(
        gateway: Arc<M>,
        target: WriteTarget,
        governor: Arc<RateLimitGovernor>,
        delay: Duration,
    ) -> Self {
        Self {
            mode: WriteMode::Live { gateway, target },
            governor,
            delay,
        }
    }

    /// Returns true when scores are written back.
    #[must_use]
    pub const fn is_live(&self) -> bool {
        matches!(self.mode, WriteMode::Live { .. })
    }

    /// Applies one score.
    ///
    /// # Errors
    ///
    /// Propagates the gateway error when the mutation fails.
    pub async fn apply(&self, score: &ItemScore) -> Result<WriteOutcome, UpvoteError> {
        let WriteMode::Live { gateway, target } = &self.mode else {
            tracing::info!(
                item = %score.item_id,
                score = score.score,
                previous = ?score.previous,
                "dry run, not writing score"
            );
            return Ok(WriteOutcome::DryRun);
        };

        if score.is_unchanged() {
            tracing::debug!(item = %score.item_id, score = score.score, "score unchanged");
            return Ok(WriteOutcome::Unchanged);
        }

        let update = FieldUpdate::new(
            target.project_id.clone(),
            target.field_id.clone(),
            score.item_id.clone(),
            score.score,
        );
        gateway.update_number_field(&update).await?;
        self.governor.record_mutation();
        tracing::info!(
            item = %score.item_id,
            score = score.score,
            previous = ?score.previous,
            "wrote score"
        );

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(WriteOutcome::Written)
    }
}
