//! Upvote scoring over a GitHub project.
//!
//! The [`Walker`] pages through the project's items, the aggregator scores
//! each item by paging its nested connections, and the [`Mutator`] writes
//! scores back. With concurrency enabled the items of a page are scored in
//! parallel by the orchestrator.

pub mod aggregator;
pub mod mutator;
mod orchestrator;
pub mod walker;

pub use aggregator::{ItemOutcome, ItemScore, aggregate};
pub use mutator::{DEFAULT_MUTATION_DELAY_MS, Mutator, WriteOutcome, WriteTarget};
pub use walker::{
    DEFAULT_PAGE_SIZE, RunCounters, RunOutcome, RunReport, RunSettings, Walker,
};

#[cfg(test)]
mod tests;
