//! Upvote scoring for GitHub Projects (v2).
//!
//! The library walks the items of an organisation project, scores each
//! issue or pull request from its reactions, comments, and linked
//! discussions, and writes the score into a number field. Runs are
//! resumable: the position in the item list is published as a cursor that
//! the next run starts from.

pub mod config;
pub mod github;
pub mod logging;
pub mod output;
pub mod telemetry;
pub mod upvotes;

pub use config::UpvotesConfig;
pub use github::{
    OctocrabProjectGateway, OuterCursor, PersonalAccessToken, ProjectLocator, UpvoteError,
};
pub use upvotes::{RunOutcome, RunReport, RunSettings, Walker};
