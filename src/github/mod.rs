//! GitHub Projects (v2) access over GraphQL.
//!
//! This module wraps Octocrab to read project items with their nested
//! discussion connections, track the API point budget, and write scores back
//! to a number field. Errors are mapped into user-facing variants so callers
//! can surface precise failures without exposing Octocrab internals.

pub mod cursor;
pub mod error;
pub mod gateway;
pub mod locator;
pub mod models;
pub mod pagination;
pub mod rate_limit;

pub use cursor::{InnerCursorSet, OuterCursor};
pub use error::UpvoteError;
pub use gateway::{FieldMutationGateway, FieldUpdate, OctocrabProjectGateway, ProjectGateway};
pub use locator::{
    DEFAULT_API_BASE, FieldId, OrganizationLogin, PersonalAccessToken, ProjectId, ProjectItemId,
    ProjectLocator, ProjectNumber,
};
pub use models::{ProjectItem, ProjectItemPage, ProjectItemsPage, ProjectMetadata, SkipReason};
pub use rate_limit::{RateLimit, RateLimitGovernor};

#[cfg(test)]
pub use gateway::{MockFieldMutationGateway, MockProjectGateway};
